// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::ids::ConnectionId;

pub const PAGE_SIZE_CHOICES: [usize; 4] = [10, 25, 50, 100];
pub const DEFAULT_PAGE_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Sort that results from clicking `column` while `current` is active.
    /// A new column starts ascending; the active column flips direction.
    pub fn next(current: Option<&Sort>, column: &str) -> Sort {
        match current {
            Some(sort) if sort.column == column => Sort {
                column: sort.column.clone(),
                direction: sort.direction.toggled(),
            },
            _ => Sort::asc(column),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "eq")]
    Equals,
    #[serde(rename = "neq")]
    NotEquals,
    #[serde(rename = "gt")]
    GreaterThan,
    #[serde(rename = "gte")]
    GreaterThanOrEqual,
    #[serde(rename = "lt")]
    LessThan,
    #[serde(rename = "lte")]
    LessThanOrEqual,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "ilike")]
    ILike,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "is_null")]
    IsNull,
    #[serde(rename = "is_not_null")]
    IsNotNull,
}

impl FilterOperator {
    pub const ALL: [Self; 11] = [
        Self::Equals,
        Self::NotEquals,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::Like,
        Self::ILike,
        Self::In,
        Self::IsNull,
        Self::IsNotNull,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "eq",
            Self::NotEquals => "neq",
            Self::GreaterThan => "gt",
            Self::GreaterThanOrEqual => "gte",
            Self::LessThan => "lt",
            Self::LessThanOrEqual => "lte",
            Self::Like => "like",
            Self::ILike => "ilike",
            Self::In => "in",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|operator| operator.as_str() == value)
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::In => "IN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    pub const fn takes_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }

    pub fn rotate(self, delta: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let current = Self::ALL
            .iter()
            .position(|operator| *operator == self)
            .unwrap_or(0) as isize;
        Self::ALL[(current + delta).rem_euclid(len) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

impl Filter {
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.operator.takes_value() || !self.value.trim().is_empty()
    }

    pub fn describe(&self) -> String {
        if self.operator.takes_value() {
            format!("{} {} {}", self.column, self.operator.symbol(), self.value)
        } else {
            format!("{} {}", self.column, self.operator.symbol())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn offset(self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn total_pages(self, total: usize) -> usize {
        total.div_ceil(self.page_size.max(1)).max(1)
    }

    pub fn has_previous(self) -> bool {
        self.page > 1
    }

    pub fn has_next(self, total: usize) -> bool {
        self.page < self.total_pages(total)
    }

    /// Index range of the current page within a dataset of `len` rows.
    pub fn window(self, len: usize) -> Range<usize> {
        let start = self.offset().min(len);
        let end = self
            .offset()
            .saturating_add(self.page_size)
            .min(len);
        start..end
    }

    pub fn with_page(self, page: usize) -> Self {
        Self::new(page, self.page_size)
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        Self::new(1, page_size)
    }

    pub fn clamped(self, total: usize) -> Self {
        Self::new(self.page.min(self.total_pages(total)), self.page_size)
    }
}

pub fn is_valid_page_size(page_size: usize) -> bool {
    PAGE_SIZE_CHOICES.contains(&page_size)
}

pub fn step_page_size(current: usize, delta: isize) -> usize {
    let index = PAGE_SIZE_CHOICES
        .iter()
        .position(|size| *size >= current)
        .unwrap_or(PAGE_SIZE_CHOICES.len() - 1) as isize;
    let next = (index + delta).clamp(0, PAGE_SIZE_CHOICES.len() as isize - 1);
    PAGE_SIZE_CHOICES[next as usize]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl fmt::Display for ForeignKeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.schema, self.table, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Primary,
    Foreign,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub references: Option<ForeignKeyRef>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_primary_key: false,
            is_foreign_key: false,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn foreign_key(mut self, reference: ForeignKeyRef) -> Self {
        self.is_foreign_key = true;
        self.references = Some(reference);
        self
    }

    /// Primary wins when a column is flagged both ways.
    pub fn key_kind(&self) -> Option<KeyKind> {
        if self.is_primary_key {
            Some(KeyKind::Primary)
        } else if self.is_foreign_key {
            Some(KeyKind::Foreign)
        } else {
            None
        }
    }
}

pub fn primary_key_column(columns: &[ColumnDescriptor]) -> Option<&ColumnDescriptor> {
    columns.iter().find(|column| column.is_primary_key)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    pub fn is_null(&self, column: &str) -> bool {
        matches!(self.0.get(column), None | Some(Value::Null))
    }

    pub fn display(&self, column: &str) -> String {
        self.0.get(column).map(display_value).unwrap_or_default()
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Row {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Ordering for two non-null cell values. Same-kind values use their natural
/// order; mixed kinds fall back to the display text.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            if let (Some(left), Some(right)) = (left.as_i64(), right.as_i64()) {
                return left.cmp(&right);
            }
            match (left.as_f64(), right.as_f64()) {
                (Some(left), Some(right)) => left.total_cmp(&right),
                _ => left.to_string().cmp(&right.to_string()),
            }
        }
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        _ => display_value(left).cmp(&display_value(right)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub connection: ConnectionId,
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(
        connection: ConnectionId,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            connection,
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn storage_key(&self) -> String {
        format!("{}:{}:{}", self.connection, self.schema, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Column name to width in terminal cells.
pub type ColumnWidths = BTreeMap<String, u16>;

pub trait WidthStore {
    fn load_widths(&self, key: &str) -> Result<Option<ColumnWidths>>;
    fn save_widths(&self, key: &str, widths: &ColumnWidths) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::{
        ColumnDescriptor, FilterOperator, ForeignKeyRef, KeyKind, Pagination, Row, Sort,
        SortDirection, TableRef, compare_values, step_page_size,
    };
    use crate::ConnectionId;
    use serde_json::json;
    use std::cmp::Ordering;

    #[test]
    fn sort_toggle_on_same_column_is_an_involution_pair() {
        let first = Sort::next(None, "name");
        assert_eq!(first.direction, SortDirection::Asc);
        let second = Sort::next(Some(&first), "name");
        assert_eq!(second.direction, SortDirection::Desc);
        let third = Sort::next(Some(&second), "name");
        assert_eq!(third, first);
    }

    #[test]
    fn sort_on_new_column_starts_ascending() {
        let current = Sort::desc("name");
        assert_eq!(Sort::next(Some(&current), "id"), Sort::asc("id"));
    }

    #[test]
    fn pagination_footer_for_twenty_five_rows() {
        let pagination = Pagination::new(1, 10);
        assert_eq!(pagination.total_pages(25), 3);
        assert!(!pagination.has_previous());
        assert!(pagination.has_next(25));
        assert_eq!(pagination.window(25), 0..10);

        let last = pagination.with_page(3);
        assert_eq!(last.window(25), 20..25);
        assert!(!last.has_next(25));
    }

    #[test]
    fn pagination_window_past_end_is_empty() {
        assert_eq!(Pagination::new(5, 10).window(25), 25..25);
        assert_eq!(Pagination::new(5, 10).clamped(25).page, 3);
        assert_eq!(Pagination::new(1, 10).total_pages(0), 1);
    }

    #[test]
    fn page_size_steps_through_choices() {
        assert_eq!(step_page_size(25, 1), 50);
        assert_eq!(step_page_size(25, -1), 10);
        assert_eq!(step_page_size(10, -1), 10);
        assert_eq!(step_page_size(100, 1), 100);
        assert_eq!(step_page_size(30, 0), 50);
    }

    #[test]
    fn filter_operator_strings_round_trip() {
        for operator in FilterOperator::ALL {
            assert_eq!(FilterOperator::parse(operator.as_str()), Some(operator));
        }
        assert!(!FilterOperator::IsNull.takes_value());
        assert_eq!(FilterOperator::IsNotNull.rotate(1), FilterOperator::Equals);
    }

    #[test]
    fn column_descriptor_decodes_backend_shape() -> anyhow::Result<()> {
        let column: ColumnDescriptor = serde_json::from_value(json!({
            "name": "customer_id",
            "type": "integer",
            "isForeignKey": true,
            "references": {"schema": "public", "table": "customers", "column": "id"}
        }))?;
        assert_eq!(column.key_kind(), Some(KeyKind::Foreign));
        assert_eq!(
            column.references,
            Some(ForeignKeyRef {
                schema: "public".to_owned(),
                table: "customers".to_owned(),
                column: "id".to_owned(),
            })
        );

        let both = ColumnDescriptor::new("id", "integer").primary_key();
        assert_eq!(both.key_kind(), Some(KeyKind::Primary));
        Ok(())
    }

    #[test]
    fn row_display_and_null_handling() {
        let row = Row::from_pairs([
            ("name", json!("Ada")),
            ("age", json!(36)),
            ("tags", json!(["a", "b"])),
            ("note", json!(null)),
        ]);
        assert_eq!(row.display("name"), "Ada");
        assert_eq!(row.display("age"), "36");
        assert_eq!(row.display("tags"), r#"["a","b"]"#);
        assert_eq!(row.display("note"), "");
        assert!(row.is_null("note"));
        assert!(row.is_null("missing"));
        assert!(!row.is_null("age"));
    }

    #[test]
    fn compare_values_uses_natural_order_per_kind() {
        assert_eq!(compare_values(&json!(9), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(2.5), &json!(2)), Ordering::Greater);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(false), &json!(true)), Ordering::Less);
        assert_eq!(compare_values(&json!(10), &json!("9")), Ordering::Less);
    }

    #[test]
    fn table_ref_storage_key_is_composite() {
        let table = TableRef::new(ConnectionId::new(7), "public", "orders");
        assert_eq!(table.storage_key(), "7:public:orders");
        assert_eq!(table.to_string(), "public.orders");
    }
}
