// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use sqlpane_app::{Filter, FilterOperator, Pagination, Row, Sort, SortDirection, compare_values};
use std::cmp::Ordering;

use crate::axis::AxisControl;

/// Rows to display, as indices into the caller's rows, plus the count the
/// footer shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derived {
    pub indices: Vec<usize>,
    pub total: usize,
    pub passthrough: bool,
}

impl Derived {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn source_index(&self, display_index: usize) -> Option<usize> {
        self.indices.get(display_index).copied()
    }
}

/// Applies each uncontrolled axis in filter, sort, page order. Controlled
/// axes were already applied by the caller and are skipped, so no axis is
/// ever applied twice.
pub fn derive(
    rows: &[Row],
    filters: &[Filter],
    sort: Option<&Sort>,
    pagination: Pagination,
    control: AxisControl,
    total_row_count: Option<usize>,
) -> Derived {
    if control.all_controlled() {
        return Derived {
            indices: (0..rows.len()).collect(),
            total: total_row_count.unwrap_or(rows.len()),
            passthrough: true,
        };
    }

    let mut indices = (0..rows.len()).collect::<Vec<_>>();

    if !control.filters {
        let active = filters
            .iter()
            .filter(|filter| filter.is_active())
            .collect::<Vec<_>>();
        if !active.is_empty() {
            indices.retain(|index| {
                active
                    .iter()
                    .all(|filter| row_matches_filter(&rows[*index], filter))
            });
        }
    }
    let filtered_count = indices.len();

    if !control.sort
        && let Some(sort) = sort
    {
        indices.sort_by(|left, right| compare_rows(&rows[*left], &rows[*right], sort));
    }

    if !control.pagination {
        let window = pagination.window(indices.len());
        indices = indices[window].to_vec();
    }

    Derived {
        indices,
        total: total_row_count.unwrap_or(filtered_count),
        passthrough: false,
    }
}

/// Client-side match: null operators test nullness, every other operator is
/// a case-insensitive substring test on the cell's display text. Exact
/// operator semantics apply only when the server filters.
pub fn row_matches_filter(row: &Row, filter: &Filter) -> bool {
    match filter.operator {
        FilterOperator::IsNull => row.is_null(&filter.column),
        FilterOperator::IsNotNull => !row.is_null(&filter.column),
        _ => {
            let needle = filter.value.trim().to_lowercase();
            if needle.is_empty() {
                return true;
            }
            row.display(&filter.column).to_lowercase().contains(&needle)
        }
    }
}

/// Nulls sort last in both directions.
pub fn compare_rows(left: &Row, right: &Row, sort: &Sort) -> Ordering {
    let left_value = left.get(&sort.column).filter(|value| !value.is_null());
    let right_value = right.get(&sort.column).filter(|value| !value.is_null());
    match (left_value, right_value) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(left), Some(right)) => match sort.direction {
            SortDirection::Asc => compare_values(left, right),
            SortDirection::Desc => compare_values(left, right).reverse(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{derive, row_matches_filter};
    use crate::axis::AxisControl;
    use serde_json::json;
    use sqlpane_app::{Filter, FilterOperator, Pagination, Row, Sort};

    fn people() -> Vec<Row> {
        vec![
            Row::from_pairs([("id", json!(1)), ("name", json!("Ada")), ("age", json!(36))]),
            Row::from_pairs([("id", json!(2)), ("name", json!("Grace")), ("age", json!(null))]),
            Row::from_pairs([("id", json!(3)), ("name", json!("Alan")), ("age", json!(41))]),
            Row::from_pairs([("id", json!(4)), ("name", json!("Barbara")), ("age", json!(12))]),
        ]
    }

    fn numbered(count: usize) -> Vec<Row> {
        (1..=count)
            .map(|id| Row::from_pairs([("id", json!(id))]))
            .collect()
    }

    fn ids(rows: &[Row], indices: &[usize]) -> Vec<i64> {
        indices
            .iter()
            .filter_map(|index| rows[*index].get("id").and_then(|id| id.as_i64()))
            .collect()
    }

    const CLIENT: AxisControl = AxisControl {
        pagination: false,
        sort: false,
        filters: false,
    };

    const SERVER: AxisControl = AxisControl {
        pagination: true,
        sort: true,
        filters: true,
    };

    #[test]
    fn all_controlled_axes_pass_rows_through_untouched() {
        let rows = people();
        let filters = vec![Filter::new("name", FilterOperator::Like, "zzz")];
        let derived = derive(
            &rows,
            &filters,
            Some(&Sort::desc("id")),
            Pagination::new(2, 1),
            SERVER,
            Some(99),
        );
        assert!(derived.passthrough);
        assert_eq!(derived.indices, vec![0, 1, 2, 3]);
        assert_eq!(derived.total, 99);
    }

    #[test]
    fn filter_is_case_insensitive_substring_and_anded() {
        let rows = people();
        let filters = vec![
            Filter::new("name", FilterOperator::Equals, "a"),
            Filter::new("name", FilterOperator::Like, "L"),
        ];
        let derived = derive(&rows, &filters, None, Pagination::new(1, 10), CLIENT, None);
        assert_eq!(ids(&rows, &derived.indices), vec![1, 3]);
        assert_eq!(derived.total, 2);
    }

    #[test]
    fn removing_filters_restores_every_row() {
        let rows = people();
        let filters = vec![Filter::new("name", FilterOperator::ILike, "gr")];
        let filtered = derive(&rows, &filters, None, Pagination::new(1, 10), CLIENT, None);
        assert_eq!(filtered.len(), 1);

        let unfiltered = derive(&rows, &[], None, Pagination::new(1, 10), CLIENT, None);
        assert_eq!(unfiltered.indices, vec![0, 1, 2, 3]);
        assert_eq!(rows, people());
    }

    #[test]
    fn null_operators_test_nullness() {
        let rows = people();
        let is_null = Filter::new("age", FilterOperator::IsNull, "");
        let not_null = Filter::new("age", FilterOperator::IsNotNull, "");
        assert!(row_matches_filter(&rows[1], &is_null));
        assert!(!row_matches_filter(&rows[0], &is_null));
        assert!(row_matches_filter(&rows[0], &not_null));
    }

    #[test]
    fn blank_value_filters_are_ignored() {
        let rows = people();
        let filters = vec![Filter::new("name", FilterOperator::Equals, "  ")];
        let derived = derive(&rows, &filters, None, Pagination::new(1, 10), CLIENT, None);
        assert_eq!(derived.len(), 4);
    }

    #[test]
    fn sort_keeps_nulls_last_in_both_directions() {
        let rows = people();
        let asc = derive(&rows, &[], Some(&Sort::asc("age")), Pagination::new(1, 10), CLIENT, None);
        assert_eq!(ids(&rows, &asc.indices), vec![4, 1, 3, 2]);

        let desc = derive(
            &rows,
            &[],
            Some(&Sort::desc("age")),
            Pagination::new(1, 10),
            CLIENT,
            None,
        );
        assert_eq!(ids(&rows, &desc.indices), vec![3, 1, 4, 2]);
    }

    #[test]
    fn sort_is_stable_for_equal_values() {
        let rows = vec![
            Row::from_pairs([("id", json!(1)), ("team", json!("b"))]),
            Row::from_pairs([("id", json!(2)), ("team", json!("a"))]),
            Row::from_pairs([("id", json!(3)), ("team", json!("b"))]),
            Row::from_pairs([("id", json!(4)), ("team", json!("a"))]),
        ];
        let derived = derive(
            &rows,
            &[],
            Some(&Sort::asc("team")),
            Pagination::new(1, 10),
            CLIENT,
            None,
        );
        assert_eq!(ids(&rows, &derived.indices), vec![2, 4, 1, 3]);
    }

    #[test]
    fn twenty_five_rows_paginate_by_ten() {
        let rows = numbered(25);
        let first = derive(&rows, &[], None, Pagination::new(1, 10), CLIENT, None);
        assert_eq!(ids(&rows, &first.indices), (1..=10).collect::<Vec<_>>());
        assert_eq!(first.total, 25);

        let last = derive(&rows, &[], None, Pagination::new(3, 10), CLIENT, None);
        assert_eq!(ids(&rows, &last.indices), (21..=25).collect::<Vec<_>>());
    }

    #[test]
    fn repeated_page_requests_are_identical() {
        let rows = people();
        let sort = Sort::asc("name");
        let first = derive(&rows, &[], Some(&sort), Pagination::new(2, 2), CLIENT, None);
        let second = derive(&rows, &[], Some(&sort), Pagination::new(2, 2), CLIENT, None);
        assert_eq!(first, second);
    }

    #[test]
    fn mixed_control_applies_only_uncontrolled_axes() {
        let rows = people();
        let control = AxisControl {
            pagination: true,
            sort: false,
            filters: true,
        };
        let filters = vec![Filter::new("name", FilterOperator::Like, "zzz")];
        let derived = derive(
            &rows,
            &filters,
            Some(&Sort::desc("id")),
            Pagination::new(9, 1),
            control,
            Some(40),
        );
        assert!(!derived.passthrough);
        assert_eq!(ids(&rows, &derived.indices), vec![4, 3, 2, 1]);
        assert_eq!(derived.total, 40);
    }

    #[test]
    fn total_is_post_filter_count_without_caller_total() {
        let rows = numbered(25);
        let filters = vec![Filter::new("id", FilterOperator::Like, "1")];
        let derived = derive(&rows, &filters, None, Pagination::new(1, 5), CLIENT, None);
        // 1, 10..=19, 21
        assert_eq!(derived.total, 12);
        assert_eq!(derived.len(), 5);
    }
}
