// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde_json::{Number, Value};

use crate::{ColumnDescriptor, Row};

/// Best-effort conversion of typed text into a JSON value. Numeric text
/// becomes a number and JSON-looking text is parsed; everything else,
/// including JSON-looking text that fails to parse, stays a string.
pub fn coerce_input(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::String(raw.to_owned());
    }

    if let Ok(integer) = trimmed.parse::<i64>() {
        return Value::Number(integer.into());
    }

    if looks_numeric(trimmed)
        && let Ok(float) = trimmed.parse::<f64>()
        && let Some(number) = Number::from_f64(float)
    {
        return Value::Number(number);
    }

    if looks_like_json(trimmed)
        && let Ok(parsed) = serde_json::from_str::<Value>(trimmed)
    {
        return parsed;
    }

    Value::String(raw.to_owned())
}

// f64 parsing also accepts "inf" and "NaN"; only digit-shaped text counts.
fn looks_numeric(text: &str) -> bool {
    let body = text.strip_prefix(['-', '+']).unwrap_or(text);
    body.starts_with(|ch: char| ch.is_ascii_digit() || ch == '.')
        && body
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | 'e' | 'E' | '-' | '+'))
}

fn looks_like_json(text: &str) -> bool {
    text.starts_with('{')
        || text.starts_with('[')
        || matches!(text, "true" | "false" | "null")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub column: String,
    pub data_type: String,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertForm {
    pub fields: Vec<FormField>,
}

impl InsertForm {
    pub fn for_columns(columns: &[ColumnDescriptor]) -> Self {
        Self {
            fields: columns
                .iter()
                .map(|column| FormField {
                    column: column.name.clone(),
                    data_type: column.data_type.clone(),
                    input: String::new(),
                })
                .collect(),
        }
    }

    pub fn set(&mut self, column: &str, input: impl Into<String>) -> bool {
        match self.fields.iter_mut().find(|field| field.column == column) {
            Some(field) => {
                field.input = input.into();
                true
            }
            None => false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            bail!("table has no columns to insert into");
        }
        if self.fields.iter().all(|field| field.input.trim().is_empty()) {
            bail!("fill in at least one column before inserting");
        }
        Ok(())
    }

    /// Payload sent to the backend. Blank fields are left out so the
    /// database can apply column defaults.
    pub fn payload(&self) -> Result<Row> {
        self.validate()?;
        let mut row = Row::new();
        for field in &self.fields {
            if field.input.trim().is_empty() {
                continue;
            }
            row.insert(field.column.clone(), coerce_input(&field.input));
        }
        Ok(row)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub column: String,
    pub input: String,
}

impl EditForm {
    pub fn new(column: impl Into<String>, current: &Value) -> Self {
        Self {
            column: column.into(),
            input: crate::display_value(current),
        }
    }

    /// Blank input clears the cell.
    pub fn payload(&self) -> Value {
        if self.input.trim().is_empty() {
            Value::Null
        } else {
            coerce_input(&self.input)
        }
    }
}
