//! SQL statement data container.
//!
//! A `Statement` is pure data: SQL text, optional paging and time zone
//! overrides, and optional named parameters. Execution is performed by
//! [`QueryExecutor`](crate::query::QueryExecutor).
//!
//! SQL text is opaque. The only transformation applied is substitution of
//! `%(name)s` placeholders with escaped literals, and only when at least one
//! parameter is bound; `%%` then stands for a literal `%`.

use crate::error::QueryError;
use std::collections::BTreeMap;

/// A value bound to a `%(name)s` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// SQL NULL
    Null,
    /// Boolean literal
    Boolean(bool),
    /// Integer literal
    Integer(i64),
    /// Floating point literal
    Float(f64),
    /// String literal, single-quoted with embedded quotes doubled
    String(String),
    /// Comma-separated list of literals, e.g. for `IN (%(ids)s)`
    List(Vec<Parameter>),
    /// Inserted verbatim (e.g. `*`)
    Raw(String),
}

impl Parameter {
    /// Render the parameter as a SQL literal.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            Parameter::Null => "NULL".to_string(),
            Parameter::Boolean(true) => "TRUE".to_string(),
            Parameter::Boolean(false) => "FALSE".to_string(),
            Parameter::Integer(i) => i.to_string(),
            Parameter::Float(f) => f.to_string(),
            Parameter::String(s) => format!("'{}'", s.replace('\'', "''")),
            Parameter::List(items) => items
                .iter()
                .map(Parameter::to_sql_literal)
                .collect::<Vec<_>>()
                .join(", "),
            Parameter::Raw(s) => s.clone(),
        }
    }
}

impl From<&str> for Parameter {
    fn from(s: &str) -> Self {
        Parameter::String(s.to_string())
    }
}

impl From<String> for Parameter {
    fn from(s: String) -> Self {
        Parameter::String(s)
    }
}

impl From<i64> for Parameter {
    fn from(i: i64) -> Self {
        Parameter::Integer(i)
    }
}

impl From<i32> for Parameter {
    fn from(i: i32) -> Self {
        Parameter::Integer(i64::from(i))
    }
}

impl From<f64> for Parameter {
    fn from(f: f64) -> Self {
        Parameter::Float(f)
    }
}

impl From<bool> for Parameter {
    fn from(b: bool) -> Self {
        Parameter::Boolean(b)
    }
}

impl<T: Into<Parameter>> From<Vec<T>> for Parameter {
    fn from(items: Vec<T>) -> Self {
        Parameter::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Parameter>> From<Option<T>> for Parameter {
    fn from(value: Option<T>) -> Self {
        value.map_or(Parameter::Null, Into::into)
    }
}

/// A read-only SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    fetch_size: Option<u32>,
    time_zone: Option<String>,
    parameters: BTreeMap<String, Parameter>,
}

impl Statement {
    /// Create a statement from SQL text.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            fetch_size: None,
            time_zone: None,
            parameters: BTreeMap::new(),
        }
    }

    /// Override the connection's page size for this statement.
    ///
    /// A size of 0 keeps the connection default.
    #[must_use]
    pub fn with_fetch_size(mut self, fetch_size: u32) -> Self {
        self.fetch_size = Some(fetch_size);
        self
    }

    /// Override the connection's time zone for this statement.
    ///
    /// Only the standard dialect honors a time zone.
    #[must_use]
    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = Some(time_zone.into());
        self
    }

    /// Bind a value to the `%(name)s` placeholder.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Parameter>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// SQL text as given.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Page size override, if any.
    pub fn fetch_size(&self) -> Option<u32> {
        self.fetch_size
    }

    /// Time zone override, if any.
    pub fn time_zone(&self) -> Option<&str> {
        self.time_zone.as_deref()
    }

    /// Bound parameters.
    pub fn parameters(&self) -> &BTreeMap<String, Parameter> {
        &self.parameters
    }

    /// Render the SQL sent to the remote.
    ///
    /// # Errors
    /// Returns `QueryError::MissingParameter` for a placeholder with no bound value.
    pub fn build_sql(&self) -> Result<String, QueryError> {
        if self.parameters.is_empty() {
            return Ok(self.sql.clone());
        }

        let mut out = String::with_capacity(self.sql.len());
        let mut rest = self.sql.as_str();

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("%%") {
                out.push('%');
                rest = after;
            } else if let Some((name, after)) = tail
                .strip_prefix("%(")
                .and_then(|t| t.split_once(")s"))
            {
                let value = self
                    .parameters
                    .get(name)
                    .ok_or_else(|| QueryError::MissingParameter(name.to_string()))?;
                out.push_str(&value.to_sql_literal());
                rest = after;
            } else {
                out.push('%');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);

        Ok(out)
    }
}
