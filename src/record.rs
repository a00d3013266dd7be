//! Record shapes: how a Rust type maps onto table columns.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::condition::identifier;
use crate::error::{ModelError, Result};
use crate::sqlite::Value;

/// One declared column of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    /// Ignored columns never appear in generated SQL.
    pub ignored: bool,
}

impl Column {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            ignored: false,
        }
    }

    pub const fn ignored(name: &'static str) -> Self {
        Self {
            name,
            ignored: true,
        }
    }
}

/// A type whose fields are persisted as table columns.
///
/// The column list is declared once per type and read without an instance.
///
/// ```
/// use rust_record::{Column, Record, Value};
///
/// struct Tag {
///     id: Option<i64>,
///     label: String,
/// }
///
/// impl Record for Tag {
///     const COLUMNS: &'static [Column] = &[Column::new("id"), Column::new("label")];
///
///     fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
///         Ok(Self { id: row.get("id")?, label: row.get("label")? })
///     }
///
///     fn values(&self) -> Vec<(&'static str, Value)> {
///         let mut values = vec![("label", Value::from(self.label.as_str()))];
///         if let Some(id) = self.id {
///             values.push(("id", Value::from(id)));
///         }
///         values
///     }
/// }
///
/// assert_eq!(rust_record::record::column_names::<Tag>(), vec!["id", "label"]);
/// ```
pub trait Record: Sized {
    /// Columns in declaration order. Names must be unique.
    const COLUMNS: &'static [Column];

    /// Build a record from a row selected with [`column_names`].
    ///
    /// Values are read by column name; ignored fields take their defaults.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Populated columns with their values.
    ///
    /// Order does not matter and unset columns (e.g. a not yet assigned id) are
    /// simply left out. Entries naming an ignored or undeclared column are dropped.
    fn values(&self) -> Vec<(&'static str, Value)>;
}

/// Selectable columns of `R`, in declaration order.
pub fn column_names<R: Record>() -> Vec<&'static str> {
    R::COLUMNS
        .iter()
        .filter(|c| !c.ignored)
        .map(|c| c.name)
        .collect()
}

/// Populated columns of `record` and their values, in declaration order.
pub fn populated<R: Record>(record: &R) -> Vec<(&'static str, Value)> {
    let mut values = record.values();
    let mut populated = Vec::with_capacity(values.len());
    for column in R::COLUMNS.iter().filter(|c| !c.ignored) {
        if let Some(pos) = values.iter().position(|(name, _)| *name == column.name) {
            populated.push(values.swap_remove(pos));
        }
    }
    populated
}

/// Check that `R` declares unique, well-formed column names.
///
/// Run by every statement builder before any SQL text is produced.
pub fn validate_columns<R: Record>() -> Result<()> {
    let mut seen = HashSet::new();
    for column in R::COLUMNS {
        identifier(column.name)?;
        if !seen.insert(column.name) {
            return Err(ModelError::DuplicateColumn(column.name));
        }
    }
    Ok(())
}

/// Direction of one `ORDER BY` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One sort entry, written `<prefix><column>`.
///
/// The prefix mapping is `-` for ascending and `+` for descending, which is
/// what existing callers send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sort {
    pub column: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Desc,
        }
    }

    /// Parse a comma separated list such as `-title,+id`.
    pub fn parse_list(spec: &str) -> Result<Vec<Sort>> {
        spec.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<Sort>)
            .collect()
    }

    pub(crate) fn to_sql(&self) -> Result<String> {
        Ok(format!("{} {}", identifier(&self.column)?, self.order.as_str()))
    }
}

impl FromStr for Sort {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let (order, column) = if let Some(column) = s.strip_prefix('-') {
            (SortOrder::Asc, column)
        } else if let Some(column) = s.strip_prefix('+') {
            (SortOrder::Desc, column)
        } else {
            return Err(ModelError::InvalidSort(s.to_string()));
        };
        if identifier(column).is_err() {
            return Err(ModelError::InvalidSort(s.to_string()));
        }
        Ok(Self {
            column: column.to_string(),
            order,
        })
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.order {
            SortOrder::Asc => '-',
            SortOrder::Desc => '+',
        };
        write!(f, "{prefix}{}", self.column)
    }
}

impl TryFrom<String> for Sort {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Sort> for String {
    fn from(sort: Sort) -> Self {
        sort.to_string()
    }
}
