//! Translation of filter conditions into a parameterized `WHERE` clause.
//!
//! Conditions are applied left to right and joined flat: each condition after
//! the first carries its own `AND`/`OR`, and no parentheses are generated.
//! Callers that need grouping must express it some other way.
//!
//! Every operand is bound through a `?` placeholder, `LIKE` patterns included.
//! Field names are written into the statement text and must be plain identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::sqlite::Value;

/// Boolean joiner placed in front of a condition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combine {
    /// Only valid on the first condition.
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl Combine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combine::None => "",
            Combine::And => "AND",
            Combine::Or => "OR",
        }
    }
}

/// Query operators for building conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    In,
    IsNull,
    IsNotNull,
    Like,
    Between,
}

impl Operator {
    /// SQL spelling of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::In => "IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Like => "LIKE",
            Operator::Between => "BETWEEN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = ModelError;

    /// Keywords are matched case-insensitively; inner whitespace is collapsed.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let op = match normalized.to_ascii_uppercase().as_str() {
            "=" => Operator::Equal,
            "!=" => Operator::NotEqual,
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterThanOrEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessThanOrEqual,
            "IN" => Operator::In,
            "IS NULL" => Operator::IsNull,
            "IS NOT NULL" => Operator::IsNotNull,
            "LIKE" => Operator::Like,
            "BETWEEN" => Operator::Between,
            _ => return Err(ModelError::UnsupportedOperator(s.to_string())),
        };
        Ok(op)
    }
}

impl TryFrom<String> for Operator {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

/// Right-hand side of a condition.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    /// Sequence operand for `IN` and `BETWEEN`.
    List(Vec<Value>),
    Scalar(Value),
    /// No operand (`IS NULL`, `IS NOT NULL`).
    #[default]
    None,
}

impl Operand {
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<T> for Operand {
    fn from(value: T) -> Self {
        Operand::Scalar(value.into())
    }
}

/// One filter predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub combine: Combine,
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Operand,
}

impl Condition {
    /// A leading condition (no combinator).
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Operand>) -> Self {
        Self {
            combine: Combine::None,
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn and(field: impl Into<String>, operator: Operator, value: impl Into<Operand>) -> Self {
        Self {
            combine: Combine::And,
            ..Self::new(field, operator, value)
        }
    }

    pub fn or(field: impl Into<String>, operator: Operator, value: impl Into<Operand>) -> Self {
        Self {
            combine: Combine::Or,
            ..Self::new(field, operator, value)
        }
    }

    /// Build a condition from its textual parts, as received from an external request.
    pub fn parse(
        combine: &str,
        field: impl Into<String>,
        operator: &str,
        value: impl Into<Operand>,
    ) -> Result<Self> {
        let field = field.into();
        let combine = match combine.trim().to_ascii_uppercase().as_str() {
            "" => Combine::None,
            "AND" => Combine::And,
            "OR" => Combine::Or,
            _ => return Err(ModelError::InvalidCombine { field }),
        };
        Ok(Self {
            combine,
            field,
            operator: operator.parse()?,
            value: value.into(),
        })
    }

    fn invalid_operand(&self) -> ModelError {
        ModelError::InvalidOperandKind {
            field: self.field.clone(),
            operator: self.operator.to_string(),
        }
    }

    fn scalar(&self) -> Result<&Value> {
        match &self.value {
            Operand::Scalar(v) => Ok(v),
            _ => Err(self.invalid_operand()),
        }
    }

    fn list(&self) -> Result<&[Value]> {
        match &self.value {
            Operand::List(values) => Ok(values),
            _ => Err(self.invalid_operand()),
        }
    }

    /// Emit this condition's SQL (without combinator), pushing bound values onto `args`.
    fn fragment(&self, args: &mut Vec<Value>) -> Result<String> {
        let field = identifier(&self.field)?;
        let op = self.operator;
        let sql = match op {
            Operator::Equal
            | Operator::NotEqual
            | Operator::GreaterThan
            | Operator::GreaterThanOrEqual
            | Operator::LessThan
            | Operator::LessThanOrEqual => {
                args.push(self.scalar()?.clone());
                format!("{field}{op}?")
            }
            Operator::In => {
                let values = self.list()?;
                let marks = vec!["?"; values.len()].join(",");
                args.extend_from_slice(values);
                format!("{field} IN ({marks})")
            }
            Operator::IsNull | Operator::IsNotNull => format!("{field} {op}"),
            Operator::Like => {
                let pattern = self.scalar()?;
                if pattern.as_text().is_none() {
                    return Err(self.invalid_operand());
                }
                args.push(pattern.clone());
                format!("{field} LIKE ?")
            }
            Operator::Between => match self.list()? {
                [low, high] => {
                    args.push(low.clone());
                    args.push(high.clone());
                    format!("{field} BETWEEN ? AND ?")
                }
                _ => return Err(self.invalid_operand()),
            },
        };
        Ok(sql)
    }
}

/// Translated `WHERE` clause: SQL text plus positional arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    /// Either empty or `" WHERE ..."`, ready to append to a statement.
    pub sql: String,
    pub args: Vec<Value>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Translate `conditions` into a `WHERE` clause.
///
/// An empty slice yields an empty clause. The clause carries exactly one
/// argument per `?` placeholder, in condition order.
pub fn translate(conditions: &[Condition]) -> Result<WhereClause> {
    let mut fragments = Vec::with_capacity(conditions.len());
    let mut args = Vec::new();

    for (i, condition) in conditions.iter().enumerate() {
        let leading = i == 0;
        if leading != (condition.combine == Combine::None) {
            return Err(ModelError::InvalidCombine {
                field: condition.field.clone(),
            });
        }
        let fragment = condition.fragment(&mut args)?;
        fragments.push(if leading {
            fragment
        } else {
            format!("{} {fragment}", condition.combine.as_str())
        });
    }

    if fragments.is_empty() {
        return Ok(WhereClause::default());
    }
    Ok(WhereClause {
        sql: format!(" WHERE {}", fragments.join(" ")),
        args,
    })
}

/// Validate a column name before it is written into statement text.
///
/// Accepts `name` and `table.name` made of ASCII letters, digits and `_`.
pub(crate) fn identifier(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(name)
    } else {
        Err(ModelError::InvalidIdentifier(name.to_string()))
    }
}
