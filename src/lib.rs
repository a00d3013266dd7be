//! Record access over SQLite: typed records, generated statements.
//!
//! # Intention
//!
//! - Let record types declare their columns once ([`Record`]) and get
//!   SELECT / INSERT / UPDATE / DELETE without per-type SQL ([`Model`]).
//! - Turn structured filters into a parameterized `WHERE` clause
//!   ([`condition::translate`]).
//!
//! # Architectural Boundaries
//!
//! - Opening and configuring connections belongs to whoever owns the
//!   [`Database`] handle. Accessors only borrow it.
//! - No transport, no transactions, no migrations.

pub mod condition;
pub mod context;
pub mod datetime;
pub mod error;
pub mod model;
pub mod record;
pub mod sqlite;

pub use condition::{translate, Combine, Condition, Operand, Operator, WhereClause};
pub use context::Context;
pub use error::{ModelError, Result};
pub use model::{Inserted, Model, MAX_LIMIT};
pub use record::{Column, Record, Sort, SortOrder};
pub use sqlite::{Database, Executed, SqlQuery, SqliteConfig, Value};
