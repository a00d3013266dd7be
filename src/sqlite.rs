use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::types::{FromSql, FromSqlResult, Null, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::datetime::SQL_DATETIME;
use crate::error::{ModelError, Result};

/// Core value types for SQLite operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Integer(i64::from(v))
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

/// Timestamps are stored as `YYYY-MM-DD HH:MM:SS` text.
impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Text(v.format(SQL_DATETIME).to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(Null),
            Value::Boolean(b) => ToSqlOutput::from(*b),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Blob(b) => ToSqlOutput::from(b.as_slice()),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        })
    }
}

/// SQL statement with positional parameters, bound in order to `?` placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Vec<Value>,
}

impl SqlQuery {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    /// Number of `?` placeholders in the statement text.
    pub fn placeholders(&self) -> usize {
        self.statement.matches('?').count()
    }
}

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executed {
    /// Rowid of the most recent successful insert on the connection.
    pub last_insert_id: i64,
    pub rows_affected: usize,
}

/// SQLite connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Path to the SQLite database file; `:memory:` opens a private in-memory database
    pub db_path: PathBuf,
    /// How long a statement waits on a locked database before failing
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(":memory:"),
            busy_timeout_ms: 5_000,
        }
    }
}

impl SqliteConfig {
    /// Create a new SQLite config for the given path
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Shared handle to one SQLite connection.
///
/// Cloning is cheap and every clone refers to the same connection. Statements
/// from concurrent callers are serialized on the handle. Record accessors borrow
/// the handle and never close it; [`Database::close`] belongs to whoever opened it.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("open", &self.is_open())
            .finish()
    }
}

impl Database {
    /// Open the database described by `config`.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        tracing::info!(path = %config.db_path.display(), "opening sqlite database");
        let connection = Connection::open(&config.db_path)?;
        connection.busy_timeout(config.busy_timeout())?;
        Ok(Self::from_connection(connection))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(connection: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(connection))),
        }
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().is_some()
    }

    /// Close the connection for every clone of this handle.
    pub fn close(&self) -> Result<()> {
        if let Some(connection) = self.conn.lock().take() {
            connection.close().map_err(|(_, err)| ModelError::from(err))?;
        }
        Ok(())
    }

    /// Run several `;`-separated statements without parameters (schema setup).
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.run(&Context::background(), |conn| conn.execute_batch(sql))
    }

    /// Execute a statement that returns no rows.
    pub fn execute(&self, ctx: &Context, query: &SqlQuery) -> Result<Executed> {
        self.run(ctx, |conn| {
            let rows_affected =
                conn.execute(&query.statement, params_from_iter(query.params.iter()))?;
            Ok(Executed {
                last_insert_id: conn.last_insert_rowid(),
                rows_affected,
            })
        })
    }

    /// Run a query and map every returned row with `map`.
    pub fn query<T, F>(&self, ctx: &Context, query: &SqlQuery, mut map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.run(ctx, |conn| {
            let mut stmt = conn.prepare(&query.statement)?;
            let rows = stmt.query_map(params_from_iter(query.params.iter()), |row| map(row))?;
            let collected = rows.collect::<rusqlite::Result<Vec<T>>>();
            collected
        })
    }

    fn run<T>(
        &self,
        ctx: &Context,
        op: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let guard = self.acquire(ctx)?;
        let conn = guard.as_ref().ok_or(ModelError::NoDatabaseConnection)?;

        let bounded = ctx.is_bounded();
        if bounded {
            let interrupt = ctx.interrupt();
            conn.progress_handler(PROGRESS_OPS, Some(move || interrupt.fired()));
        }
        let result = op(conn);
        if bounded {
            conn.progress_handler(0, None::<fn() -> bool>);
        }

        result.map_err(|err| {
            let interrupted = matches!(
                &err,
                rusqlite::Error::SqliteFailure(failure, _)
                    if failure.code == rusqlite::ErrorCode::OperationInterrupted
            );
            match ctx.check() {
                Err(done) if interrupted => done,
                _ => ModelError::Execution(err),
            }
        })
    }

    /// Wait for the connection while another caller's statement runs.
    ///
    /// The wait is sliced so the context is re-checked between attempts; a context
    /// that ends while waiting fails without ever touching the connection.
    fn acquire(&self, ctx: &Context) -> Result<MutexGuard<'_, Option<Connection>>> {
        ctx.check()?;
        if !ctx.is_bounded() {
            return Ok(self.conn.lock());
        }
        loop {
            let slice = match ctx.deadline() {
                Some(deadline) => deadline
                    .saturating_duration_since(Instant::now())
                    .min(LOCK_POLL),
                None => LOCK_POLL,
            };
            if let Some(guard) = self.conn.try_lock_for(slice) {
                ctx.check()?;
                return Ok(guard);
            }
            ctx.check()?;
        }
    }
}

/// Longest single wait on the connection lock between two context checks.
const LOCK_POLL: Duration = Duration::from_millis(10);

/// Virtual machine instructions between two cancellation checks.
const PROGRESS_OPS: std::os::raw::c_int = 1_000;
