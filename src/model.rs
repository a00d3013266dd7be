//! Per-table record accessor.
//!
//! A [`Model`] is bound to one table and one [`Database`] handle. Callers set
//! pagination and sort state, then issue one operation at a time; each call
//! builds a single parameterized statement and executes it.

use crate::condition::{identifier, translate, Condition};
use crate::context::Context;
use crate::error::{ModelError, Result};
use crate::record::{column_names, populated, validate_columns, Record, Sort};
use crate::sqlite::{Database, SqlQuery, Value};

/// Largest page size accepted by [`Model::set_limit`].
pub const MAX_LIMIT: u32 = 50;

/// Result of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inserted {
    /// Rowid generated for the (last) inserted row.
    pub id: i64,
    pub rows_affected: usize,
}

/// Statement builder and executor for one table.
///
/// Not meant to be shared between concurrent operations: use one instance per
/// logical request. The database handle is shared and never closed here.
#[derive(Debug, Clone)]
pub struct Model {
    db: Database,
    table: String,
    limit: u32,
    offset: u32,
    sort: Vec<Sort>,
}

impl Model {
    /// Bind a new accessor to `table` on `db`, unpaginated and unsorted.
    pub fn new(table: impl Into<String>, db: &Database) -> Result<Self> {
        if !db.is_open() {
            return Err(ModelError::NoDatabaseConnection);
        }
        let table = table.into();
        identifier(&table)?;
        Ok(Self {
            db: db.clone(),
            table,
            limit: 0,
            offset: 0,
            sort: Vec::new(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn sort(&self) -> &[Sort] {
        &self.sort
    }

    /// Page size for selects. `0` removes the limit.
    pub fn set_limit(&mut self, limit: u32) -> Result<()> {
        if limit > MAX_LIMIT {
            return Err(ModelError::LimitOutOfRange(limit));
        }
        self.limit = limit;
        Ok(())
    }

    /// Rows to skip. Only applied together with a limit.
    pub fn set_offset(&mut self, offset: u32) {
        self.offset = offset;
    }

    pub fn set_sort(&mut self, sort: Vec<Sort>) {
        self.sort = sort;
    }

    /// Replace the sort state from a list like `-title,+id`.
    pub fn sort_by(&mut self, spec: &str) -> Result<()> {
        self.sort = Sort::parse_list(spec)?;
        Ok(())
    }

    /// `SELECT` statement for `R` under the current pagination and sort state.
    pub fn build_select<R: Record>(&self, conditions: &[Condition]) -> Result<SqlQuery> {
        validate_columns::<R>()?;
        let columns = column_names::<R>();
        if columns.is_empty() {
            return Err(ModelError::NoSelectableColumns);
        }
        let filter = translate(conditions)?;

        let mut sql = format!("SELECT {} FROM {}", columns.join(","), self.table);
        sql.push_str(&filter.sql);

        if !self.sort.is_empty() {
            let order = self
                .sort
                .iter()
                .map(Sort::to_sql)
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(","));
        }

        if self.limit != 0 {
            sql.push_str(&format!(" LIMIT {},{}", self.offset, self.limit));
        }

        Ok(SqlQuery::new(sql).with_params(filter.args))
    }

    /// Select every matching row. No match is an empty vector, not an error.
    pub fn select<R: Record>(&self, ctx: &Context, conditions: &[Condition]) -> Result<Vec<R>> {
        let query = self.build_select::<R>(conditions)?;
        tracing::debug!(
            table = %self.table,
            sql = %query.statement,
            args = query.params.len(),
            "select"
        );
        self.db.query(ctx, &query, R::from_row)
    }

    /// The single matching row.
    ///
    /// Zero rows is [`ModelError::NotFound`], more than one is
    /// [`ModelError::MultipleRecords`].
    pub fn select_one<R: Record>(&self, ctx: &Context, conditions: &[Condition]) -> Result<R> {
        let mut rows = self.select(ctx, conditions)?.into_iter();
        let first = rows.next().ok_or(ModelError::NotFound)?;
        if rows.next().is_some() {
            return Err(ModelError::MultipleRecords);
        }
        Ok(first)
    }

    /// Multi-row `INSERT` for `records`. All records must populate the same columns.
    pub fn build_insert<R: Record>(&self, records: &[R]) -> Result<SqlQuery> {
        validate_columns::<R>()?;
        let mut rows = records.iter().map(populated);
        let first = rows.next().unwrap_or_default();
        if first.is_empty() {
            return Err(ModelError::NoInsertRecordProvided);
        }

        let columns: Vec<&str> = first.iter().map(|(name, _)| *name).collect();
        let tuple = format!("({})", vec!["?"; columns.len()].join(","));
        let mut tuples = vec![tuple.clone()];
        let mut params: Vec<Value> = first.into_iter().map(|(_, v)| v).collect();

        for row in rows {
            let same_columns = row.len() == columns.len()
                && row.iter().zip(&columns).all(|((name, _), column)| name == column);
            if !same_columns {
                return Err(ModelError::MismatchedColumns);
            }
            tuples.push(tuple.clone());
            params.extend(row.into_iter().map(|(_, v)| v));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            columns.join(","),
            tuples.join(",")
        );
        Ok(SqlQuery::new(sql).with_params(params))
    }

    /// Insert one record, returning its generated id.
    ///
    /// A record with no populated column fails with
    /// [`ModelError::NoInsertRecordProvided`] before anything is executed.
    pub fn insert<R: Record>(&self, ctx: &Context, record: &R) -> Result<Inserted> {
        self.insert_batch(ctx, std::slice::from_ref(record))
    }

    /// Insert several records in one statement. The id is that of the last row.
    pub fn insert_batch<R: Record>(&self, ctx: &Context, records: &[R]) -> Result<Inserted> {
        let query = self.build_insert(records)?;
        tracing::debug!(
            table = %self.table,
            sql = %query.statement,
            args = query.params.len(),
            "insert"
        );
        let executed = self.db.execute(ctx, &query)?;
        Ok(Inserted {
            id: executed.last_insert_id,
            rows_affected: executed.rows_affected,
        })
    }

    /// `UPDATE` statement: SET values are bound first, then the filter's.
    pub fn build_update(
        &self,
        set: &[(&str, Value)],
        conditions: &[Condition],
    ) -> Result<SqlQuery> {
        if set.is_empty() {
            return Err(ModelError::NoUpdateRecordProvided);
        }
        let assignments = set
            .iter()
            .map(|(column, _)| identifier(column).map(|c| format!("{c}=?")))
            .collect::<Result<Vec<_>>>()?;
        let filter = translate(conditions)?;

        let mut params: Vec<Value> = set.iter().map(|(_, v)| v.clone()).collect();
        params.extend(filter.args);
        let sql = format!(
            "UPDATE {} SET {}{}",
            self.table,
            assignments.join(","),
            filter.sql
        );
        Ok(SqlQuery::new(sql).with_params(params))
    }

    /// Update matching rows, returning how many were affected.
    ///
    /// Empty `conditions` update the whole table.
    pub fn update(
        &self,
        ctx: &Context,
        set: &[(&str, Value)],
        conditions: &[Condition],
    ) -> Result<usize> {
        let query = self.build_update(set, conditions)?;
        tracing::debug!(
            table = %self.table,
            sql = %query.statement,
            args = query.params.len(),
            "update"
        );
        Ok(self.db.execute(ctx, &query)?.rows_affected)
    }

    /// Execute a caller-written statement as is.
    ///
    /// Nothing is generated or validated; parameterizing safely is up to the caller.
    pub fn delete(&self, ctx: &Context, statement: &str, args: &[Value]) -> Result<usize> {
        let query = SqlQuery::new(statement).with_params(args.to_vec());
        tracing::debug!(table = %self.table, sql = %query.statement, args = args.len(), "delete");
        Ok(self.db.execute(ctx, &query)?.rows_affected)
    }

    pub fn build_delete(&self, conditions: &[Condition]) -> Result<SqlQuery> {
        let filter = translate(conditions)?;
        let sql = format!("DELETE FROM {}{}", self.table, filter.sql);
        Ok(SqlQuery::new(sql).with_params(filter.args))
    }

    /// Delete matching rows through the condition translator.
    ///
    /// Empty `conditions` delete every row.
    pub fn delete_where(&self, ctx: &Context, conditions: &[Condition]) -> Result<usize> {
        let query = self.build_delete(conditions)?;
        tracing::debug!(
            table = %self.table,
            sql = %query.statement,
            args = query.params.len(),
            "delete"
        );
        Ok(self.db.execute(ctx, &query)?.rows_affected)
    }
}
