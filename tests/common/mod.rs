#![allow(dead_code)]

use chrono::NaiveDateTime;
use rust_record::datetime::parse_sql_datetime;
use rust_record::{Column, Database, Record, Result, SqliteConfig, Value};
use tempfile::NamedTempFile;

pub const SCHEMA: &str = r#"
    CREATE TABLE todo (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        reminder TEXT
    );
    CREATE INDEX idx_todo_title ON todo(title);
"#;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToDo {
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub reminder: Option<NaiveDateTime>,
    // in-process flag, never persisted
    pub cache_this: bool,
}

impl ToDo {
    pub fn new(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            ..Self::default()
        }
    }

    pub fn with_reminder(mut self, reminder: &str) -> Self {
        self.reminder = parse_sql_datetime(reminder);
        self
    }
}

impl Record for ToDo {
    const COLUMNS: &'static [Column] = &[
        Column::new("id"),
        Column::new("title"),
        Column::new("description"),
        Column::new("reminder"),
        Column::ignored("cache_this"),
    ];

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let reminder: Option<String> = row.get("reminder")?;
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            reminder: reminder.as_deref().and_then(parse_sql_datetime),
            cache_this: false,
        })
    }

    fn values(&self) -> Vec<(&'static str, Value)> {
        let mut values = vec![
            ("cache_this", Value::from(self.cache_this)),
            ("description", Value::from(self.description.as_str())),
            ("title", Value::from(self.title.as_str())),
        ];
        if let Some(id) = self.id {
            values.push(("id", Value::from(id)));
        }
        if let Some(reminder) = self.reminder {
            values.push(("reminder", Value::from(reminder)));
        }
        values
    }
}

// Helper function to create an in-memory database for testing
pub fn create_test_db() -> Result<Database> {
    let db = Database::open_in_memory()?;
    db.execute_batch(SCHEMA)?;
    Ok(db)
}

// Helper function to create a temporary file-based database
pub fn create_temp_db() -> Result<(Database, NamedTempFile)> {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::open(&SqliteConfig::new(temp_file.path()))?;
    db.execute_batch(SCHEMA)?;
    Ok((db, temp_file))
}
