//! SQLite catalog connection.

use rusqlite::types::{Value, ValueRef};
use tokio_rusqlite::Connection;
use tracing::debug;

use super::{CatalogConnection, CatalogRow, CatalogValue, Dialect, SqlParam};
use crate::error::{SquashError, SquashResult};

/// A SQLite database opened on the blocking worker thread.
pub struct SqliteCatalog {
    conn: Connection,
}

/// Extract the file path from a `sqlite:` URL. `None` means in-memory.
pub fn database_path(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("sqlite3:")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let rest = rest.split('?').next().unwrap_or(rest);

    match rest {
        "" | ":memory:" => None,
        path => Some(path.to_string()),
    }
}

impl SqliteCatalog {
    /// Open the database named by the URL.
    pub async fn connect(url: &str) -> SquashResult<Self> {
        let conn = match database_path(url) {
            None => Connection::open_in_memory().await,
            Some(path) => Connection::open(path).await,
        }
        .map_err(db_error)?;

        Ok(Self { conn })
    }

    /// Wrap an already opened connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }
}

fn db_error(e: tokio_rusqlite::Error) -> SquashError {
    SquashError::database(e.to_string())
}

fn bind(params: &[SqlParam]) -> Vec<Value> {
    params
        .iter()
        .map(|p| match p {
            SqlParam::Text(s) => Value::Text(s.clone()),
            SqlParam::Int(i) => Value::Integer((*i).into()),
        })
        .collect()
}

fn from_value_ref(value: ValueRef<'_>) -> CatalogValue {
    match value {
        ValueRef::Null => CatalogValue::Null,
        ValueRef::Integer(i) => CatalogValue::Int(i),
        ValueRef::Real(f) => CatalogValue::Float(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            CatalogValue::Text(String::from_utf8_lossy(t).into_owned())
        }
    }
}

#[async_trait::async_trait]
impl CatalogConnection for SqliteCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> SquashResult<Vec<CatalogRow>> {
        debug!(sql = %sql, "Executing query");
        let sql = sql.to_string();
        let values = bind(params);

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();

                let rows = stmt
                    .query_map(rusqlite::params_from_iter(values), |row| {
                        let mut out = CatalogRow::new();
                        for (i, name) in names.iter().enumerate() {
                            out.push(name.clone(), from_value_ref(row.get_ref(i)?));
                        }
                        Ok(out)
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(rows)
            })
            .await
            .map_err(db_error)
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> SquashResult<u64> {
        debug!(sql = %sql, "Executing statement");
        let sql = sql.to_string();
        let values = bind(params);

        self.conn
            .call(move |conn| {
                let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
                Ok(affected as u64)
            })
            .await
            .map_err(db_error)
    }
}
