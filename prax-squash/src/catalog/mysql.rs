//! MySQL / MariaDB catalog connection.

use mysql_async::prelude::Queryable;
use mysql_async::{Opts, Params, Pool, Row, Value};
use tracing::debug;

use super::{CatalogConnection, CatalogRow, CatalogValue, Dialect, SqlParam};
use crate::error::{SquashError, SquashResult};

/// A MySQL connection pool used for catalog reads and ledger writes.
pub struct MySqlCatalog {
    pool: Pool,
}

impl MySqlCatalog {
    /// Open a pool and verify that a connection can be checked out.
    pub async fn connect(url: &str) -> SquashResult<Self> {
        let url = match url.strip_prefix("mariadb://") {
            Some(rest) => format!("mysql://{}", rest),
            None => url.to_string(),
        };
        let opts = Opts::from_url(&url)
            .map_err(|e| SquashError::config(format!("invalid MySQL URL: {}", e)))?;

        let pool = Pool::new(opts);
        drop(pool.get_conn().await.map_err(db_error)?);

        Ok(Self { pool })
    }
}

fn db_error(e: mysql_async::Error) -> SquashError {
    SquashError::database(e.to_string())
}

fn bind(params: &[SqlParam]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }

    Params::Positional(
        params
            .iter()
            .map(|p| match p {
                SqlParam::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
                SqlParam::Int(i) => Value::Int((*i).into()),
            })
            .collect(),
    )
}

fn from_mysql_value(value: Value) -> CatalogValue {
    match value {
        Value::NULL => CatalogValue::Null,
        Value::Bytes(bytes) => CatalogValue::Text(String::from_utf8_lossy(&bytes).into_owned()),
        Value::Int(i) => CatalogValue::Int(i),
        Value::UInt(u) => i64::try_from(u)
            .map(CatalogValue::Int)
            .unwrap_or_else(|_| CatalogValue::Text(u.to_string())),
        Value::Float(f) => CatalogValue::Float(f.into()),
        Value::Double(d) => CatalogValue::Float(d),
        other => CatalogValue::Text(other.as_sql(true).trim_matches('\'').to_string()),
    }
}

fn decode(row: &Row) -> CatalogRow {
    let mut out = CatalogRow::new();

    for (i, column) in row.columns_ref().iter().enumerate() {
        let value: Option<Value> = row.get(i);
        out.push(column.name_str().to_string(), from_mysql_value(value.unwrap_or(Value::NULL)));
    }

    out
}

#[async_trait::async_trait]
impl CatalogConnection for MySqlCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> SquashResult<Vec<CatalogRow>> {
        debug!(sql = %sql, "Executing query");
        let mut conn = self.pool.get_conn().await.map_err(db_error)?;

        let rows: Vec<Row> = conn.exec(sql, bind(params)).await.map_err(db_error)?;

        Ok(rows.iter().map(decode).collect())
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> SquashResult<u64> {
        debug!(sql = %sql, "Executing statement");
        let mut conn = self.pool.get_conn().await.map_err(db_error)?;

        conn.exec_drop(sql, bind(params)).await.map_err(db_error)?;

        Ok(conn.affected_rows())
    }
}
