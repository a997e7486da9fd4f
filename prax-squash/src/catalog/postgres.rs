//! PostgreSQL catalog connection.

use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, warn};

use super::{CatalogConnection, CatalogRow, CatalogValue, Dialect, SqlParam};
use crate::error::{SquashError, SquashResult};

/// A single PostgreSQL client connection.
pub struct PostgresCatalog {
    client: Client,
}

impl PostgresCatalog {
    /// Connect and spawn the connection driver task.
    pub async fn connect(url: &str) -> SquashResult<Self> {
        let (client, connection) = tokio_postgres::connect(url, NoTls)
            .await
            .map_err(|e| SquashError::database(format!("Failed to connect: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection closed with error");
            }
        });

        Ok(Self { client })
    }
}

fn bind(params: &[SqlParam]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    params
        .iter()
        .map(|p| -> Box<dyn ToSql + Sync + Send> {
            match p {
                SqlParam::Text(s) => Box::new(s.clone()),
                SqlParam::Int(i) => Box::new(*i),
            }
        })
        .collect()
}

fn decode(row: &Row) -> CatalogRow {
    let mut out = CatalogRow::new();

    for (i, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = if *ty == Type::BOOL {
            row.try_get::<_, Option<bool>>(i).ok().flatten().map(CatalogValue::Bool)
        } else if *ty == Type::INT2 {
            row.try_get::<_, Option<i16>>(i).ok().flatten().map(|v| CatalogValue::Int(v.into()))
        } else if *ty == Type::INT4 {
            row.try_get::<_, Option<i32>>(i).ok().flatten().map(|v| CatalogValue::Int(v.into()))
        } else if *ty == Type::INT8 {
            row.try_get::<_, Option<i64>>(i).ok().flatten().map(CatalogValue::Int)
        } else if *ty == Type::OID {
            row.try_get::<_, Option<u32>>(i).ok().flatten().map(|v| CatalogValue::Int(v.into()))
        } else if *ty == Type::CHAR {
            row.try_get::<_, Option<i8>>(i)
                .ok()
                .flatten()
                .map(|v| CatalogValue::Text(char::from(v as u8).to_string()))
        } else if *ty == Type::FLOAT4 {
            row.try_get::<_, Option<f32>>(i).ok().flatten().map(|v| CatalogValue::Float(v.into()))
        } else if *ty == Type::FLOAT8 {
            row.try_get::<_, Option<f64>>(i).ok().flatten().map(CatalogValue::Float)
        } else {
            row.try_get::<_, Option<String>>(i).ok().flatten().map(CatalogValue::Text)
        };

        out.push(column.name(), value.unwrap_or(CatalogValue::Null));
    }

    out
}

#[async_trait::async_trait]
impl CatalogConnection for PostgresCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> SquashResult<Vec<CatalogRow>> {
        debug!(sql = %sql, "Executing query");
        let owned = bind(params);
        let refs: Vec<&(dyn ToSql + Sync)> = owned.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        let rows = self
            .client
            .query(sql, &refs)
            .await
            .map_err(|e| SquashError::database(e.to_string()))?;

        Ok(rows.iter().map(decode).collect())
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> SquashResult<u64> {
        debug!(sql = %sql, "Executing statement");
        let owned = bind(params);
        let refs: Vec<&(dyn ToSql + Sync)> = owned.iter().map(|p| p.as_ref() as &(dyn ToSql + Sync)).collect();

        self.client
            .execute(sql, &refs)
            .await
            .map_err(|e| SquashError::database(e.to_string()))
    }
}
