//! Microsoft SQL Server catalog connection.

use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, Row, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

use super::{CatalogConnection, CatalogRow, CatalogValue, Dialect, SqlParam};
use crate::error::{SquashError, SquashResult};

/// A single TDS client. Tiberius needs `&mut` access, so it sits behind a lock.
pub struct MssqlCatalog {
    client: Mutex<Client<Compat<TcpStream>>>,
}

/// Build a tiberius config from either a `mssql://` URL or an ADO.NET string.
pub fn parse_config(conn_str: &str) -> SquashResult<Config> {
    if !(conn_str.starts_with("mssql://") || conn_str.starts_with("sqlserver://")) {
        return Config::from_ado_string(conn_str)
            .map_err(|e| SquashError::config(format!("invalid connection string: {}", e)));
    }

    let parsed = url::Url::parse(conn_str)
        .map_err(|e| SquashError::config(format!("invalid connection URL: {}", e)))?;

    let mut config = Config::new();
    config.host(
        parsed
            .host_str()
            .ok_or_else(|| SquashError::config("missing host in URL"))?,
    );
    config.port(parsed.port().unwrap_or(1433));

    let database = parsed.path().trim_start_matches('/');
    if !database.is_empty() {
        config.database(database);
    }

    if !parsed.username().is_empty() {
        config.authentication(AuthMethod::sql_server(
            parsed.username(),
            parsed.password().unwrap_or_default(),
        ));
    }

    for (key, value) in parsed.query_pairs() {
        let truthy = matches!(value.to_lowercase().as_str(), "true" | "yes" | "on");
        match key.to_lowercase().as_str() {
            "trustservercertificate" | "trust_cert" if truthy => config.trust_cert(),
            "encrypt" if !truthy => config.encryption(EncryptionLevel::NotSupported),
            "applicationname" | "application_name" | "app" => config.application_name(value.as_ref()),
            _ => {}
        }
    }

    Ok(config)
}

impl MssqlCatalog {
    /// Open a TCP connection and complete the TDS handshake.
    pub async fn connect(url: &str) -> SquashResult<Self> {
        let config = parse_config(url)?;

        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| SquashError::database(format!("Failed to connect: {}", e)))?;

        Ok(Self {
            client: Mutex::new(client),
        })
    }
}

fn from_column_data(data: ColumnData<'static>) -> CatalogValue {
    match data {
        ColumnData::Bit(Some(b)) => CatalogValue::Bool(b),
        ColumnData::U8(Some(v)) => CatalogValue::Int(v.into()),
        ColumnData::I16(Some(v)) => CatalogValue::Int(v.into()),
        ColumnData::I32(Some(v)) => CatalogValue::Int(v.into()),
        ColumnData::I64(Some(v)) => CatalogValue::Int(v),
        ColumnData::F32(Some(v)) => CatalogValue::Float(v.into()),
        ColumnData::F64(Some(v)) => CatalogValue::Float(v),
        ColumnData::String(Some(s)) => CatalogValue::Text(s.into_owned()),
        ColumnData::Guid(Some(g)) => CatalogValue::Text(g.to_string()),
        ColumnData::Numeric(Some(n)) => CatalogValue::Text(n.to_string()),
        _ => CatalogValue::Null,
    }
}

fn decode(row: Row) -> CatalogRow {
    let names: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let mut out = CatalogRow::new();

    for (name, data) in names.into_iter().zip(row) {
        out.push(name, from_column_data(data));
    }

    out
}

fn bind(params: &[SqlParam]) -> Vec<&dyn ToSql> {
    params
        .iter()
        .map(|p| match p {
            SqlParam::Text(s) => s as &dyn ToSql,
            SqlParam::Int(i) => i as &dyn ToSql,
        })
        .collect()
}

#[async_trait::async_trait]
impl CatalogConnection for MssqlCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> SquashResult<Vec<CatalogRow>> {
        debug!(sql = %sql, "Executing query");
        let mut client = self.client.lock().await;

        let stream = client
            .query(sql, &bind(params))
            .await
            .map_err(|e| SquashError::database(e.to_string()))?;
        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| SquashError::database(e.to_string()))?;

        Ok(rows.into_iter().map(decode).collect())
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> SquashResult<u64> {
        debug!(sql = %sql, "Executing statement");
        let mut client = self.client.lock().await;

        let result = client
            .execute(sql, &bind(params))
            .await
            .map_err(|e| SquashError::database(e.to_string()))?;

        Ok(result.total())
    }
}
