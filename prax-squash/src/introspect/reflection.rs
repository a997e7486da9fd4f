//! Reflection strategy over the SQL-standard `INFORMATION_SCHEMA` views.
//!
//! Columns are read with `SELECT *` so vendor extension columns
//! (`column_type`, `extra`, `column_comment`, `is_identity`, `udt_name`)
//! are picked up when the server has them. Index listing has no standard
//! view and is answered by the native strategy, as are enum labels and
//! PostgreSQL column comments.

use std::future::Future;
use std::sync::Arc;

use tracing::warn;

use super::parse::{is_sequence_default, normalize_type_name, parse_default, parse_enum_values, parse_type_spec};
use super::{
    ColumnDescriptor, ForeignKeyDescriptor, IndexDescriptor, MetadataProvider, NativeProvider,
    ReferentialAction,
};
use crate::catalog::{CatalogConnection, CatalogRow, Dialect, SqlParam};
use crate::error::{SquashError, SquashResult};

/// Reflection provider with a native fallback.
pub struct ReflectionProvider {
    conn: Arc<dyn CatalogConnection>,
    schema: String,
    native: NativeProvider,
}

impl ReflectionProvider {
    /// Create the provider. Use [`ReflectionProvider::probe`] first.
    pub fn new(conn: Arc<dyn CatalogConnection>, schema: impl Into<String>, native: NativeProvider) -> Self {
        Self {
            conn,
            schema: schema.into(),
            native,
        }
    }

    /// Check that `INFORMATION_SCHEMA` is usable on this connection.
    pub async fn probe(conn: &dyn CatalogConnection, schema: &str) -> SquashResult<()> {
        let dialect = conn.dialect();
        if !matches!(dialect, Dialect::Postgres | Dialect::MySql) {
            return Err(SquashError::unsupported_catalog(format!(
                "{} has no INFORMATION_SCHEMA identity metadata",
                dialect
            )));
        }

        let sql = format!(
            "SELECT COUNT(*) AS n FROM information_schema.tables WHERE table_schema = {}",
            dialect.placeholder(1)
        );
        conn.query(&sql, &[SqlParam::from(schema)]).await?;
        Ok(())
    }

    fn dialect(&self) -> Dialect {
        self.conn.dialect()
    }

    fn sql(&self, template: &str) -> String {
        let mut sql = template.to_string();
        for n in 1..=2 {
            sql = sql.replacen("{}", &self.dialect().placeholder(n), 1);
        }
        sql
    }

    /// Run a reflection call, answering from the native strategy on failure.
    async fn or_native<T, R, N>(&self, what: &str, table: &str, reflect: R, native: N) -> SquashResult<T>
    where
        R: Future<Output = SquashResult<T>>,
        N: Future<Output = SquashResult<T>>,
    {
        match reflect.await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(table = %table, error = %e, "Reflection {} failed, using native catalog", what);
                native.await
            }
        }
    }

    async fn reflect_tables(&self) -> SquashResult<Vec<String>> {
        let sql = self.sql(
            "SELECT table_name AS name FROM information_schema.tables \
             WHERE table_schema = {} AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
        );
        let rows = self.conn.query(&sql, &[SqlParam::from(self.schema.as_str())]).await?;

        let mut tables: Vec<String> = rows.iter().filter_map(|r| r.text("name")).collect();
        tables.sort();
        Ok(tables)
    }

    async fn reflect_columns(&self, table: &str) -> SquashResult<Vec<ColumnDescriptor>> {
        let sql = self.sql(
            "SELECT * FROM information_schema.columns \
             WHERE table_name = {} AND table_schema = {} \
             ORDER BY ordinal_position",
        );
        let rows = self
            .conn
            .query(&sql, &[SqlParam::from(table), SqlParam::from(self.schema.as_str())])
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut columns = rows
            .iter()
            .map(|row| reflected_column(self.dialect(), table, row))
            .collect::<SquashResult<Vec<_>>>()?;

        if rows.first().is_some_and(|r| !r.has("column_comment")) {
            let native = self.native.list_columns(table).await?;
            for column in columns.iter_mut() {
                if let Some(found) = native.iter().find(|n| n.name == column.name) {
                    column.comment = found.comment.clone();
                    if found.type_name == "enum" {
                        column.type_name = found.type_name.clone();
                        column.enum_values = found.enum_values.clone();
                    }
                }
            }
        } else {
            self.native.fill_enum_values(table, &mut columns).await;
        }

        Ok(columns)
    }

    async fn reflect_foreign_keys(&self, table: &str) -> SquashResult<Vec<ForeignKeyDescriptor>> {
        let template = match self.dialect() {
            Dialect::MySql => {
                "SELECT k.constraint_name AS name, k.column_name AS column_name, \
                    k.referenced_table_name AS foreign_table, k.referenced_column_name AS foreign_column, \
                    r.update_rule AS on_update, r.delete_rule AS on_delete \
                 FROM information_schema.referential_constraints r \
                 JOIN information_schema.key_column_usage k \
                    ON k.constraint_schema = r.constraint_schema AND k.constraint_name = r.constraint_name \
                 WHERE k.table_name = {} AND k.table_schema = {} AND k.referenced_table_name IS NOT NULL \
                 ORDER BY k.constraint_name, k.ordinal_position"
            }
            _ => {
                "SELECT r.constraint_name AS name, k.column_name AS column_name, \
                    u.table_name AS foreign_table, u.column_name AS foreign_column, \
                    r.update_rule AS on_update, r.delete_rule AS on_delete \
                 FROM information_schema.referential_constraints r \
                 JOIN information_schema.key_column_usage k \
                    ON k.constraint_schema = r.constraint_schema AND k.constraint_name = r.constraint_name \
                 JOIN information_schema.key_column_usage u \
                    ON u.constraint_schema = r.unique_constraint_schema \
                    AND u.constraint_name = r.unique_constraint_name \
                    AND u.ordinal_position = k.position_in_unique_constraint \
                 WHERE k.table_name = {} AND k.table_schema = {} \
                 ORDER BY r.constraint_name, k.ordinal_position"
            }
        };

        let rows = self
            .conn
            .query(&self.sql(template), &[SqlParam::from(table), SqlParam::from(self.schema.as_str())])
            .await?;

        super::native::group_foreign_keys(&rows, ReferentialAction::from_rule)
    }
}

/// Build a column from an `information_schema.columns` row, using vendor
/// extension columns when present.
pub fn reflected_column(dialect: Dialect, table: &str, row: &CatalogRow) -> SquashResult<ColumnDescriptor> {
    let name = row.require_text("column_name")?;
    let data_type = row.text("data_type").unwrap_or_default();
    let column_type = row.text("column_type");
    let extra = row.text("extra").unwrap_or_default().to_lowercase();

    let spec = parse_type_spec(column_type.as_deref().unwrap_or(&data_type));
    let mut type_name = spec.base.clone();
    if data_type.eq_ignore_ascii_case("USER-DEFINED") {
        type_name = row
            .text("udt_name")
            .map(|udt| normalize_type_name(&udt))
            .unwrap_or_else(|| "string".to_string());
    }
    if column_type.as_deref().is_some_and(|c| c.to_lowercase().starts_with("tinyint(1)")) {
        type_name = "boolean".to_string();
    }

    let raw_default = row.text("column_default");
    let sequence = raw_default.as_deref().map(is_sequence_default).unwrap_or(false);

    let mut column = ColumnDescriptor::new(table, name, type_name);
    column.nullable = row.flag("is_nullable");
    column.unsigned = spec.unsigned;
    column.autoincrement = extra.contains("auto_increment") || row.flag("is_identity") || sequence;
    column.comment = row.text("column_comment").filter(|c| !c.is_empty());
    column.enum_values = column_type.as_deref().map(parse_enum_values).unwrap_or_default();

    match column.type_name.as_str() {
        "varchar" | "char" => {
            column.length = row
                .int("character_maximum_length")
                .and_then(|l| u32::try_from(l).ok());
        }
        "decimal" | "float" | "double" => {
            let declared = spec.precision_scale();
            let reported = match (row.int("numeric_precision"), row.int("numeric_scale")) {
                (Some(p), Some(s)) if column.type_name == "decimal" => {
                    u32::try_from(p).ok().zip(u32::try_from(s).ok())
                }
                _ => None,
            };
            if let Some((p, s)) = declared.or(reported) {
                column.precision = Some(p);
                column.scale = Some(s);
            }
        }
        _ => {}
    }

    if !sequence {
        column.default = raw_default.and_then(|raw| {
            let parsed = parse_default(&raw, dialect);
            match parsed {
                Some(super::DefaultValue::String(expr)) if extra.contains("default_generated") => {
                    Some(super::DefaultValue::Expression(expr))
                }
                other => other,
            }
        });
    }

    Ok(column)
}

#[async_trait::async_trait]
impl MetadataProvider for ReflectionProvider {
    async fn list_tables(&self) -> SquashResult<Vec<String>> {
        self.or_native("table listing", "*", self.reflect_tables(), self.native.list_tables())
            .await
    }

    async fn list_columns(&self, table: &str) -> SquashResult<Vec<ColumnDescriptor>> {
        self.or_native(
            "column listing",
            table,
            self.reflect_columns(table),
            self.native.list_columns(table),
        )
        .await
    }

    async fn list_indexes(&self, table: &str) -> SquashResult<Vec<IndexDescriptor>> {
        self.native.list_indexes(table).await
    }

    async fn list_foreign_keys(&self, table: &str) -> SquashResult<Vec<ForeignKeyDescriptor>> {
        self.or_native(
            "foreign key listing",
            table,
            self.reflect_foreign_keys(table),
            self.native.list_foreign_keys(table),
        )
        .await
    }

    fn supports_rich_introspection(&self) -> bool {
        true
    }
}
