//! Native catalog strategy: each dialect's own system catalog.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::parse::{
    check_constraint_values, is_sequence_default, normalize_type_name, parse_default,
    parse_enum_values, parse_type_spec,
};
use super::{
    ColumnDescriptor, ForeignKeyDescriptor, IndexDescriptor, MetadataProvider, ReferentialAction,
};
use crate::catalog::{CatalogConnection, CatalogRow, Dialect, SqlParam};
use crate::error::SquashResult;

/// SQL text for the per-dialect catalog queries.
///
/// Table-scoped queries bind the table name first and the schema second;
/// SQLite binds only the table name.
pub mod queries {
    use crate::catalog::Dialect;

    /// Base tables in a schema, ascending.
    pub fn tables(dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::Postgres => {
                "SELECT c.relname::text AS name \
                 FROM pg_catalog.pg_class c \
                 JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
                 WHERE c.relkind IN ('r', 'p') AND NOT c.relispartition AND n.nspname = $1 \
                 ORDER BY c.relname"
            }
            Dialect::MySql => {
                "SELECT table_name AS name \
                 FROM information_schema.tables \
                 WHERE table_type = 'BASE TABLE' AND table_schema = ? \
                 ORDER BY table_name"
            }
            Dialect::Sqlite => {
                "SELECT name \
                 FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name"
            }
            Dialect::SqlServer => {
                "SELECT t.name AS name \
                 FROM sys.tables t \
                 JOIN sys.schemas s ON s.schema_id = t.schema_id \
                 WHERE t.is_ms_shipped = 0 AND s.name = @P1 \
                 ORDER BY t.name"
            }
        }
    }

    /// Columns of a table in declared order.
    pub fn columns(dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::Postgres => {
                "SELECT a.attname::text AS name, \
                    pg_catalog.format_type(a.atttypid, a.atttypmod) AS column_type, \
                    t.typname::text AS udt_name, \
                    t.typtype::text AS type_kind, \
                    NOT a.attnotnull AS nullable, \
                    pg_catalog.pg_get_expr(d.adbin, d.adrelid) AS column_default, \
                    a.attidentity IN ('a', 'd') AS is_identity, \
                    pg_catalog.col_description(c.oid, a.attnum) AS comment \
                 FROM pg_catalog.pg_attribute a \
                 JOIN pg_catalog.pg_class c ON c.oid = a.attrelid \
                 JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
                 JOIN pg_catalog.pg_type t ON t.oid = a.atttypid \
                 LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum \
                 WHERE c.relname::text = $1 AND n.nspname::text = $2 \
                    AND a.attnum > 0 AND NOT a.attisdropped \
                 ORDER BY a.attnum"
            }
            Dialect::MySql => {
                "SELECT column_name AS name, data_type, column_type, is_nullable, column_default, \
                    character_maximum_length, extra, column_comment \
                 FROM information_schema.columns \
                 WHERE table_name = ? AND table_schema = ? \
                 ORDER BY ordinal_position"
            }
            Dialect::Sqlite => {
                "SELECT cid, name, type, \"notnull\" AS not_null, dflt_value, pk \
                 FROM pragma_table_info(?) \
                 ORDER BY cid"
            }
            Dialect::SqlServer => {
                "SELECT c.name AS name, ty.name AS type_name, c.max_length AS max_length, \
                    c.precision AS numeric_precision, c.scale AS numeric_scale, \
                    c.is_nullable AS nullable, c.is_identity AS is_identity, \
                    dc.definition AS column_default, \
                    CAST(ep.value AS nvarchar(4000)) AS comment \
                 FROM sys.columns c \
                 JOIN sys.tables t ON t.object_id = c.object_id \
                 JOIN sys.schemas s ON s.schema_id = t.schema_id \
                 JOIN sys.types ty ON ty.user_type_id = c.user_type_id \
                 LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id \
                 LEFT JOIN sys.extended_properties ep \
                    ON ep.major_id = c.object_id AND ep.minor_id = c.column_id AND ep.name = 'MS_Description' \
                 WHERE t.name = @P1 AND s.name = @P2 \
                 ORDER BY c.column_id"
            }
        }
    }

    /// One row per (index, column), ordered by index name then key position.
    pub fn indexes(dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::Postgres => {
                "SELECT i.relname::text AS name, a.attname::text AS column_name, \
                    ix.indisunique AS is_unique, ix.indisprimary AS is_primary \
                 FROM pg_catalog.pg_index ix \
                 JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid \
                 JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid \
                 JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
                 JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
                 WHERE t.relname::text = $1 AND n.nspname::text = $2 \
                 ORDER BY i.relname, array_position(ix.indkey::int2[], a.attnum)"
            }
            Dialect::MySql => {
                "SELECT index_name AS name, column_name, non_unique = 0 AS is_unique, \
                    index_name = 'PRIMARY' AS is_primary \
                 FROM information_schema.statistics \
                 WHERE table_name = ? AND table_schema = ? \
                 ORDER BY index_name, seq_in_index"
            }
            Dialect::Sqlite => {
                "SELECT il.name AS name, ii.name AS column_name, il.\"unique\" AS is_unique, \
                    il.origin = 'pk' AS is_primary, il.origin AS origin \
                 FROM pragma_index_list(?) AS il \
                 JOIN pragma_index_info(il.name) AS ii \
                 ORDER BY il.name, ii.seqno"
            }
            Dialect::SqlServer => {
                "SELECT i.name AS name, c.name AS column_name, i.is_unique AS is_unique, \
                    i.is_primary_key AS is_primary \
                 FROM sys.indexes i \
                 JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
                 JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
                 JOIN sys.tables t ON t.object_id = i.object_id \
                 JOIN sys.schemas s ON s.schema_id = t.schema_id \
                 WHERE t.name = @P1 AND s.name = @P2 AND i.name IS NOT NULL AND ic.is_included_column = 0 \
                 ORDER BY i.name, ic.key_ordinal"
            }
        }
    }

    /// One row per (constraint, column pair), ordered by constraint then position.
    pub fn foreign_keys(dialect: Dialect) -> &'static str {
        match dialect {
            Dialect::Postgres => {
                "SELECT con.conname::text AS name, a.attname::text AS column_name, \
                    ft.relname::text AS foreign_table, fa.attname::text AS foreign_column, \
                    con.confupdtype::text AS on_update, con.confdeltype::text AS on_delete \
                 FROM pg_catalog.pg_constraint con \
                 JOIN pg_catalog.pg_class t ON t.oid = con.conrelid \
                 JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace \
                 JOIN pg_catalog.pg_class ft ON ft.oid = con.confrelid \
                 CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, fattnum, pos) \
                 JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum \
                 JOIN pg_catalog.pg_attribute fa ON fa.attrelid = con.confrelid AND fa.attnum = k.fattnum \
                 WHERE con.contype = 'f' AND t.relname::text = $1 AND n.nspname::text = $2 \
                 ORDER BY con.conname, k.pos"
            }
            Dialect::MySql => {
                "SELECT k.constraint_name AS name, k.column_name AS column_name, \
                    k.referenced_table_name AS foreign_table, k.referenced_column_name AS foreign_column, \
                    r.update_rule AS on_update, r.delete_rule AS on_delete \
                 FROM information_schema.key_column_usage k \
                 JOIN information_schema.referential_constraints r \
                    ON r.constraint_schema = k.constraint_schema \
                    AND r.constraint_name = k.constraint_name \
                    AND r.table_name = k.table_name \
                 WHERE k.table_name = ? AND k.table_schema = ? AND k.referenced_table_name IS NOT NULL \
                 ORDER BY k.constraint_name, k.ordinal_position"
            }
            Dialect::Sqlite => {
                "SELECT id, seq, \"table\" AS foreign_table, \"from\" AS column_name, \
                    \"to\" AS foreign_column, on_update, on_delete \
                 FROM pragma_foreign_key_list(?) \
                 ORDER BY id, seq"
            }
            Dialect::SqlServer => {
                "SELECT fk.name AS name, c.name AS column_name, rt.name AS foreign_table, \
                    rc.name AS foreign_column, fk.update_referential_action_desc AS on_update, \
                    fk.delete_referential_action_desc AS on_delete \
                 FROM sys.foreign_keys fk \
                 JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id \
                 JOIN sys.tables t ON t.object_id = fk.parent_object_id \
                 JOIN sys.schemas s ON s.schema_id = t.schema_id \
                 JOIN sys.columns c ON c.object_id = fkc.parent_object_id AND c.column_id = fkc.parent_column_id \
                 JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id \
                 JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id \
                 WHERE t.name = @P1 AND s.name = @P2 \
                 ORDER BY fk.name, fkc.constraint_column_id"
            }
        }
    }

    /// Check-constraint text that may restrict a column to a value list.
    ///
    /// MySQL carries enum values in `column_type`, so it has no query here.
    pub fn check_constraints(dialect: Dialect) -> Option<&'static str> {
        match dialect {
            Dialect::Postgres => Some(
                "SELECT pg_catalog.pg_get_constraintdef(con.oid) AS definition \
                 FROM pg_catalog.pg_constraint con \
                 JOIN pg_catalog.pg_class c ON c.oid = con.conrelid \
                 JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
                 WHERE con.contype = 'c' AND c.relname::text = $1 AND n.nspname::text = $2 \
                 ORDER BY con.conname",
            ),
            Dialect::Sqlite => Some(
                "SELECT sql AS definition FROM sqlite_master WHERE type = 'table' AND name = ?",
            ),
            Dialect::SqlServer => Some(
                "SELECT cc.definition AS definition \
                 FROM sys.check_constraints cc \
                 JOIN sys.tables t ON t.object_id = cc.parent_object_id \
                 JOIN sys.schemas s ON s.schema_id = t.schema_id \
                 WHERE t.name = @P1 AND s.name = @P2 \
                 ORDER BY cc.name",
            ),
            Dialect::MySql => None,
        }
    }

    /// Labels of a PostgreSQL enum type, in declared order.
    pub fn pg_enum_labels() -> &'static str {
        "SELECT e.enumlabel::text AS label \
         FROM pg_catalog.pg_enum e \
         JOIN pg_catalog.pg_type t ON t.oid = e.enumtypid \
         WHERE t.typname::text = $1 \
         ORDER BY e.enumsortorder"
    }
}

/// Reads each dialect's own catalog.
pub struct NativeProvider {
    conn: Arc<dyn CatalogConnection>,
    schema: String,
}

impl NativeProvider {
    /// Create a provider over a connection and a resolved schema name.
    pub fn new(conn: Arc<dyn CatalogConnection>, schema: impl Into<String>) -> Self {
        Self {
            conn,
            schema: schema.into(),
        }
    }

    /// The dialect of the underlying connection.
    pub fn dialect(&self) -> Dialect {
        self.conn.dialect()
    }

    fn table_params(&self, table: &str) -> Vec<SqlParam> {
        match self.dialect() {
            Dialect::Sqlite => vec![SqlParam::from(table)],
            _ => vec![SqlParam::from(table), SqlParam::from(self.schema.as_str())],
        }
    }

    /// Fill enum/set values for the columns of one table.
    ///
    /// Lookup failures are logged and leave the value list empty.
    pub async fn fill_enum_values(&self, table: &str, columns: &mut [ColumnDescriptor]) {
        if let Err(e) = self.try_fill_enum_values(table, columns).await {
            warn!(table = %table, error = %e, "Enum value lookup failed, leaving values empty");
        }
    }

    async fn try_fill_enum_values(
        &self,
        table: &str,
        columns: &mut [ColumnDescriptor],
    ) -> SquashResult<()> {
        if self.dialect() == Dialect::Postgres {
            for column in columns.iter_mut().filter(|c| c.type_name == "enum" && c.enum_values.is_empty()) {
                let Some(udt) = column.enum_type.clone() else {
                    continue;
                };
                let rows = self
                    .conn
                    .query(queries::pg_enum_labels(), &[SqlParam::from(udt)])
                    .await?;
                column.enum_values = rows.iter().filter_map(|r| r.text("label")).collect();
            }
        }

        let Some(sql) = queries::check_constraints(self.dialect()) else {
            return Ok(());
        };
        let definitions: Vec<String> = self
            .conn
            .query(sql, &self.table_params(table))
            .await?
            .iter()
            .filter_map(|r| r.text("definition"))
            .collect();

        for column in columns.iter_mut().filter(|c| is_text_type(&c.type_name)) {
            if let Some(values) = definitions
                .iter()
                .find_map(|d| check_constraint_values(d, &column.name))
            {
                column.type_name = "enum".to_string();
                column.enum_values = values;
            }
        }

        Ok(())
    }
}

fn is_text_type(type_name: &str) -> bool {
    matches!(type_name, "varchar" | "char" | "text" | "nvarchar" | "nchar")
}

fn text(row: &CatalogRow, name: &str) -> Option<String> {
    row.text(name).filter(|s| !s.is_empty())
}

fn to_u32(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

/// Build a column from a PostgreSQL `pg_attribute` row.
pub fn postgres_column(table: &str, row: &CatalogRow) -> SquashResult<ColumnDescriptor> {
    let name = row.require_text("name")?;
    let spec = parse_type_spec(&row.text("column_type").unwrap_or_default());
    let raw_default = row.text("column_default");
    let sequence = raw_default.as_deref().map(is_sequence_default).unwrap_or(false);

    let mut column = ColumnDescriptor::new(table, name, spec.base.clone());
    column.nullable = row.flag("nullable");
    column.autoincrement = row.flag("is_identity") || sequence;
    column.comment = text(row, "comment");

    if row.text("type_kind").as_deref() == Some("e") {
        column.type_name = "enum".to_string();
        column.enum_type = row.text("udt_name");
    }

    match spec.base.as_str() {
        "varchar" | "char" | "bit" | "varbit" => column.length = spec.length(),
        "decimal" => {
            if let Some((p, s)) = spec.precision_scale() {
                column.precision = Some(p);
                column.scale = Some(s);
            }
        }
        _ => {}
    }

    if !sequence {
        column.default = raw_default.and_then(|d| parse_default(&d, Dialect::Postgres));
    }

    Ok(column)
}

/// Build a column from a MySQL `information_schema.columns` row.
pub fn mysql_column(table: &str, row: &CatalogRow) -> SquashResult<ColumnDescriptor> {
    let name = row.require_text("name")?;
    let column_type = row.text("column_type").unwrap_or_default();
    let spec = parse_type_spec(&column_type);
    let extra = row.text("extra").unwrap_or_default().to_lowercase();

    let base = if column_type.to_lowercase().starts_with("tinyint(1)") {
        "boolean".to_string()
    } else {
        spec.base.clone()
    };

    let mut column = ColumnDescriptor::new(table, name, base);
    column.nullable = row.flag("is_nullable");
    column.unsigned = spec.unsigned;
    column.autoincrement = extra.contains("auto_increment");
    column.comment = text(row, "column_comment");
    column.enum_values = parse_enum_values(&column_type);

    match column.type_name.as_str() {
        "varchar" | "char" => column.length = to_u32(row.int("character_maximum_length")),
        "decimal" | "float" | "double" => {
            if let Some((p, s)) = spec.precision_scale() {
                column.precision = Some(p);
                column.scale = Some(s);
            }
        }
        _ => {}
    }

    column.default = row.text("column_default").and_then(|raw| {
        if extra.contains("default_generated") {
            parse_default(&raw, Dialect::MySql).map(|value| match value {
                super::DefaultValue::String(expr) => super::DefaultValue::Expression(expr),
                other => other,
            })
        } else {
            parse_default(&raw, Dialect::MySql)
        }
    });

    Ok(column)
}

/// Build a column from a SQLite `pragma_table_info` row.
///
/// `sole_pk` is set when this is the only primary-key column.
pub fn sqlite_column(table: &str, row: &CatalogRow, sole_pk: bool) -> SquashResult<ColumnDescriptor> {
    let name = row.require_text("name")?;
    let declared = row.text("type").unwrap_or_default();
    let spec = parse_type_spec(&declared);
    let in_pk = row.int("pk").unwrap_or(0) > 0;

    let base = if declared.trim().to_lowercase().starts_with("tinyint(1)") {
        "boolean".to_string()
    } else {
        spec.base.clone()
    };

    let mut column = ColumnDescriptor::new(table, name, base);
    column.nullable = !row.flag("not_null") && !in_pk;
    column.unsigned = spec.unsigned;
    column.autoincrement = sole_pk && in_pk && declared.trim().eq_ignore_ascii_case("integer");

    match spec.base.as_str() {
        "varchar" | "char" | "nvarchar" | "nchar" => column.length = spec.length(),
        "decimal" | "float" | "double" => {
            if let Some((p, s)) = spec.precision_scale() {
                column.precision = Some(p);
                column.scale = Some(s);
            }
        }
        _ => {}
    }

    column.default = row
        .text("dflt_value")
        .and_then(|d| parse_default(&d, Dialect::Sqlite));

    Ok(column)
}

/// Build a column from a SQL Server `sys.columns` row.
pub fn mssql_column(table: &str, row: &CatalogRow) -> SquashResult<ColumnDescriptor> {
    let name = row.require_text("name")?;
    let type_name = normalize_type_name(&row.text("type_name").unwrap_or_default());
    let max_length = row.int("max_length");

    let base = match (type_name.as_str(), max_length) {
        ("varchar" | "nvarchar", Some(-1)) => "text".to_string(),
        ("varbinary", Some(-1)) => "binary".to_string(),
        ("bit", _) => "boolean".to_string(),
        _ => type_name.clone(),
    };

    let mut column = ColumnDescriptor::new(table, name, base);
    column.nullable = row.flag("nullable");
    column.autoincrement = row.flag("is_identity");
    column.comment = text(row, "comment");

    match column.type_name.as_str() {
        "varchar" | "char" => column.length = to_u32(max_length),
        "nvarchar" | "nchar" => column.length = to_u32(max_length.map(|l| l / 2)),
        "decimal" => {
            column.precision = to_u32(row.int("numeric_precision"));
            column.scale = to_u32(row.int("numeric_scale"));
        }
        _ => {}
    }

    column.default = row
        .text("column_default")
        .and_then(|d| parse_default(&d, Dialect::SqlServer));

    Ok(column)
}

/// Fold per-column index rows into descriptors, keeping first-seen order.
pub fn group_indexes(rows: &[CatalogRow]) -> SquashResult<Vec<IndexDescriptor>> {
    let mut grouped: IndexMap<String, IndexDescriptor> = IndexMap::new();

    for row in rows {
        let name = row.require_text("name")?;
        let Some(column) = row.text("column_name") else {
            continue;
        };
        let entry = grouped.entry(name.clone()).or_insert_with(|| IndexDescriptor {
            name,
            columns: Vec::new(),
            unique: row.flag("is_unique"),
            primary: row.flag("is_primary"),
        });
        entry.columns.push(column);
    }

    Ok(grouped.into_values().collect())
}

/// Fold per-column foreign key rows into descriptors, keeping first-seen order.
///
/// Rows are keyed by `name`, or by SQLite's numeric `id` when unnamed.
pub fn group_foreign_keys(
    rows: &[CatalogRow],
    parse_action: fn(&str) -> Option<ReferentialAction>,
) -> SquashResult<Vec<ForeignKeyDescriptor>> {
    let mut grouped: IndexMap<String, ForeignKeyDescriptor> = IndexMap::new();

    for row in rows {
        let name = row.text("name");
        let key = match (&name, row.int("id")) {
            (Some(n), _) => n.clone(),
            (None, Some(id)) => format!("#{}", id),
            (None, None) => continue,
        };

        let entry = grouped.entry(key).or_insert(ForeignKeyDescriptor {
            name,
            columns: Vec::new(),
            foreign_table: row.require_text("foreign_table")?,
            foreign_columns: Vec::new(),
            on_update: row.text("on_update").and_then(|a| parse_action(&a)),
            on_delete: row.text("on_delete").and_then(|a| parse_action(&a)),
        });
        entry.columns.push(row.require_text("column_name")?);
        entry
            .foreign_columns
            .push(row.text("foreign_column").unwrap_or_else(|| "id".to_string()));
    }

    Ok(grouped.into_values().collect())
}

#[async_trait::async_trait]
impl MetadataProvider for NativeProvider {
    async fn list_tables(&self) -> SquashResult<Vec<String>> {
        let params = match self.dialect() {
            Dialect::Sqlite => Vec::new(),
            _ => vec![SqlParam::from(self.schema.as_str())],
        };
        let rows = self.conn.query(queries::tables(self.dialect()), &params).await?;

        let mut tables: Vec<String> = rows.iter().filter_map(|r| r.text("name")).collect();
        tables.sort();
        debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    async fn list_columns(&self, table: &str) -> SquashResult<Vec<ColumnDescriptor>> {
        let dialect = self.dialect();
        let rows = self
            .conn
            .query(queries::columns(dialect), &self.table_params(table))
            .await?;

        let sole_pk = rows.iter().filter(|r| r.int("pk").unwrap_or(0) > 0).count() == 1;
        let mut columns = rows
            .iter()
            .map(|row| match dialect {
                Dialect::Postgres => postgres_column(table, row),
                Dialect::MySql => mysql_column(table, row),
                Dialect::Sqlite => sqlite_column(table, row, sole_pk),
                Dialect::SqlServer => mssql_column(table, row),
            })
            .collect::<SquashResult<Vec<_>>>()?;

        if !columns.is_empty() {
            self.fill_enum_values(table, &mut columns).await;
        }

        Ok(columns)
    }

    async fn list_indexes(&self, table: &str) -> SquashResult<Vec<IndexDescriptor>> {
        let dialect = self.dialect();
        let rows = self
            .conn
            .query(queries::indexes(dialect), &self.table_params(table))
            .await?;
        let mut indexes = group_indexes(&rows)?;

        if dialect == Dialect::Sqlite {
            for index in indexes.iter_mut().filter(|i| i.name.starts_with("sqlite_autoindex_")) {
                if !index.primary {
                    index.name = format!("{}_{}_unique", table, index.columns.join("_")).to_lowercase();
                }
            }

            if !indexes.iter().any(|i| i.primary) {
                let columns = self
                    .conn
                    .query(queries::columns(dialect), &self.table_params(table))
                    .await?;
                let mut pk: Vec<(i64, String)> = columns
                    .iter()
                    .filter_map(|r| match (r.int("pk"), r.text("name")) {
                        (Some(pos), Some(name)) if pos > 0 => Some((pos, name)),
                        _ => None,
                    })
                    .collect();
                pk.sort();

                if !pk.is_empty() {
                    indexes.insert(
                        0,
                        IndexDescriptor {
                            name: "primary".to_string(),
                            columns: pk.into_iter().map(|(_, name)| name).collect(),
                            unique: true,
                            primary: true,
                        },
                    );
                }
            }
        }

        Ok(indexes)
    }

    async fn list_foreign_keys(&self, table: &str) -> SquashResult<Vec<ForeignKeyDescriptor>> {
        let dialect = self.dialect();
        let rows = self
            .conn
            .query(queries::foreign_keys(dialect), &self.table_params(table))
            .await?;

        match dialect {
            Dialect::Postgres => group_foreign_keys(&rows, ReferentialAction::from_pg_code),
            _ => group_foreign_keys(&rows, ReferentialAction::from_rule),
        }
    }

    fn supports_rich_introspection(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogValue;
    use crate::introspect::DefaultValue;

    fn t(s: &str) -> CatalogValue {
        CatalogValue::Text(s.to_string())
    }

    #[test]
    fn test_mysql_column_boolean_and_unsigned() {
        let row = CatalogRow::new()
            .with("NAME", t("active"))
            .with("DATA_TYPE", t("tinyint"))
            .with("COLUMN_TYPE", t("tinyint(1)"))
            .with("IS_NULLABLE", t("NO"))
            .with("COLUMN_DEFAULT", t("1"))
            .with("EXTRA", t(""))
            .with("COLUMN_COMMENT", t(""));
        let column = mysql_column("users", &row).unwrap();
        assert_eq!(column.type_name, "boolean");
        assert!(!column.nullable);
        assert_eq!(column.default, Some(DefaultValue::Int(1)));
        assert_eq!(column.comment, None);

        let row = CatalogRow::new()
            .with("name", t("votes"))
            .with("column_type", t("int unsigned"))
            .with("is_nullable", t("YES"))
            .with("column_default", CatalogValue::Null)
            .with("extra", t(""));
        let column = mysql_column("posts", &row).unwrap();
        assert_eq!(column.type_name, "integer");
        assert!(column.unsigned);
        assert!(column.nullable);
        assert_eq!(column.default, None);
    }

    #[test]
    fn test_mysql_column_enum_and_generated_default() {
        let row = CatalogRow::new()
            .with("name", t("status"))
            .with("column_type", t("enum('draft','published')"))
            .with("is_nullable", t("NO"))
            .with("column_default", t("draft"))
            .with("extra", t(""));
        let column = mysql_column("posts", &row).unwrap();
        assert_eq!(column.type_name, "enum");
        assert_eq!(column.enum_values, vec!["draft", "published"]);
        assert_eq!(column.default, Some(DefaultValue::String("draft".into())));

        let row = CatalogRow::new()
            .with("name", t("created_at"))
            .with("column_type", t("timestamp"))
            .with("is_nullable", t("YES"))
            .with("column_default", t("CURRENT_TIMESTAMP"))
            .with("extra", t("DEFAULT_GENERATED"));
        let column = mysql_column("posts", &row).unwrap();
        assert_eq!(
            column.default,
            Some(DefaultValue::Expression("CURRENT_TIMESTAMP".into()))
        );
    }

    #[test]
    fn test_sqlite_column_laravel_types() {
        let row = CatalogRow::new()
            .with("name", t("active"))
            .with("type", t("tinyint(1)"))
            .with("not_null", CatalogValue::Int(1))
            .with("dflt_value", t("'1'"))
            .with("pk", CatalogValue::Int(0));
        let column = sqlite_column("logs", &row, false).unwrap();
        assert_eq!(column.type_name, "boolean");
        assert!(!column.nullable);

        let row = CatalogRow::new()
            .with("name", t("id"))
            .with("type", t("integer"))
            .with("not_null", CatalogValue::Int(1))
            .with("dflt_value", CatalogValue::Null)
            .with("pk", CatalogValue::Int(1));
        let column = sqlite_column("logs", &row, true).unwrap();
        assert_eq!(column.type_name, "integer");
        assert!(column.autoincrement);

        let row = CatalogRow::new()
            .with("name", t("votes"))
            .with("type", t("tinyint"))
            .with("not_null", CatalogValue::Int(0))
            .with("dflt_value", CatalogValue::Null)
            .with("pk", CatalogValue::Int(0));
        assert_eq!(sqlite_column("logs", &row, false).unwrap().type_name, "tinyint");
    }

    #[test]
    fn test_postgres_column_serial() {
        let row = CatalogRow::new()
            .with("name", t("id"))
            .with("column_type", t("bigint"))
            .with("udt_name", t("int8"))
            .with("type_kind", t("b"))
            .with("nullable", CatalogValue::Bool(false))
            .with("column_default", t("nextval('users_id_seq'::regclass)"))
            .with("is_identity", CatalogValue::Bool(false))
            .with("comment", CatalogValue::Null);
        let column = postgres_column("users", &row).unwrap();
        assert_eq!(column.type_name, "bigint");
        assert!(column.autoincrement);
        assert_eq!(column.default, None);
    }

    #[test]
    fn test_postgres_column_enum_type() {
        let row = CatalogRow::new()
            .with("name", t("mood"))
            .with("column_type", t("mood_type"))
            .with("udt_name", t("mood_type"))
            .with("type_kind", t("e"))
            .with("nullable", CatalogValue::Bool(true));
        let column = postgres_column("people", &row).unwrap();
        assert_eq!(column.type_name, "enum");
        assert_eq!(column.enum_type.as_deref(), Some("mood_type"));
    }

    #[test]
    fn test_mssql_column_lengths() {
        let row = CatalogRow::new()
            .with("name", t("title"))
            .with("type_name", t("nvarchar"))
            .with("max_length", CatalogValue::Int(200))
            .with("nullable", CatalogValue::Bool(false))
            .with("is_identity", CatalogValue::Bool(false))
            .with("column_default", t("(N'untitled')"));
        let column = mssql_column("posts", &row).unwrap();
        assert_eq!(column.type_name, "nvarchar");
        assert_eq!(column.length, Some(100));
        assert_eq!(column.default, Some(DefaultValue::String("untitled".into())));

        let row = CatalogRow::new()
            .with("name", t("body"))
            .with("type_name", t("nvarchar"))
            .with("max_length", CatalogValue::Int(-1))
            .with("nullable", CatalogValue::Bool(true));
        assert_eq!(mssql_column("posts", &row).unwrap().type_name, "text");
    }

    #[test]
    fn test_group_indexes() {
        let rows = vec![
            CatalogRow::new()
                .with("name", t("PRIMARY"))
                .with("column_name", t("id"))
                .with("is_unique", CatalogValue::Int(1))
                .with("is_primary", CatalogValue::Int(1)),
            CatalogRow::new()
                .with("name", t("posts_a_b_index"))
                .with("column_name", t("a"))
                .with("is_unique", CatalogValue::Int(0))
                .with("is_primary", CatalogValue::Int(0)),
            CatalogRow::new()
                .with("name", t("posts_a_b_index"))
                .with("column_name", t("b"))
                .with("is_unique", CatalogValue::Int(0))
                .with("is_primary", CatalogValue::Int(0)),
        ];
        let indexes = group_indexes(&rows).unwrap();
        assert_eq!(indexes.len(), 2);
        assert!(indexes[0].primary);
        assert_eq!(indexes[1].columns, vec!["a", "b"]);
        assert!(!indexes[1].unique);
    }

    #[test]
    fn test_group_foreign_keys_unnamed() {
        let rows = vec![
            CatalogRow::new()
                .with("id", CatalogValue::Int(0))
                .with("foreign_table", t("users"))
                .with("column_name", t("user_id"))
                .with("foreign_column", t("id"))
                .with("on_update", t("NO ACTION"))
                .with("on_delete", t("CASCADE")),
        ];
        let fks = group_foreign_keys(&rows, ReferentialAction::from_rule).unwrap();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].name, None);
        assert_eq!(fks[0].columns, vec!["user_id"]);
        assert_eq!(fks[0].on_delete, Some(ReferentialAction::Cascade));
    }
}
