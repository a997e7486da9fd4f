//! Catalog introspection.
//!
//! A [`MetadataProvider`] turns the live catalog into normalized descriptors.
//! Two strategies implement it:
//!
//! - [`NativeProvider`] queries each dialect's own catalog (`pg_catalog`,
//!   MySQL `information_schema`, SQLite pragmas, SQL Server `sys.*`).
//! - [`ReflectionProvider`] reads the SQL-standard `INFORMATION_SCHEMA` views
//!   and answers from the native strategy whenever a reflection query fails.
//!
//! [`select_provider`] picks one of them once, up front.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{CatalogConnection, Dialect};
use crate::error::{SquashError, SquashResult};

pub mod native;
pub mod parse;
pub mod reflection;

pub use native::NativeProvider;
pub use reflection::ReflectionProvider;

// ============================================================================
// Descriptors
// ============================================================================

/// A column default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// Boolean literal.
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Non-integer numeric literal, kept as written.
    Numeric(String),
    /// String literal, already unescaped.
    String(String),
    /// Database-computed expression such as `CURRENT_TIMESTAMP`.
    Expression(String),
}

/// Referential action for foreign keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    /// Parse a rule as reported by `information_schema` or `sys.foreign_keys`.
    pub fn from_rule(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "NO ACTION" | "NOACTION" => Some(Self::NoAction),
            "RESTRICT" => Some(Self::Restrict),
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" | "SETNULL" => Some(Self::SetNull),
            "SET DEFAULT" | "SETDEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// Parse a `pg_constraint.confupdtype` / `confdeltype` code.
    pub fn from_pg_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(Self::NoAction),
            "r" => Some(Self::Restrict),
            "c" => Some(Self::Cascade),
            "n" => Some(Self::SetNull),
            "d" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// SQL spelling, lower-case.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "no action",
            Self::Restrict => "restrict",
            Self::Cascade => "cascade",
            Self::SetNull => "set null",
            Self::SetDefault => "set default",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One column, in catalog-declared order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Normalized raw type name (`varchar`, `bigint`, `timestamptz`, ...).
    pub type_name: String,
    /// Declared character length.
    pub length: Option<u32>,
    /// Numeric precision.
    pub precision: Option<u32>,
    /// Numeric scale.
    pub scale: Option<u32>,
    /// Whether `NULL` is allowed.
    pub nullable: bool,
    /// Default value; `None` when there is none or it is SQL `NULL`.
    pub default: Option<DefaultValue>,
    /// Unsigned integer/decimal (MySQL only).
    pub unsigned: bool,
    /// Auto-increment, serial or identity column.
    pub autoincrement: bool,
    /// Column comment.
    pub comment: Option<String>,
    /// Owning table.
    pub table: String,
    /// Allowed values for enum/set columns.
    pub enum_values: Vec<String>,
    /// Named enum type backing the column (PostgreSQL).
    pub enum_type: Option<String>,
}

impl ColumnDescriptor {
    /// Create a column with the given name and raw type.
    pub fn new(table: impl Into<String>, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            table: table.into(),
            ..Default::default()
        }
    }

    /// Set the declared length.
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Set precision and scale.
    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Allow `NULL`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as auto-increment.
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// Mark as unsigned.
    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    /// Set the default value.
    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Set the comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the allowed enum values.
    pub fn enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = values;
        self
    }
}

/// An index, including the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Index name.
    pub name: String,
    /// Indexed columns, in key order.
    pub columns: Vec<String>,
    /// Unique index.
    pub unique: bool,
    /// Primary key.
    pub primary: bool,
}

impl IndexDescriptor {
    /// Plain, non-unique index.
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
            primary: false,
        }
    }

    /// Mark as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark as the primary key (implies unique).
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self.unique = true;
        self
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDescriptor {
    /// Constraint name; SQLite does not name them.
    pub name: Option<String>,
    /// Local columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub foreign_table: String,
    /// Referenced columns, same cardinality as `columns`.
    pub foreign_columns: Vec<String>,
    /// ON UPDATE action.
    pub on_update: Option<ReferentialAction>,
    /// ON DELETE action.
    pub on_delete: Option<ReferentialAction>,
}

/// A complete table snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,
    /// Columns in catalog-declared order.
    pub columns: Vec<ColumnDescriptor>,
    /// Indexes in catalog enumeration order.
    pub indexes: Vec<IndexDescriptor>,
    /// Foreign keys in catalog enumeration order.
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

impl TableDescriptor {
    /// The primary key index, if any.
    pub fn primary_key(&self) -> Option<&IndexDescriptor> {
        self.indexes.iter().find(|i| i.primary)
    }
}

// ============================================================================
// Provider contract
// ============================================================================

/// Source of catalog metadata.
///
/// Lookups for a table that does not exist return empty collections.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Base table names, ascending.
    async fn list_tables(&self) -> SquashResult<Vec<String>>;

    /// Columns of a table, in declared order.
    async fn list_columns(&self, table: &str) -> SquashResult<Vec<ColumnDescriptor>>;

    /// Indexes of a table, including the primary key.
    async fn list_indexes(&self, table: &str) -> SquashResult<Vec<IndexDescriptor>>;

    /// Foreign keys declared on a table.
    async fn list_foreign_keys(&self, table: &str) -> SquashResult<Vec<ForeignKeyDescriptor>>;

    /// Whether this provider uses the cross-dialect reflection layer.
    fn supports_rich_introspection(&self) -> bool;

    /// Snapshot one table.
    async fn describe_table(&self, table: &str) -> SquashResult<TableDescriptor> {
        Ok(TableDescriptor {
            name: table.to_string(),
            columns: self.list_columns(table).await?,
            indexes: self.list_indexes(table).await?,
            foreign_keys: self.list_foreign_keys(table).await?,
        })
    }
}

/// Resolve the namespace to introspect: the configured one, or the
/// connection's current schema.
pub async fn resolve_schema(
    conn: &dyn CatalogConnection,
    configured: Option<&str>,
) -> SquashResult<String> {
    if let Some(schema) = configured {
        return Ok(schema.to_string());
    }

    let dialect = conn.dialect();
    let sql = format!("SELECT {} AS name", dialect.current_schema_expr());
    let rows = conn.query(&sql, &[]).await?;

    rows.first()
        .and_then(|row| row.text("name"))
        .ok_or_else(|| SquashError::config(format!("{} connection has no current schema", dialect)))
}

/// Choose the introspection strategy for a connection.
///
/// The reflection strategy is used when the dialect exposes
/// `INFORMATION_SCHEMA` with identity metadata and a probe query succeeds;
/// otherwise the native strategy is used. The choice is final.
pub async fn select_provider(
    conn: Arc<dyn CatalogConnection>,
    schema: Option<&str>,
) -> SquashResult<Box<dyn MetadataProvider>> {
    let schema = resolve_schema(conn.as_ref(), schema).await?;
    let native = NativeProvider::new(Arc::clone(&conn), schema.clone());

    if !matches!(conn.dialect(), Dialect::Postgres | Dialect::MySql) {
        debug!(dialect = %conn.dialect(), "Reflection not available, using native catalog");
        return Ok(Box::new(native));
    }

    match ReflectionProvider::probe(conn.as_ref(), &schema).await {
        Ok(()) => {
            info!(dialect = %conn.dialect(), schema = %schema, "Using INFORMATION_SCHEMA reflection");
            Ok(Box::new(ReflectionProvider::new(conn, schema, native)))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Reflection probe failed, falling back to native catalog");
            Ok(Box::new(native))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogRow, CatalogValue, SqlParam};
    use std::sync::Mutex;

    /// PostgreSQL catalog whose `INFORMATION_SCHEMA` views are unusable.
    struct MockCatalog {
        seen: Mutex<Vec<String>>,
    }

    impl MockCatalog {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        fn reflection_attempts(&self) -> usize {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter(|sql| sql.contains("information_schema"))
                .count()
        }
    }

    fn t(s: &str) -> CatalogValue {
        CatalogValue::Text(s.to_string())
    }

    fn pg_column(name: &str, column_type: &str, identity: bool) -> CatalogRow {
        CatalogRow::new()
            .with("name", t(name))
            .with("column_type", t(column_type))
            .with("udt_name", t(column_type))
            .with("type_kind", t("b"))
            .with("nullable", CatalogValue::Bool(false))
            .with("column_default", CatalogValue::Null)
            .with("is_identity", CatalogValue::Bool(identity))
            .with("comment", CatalogValue::Null)
    }

    #[async_trait::async_trait]
    impl CatalogConnection for MockCatalog {
        fn dialect(&self) -> Dialect {
            Dialect::Postgres
        }

        async fn query(&self, sql: &str, _params: &[SqlParam]) -> SquashResult<Vec<CatalogRow>> {
            self.seen.lock().unwrap().push(sql.to_string());

            if sql.contains("information_schema") {
                return Err(SquashError::database("permission denied for schema information_schema"));
            }
            if sql.contains("confdeltype") {
                return Ok(vec![
                    CatalogRow::new()
                        .with("name", t("posts_user_id_foreign"))
                        .with("column_name", t("user_id"))
                        .with("foreign_table", t("users"))
                        .with("foreign_column", t("id"))
                        .with("on_update", t("a"))
                        .with("on_delete", t("c")),
                ]);
            }
            if sql.contains("pg_index") {
                return Ok(Vec::new());
            }
            if sql.contains("attisdropped") {
                return Ok(vec![pg_column("id", "bigint", true), pg_column("user_id", "bigint", false)]);
            }
            if sql.contains("relkind") {
                return Ok(vec![CatalogRow::new().with("name", t("posts"))]);
            }
            Ok(Vec::new())
        }

        async fn execute(&self, _sql: &str, _params: &[SqlParam]) -> SquashResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_failed_probe_selects_native_provider() {
        let mock = MockCatalog::new();
        let conn: Arc<dyn CatalogConnection> = mock.clone();

        let provider = select_provider(conn, Some("public")).await.unwrap();
        assert!(!provider.supports_rich_introspection());
        assert_eq!(mock.reflection_attempts(), 1);

        assert_eq!(provider.list_tables().await.unwrap(), vec!["posts"]);
        let posts = provider.describe_table("posts").await.unwrap();
        assert_eq!(posts.columns.len(), 2);
        assert!(posts.columns[0].autoincrement);
        assert_eq!(posts.foreign_keys[0].foreign_table, "users");
        assert_eq!(mock.reflection_attempts(), 1);
    }

    #[tokio::test]
    async fn test_reflection_failures_answer_from_native_catalog() {
        let mock = MockCatalog::new();
        let conn: Arc<dyn CatalogConnection> = mock.clone();
        let native = NativeProvider::new(Arc::clone(&conn), "public");
        let provider = ReflectionProvider::new(conn, "public", native);
        assert!(provider.supports_rich_introspection());

        assert_eq!(provider.list_tables().await.unwrap(), vec!["posts"]);

        let columns = provider.list_columns("posts").await.unwrap();
        assert_eq!(
            columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "user_id"]
        );
        assert_eq!(columns[1].type_name, "bigint");

        let fks = provider.list_foreign_keys("posts").await.unwrap();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].columns, vec!["user_id"]);
        assert_eq!(fks[0].on_delete, Some(ReferentialAction::Cascade));

        assert_eq!(mock.reflection_attempts(), 3);
    }

    #[test]
    fn test_referential_action_from_rule() {
        assert_eq!(ReferentialAction::from_rule("CASCADE"), Some(ReferentialAction::Cascade));
        assert_eq!(ReferentialAction::from_rule("SET_NULL"), Some(ReferentialAction::SetNull));
        assert_eq!(ReferentialAction::from_rule("no action"), Some(ReferentialAction::NoAction));
        assert_eq!(ReferentialAction::from_rule("bogus"), None);
    }

    #[test]
    fn test_referential_action_from_pg_code() {
        assert_eq!(ReferentialAction::from_pg_code("c"), Some(ReferentialAction::Cascade));
        assert_eq!(ReferentialAction::from_pg_code("d"), Some(ReferentialAction::SetDefault));
        assert_eq!(ReferentialAction::from_pg_code("x"), None);
    }

    #[test]
    fn test_primary_key_lookup() {
        let table = TableDescriptor {
            name: "users".into(),
            indexes: vec![
                IndexDescriptor::new("users_email_unique", &["email"]).unique(),
                IndexDescriptor::new("PRIMARY", &["id"]).primary(),
            ],
            ..Default::default()
        };
        let pk = table.primary_key().unwrap();
        assert_eq!(pk.columns, vec!["id"]);
        assert!(pk.unique);
    }
}
