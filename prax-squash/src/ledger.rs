//! Migration ledger bookkeeping.
//!
//! The ledger table records applied migrations as `(migration, batch)` rows.
//! After a squash the retired rows are replaced by a single row for the
//! artifact.

use tracing::{debug, info};

use crate::catalog::{CatalogConnection, SqlParam};
use crate::error::SquashResult;

/// Names bound per statement; below every dialect's parameter limit.
const CHUNK_SIZE: usize = 500;

/// Batch recorded when none of the retired rows were found.
pub const DEFAULT_BATCH: i32 = 1;

/// Result of a ledger rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerUpdate {
    /// Retired rows deleted.
    pub removed: u64,
    /// Batch assigned to the artifact row.
    pub batch: i32,
}

/// Access to the ledger table over a catalog connection.
pub struct Ledger<'a> {
    conn: &'a dyn CatalogConnection,
    table: String,
}

impl<'a> Ledger<'a> {
    /// Create a ledger for the given table.
    pub fn new(conn: &'a dyn CatalogConnection, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
        }
    }

    fn quoted_table(&self) -> String {
        self.conn.dialect().quote_identifier(&self.table)
    }

    fn in_list(&self, offset: usize, count: usize) -> String {
        let dialect = self.conn.dialect();
        (1..=count)
            .map(|i| dialect.placeholder(offset + i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Smallest batch among the given migrations, if any are recorded.
    pub async fn min_batch(&self, names: &[String]) -> SquashResult<Option<i64>> {
        let mut min: Option<i64> = None;

        for chunk in names.chunks(CHUNK_SIZE) {
            let sql = format!(
                "SELECT MIN(batch) AS batch FROM {} WHERE migration IN ({})",
                self.quoted_table(),
                self.in_list(0, chunk.len())
            );
            let params: Vec<SqlParam> = chunk.iter().map(|n| SqlParam::from(n.as_str())).collect();
            let rows = self.conn.query(&sql, &params).await?;

            if let Some(batch) = rows.first().and_then(|r| r.int("batch")) {
                min = Some(min.map_or(batch, |m| m.min(batch)));
            }
        }

        Ok(min)
    }

    /// Delete the rows of the given migrations.
    pub async fn remove(&self, names: &[String]) -> SquashResult<u64> {
        let mut removed = 0;

        for chunk in names.chunks(CHUNK_SIZE) {
            let sql = format!(
                "DELETE FROM {} WHERE migration IN ({})",
                self.quoted_table(),
                self.in_list(0, chunk.len())
            );
            let params: Vec<SqlParam> = chunk.iter().map(|n| SqlParam::from(n.as_str())).collect();
            removed += self.conn.execute(&sql, &params).await?;
        }

        Ok(removed)
    }

    /// Insert one ledger row.
    pub async fn record(&self, name: &str, batch: i32) -> SquashResult<()> {
        let dialect = self.conn.dialect();
        let sql = format!(
            "INSERT INTO {} (migration, batch) VALUES ({}, {})",
            self.quoted_table(),
            dialect.placeholder(1),
            dialect.placeholder(2)
        );
        self.conn.execute(&sql, &[SqlParam::from(name), SqlParam::Int(batch)]).await?;
        Ok(())
    }

    /// Replace the retired rows, and any earlier artifact row, with one row
    /// for the artifact.
    ///
    /// The artifact takes the smallest batch among the retired rows.
    pub async fn replace(&self, retired: &[String], artifact: &str) -> SquashResult<LedgerUpdate> {
        let batch = self
            .min_batch(retired)
            .await?
            .and_then(|b| i32::try_from(b).ok())
            .unwrap_or(DEFAULT_BATCH);

        let removed = self.remove(retired).await?;
        let previous = self.remove(&[artifact.to_string()]).await?;
        if previous > 0 {
            debug!(artifact = %artifact, "Replaced earlier artifact ledger row");
        }

        self.record(artifact, batch).await?;
        info!(table = %self.table, removed, batch, "Ledger updated");

        Ok(LedgerUpdate { removed, batch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sqlite")]
    async fn ledger_db(rows: &[(&str, i32)]) -> crate::catalog::sqlite::SqliteCatalog {
        let conn = crate::catalog::sqlite::SqliteCatalog::connect("sqlite::memory:")
            .await
            .unwrap();
        conn.execute(
            "CREATE TABLE migrations (id INTEGER PRIMARY KEY, migration VARCHAR(255) NOT NULL, batch INTEGER NOT NULL)",
            &[],
        )
        .await
        .unwrap();
        for (name, batch) in rows {
            conn.execute(
                "INSERT INTO migrations (migration, batch) VALUES (?, ?)",
                &[SqlParam::from(*name), SqlParam::Int(*batch)],
            )
            .await
            .unwrap();
        }
        conn
    }

    #[cfg(feature = "sqlite")]
    async fn ledger_rows(conn: &dyn CatalogConnection) -> Vec<(String, i64)> {
        conn.query("SELECT migration, batch FROM migrations ORDER BY migration", &[])
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.text("migration").unwrap(), r.int("batch").unwrap()))
            .collect()
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_replace_uses_min_batch() {
        let conn = ledger_db(&[("2023_a", 2), ("2023_b", 3), ("2024_c", 4)]).await;
        let ledger = Ledger::new(&conn, "migrations");

        let update = ledger
            .replace(&["2023_a".to_string(), "2023_b".to_string()], "0000_squashed_schema")
            .await
            .unwrap();

        assert_eq!(update, LedgerUpdate { removed: 2, batch: 2 });
        assert_eq!(
            ledger_rows(&conn).await,
            vec![("0000_squashed_schema".to_string(), 2), ("2024_c".to_string(), 4)]
        );
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_replace_without_recorded_rows() {
        let conn = ledger_db(&[("0000_squashed_schema", 7)]).await;
        let ledger = Ledger::new(&conn, "migrations");

        let update = ledger.replace(&["missing".to_string()], "0000_squashed_schema").await.unwrap();

        assert_eq!(update, LedgerUpdate { removed: 0, batch: DEFAULT_BATCH });
        assert_eq!(ledger_rows(&conn).await, vec![("0000_squashed_schema".to_string(), 1)]);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_min_batch_of_nothing() {
        let conn = ledger_db(&[]).await;
        assert_eq!(Ledger::new(&conn, "migrations").min_batch(&[]).await.unwrap(), None);
    }
}
