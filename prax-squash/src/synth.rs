//! Source synthesis pipeline: provider, recognizer, printer.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::blueprint::{self, TableBlueprint};
use crate::error::SquashResult;
use crate::introspect::{MetadataProvider, TableDescriptor};
use crate::printer::MigrationPrinter;

/// Generated migration source and the tables it creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedArtifact {
    /// PHP source text.
    pub source: String,
    /// Tables in creation order.
    pub tables: Vec<String>,
}

impl SynthesizedArtifact {
    /// Tables in teardown order.
    pub fn teardown_order(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().rev().map(String::as_str)
    }

    /// Whether the artifact creates no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Builds a [`SynthesizedArtifact`] from a live catalog.
pub struct Synthesizer<'a> {
    provider: &'a dyn MetadataProvider,
    excluded: BTreeSet<String>,
}

impl<'a> Synthesizer<'a> {
    /// Create a synthesizer that skips the given tables.
    pub fn new<I, S>(provider: &'a dyn MetadataProvider, excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            provider,
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    /// Snapshot every non-excluded table, in creation order.
    ///
    /// Tables that report no columns (dropped while the run was in
    /// progress) are skipped. See [`dependency_order`].
    pub async fn collect(&self) -> SquashResult<Vec<TableDescriptor>> {
        let mut names: Vec<String> = self
            .provider
            .list_tables()
            .await?
            .into_iter()
            .filter(|t| !self.excluded.contains(t))
            .collect();
        names.sort();
        names.dedup();

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let table = self.provider.describe_table(&name).await?;
            if table.columns.is_empty() {
                debug!(table = %name, "Skipping table without columns");
                continue;
            }
            debug!(
                table = %name,
                columns = table.columns.len(),
                indexes = table.indexes.len(),
                foreign_keys = table.foreign_keys.len(),
                "Described table"
            );
            tables.push(table);
        }

        Ok(dependency_order(tables))
    }

    /// Introspect the catalog and render the artifact.
    pub async fn synthesize(&self) -> SquashResult<SynthesizedArtifact> {
        let tables = self.collect().await?;
        Ok(render(&tables))
    }
}

/// Order tables so each one follows every table its foreign keys reference.
///
/// Ready tables are taken in ascending name order. When only tables in a
/// reference cycle remain, the lowest name goes next. Self-references and
/// references to tables outside the set are ignored.
pub fn dependency_order(tables: Vec<TableDescriptor>) -> Vec<TableDescriptor> {
    let mut by_name: BTreeMap<String, TableDescriptor> =
        tables.into_iter().map(|t| (t.name.clone(), t)).collect();

    let mut pending: BTreeMap<String, BTreeSet<String>> = by_name
        .values()
        .map(|t| {
            let refs = t
                .foreign_keys
                .iter()
                .map(|fk| fk.foreign_table.clone())
                .filter(|r| *r != t.name && by_name.contains_key(r))
                .collect();
            (t.name.clone(), refs)
        })
        .collect();

    let mut ordered = Vec::with_capacity(by_name.len());
    while !pending.is_empty() {
        let ready = pending
            .iter()
            .find(|(_, refs)| refs.is_empty())
            .or_else(|| pending.iter().next())
            .map(|(name, _)| name.clone());
        let Some(next) = ready else { break };

        pending.remove(&next);
        for refs in pending.values_mut() {
            refs.remove(&next);
        }
        if let Some(table) = by_name.remove(&next) {
            ordered.push(table);
        }
    }

    ordered
}

/// Render table snapshots, in the given order, into an artifact.
pub fn render(tables: &[TableDescriptor]) -> SynthesizedArtifact {
    let blueprints: Vec<TableBlueprint> = tables.iter().map(blueprint::recognize).collect();

    SynthesizedArtifact {
        source: MigrationPrinter.print(&blueprints),
        tables: blueprints.into_iter().map(|b| b.table).collect(),
    }
}
