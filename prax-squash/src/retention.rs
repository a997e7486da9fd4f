//! Retention planning.
//!
//! Decides which migrations may be folded into the squashed artifact. A
//! migration is retired when it predates the cutoff and is not among the
//! most recent `keep` migrations.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::inventory::MigrationRecord;

/// Outcome of retention planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SquashPlan {
    /// Migrations to retire, oldest first.
    pub retired: Vec<MigrationRecord>,
    /// Migrations that stay, oldest first.
    pub retained: Vec<MigrationRecord>,
    /// Cutoff date used.
    pub cutoff: NaiveDate,
    /// Retained-tail size requested.
    pub keep: i64,
}

impl SquashPlan {
    /// Partition `records` for the given cutoff and keep count.
    pub fn compute(records: &[MigrationRecord], cutoff: NaiveDate, keep: i64) -> Self {
        let mut sorted = records.to_vec();
        sort_records(&mut sorted);

        let tail_start = sorted.len().saturating_sub(tail_len(keep));
        let limit = cutoff_instant(cutoff);

        let (retired, retained) = sorted
            .into_iter()
            .enumerate()
            .partition::<Vec<_>, _>(|(i, r)| *i < tail_start && r.timestamp < limit);

        Self {
            retired: retired.into_iter().map(|(_, r)| r).collect(),
            retained: retained.into_iter().map(|(_, r)| r).collect(),
            cutoff,
            keep,
        }
    }

    /// Whether nothing would be retired.
    pub fn is_empty(&self) -> bool {
        self.retired.is_empty()
    }

    /// Ledger identifiers of the retired migrations.
    pub fn retired_names(&self) -> Vec<String> {
        self.retired.iter().map(|r| r.name.clone()).collect()
    }
}

/// Records to retire for the given cutoff and keep count, oldest first.
pub fn select_for_retirement(
    records: &[MigrationRecord],
    cutoff: NaiveDate,
    keep: i64,
) -> Vec<MigrationRecord> {
    SquashPlan::compute(records, cutoff, keep).retired
}

fn sort_records(records: &mut [MigrationRecord]) {
    records.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.filename.cmp(&b.filename))
    });
}

fn tail_len(keep: i64) -> usize {
    usize::try_from(keep.max(0)).unwrap_or(usize::MAX)
}

fn cutoff_instant(cutoff: NaiveDate) -> NaiveDateTime {
    cutoff.and_time(chrono::NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::FilenamePattern;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn record(name: &str) -> MigrationRecord {
        FilenamePattern::new("php")
            .unwrap()
            .parse(Path::new(&format!("{}.php", name)))
            .unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn names(records: &[MigrationRecord]) -> Vec<&str> {
        records.iter().map(|r| r.short_name.as_str()).collect()
    }

    fn history() -> Vec<MigrationRecord> {
        vec![
            record("2024_10_15_000000_d"),
            record("2023_01_01_000000_a"),
            record("2024_10_01_000000_c"),
            record("2023_06_01_000000_b"),
        ]
    }

    #[test]
    fn test_cutoff_and_tail_scenario() {
        let plan = SquashPlan::compute(&history(), date("2024-01-01"), 2);
        assert_eq!(names(&plan.retired), vec!["a", "b"]);
        assert_eq!(names(&plan.retained), vec!["c", "d"]);
    }

    #[test]
    fn test_tail_protects_old_records() {
        let plan = SquashPlan::compute(&history(), date("2025-01-01"), 3);
        assert_eq!(names(&plan.retired), vec!["a"]);
    }

    #[test]
    fn test_keep_zero_retires_everything_before_cutoff() {
        let retired = select_for_retirement(&history(), date("2024-10-01"), 0);
        assert_eq!(names(&retired), vec!["a", "b"]);
    }

    #[test]
    fn test_cutoff_is_strict() {
        let records = vec![record("2024_01_01_000000_midnight"), record("2023_12_31_235959_eve")];
        let retired = select_for_retirement(&records, date("2024-01-01"), 0);
        assert_eq!(names(&retired), vec!["eve"]);
    }

    #[test]
    fn test_keep_at_least_count_retires_nothing() {
        assert!(select_for_retirement(&history(), date("2030-01-01"), 4).is_empty());
        assert!(select_for_retirement(&history(), date("2030-01-01"), 100).is_empty());
    }

    #[test]
    fn test_negative_keep_is_zero() {
        let retired = select_for_retirement(&history(), date("2030-01-01"), -3);
        assert_eq!(retired.len(), 4);
    }

    #[test]
    fn test_empty_input() {
        let plan = SquashPlan::compute(&[], date("2030-01-01"), 0);
        assert!(plan.is_empty());
        assert!(plan.retained.is_empty());
    }

    #[test]
    fn test_set_laws() {
        let records = history();
        let mut sorted = records.clone();
        sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.filename.cmp(&b.filename)));

        for keep in -1..=5_i64 {
            for cutoff in ["2022-01-01", "2023-03-01", "2024-10-10", "2030-01-01"] {
                let cutoff = date(cutoff);
                let plan = SquashPlan::compute(&records, cutoff, keep);
                let k = keep.max(0) as usize;

                let tail = &sorted[sorted.len().saturating_sub(k)..];
                assert_eq!(tail.len(), k.min(records.len()));
                assert!(tail.iter().all(|r| plan.retained.contains(r)));
                assert!(plan.retired.iter().all(|r| !tail.contains(r)));
                assert!(plan.retired.iter().all(|r| r.timestamp < cutoff_instant(cutoff)));
                assert_eq!(plan.retired.len() + plan.retained.len(), records.len());
            }
        }
    }
}
