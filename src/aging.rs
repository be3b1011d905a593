// src/aging.rs
use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::remote::FileRecord;

/// Largest threshold chrono can represent, in seconds
const MAX_THRESHOLD_SECS: u64 = (i64::MAX / 1000) as u64;

/// Outcome of checking one listing against the alerted set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Stale files not alerted on before, in listing order
    pub newly_stale: Vec<String>,
    /// Names to persist once the alert has gone out
    pub to_append: Vec<String>,
    /// Every stale file in the listing, alerted or not
    pub stale_total: usize,
}

/// Decides which files have been sitting in the folder too long.
pub struct StaleFileResolver {
    threshold: Duration,
}

impl StaleFileResolver {
    pub fn new(threshold_hours: u64) -> Self {
        let secs = threshold_hours.saturating_mul(3600).min(MAX_THRESHOLD_SECS);
        StaleFileResolver {
            threshold: Duration::seconds(secs as i64),
        }
    }

    // Strictly older than the threshold; a file exactly at the limit is still fresh.
    // Modification times in the future give a negative age and never count.
    pub fn is_stale(&self, record: &FileRecord, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(record.modified_at) > self.threshold
    }

    /// Splits a listing into the stale files that still need an alert.
    ///
    /// Pure: no I/O, deterministic for the same inputs. A name repeated within
    /// `records` is reported once.
    pub fn resolve(
        &self,
        records: &[FileRecord],
        now: DateTime<Utc>,
        already_alerted: &HashSet<String>,
    ) -> Resolution {
        let mut seen = HashSet::new();
        let mut stale_total = 0;
        let mut newly_stale = Vec::new();

        for record in records.iter().filter(|r| self.is_stale(r, now)) {
            if !seen.insert(record.name.as_str()) {
                continue;
            }
            stale_total += 1;
            if !already_alerted.contains(&record.name) {
                newly_stale.push(record.name.clone());
            }
        }

        Resolution {
            to_append: newly_stale.clone(),
            newly_stale,
            stale_total,
        }
    }
}

/// Convenience wrapper over [`StaleFileResolver::resolve`].
pub fn resolve(
    records: &[FileRecord],
    now: DateTime<Utc>,
    threshold_hours: u64,
    already_alerted: &HashSet<String>,
) -> Resolution {
    StaleFileResolver::new(threshold_hours).resolve(records, now, already_alerted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn aged(name: &str, age: Duration) -> FileRecord {
        FileRecord::new(name, t0() - age)
    }

    fn alerted(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn reports_only_files_past_threshold() {
        let records = vec![aged("a.txt", Duration::hours(7)), aged("b.txt", Duration::hours(3))];

        let resolution = resolve(&records, t0(), 6, &HashSet::new());

        assert_eq!(resolution.newly_stale, vec!["a.txt"]);
        assert_eq!(resolution.to_append, vec!["a.txt"]);
        assert_eq!(resolution.stale_total, 1);
    }

    #[test]
    fn skips_files_already_alerted() {
        let records = vec![aged("a.txt", Duration::hours(7)), aged("b.txt", Duration::hours(3))];

        let resolution = resolve(&records, t0(), 6, &alerted(&["a.txt"]));

        assert!(resolution.newly_stale.is_empty());
        assert!(resolution.to_append.is_empty());
        assert_eq!(resolution.stale_total, 1);
    }

    #[test]
    fn exact_threshold_is_not_stale() {
        let resolver = StaleFileResolver::new(6);
        assert!(!resolver.is_stale(&aged("edge", Duration::hours(6)), t0()));
        assert!(resolver.is_stale(&aged("edge", Duration::hours(6) + Duration::seconds(1)), t0()));
        assert!(resolver.is_stale(
            &aged("edge", Duration::hours(6) + Duration::milliseconds(1)),
            t0()
        ));
    }

    #[test]
    fn strictness_holds_across_thresholds() {
        for threshold in [0u64, 1, 6, 24, 168] {
            let resolver = StaleFileResolver::new(threshold);
            let limit = Duration::hours(threshold as i64);
            assert!(!resolver.is_stale(&aged("f", limit), t0()), "tie at {}h", threshold);
            assert!(!resolver.is_stale(&aged("f", limit - Duration::seconds(1)), t0()));
            assert!(resolver.is_stale(&aged("f", limit + Duration::seconds(1)), t0()));
        }
    }

    #[test]
    fn future_timestamps_are_fresh() {
        let resolver = StaleFileResolver::new(0);
        assert!(!resolver.is_stale(&aged("clock-skew", Duration::hours(-2)), t0()));
    }

    #[test]
    fn preserves_listing_order() {
        let records = vec![
            aged("zeta", Duration::hours(10)),
            aged("alpha", Duration::hours(20)),
            aged("fresh", Duration::minutes(5)),
            aged("mid", Duration::hours(8)),
        ];

        let resolution = resolve(&records, t0(), 6, &HashSet::new());

        assert_eq!(resolution.newly_stale, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn second_pass_with_persisted_names_is_empty() {
        let records = vec![aged("a", Duration::hours(9)), aged("b", Duration::hours(12))];
        let first = resolve(&records, t0(), 6, &HashSet::new());

        let persisted: HashSet<String> = first.to_append.iter().cloned().collect();
        let second = resolve(&records, t0(), 6, &persisted);

        assert_eq!(first.newly_stale, vec!["a", "b"]);
        assert!(second.newly_stale.is_empty());
        assert!(second.to_append.is_empty());
    }

    #[test]
    fn one_of_two_stale_files_already_alerted() {
        let records = vec![aged("old.csv", Duration::hours(30)), aged("new.csv", Duration::hours(7))];

        let resolution = resolve(&records, t0(), 6, &alerted(&["old.csv"]));

        assert_eq!(resolution.newly_stale, vec!["new.csv"]);
        assert_eq!(resolution.stale_total, 2);
    }

    #[test]
    fn repeated_name_reported_once() {
        let records = vec![aged("dup", Duration::hours(7)), aged("dup", Duration::hours(8))];

        let resolution = resolve(&records, t0(), 6, &HashSet::new());

        assert_eq!(resolution.newly_stale, vec!["dup"]);
    }

    #[test]
    fn names_are_compared_verbatim() {
        let records = vec![aged("Report.TXT", Duration::hours(7))];

        let resolution = resolve(&records, t0(), 6, &alerted(&["report.txt", "./Report.TXT"]));

        assert_eq!(resolution.newly_stale, vec!["Report.TXT"]);
    }

    #[test]
    fn empty_listing_yields_nothing() {
        assert_eq!(resolve(&[], t0(), 6, &HashSet::new()), Resolution::default());
    }

    #[test]
    fn huge_threshold_does_not_overflow() {
        let resolver = StaleFileResolver::new(u64::MAX);
        assert!(!resolver.is_stale(&aged("ancient", Duration::days(365 * 100)), t0()));
    }
}
