use std::collections::HashSet;

use crate::model::{RecordKey, TradingRecord};

/// Result of collapsing a record set to one entry per key.
#[derive(Debug)]
pub struct Deduped {
    pub records: Vec<TradingRecord>,
    pub duplicates: usize,
}

/// Keeps the first record seen for each (ticker, session date) key and
/// drops the rest, preserving first-seen order. The source document may
/// legitimately repeat an instrument across market segments; the loader
/// must never see the same key twice within one load.
pub fn dedupe_records(records: Vec<TradingRecord>) -> Deduped {
    let mut seen: HashSet<RecordKey> = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    let mut duplicates = 0usize;

    for record in records {
        if seen.insert(record.key()) {
            unique.push(record);
        } else {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        log::info!(
            "removed {} duplicate records, {} unique remain",
            duplicates,
            unique.len()
        );
    }

    Deduped {
        records: unique,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sourced;

    fn record(ticker: &str, date: &str, last: f64) -> TradingRecord {
        TradingRecord {
            ticker: ticker.to_string(),
            session_date: Sourced::Reported(date.to_string()),
            open: Sourced::Reported(last),
            min: Sourced::Reported(last),
            max: Sourced::Reported(last),
            average: Sourced::Reported(last),
            last: Sourced::Reported(last),
            volume: Sourced::Reported(100),
        }
    }

    #[test]
    fn keeps_first_occurrence_per_key() {
        let deduped = dedupe_records(vec![
            record("PETR4", "2024-01-01", 37.0),
            record("VALE3", "2024-01-01", 60.0),
            record("PETR4", "2024-01-01", 99.0),
        ]);

        assert_eq!(deduped.duplicates, 1);
        assert_eq!(deduped.records.len(), 2);
        assert_eq!(deduped.records[0].ticker, "PETR4");
        assert_eq!(deduped.records[0].last, Sourced::Reported(37.0));
        assert_eq!(deduped.records[1].ticker, "VALE3");
    }

    #[test]
    fn same_ticker_on_different_dates_is_not_a_duplicate() {
        let deduped = dedupe_records(vec![
            record("PETR4", "2024-01-01", 37.0),
            record("PETR4", "2024-01-02", 38.0),
        ]);
        assert_eq!(deduped.duplicates, 0);
        assert_eq!(deduped.records.len(), 2);
    }

    #[test]
    fn is_idempotent() {
        let once = dedupe_records(vec![
            record("PETR4", "2024-01-01", 37.0),
            record("PETR4", "2024-01-01", 99.0),
            record("VALE3", "2024-01-01", 60.0),
        ]);
        let first_pass = once.records.clone();

        let twice = dedupe_records(once.records);
        assert_eq!(twice.duplicates, 0);
        assert_eq!(twice.records, first_pass);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let deduped = dedupe_records(Vec::new());
        assert!(deduped.records.is_empty());
        assert_eq!(deduped.duplicates, 0);
    }
}
