//! Fan-in of per-instrument matches into ranked per-rule buckets.

use crate::domain::rule::{PatternRule, RankKey};
use crate::domain::scan::MatchRecord;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ResultBucket {
    pub rule: PatternRule,
    pub records: Vec<MatchRecord>,
}

/// Groups records by matched rule (a record with k matches lands in k
/// buckets) and ranks each bucket with its rule's key. Buckets come back in
/// catalog order; rules nobody matched have no bucket.
pub fn aggregate(records: &[MatchRecord]) -> Vec<ResultBucket> {
    let mut grouped: BTreeMap<PatternRule, Vec<MatchRecord>> = BTreeMap::new();
    for record in records {
        let mut seen = Vec::with_capacity(record.matches.len());
        for rule in record.rules() {
            if seen.contains(&rule) {
                continue;
            }
            seen.push(rule);
            grouped.entry(rule).or_default().push(record.clone());
        }
    }

    grouped
        .into_iter()
        .map(|(rule, mut records)| {
            rank(&mut records, rule.rank_key());
            ResultBucket { rule, records }
        })
        .collect()
}

pub fn rank(records: &mut [MatchRecord], key: RankKey) {
    records.sort_by(|a, b| {
        let primary = descending(a.pct_chg, b.pct_chg);
        let secondary = match key {
            RankKey::PctChange => Ordering::Equal,
            RankKey::PctChangeThenVolumeRatio => descending(a.volume_ratio, b.volume_ratio),
        };
        primary
            .then(secondary)
            .then_with(|| a.code.cmp(&b.code))
    });
}

/// Larger values first; missing values after every present one.
fn descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Match counts per rule, in catalog order.
pub fn summarize(buckets: &[ResultBucket]) -> Vec<(PatternRule, usize)> {
    buckets.iter().map(|b| (b.rule, b.records.len())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::{Evidence, RuleMatch};
    use chrono::NaiveDate;

    fn record(code: &str, pct: Option<f64>, ratio: Option<f64>, rules: &[PatternRule]) -> MatchRecord {
        MatchRecord {
            code: code.into(),
            name: format!("name-{code}"),
            date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            close: 10.0,
            pct_chg: pct,
            volume_ratio: ratio,
            matches: rules
                .iter()
                .map(|&rule| RuleMatch {
                    rule,
                    evidence: Evidence::Alignment,
                })
                .collect(),
        }
    }

    fn codes(bucket: &ResultBucket) -> Vec<&str> {
        bucket.records.iter().map(|r| r.code.as_str()).collect()
    }

    #[test]
    fn fan_out_places_record_in_each_matched_bucket_once() {
        let records = vec![record(
            "000001",
            Some(1.0),
            None,
            &[PatternRule::BreakoutPullback, PatternRule::ChaseLimitUp],
        )];
        let buckets = aggregate(&records);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].rule, PatternRule::BreakoutPullback);
        assert_eq!(buckets[1].rule, PatternRule::ChaseLimitUp);
        assert_eq!(codes(&buckets[0]), vec!["000001"]);
        assert_eq!(codes(&buckets[1]), vec!["000001"]);
        assert!(buckets.iter().all(|b| b.rule != PatternRule::HighVolumeSupport));
    }

    #[test]
    fn ranks_by_pct_change_descending() {
        let records = vec![
            record("A", Some(1.0), None, &[PatternRule::MaFan]),
            record("B", Some(5.0), None, &[PatternRule::MaFan]),
            record("C", None, None, &[PatternRule::MaFan]),
            record("D", Some(-2.0), None, &[PatternRule::MaFan]),
        ];
        let buckets = aggregate(&records);
        assert_eq!(codes(&buckets[0]), vec!["B", "A", "D", "C"]);
    }

    #[test]
    fn volume_ratio_breaks_pct_ties_for_volume_rules() {
        let records = vec![
            record("A", Some(3.0), Some(1.2), &[PatternRule::TrendInflection]),
            record("B", Some(3.0), Some(2.5), &[PatternRule::TrendInflection]),
        ];
        let buckets = aggregate(&records);
        assert_eq!(codes(&buckets[0]), vec!["B", "A"]);
    }

    #[test]
    fn pct_only_rules_fall_back_to_code() {
        let records = vec![
            record("B", Some(3.0), Some(2.5), &[PatternRule::MaFan]),
            record("A", Some(3.0), Some(1.2), &[PatternRule::MaFan]),
        ];
        let buckets = aggregate(&records);
        assert_eq!(codes(&buckets[0]), vec!["A", "B"]);
    }

    #[test]
    fn ordering_is_independent_of_input_order() {
        let mut records = vec![
            record("C", Some(2.0), Some(1.0), &[PatternRule::MacdTrendDaily]),
            record("A", Some(2.0), Some(1.0), &[PatternRule::MacdTrendDaily]),
            record("B", Some(4.0), Some(0.5), &[PatternRule::MacdTrendDaily]),
        ];
        let first = aggregate(&records);
        records.reverse();
        let second = aggregate(&records);
        assert_eq!(first, second);
        assert_eq!(codes(&first[0]), vec!["B", "A", "C"]);
    }

    #[test]
    fn summarize_counts_each_bucket() {
        let records = vec![
            record("A", Some(1.0), None, &[PatternRule::MaFan, PatternRule::ChaseLimitUp]),
            record("B", Some(2.0), None, &[PatternRule::MaFan]),
        ];
        let summary = summarize(&aggregate(&records));
        assert_eq!(
            summary,
            vec![(PatternRule::MaFan, 2), (PatternRule::ChaseLimitUp, 1)]
        );
    }

    #[test]
    fn no_records_no_buckets() {
        assert!(aggregate(&[]).is_empty());
    }
}
