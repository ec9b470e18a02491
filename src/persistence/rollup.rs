//! Analytics rollup over stored interaction records

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::behavior::types::CognitiveStateKind;
use crate::persistence::repository::InteractionRecord;

/// Per-user summary of classified states
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateRollup {
    pub total: usize,
    pub counts: BTreeMap<CognitiveStateKind, usize>,
    /// Mean confidence per state
    pub mean_confidence: BTreeMap<CognitiveStateKind, f64>,
    /// Mean confidence over every record
    pub overall_confidence: f64,
    /// Most frequent state; ties go to the earlier state in declaration order
    pub dominant: Option<CognitiveStateKind>,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl StateRollup {
    pub fn from_records(records: &[InteractionRecord]) -> Self {
        let mut rollup = Self::default();
        let mut sums: BTreeMap<CognitiveStateKind, f64> = BTreeMap::new();
        let mut total_confidence = 0.0;

        for record in records {
            let confidence = if record.confidence.is_finite() {
                record.confidence.clamp(0.0, 1.0)
            } else {
                0.0
            };
            *rollup.counts.entry(record.state).or_insert(0) += 1;
            *sums.entry(record.state).or_insert(0.0) += confidence;
            total_confidence += confidence;

            rollup.first_timestamp = Some(match rollup.first_timestamp {
                Some(t) => t.min(record.timestamp),
                None => record.timestamp,
            });
            rollup.last_timestamp = Some(match rollup.last_timestamp {
                Some(t) => t.max(record.timestamp),
                None => record.timestamp,
            });
        }

        rollup.total = records.len();
        if rollup.total > 0 {
            rollup.overall_confidence = total_confidence / rollup.total as f64;
        }
        rollup.mean_confidence = sums
            .into_iter()
            .map(|(state, sum)| (state, sum / rollup.counts[&state] as f64))
            .collect();

        // BTreeMap iterates in declaration order; strict `>` keeps the earliest on ties
        let mut best: Option<(CognitiveStateKind, usize)> = None;
        for (&state, &count) in &rollup.counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((state, count));
            }
        }
        rollup.dominant = best.map(|(state, _)| state);

        rollup
    }

    /// Share of records in `state` (0-1)
    pub fn share(&self, state: CognitiveStateKind) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.counts.get(&state).copied().unwrap_or(0) as f64 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(state: CognitiveStateKind, confidence: f64, minute: u32) -> InteractionRecord {
        InteractionRecord {
            id: format!("r-{}", minute),
            user_id: "u1".to_string(),
            state,
            confidence,
            indicators: Vec::new(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 14, minute, 0).unwrap(),
        }
    }

    #[test]
    fn test_empty_rollup() {
        let rollup = StateRollup::from_records(&[]);
        assert_eq!(rollup.total, 0);
        assert_eq!(rollup.dominant, None);
        assert_eq!(rollup.overall_confidence, 0.0);
        assert_eq!(rollup.share(CognitiveStateKind::Focused), 0.0);
    }

    #[test]
    fn test_counts_and_means() {
        let records = vec![
            record(CognitiveStateKind::Focused, 0.8, 5),
            record(CognitiveStateKind::Distracted, 0.6, 1),
            record(CognitiveStateKind::Focused, 0.6, 9),
        ];
        let rollup = StateRollup::from_records(&records);

        assert_eq!(rollup.total, 3);
        assert_eq!(rollup.counts[&CognitiveStateKind::Focused], 2);
        assert!((rollup.mean_confidence[&CognitiveStateKind::Focused] - 0.7).abs() < 1e-9);
        assert!((rollup.overall_confidence - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(rollup.dominant, Some(CognitiveStateKind::Focused));
        assert!((rollup.share(CognitiveStateKind::Distracted) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(rollup.first_timestamp.unwrap().format("%M").to_string(), "01");
        assert_eq!(rollup.last_timestamp.unwrap().format("%M").to_string(), "09");
    }

    #[test]
    fn test_dominant_tie_prefers_earlier_state() {
        let records = vec![
            record(CognitiveStateKind::Fatigued, 0.5, 1),
            record(CognitiveStateKind::Receptive, 0.5, 2),
        ];
        let rollup = StateRollup::from_records(&records);
        assert_eq!(rollup.dominant, Some(CognitiveStateKind::Receptive));
    }

    #[test]
    fn test_serializes_state_keys() {
        let rollup = StateRollup::from_records(&[record(CognitiveStateKind::Neutral, 0.2, 0)]);
        let value = serde_json::to_value(&rollup).unwrap();
        assert_eq!(value["counts"]["neutral"], 1);
    }
}
