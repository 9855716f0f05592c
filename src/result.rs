use serde::{Deserialize, Serialize};

use crate::metrics;
use crate::snippet::Language;
use crate::typed_log::TypedLog;

/// Terminal numbers of a session, frozen at finalize time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalMetrics {
    pub wpm: u32,
    pub raw_wpm: u32,
    pub accuracy: u32,
    pub errors: u32,
    pub consistency: u32,
    pub elapsed_ms: u64,
}

impl FinalMetrics {
    pub fn compute(log: &TypedLog, wpm_samples: &[u32], elapsed_ms: u64) -> Self {
        let correct = log.correct_count();
        let total = log.len();

        Self {
            wpm: metrics::speed(correct, elapsed_ms),
            raw_wpm: metrics::speed(total, elapsed_ms),
            accuracy: metrics::accuracy(correct, total),
            errors: log.incorrect_count() as u32,
            consistency: metrics::consistency(wpm_samples),
            elapsed_ms,
        }
    }
}

/// The record handed to persistence, once per finished session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub language: Language,
    #[serde(rename = "duration")]
    pub duration_secs: u32,
    pub wpm: u32,
    pub raw_wpm: u32,
    pub accuracy: u32,
    pub errors: u32,
    pub consistency: u32,
    pub snippet_id: String,
    pub elapsed_ms: u64,
    pub user_id: Option<String>,
    pub display_name: String,
}
