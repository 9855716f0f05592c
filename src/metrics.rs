//! Speed, accuracy and pacing numbers derived from a typed log.
//!
//! Everything here is a pure function of its arguments, so the live display
//! and the final result can share the same arithmetic.

use crate::typed_log::TypedEntry;

/// Characters per "word" for every words-per-minute figure.
pub const CHARS_PER_WORD: f64 = 5.0;

/// Trailing window used for the live speed estimate.
pub const ROLLING_WINDOW_MS: u64 = 3000;

const MS_PER_MINUTE: f64 = 60_000.0;

pub fn mean(data: &[f64]) -> Option<f64> {
    match data.len() {
        0 => None,
        count => Some(data.iter().sum::<f64>() / count as f64),
    }
}

/// Population standard deviation.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let data_mean = mean(data)?;
    let variance = data
        .iter()
        .map(|value| {
            let diff = data_mean - *value;
            diff * diff
        })
        .sum::<f64>()
        / data.len() as f64;

    Some(variance.sqrt())
}

fn per_minute(char_count: usize, elapsed_ms: u64) -> u32 {
    if elapsed_ms == 0 {
        return 0;
    }
    let minutes = elapsed_ms as f64 / MS_PER_MINUTE;
    (char_count as f64 / CHARS_PER_WORD / minutes).round() as u32
}

/// Words per minute for `char_count` characters over `elapsed_ms`.
///
/// Pass the correct-character count for wpm and the total attempted count for
/// raw wpm.
pub fn speed(char_count: usize, elapsed_ms: u64) -> u32 {
    per_minute(char_count, elapsed_ms)
}

/// Percentage of attempts that were correct; an empty attempt set counts as 100.
pub fn accuracy(correct_count: usize, total_count: usize) -> u32 {
    if total_count == 0 {
        return 100;
    }
    (correct_count as f64 / total_count as f64 * 100.0).round() as u32
}

/// Live speed over the trailing `window_ms` of the log.
///
/// The window is anchored at the last entry's timestamp. Its denominator is the
/// time actually covered by the log, so the estimate does not sag during the
/// first seconds of a session.
pub fn rolling_speed(log: &[TypedEntry], window_ms: u64) -> u32 {
    let (Some(first), Some(last)) = (log.first(), log.last()) else {
        return 0;
    };

    let now = last.timestamp_ms;
    let cutoff = now.saturating_sub(window_ms);
    let correct_in_window = log
        .iter()
        .filter(|entry| entry.is_correct() && entry.timestamp_ms >= cutoff)
        .count();

    let elapsed = window_ms.min(now.saturating_sub(first.timestamp_ms));
    per_minute(correct_in_window, elapsed)
}

/// Pacing stability in 0..=100 from periodic speed samples.
///
/// Inverts the coefficient of variation: a perfectly even pace scores 100 and
/// the score is floored at 0.
pub fn consistency(samples: &[u32]) -> u32 {
    if samples.len() < 2 {
        return 100;
    }

    let values: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
    let (Some(avg), Some(deviation)) = (mean(&values), std_dev(&values)) else {
        return 100;
    };
    if avg == 0.0 {
        return 100;
    }

    ((1.0 - deviation / avg) * 100.0).round().max(0.0) as u32
}
