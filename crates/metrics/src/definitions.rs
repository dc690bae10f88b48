//! Metric name and label definitions.

/// Arbitration metrics
pub mod arbiter {
    /// Arbitration attempts started, labelled by `variant`
    pub const ATTEMPTS_TOTAL: &str = "emojilike_arbiter_attempts_total";
    /// Resolved attempts, labelled by `verdict` and `reason`
    pub const VERDICTS_TOTAL: &str = "emojilike_arbiter_verdicts_total";
    /// Annotation channel failures, labelled by `op` (fetch, claim, feedback)
    pub const CHANNEL_ERRORS_TOTAL: &str = "emojilike_arbiter_channel_errors_total";
    /// Wall time from precheck to verdict
    pub const DURATION_SECONDS: &str = "emojilike_arbiter_duration_seconds";
}

/// OneBot HTTP client metrics
pub mod onebot {
    /// Actions sent to the OneBot endpoint, labelled by `action`
    pub const REQUESTS_TOTAL: &str = "emojilike_onebot_requests_total";
    /// Actions that failed at transport or returned a failed envelope
    pub const REQUEST_ERRORS_TOTAL: &str = "emojilike_onebot_request_errors_total";
}

/// Common label keys
pub mod labels {
    pub const VARIANT: &str = "variant";
    pub const VERDICT: &str = "verdict";
    pub const REASON: &str = "reason";
    pub const OP: &str = "op";
    pub const ACTION: &str = "action";
}

/// Standard histogram buckets
pub mod buckets {
    use once_cell::sync::Lazy;

    /// Arbitration duration buckets (in seconds).
    /// One claim window is 1-1.5s; each backup turn adds 0.7s.
    pub static ARBITRATION_DURATION: Lazy<Vec<f64>> = Lazy::new(|| {
        vec![
            0.01, 0.1, 0.5, 1.0, 1.5, 1.75, 2.5, 3.25, 4.0, 5.0, 7.5, 10.0, 20.0,
        ]
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_share_crate_prefix() {
        for name in [
            arbiter::ATTEMPTS_TOTAL,
            arbiter::VERDICTS_TOTAL,
            arbiter::CHANNEL_ERRORS_TOTAL,
            arbiter::DURATION_SECONDS,
            onebot::REQUESTS_TOTAL,
            onebot::REQUEST_ERRORS_TOTAL,
        ] {
            assert!(name.starts_with("emojilike_"), "{name}");
        }
    }

    #[test]
    fn buckets_are_sorted() {
        let b = &*buckets::ARBITRATION_DURATION;
        assert!(b.windows(2).all(|w| w[0] < w[1]));
    }
}
