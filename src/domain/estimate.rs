/// Lower bound of any estimate, in seconds.
pub const MIN_ESTIMATE_SECS: u32 = 10;
/// Upper bound of any estimate, in seconds.
pub const MAX_ESTIMATE_SECS: u32 = 120;
/// Every this many prompt characters add one second of processing.
const CHARS_PER_EXTRA_SEC: usize = 25;

/// Expected processing time for a track, in seconds.
///
/// Half a second per second of requested audio, plus a second per
/// [`CHARS_PER_EXTRA_SEC`] prompt characters, clamped to
/// [`MIN_ESTIMATE_SECS`]..=[`MAX_ESTIMATE_SECS`]. Non-decreasing in both
/// arguments.
pub fn estimate(requested_duration: u32, prompt: &str) -> u32 {
    let audio_secs = requested_duration.div_ceil(2);
    let text_secs = u32::try_from(prompt.chars().count() / CHARS_PER_EXTRA_SEC).unwrap_or(u32::MAX);

    audio_secs
        .saturating_add(text_secs)
        .clamp(MIN_ESTIMATE_SECS, MAX_ESTIMATE_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_examples() {
        assert_eq!(estimate(5, "x"), MIN_ESTIMATE_SECS);
        assert_eq!(estimate(60, "relaxing piano"), 30);
        assert_eq!(estimate(61, "relaxing piano"), 31);
        assert_eq!(estimate(60, &"a".repeat(50)), 32);
        assert_eq!(estimate(300, "x"), MAX_ESTIMATE_SECS);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let prompt = "epic orchestral soundtrack with choir";
        assert_eq!(estimate(120, prompt), estimate(120, prompt));
    }

    #[test]
    fn test_estimate_monotonic_in_duration() {
        assert!(estimate(5, "x") <= estimate(300, "x"));

        let long_prompt = "word ".repeat(100);
        for prompt in ["x", "lofi hip hop", long_prompt.as_str()] {
            let mut previous = 0;
            for duration in 5..=300 {
                let current = estimate(duration, prompt);
                assert!(
                    current >= previous,
                    "estimate dropped from {previous} to {current} at duration {duration}"
                );
                previous = current;
            }
        }
    }

    #[test]
    fn test_estimate_monotonic_in_prompt_length() {
        for duration in [5, 30, 60, 200, 300] {
            let mut previous = 0;
            for len in 1..=500 {
                let current = estimate(duration, &"b".repeat(len));
                assert!(current >= previous);
                previous = current;
            }
        }
    }

    #[test]
    fn test_estimate_is_positive() {
        assert!(estimate(0, "") > 0);
    }
}
