//! Human-friendly counters for profile headers.

/// Abbreviate a count: `999`, `1.5K`, `2.0M`, `1.2B`.
pub fn abbreviate(count: u64) -> String {
    const BILLION: u64 = 1_000_000_000;
    const MILLION: u64 = 1_000_000;
    const THOUSAND: u64 = 1_000;

    if count >= BILLION {
        format!("{:.1}B", count as f64 / BILLION as f64)
    } else if count >= MILLION {
        format!("{:.1}M", count as f64 / MILLION as f64)
    } else if count >= THOUSAND {
        format!("{:.1}K", count as f64 / THOUSAND as f64)
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate(0), "0");
        assert_eq!(abbreviate(999), "999");
        assert_eq!(abbreviate(1_000), "1.0K");
        assert_eq!(abbreviate(1_540), "1.5K");
        assert_eq!(abbreviate(2_000_000), "2.0M");
        assert_eq!(abbreviate(1_250_000_000), "1.2B");
    }
}
