use std::sync::Arc;

/// A function which formats a world coordinate into a grid annotation label.
pub type LabelFormatter = Arc<dyn Fn(f64) -> String + Send + Sync>;

/// Formats coordinates as plain integers, e.g. `2600000`.
pub fn default_formatter(value: f64) -> String {
    // Avoid printing "-0" for values that round to zero.
    let rounded = value.round();
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.0}")
}

/// Formats coordinates as integers with digit grouping, e.g. `2'600'000`.
///
/// This is the hook for locale-aware formatting: pass the locale's group
/// separator.
pub fn grouped_formatter(separator: char) -> LabelFormatter {
    Arc::new(move |value| group_digits(&default_formatter(value), separator))
}

fn group_digits(integer: &str, separator: char) -> String {
    let (sign, digits) = match integer.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer),
    };
    let mut out = String::with_capacity(integer.len() + digits.len() / 3);
    out.push_str(sign);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_formatter_rounds_to_integer() {
        assert_eq!(default_formatter(2_600_000.4), "2600000");
        assert_eq!(default_formatter(-12.6), "-13");
        assert_eq!(default_formatter(-0.2), "0");
    }

    #[test]
    fn grouped_formatter_inserts_separators() {
        let f = grouped_formatter(',');
        assert_eq!(f(1_234_567.0), "1,234,567");
        assert_eq!(f(-1000.0), "-1,000");
        assert_eq!(f(999.0), "999");
        assert_eq!(f(0.0), "0");
    }
}
