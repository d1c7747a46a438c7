//! Number format classification.
//!
//! Both container formats store dates as serial numbers; only the number
//! format attached to a cell tells a date apart from a plain number.

/// Built-in number format ids that render as dates or times
pub fn is_builtin_date_format(id: u16) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// Heuristic for custom number formats: date/time tokens outside quotes and brackets
pub fn is_date_format_string(format: &str) -> bool {
    let mut in_quotes = false;
    let mut in_brackets = false;
    for c in format.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            'd' | 'D' | 'm' | 'M' | 'y' | 'Y' | 'h' | 'H' | 's' | 'S'
                if !in_quotes && !in_brackets =>
            {
                return true;
            },
            _ => {},
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_format_detection() {
        assert!(is_builtin_date_format(14));
        assert!(is_builtin_date_format(22));
        assert!(!is_builtin_date_format(0));
        assert!(is_date_format_string("yyyy-mm-dd"));
        assert!(is_date_format_string("[$-409]h:mm AM/PM"));
        assert!(!is_date_format_string("0.00"));
        assert!(!is_date_format_string("\"days\" 0"));
        assert!(!is_date_format_string("[Red]0.00"));
    }
}
