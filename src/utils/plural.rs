//! Pluralization helpers for log lines.

/// `""` for one, `"s"` otherwise.
#[inline]
pub fn plural_s(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// `plural_count(3, "module")` -> `"3 modules"`
#[inline]
pub fn plural_count(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, plural_s(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural_count() {
        assert_eq!(plural_count(0, "chunk"), "0 chunks");
        assert_eq!(plural_count(1, "chunk"), "1 chunk");
        assert_eq!(plural_count(2, "error"), "2 errors");
    }
}
