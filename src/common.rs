use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn write_string_to_file(filename: impl AsRef<Path>, content: &str) -> std::io::Result<()> {
    let mut file = File::create(filename.as_ref())?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn is_truthy(s: &str) -> bool {
    let trimmed_lowercase = s.trim().to_lowercase();
    matches!(trimmed_lowercase.as_str(), "true" | "y" | "yes" | "1")
}

pub fn strip_quotes_and_whitespace(s: &str) -> &str {
    let trimmed = s.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Empty and `null` cells are treated as missing
pub fn non_null(s: &str) -> Option<String> {
    let stripped = strip_quotes_and_whitespace(s);
    if stripped.is_empty() || stripped.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(stripped.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy("true"));
        assert!(is_truthy("True"));
        assert!(is_truthy(" YES "));
        assert!(is_truthy("y"));
        assert!(is_truthy("1"));
        assert!(is_truthy("\ntrue\n"));

        assert!(!is_truthy("false"));
        assert!(!is_truthy("no"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn test_strip_quotes_and_whitespace() {
        assert_eq!(strip_quotes_and_whitespace("  \"abc\" "), "abc");
        assert_eq!(strip_quotes_and_whitespace("'x y'"), "x y");
        assert_eq!(strip_quotes_and_whitespace("\""), "\"");
        assert_eq!(strip_quotes_and_whitespace("plain"), "plain");
    }

    #[test]
    fn test_non_null() {
        assert_eq!(non_null(""), None);
        assert_eq!(non_null("NULL"), None);
        assert_eq!(non_null(" \"\" "), None);
        assert_eq!(non_null("g1"), Some("g1".to_string()));
    }

    #[test]
    fn test_write_string_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_string_to_file(&path, "hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }
}
