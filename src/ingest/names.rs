//! Local file naming for mirrored drive items.

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

static INVALID_CHARS: OnceLock<Regex> = OnceLock::new();

/// Items the drive lists but never lets us download.
const PROTECTED_ITEMS: [&str; 2] = ["personal vault", "vault"];

/// Strip characters that are invalid in file names on common platforms.
pub fn safe_name(name: &str) -> String {
    let re = INVALID_CHARS.get_or_init(|| {
        Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("file name regex must compile")
    });
    let cleaned = re.replace_all(name, "");
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitize every segment of a `/`-separated relative directory.
pub fn safe_relative_dir(relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|segment| !segment.trim().is_empty())
        .map(safe_name)
        .collect()
}

pub fn is_protected(name: &str) -> bool {
    PROTECTED_ITEMS.contains(&name.trim().to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_name_strips_reserved_characters() {
        assert_eq!(safe_name(r#"a<b>c:d"e/f\g|h?i*j.pdf"#), "abcdefghij.pdf");
        assert_eq!(safe_name("  report.docx  "), "report.docx");
    }

    #[test]
    fn safe_name_falls_back_to_untitled() {
        assert_eq!(safe_name("???"), "untitled");
        assert_eq!(safe_name(""), "untitled");
        assert_eq!(safe_name(".."), "untitled");
    }

    #[test]
    fn relative_dir_keeps_structure() {
        assert_eq!(
            safe_relative_dir("Specs/Q1: draft"),
            PathBuf::from("Specs").join("Q1 draft")
        );
        assert_eq!(safe_relative_dir("../x"), PathBuf::from("untitled").join("x"));
    }

    #[test]
    fn vault_items_are_protected() {
        assert!(is_protected("Personal Vault"));
        assert!(is_protected("vault"));
        assert!(!is_protected("vaults.pdf"));
    }
}
