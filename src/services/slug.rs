//! URL slugs for content rows.
//!
//! Slugs keep letters from any script so Arabic titles stay readable in the
//! address bar; everything else collapses into single hyphens.

/// Longest slug stored, in characters.
pub const MAX_SLUG_CHARS: usize = 120;

/// Build a slug from a title.
///
/// Returns an empty string when the title has no letters or digits.
pub fn generate_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    truncate_slug(&slug)
}

fn truncate_slug(slug: &str) -> String {
    if slug.chars().count() <= MAX_SLUG_CHARS {
        return slug.to_string();
    }
    let cut: String = slug.chars().take(MAX_SLUG_CHARS).collect();
    cut.trim_end_matches('-').to_string()
}

/// The `n`-th candidate for a base slug: `base`, `base-2`, `base-3`, ...
pub fn candidate(base: &str, n: u32) -> String {
    if n <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ascii_title() {
        assert_eq!(generate_slug("The Seerah of the Prophet"), "the-seerah-of-the-prophet");
        assert_eq!(generate_slug("  Fiqh 101: Salah!  "), "fiqh-101-salah");
        assert_eq!(generate_slug("a__b--c"), "a-b-c");
    }

    #[test]
    fn test_arabic_title_keeps_letters() {
        assert_eq!(generate_slug("تفسير سورة الفاتحة"), "تفسير-سورة-الفاتحة");
        // Arabic question mark is punctuation
        assert_eq!(generate_slug("ما هو الإيمان؟"), "ما-هو-الإيمان");
    }

    #[test]
    fn test_no_letters_gives_empty() {
        assert_eq!(generate_slug("!!! ???"), "");
        assert_eq!(generate_slug(""), "");
    }

    #[test]
    fn test_long_title_is_truncated() {
        let slug = generate_slug(&"word ".repeat(60));
        assert!(slug.chars().count() <= MAX_SLUG_CHARS);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_candidates() {
        assert_eq!(candidate("zakat", 1), "zakat");
        assert_eq!(candidate("zakat", 2), "zakat-2");
        assert_eq!(candidate("zakat", 10), "zakat-10");
    }

    proptest! {
        #[test]
        fn slug_has_no_edge_or_double_hyphens(title in "\\PC{0,80}") {
            let slug = generate_slug(&title);
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(slug.chars().all(|c| c == '-' || c.is_alphanumeric()));
        }

        #[test]
        fn slug_is_idempotent(title in "[a-zA-Z0-9 _.,!-]{0,60}") {
            let once = generate_slug(&title);
            prop_assert_eq!(generate_slug(&once), once.clone());
        }
    }
}
