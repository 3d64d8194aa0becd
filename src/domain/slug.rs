//! Group slug derivation and validation.
//!
//! Groups are addressed by a URL slug. Administrators may type one explicitly;
//! otherwise it is derived from the title the way the admin form
//! prepopulates it. Non-ASCII titles are transliterated by the `slug` crate.

use slug::slugify;
use thiserror::Error;

/// Upper bound on slug length, matching the `groups.slug` column.
pub const MAX_SLUG_LEN: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("slug `{slug}` may only contain letters, numbers, underscores or hyphens")]
    InvalidCharacters { slug: String },
    #[error("slug `{slug}` exceeds {MAX_SLUG_LEN} characters")]
    TooLong { slug: String },
}

/// Derive a slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(truncate(candidate))
}

/// Check an explicitly supplied slug.
pub fn validate_slug(slug: &str) -> Result<(), SlugError> {
    if slug.is_empty() {
        return Err(SlugError::EmptyInput);
    }
    if slug.chars().count() > MAX_SLUG_LEN {
        return Err(SlugError::TooLong {
            slug: slug.to_string(),
        });
    }
    if !slug
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(SlugError::InvalidCharacters {
            slug: slug.to_string(),
        });
    }
    Ok(())
}

/// The slug a new group is stored under: the explicit one when given,
/// otherwise one derived from `title`.
pub fn resolve_slug(explicit: Option<String>, title: &str) -> Result<String, SlugError> {
    match explicit {
        Some(slug) => validate_slug(&slug).map(|()| slug),
        None => derive_slug(title),
    }
}

fn truncate(slug: String) -> String {
    if slug.len() <= MAX_SLUG_LEN {
        return slug;
    }
    // slugify output is ASCII, so byte slicing is safe.
    slug[..MAX_SLUG_LEN].trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_slug_lowercases_and_hyphenates() {
        let slug = derive_slug("Cats & Dogs Club").expect("slug");
        assert_eq!(slug, "cats-dogs-club");
    }

    #[test]
    fn derive_slug_rejects_blank_input() {
        assert_eq!(derive_slug("   "), Err(SlugError::EmptyInput));
    }

    #[test]
    fn derive_slug_truncates_long_titles() {
        let title = "word ".repeat(30);
        let slug = derive_slug(&title).expect("slug");
        assert!(slug.len() <= MAX_SLUG_LEN);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn validate_slug_accepts_underscores_and_hyphens() {
        assert!(validate_slug("test_group-1").is_ok());
    }

    #[test]
    fn resolve_slug_prefers_explicit_value() {
        assert_eq!(
            resolve_slug(Some("kittens".into()), "Cats"),
            Ok("kittens".to_string())
        );
        assert_eq!(resolve_slug(None, "Cats"), Ok("cats".to_string()));
    }

    #[test]
    fn validate_slug_rejects_spaces() {
        assert!(matches!(
            validate_slug("test group"),
            Err(SlugError::InvalidCharacters { .. })
        ));
    }
}
