//! Submission validation for posts and comments.
//!
//! Validation yields field-level messages; nothing is saved unless every
//! field is clean.

use std::collections::BTreeMap;

use thiserror::Error;

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const UNKNOWN_GROUP_MESSAGE: &str = "Select a valid choice. That choice is not one of the available choices.";
pub const BLANK_IMAGE_MESSAGE: &str = "The submitted image reference is empty.";

/// Field name → messages, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("submission has errors in: {}", self.fields().join(", "))]
pub struct FormErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.errors.keys().map(String::as_str).collect()
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }
}

/// Raw post submission as received from the actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub text: String,
    pub group: Option<i64>,
    pub image: Option<String>,
}

/// A post submission that passed the field checks which need no storage lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPost {
    pub text: String,
    pub group: Option<i64>,
    pub image: Option<String>,
}

impl PostForm {
    /// Field-local checks. Group existence is verified by the caller against the store.
    pub fn clean(self) -> Result<CleanPost, FormErrors> {
        let mut errors = FormErrors::new();

        if self.text.trim().is_empty() {
            errors.add("text", REQUIRED_MESSAGE);
        }

        let image = match self.image {
            Some(reference) if reference.trim().is_empty() => {
                errors.add("image", BLANK_IMAGE_MESSAGE);
                None
            }
            other => other,
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CleanPost {
            text: self.text,
            group: self.group,
            image,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn clean(self) -> Result<String, FormErrors> {
        if self.text.trim().is_empty() {
            let mut errors = FormErrors::new();
            errors.add("text", REQUIRED_MESSAGE);
            return Err(errors);
        }
        Ok(self.text)
    }
}

pub const USERNAME_MAX_LEN: usize = 150;

/// First path segments taken by fixed routes; a user named like one would
/// have an unreachable profile.
const RESERVED_USERNAMES: [&str; 5] = ["_health", "auth", "follow", "group", "new"];

/// Letters, digits and `@ . + - _`, at most [`USERNAME_MAX_LEN`] characters.
pub fn is_valid_username(username: &str) -> bool {
    let length = username.chars().count();
    (1..=USERNAME_MAX_LEN).contains(&length)
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
        && !RESERVED_USERNAMES.contains(&username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_follow_the_account_rules() {
        assert!(is_valid_username("leo"));
        assert!(is_valid_username("mia.k+blog@example"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("a/b"));
        assert!(!is_valid_username("new"));
        assert!(!is_valid_username(&"x".repeat(USERNAME_MAX_LEN + 1)));
    }

    #[test]
    fn blank_post_text_is_required() {
        let errors = PostForm {
            text: "   ".to_string(),
            ..Default::default()
        }
        .clean()
        .expect_err("blank text must fail");

        assert_eq!(errors.get("text"), Some(&[REQUIRED_MESSAGE.to_string()][..]));
        assert_eq!(errors.fields(), vec!["text"]);
    }

    #[test]
    fn blank_image_reference_is_reported_alongside_text() {
        let errors = PostForm {
            text: String::new(),
            group: None,
            image: Some(" ".to_string()),
        }
        .clean()
        .expect_err("should fail");

        assert_eq!(errors.fields(), vec!["image", "text"]);
    }

    #[test]
    fn clean_post_keeps_fields() {
        let clean = PostForm {
            text: "Hello".to_string(),
            group: Some(3),
            image: Some("posts/cat.png".to_string()),
        }
        .clean()
        .expect("valid form");

        assert_eq!(clean.group, Some(3));
        assert_eq!(clean.image.as_deref(), Some("posts/cat.png"));
    }

    #[test]
    fn comment_requires_text() {
        assert!(CommentForm::default().clean().is_err());
        assert_eq!(
            CommentForm {
                text: "Nice".to_string()
            }
            .clean()
            .expect("valid"),
            "Nice"
        );
    }
}
