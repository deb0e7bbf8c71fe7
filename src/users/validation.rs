use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// A single field constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Length bounds plus the patterns one field must match.
///
/// `{limit}` in a message is replaced with the bound that was violated.
pub struct FieldRule {
    pub field: &'static str,
    pub min_len: usize,
    pub min_message: &'static str,
    pub max_len: Option<(usize, &'static str)>,
    pub patterns: Vec<&'static Regex>,
    pub blank_message: &'static str,
    pub pattern_message: &'static str,
}

impl FieldRule {
    pub fn check(&self, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::new(self.field, self.blank_message));
        }

        let len = value.chars().count();
        if len < self.min_len {
            return Err(self.limit_error(self.min_message, self.min_len));
        }
        if let Some((max, message)) = self.max_len {
            if len > max {
                return Err(self.limit_error(message, max));
            }
        }

        if !self.patterns.iter().all(|re| re.is_match(value)) {
            return Err(ValidationError::new(self.field, self.pattern_message));
        }
        Ok(())
    }

    fn limit_error(&self, template: &str, limit: usize) -> ValidationError {
        ValidationError::new(self.field, template.replace("{limit}", &limit.to_string()))
    }
}

lazy_static! {
    // HTML5 form email syntax: dotted domain labels of letters, digits and inner hyphens.
    static ref EMAIL_RE: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_\x60{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$"
    )
    .unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
    // No lookahead in `regex`: one pattern per required class, plus the charset.
    static ref PASSWORD_CHARSET_RE: Regex = Regex::new(r"^[A-Za-z0-9@$!%*?&]+$").unwrap();
    static ref PASSWORD_LOWER_RE: Regex = Regex::new(r"[a-z]").unwrap();
    static ref PASSWORD_UPPER_RE: Regex = Regex::new(r"[A-Z]").unwrap();
    static ref PASSWORD_DIGIT_RE: Regex = Regex::new(r"[0-9]").unwrap();
    static ref PASSWORD_SPECIAL_RE: Regex = Regex::new(r"[@$!%*?&]").unwrap();

    pub static ref EMAIL_RULE: FieldRule = FieldRule {
        field: "email",
        min_len: 6,
        min_message: "Your email address must contain at least {limit} characters.",
        max_len: Some((255, "Your email address cannot contain more than {limit} characters.")),
        patterns: vec![&*EMAIL_RE],
        blank_message: "An email address is required.",
        pattern_message: "Please enter a valid email address.",
    };

    pub static ref USERNAME_RULE: FieldRule = FieldRule {
        field: "username",
        min_len: 3,
        min_message: "Your username must contain at least {limit} characters.",
        max_len: Some((50, "Your username cannot contain more than {limit} characters.")),
        patterns: vec![&*USERNAME_RE],
        blank_message: "A username is required.",
        pattern_message: "Your username may only contain letters, digits, dashes (-) and underscores (_).",
    };

    pub static ref PASSWORD_RULE: FieldRule = FieldRule {
        field: "plain_password",
        min_len: 8,
        min_message: "The password must contain at least {limit} characters.",
        max_len: None,
        patterns: vec![
            &*PASSWORD_CHARSET_RE,
            &*PASSWORD_LOWER_RE,
            &*PASSWORD_UPPER_RE,
            &*PASSWORD_DIGIT_RE,
            &*PASSWORD_SPECIAL_RE,
        ],
        blank_message: "A password is required.",
        pattern_message: "The password must contain an uppercase letter, a lowercase letter, a digit and one of @$!%*?&.",
    };
}

pub fn validate_email(value: &str) -> Result<(), ValidationError> {
    EMAIL_RULE.check(value)
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    USERNAME_RULE.check(value)
}

pub fn validate_password(value: &str) -> Result<(), ValidationError> {
    PASSWORD_RULE.check(value)
}
