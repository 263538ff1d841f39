//! HTML form payloads and their validation.
//!
//! Each form deserializes from `application/x-www-form-urlencoded` and
//! validates into either a typed input or a set of [`FormErrors`] that the
//! template shows next to the offending fields.

use crate::models::{
    bucket::{BUCKET_NAME_MAX_LEN, BucketInput},
    user::{EMAIL_MAX_LEN, NewUser, USERNAME_MAX_LEN},
};
use serde::Deserialize;
use std::collections::BTreeMap;

pub const REQUIRED: &str = "This field is required.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
pub const DUPLICATE_BUCKET: &str = "Bucket with this Name and Owner already exists.";

const MIN_PASSWORD_LEN: usize = 8;
const MAX_SIMILARITY: f64 = 0.7;

/// A handful of passwords that are refused outright.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty123",
    "qwertyuiop",
    "iloveyou",
    "letmein1",
    "welcome1",
    "admin123",
    "abc12345",
    "football",
    "baseball",
    "sunshine",
];

/// Validation messages keyed by field name, plus form-wide messages.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn field(&self, field: &str) -> Vec<String> {
        self.fields.get(field).cloned().unwrap_or_default()
    }

    pub fn non_field(&self) -> Vec<String> {
        self.non_field.clone()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

fn max_length_message(max: usize, actual: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, actual
    )
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<NewUser, FormErrors> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();
        let email = self.email.trim();

        if username.is_empty() {
            errors.add("username", REQUIRED);
        } else {
            let len = username.chars().count();
            if len > USERNAME_MAX_LEN {
                errors.add("username", max_length_message(USERNAME_MAX_LEN, len));
            }
            if !username
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
            {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }

        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else {
            let len = email.chars().count();
            if len > EMAIL_MAX_LEN {
                errors.add("email", max_length_message(EMAIL_MAX_LEN, len));
            }
            if !looks_like_email(email) {
                errors.add("email", "Enter a valid email address.");
            }
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        }
        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else {
                for problem in password_problems(&self.password2, username, email) {
                    errors.add("password2", problem);
                }
            }
        }

        errors.into_result(|| NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: self.password1.clone(),
        })
    }
}

/// Strength rules applied to a new password.
///
/// Attributes longer than their field allows are not compared; the form
/// already rejects them.
fn password_problems(password: &str, username: &str, email: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    let lowered = password.to_lowercase();

    let username_fits = username.chars().count() <= USERNAME_MAX_LEN;
    let email_fits = email.chars().count() <= EMAIL_MAX_LEN;
    let email_local = email.split('@').next().unwrap_or_default();
    if username_fits && too_similar(&lowered, username) {
        problems.push("The password is too similar to the username.");
    } else if email_fits
        && [email_local, email]
            .iter()
            .any(|part| too_similar(&lowered, part))
    {
        problems.push("The password is too similar to the email address.");
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push("This password is too short. It must contain at least 8 characters.");
    }
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.");
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.");
    }
    problems
}

/// `password` must already be lowercased.
fn too_similar(password: &str, attribute: &str) -> bool {
    let attribute = attribute.to_lowercase();
    let attribute_len = attribute.chars().count();
    if attribute_len == 0 {
        return false;
    }
    let password_len = password.chars().count();
    // Upper bound of `similarity` for these lengths.
    let best =
        (2 * password_len.min(attribute_len)) as f64 / (password_len + attribute_len) as f64;
    best >= MAX_SIMILARITY && similarity(password, &attribute) >= MAX_SIMILARITY
}

/// `2 * longest common substring / total length`, in `0.0..=1.0`.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut longest = 0;
    let mut previous = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut current = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                current[j + 1] = previous[j] + 1;
                longest = longest.max(current[j + 1]);
            }
        }
        previous = current;
    }
    (2 * longest) as f64 / (a.len() + b.len()) as f64
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    /// Only checks presence; credentials are checked by the account service.
    pub fn validate(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::default();
        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(|| (username.to_string(), self.password.clone()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BucketForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl BucketForm {
    pub fn validate(&self) -> Result<BucketInput, FormErrors> {
        let mut errors = FormErrors::default();
        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", REQUIRED);
        } else {
            let len = name.chars().count();
            if len > BUCKET_NAME_MAX_LEN {
                errors.add("name", max_length_message(BUCKET_NAME_MAX_LEN, len));
            }
        }
        errors.into_result(|| BucketInput {
            name: name.to_string(),
            description: self.description.trim().to_string(),
        })
    }
}

/// Accept a post-login redirect target only if it stays on this site.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    let is_local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control);
    is_local.then_some(next)
}
