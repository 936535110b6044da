use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{NaiveDateTime, Utc};
use thiserror::Error;

/// Which required-field subset `validate` checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Create,
    Update,
    Login,
}

/// First failing rule, reported as-is. Validation never aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("invalid email format")]
    InvalidEmail,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: u32,
    pub nickname: String,
    pub email: String,
    /// Plaintext between prepare and persistence; the adapter hashes it
    /// before any write. Persisted rows only ever hold the hash.
    pub password: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    /// Normalizes raw request fields into an entity ready for validation:
    /// trims and HTML-escapes the string fields, zeroes the id and stamps
    /// both timestamps. The password is carried through untouched.
    pub fn prepare(nickname: &str, email: &str, password: &str) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: 0,
            nickname: escape(nickname.trim()),
            email: escape(email.trim()),
            password: password.to_owned(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks required fields in a fixed order, returning the first
    /// violation: nickname, password, email, email format. Login skips the
    /// nickname check.
    pub fn validate(&self, mode: ValidationMode) -> Result<(), ValidationError> {
        if mode != ValidationMode::Login && self.nickname.is_empty() {
            return Err(ValidationError::Required("nickname"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::Required("password"));
        }
        if self.email.is_empty() {
            return Err(ValidationError::Required("email"));
        }
        if !email_format_ok(&self.email) {
            return Err(ValidationError::InvalidEmail);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub id: u64,
    pub title: String,
    pub content: String,
    /// Looked up and attached on create/read/update, never persisted.
    pub author: Option<User>,
    pub author_id: u32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Event {
    pub fn prepare(title: &str, content: &str, author_id: u32) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: 0,
            title: escape(title.trim()),
            content: escape(content.trim()),
            author: None,
            author_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.is_empty() {
            return Err(ValidationError::Required("title"));
        }
        if self.content.is_empty() {
            return Err(ValidationError::Required("content"));
        }
        if self.author_id < 1 {
            return Err(ValidationError::Required("author"));
        }
        Ok(())
    }
}

/// One-way, salted, default-cost Argon2id hash in PHC string form.
pub fn hash_password(plain: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(plain.as_bytes(), &salt)?
        .to_string())
}

/// Inverse predicate of `hash_password`. A malformed hash is simply a
/// non-match, not an error.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Escapes the five HTML-special characters, so stored values are safe to
/// render verbatim.
fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Structural email check: one `@` splitting non-empty local and domain
/// parts, no whitespace, domain carrying an alphabetic TLD of length >= 2.
fn email_format_ok(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => {
            !host.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}
