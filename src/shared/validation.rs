/**
 * Request Validation
 *
 * Field rules for signup, posts, search and pagination. Every check runs
 * before any storage call is dispatched, so a rejected request never reaches
 * the datastore.
 *
 * # Rules
 *
 * - Name: 1-15 characters, ASCII letters, digits and underscores
 * - Email: at most 254 bytes, `local@domain` with dot-separated labels
 * - Password: at least 8 bytes with an uppercase letter, a lowercase letter,
 *   a digit and a punctuation or symbol character (spaces are allowed)
 * - Post: title and body not blank, at most 50 and 5000 characters
 */
use chrono::{DateTime, Utc};
use unicode_categories::UnicodeCategories;
use uuid::Uuid;

use crate::shared::error::SharedError;

const MAX_NAME_LEN: usize = 15;
const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_TITLE_CHARS: usize = 50;
const MAX_BODY_CHARS: usize = 5000;
const MAX_LABEL_LEN: usize = 63;

/// Validate a signup request's fields in the order the client sees them
pub fn validate_signup(name: &str, email: &str, password: &str) -> Result<(), SharedError> {
    if name.trim().is_empty() || email.trim().is_empty() || password.trim().is_empty() {
        return Err(SharedError::validation(
            "form",
            "invalid name, email, and/or password",
        ));
    }

    if !is_valid_name(name) {
        return Err(SharedError::validation("name", "invalid name"));
    }

    if !is_valid_email(email) {
        return Err(SharedError::validation("email", "invalid email"));
    }

    if !is_valid_password(password) {
        return Err(SharedError::validation("password", "invalid password"));
    }

    Ok(())
}

/// Validate a post's title and body
///
/// Lengths are counted in characters rather than bytes.
pub fn validate_post(title: &str, body: &str) -> Result<(), SharedError> {
    let blank = title.trim().is_empty() || body.trim().is_empty();
    let too_long =
        title.chars().count() > MAX_TITLE_CHARS || body.chars().count() > MAX_BODY_CHARS;

    if blank || too_long {
        return Err(SharedError::validation("post", "invalid title and/or body"));
    }

    Ok(())
}

/// Validate and return a search query
pub fn validate_search(query: Option<&str>) -> Result<&str, SharedError> {
    match query {
        Some(q) if !q.trim().is_empty() => Ok(q),
        _ => Err(SharedError::validation("q", "invalid search query")),
    }
}

/// Parse a `prev` pagination cursor
///
/// A missing or blank cursor starts from the most recent entry.
pub fn parse_cursor(prev: Option<&str>) -> Result<DateTime<Utc>, SharedError> {
    match prev {
        Some(raw) if !raw.trim().is_empty() => DateTime::parse_from_rfc3339(raw.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| SharedError::cursor(raw)),
        _ => Ok(Utc::now()),
    }
}

/// Parse a resource ID taken from the URL path
pub fn parse_id(raw: &str, field: &'static str) -> Result<Uuid, SharedError> {
    Uuid::parse_str(raw.trim()).map_err(|_| SharedError::validation(field, format!("invalid {field}")))
}

/// Names are 1-15 ASCII letters, digits or underscores
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Email addresses: `local@domain`, at most 254 bytes
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    let local_ok = !local.is_empty() && local.chars().all(is_local_char);
    local_ok && !domain.is_empty() && domain.split('.').all(is_valid_label)
}

fn is_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || ".!#$%&'*+/=?^_`{|}~-".contains(c)
}

fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            label.len() <= MAX_LABEL_LEN
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        }
        _ => false,
    }
}

/// Passwords need length plus four character classes
pub fn is_valid_password(password: &str) -> bool {
    let (mut upper, mut lower, mut number, mut special) = (false, false, false, false);

    for c in password.chars() {
        if c.is_uppercase() {
            upper = true;
        } else if c.is_lowercase() {
            lower = true;
        } else if c.is_numeric() {
            number = true;
        } else if c.is_punctuation() || c.is_symbol() {
            special = true;
        }
    }

    password.len() >= MIN_PASSWORD_LEN && upper && lower && number && special
}
