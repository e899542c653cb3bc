//! Client-side input sanitization and validation.
//!
//! These filters improve what users see and what gets sent; they are not a
//! security boundary. The API must still validate every field, use
//! parameterized queries and encode output for its context. Regex stripping
//! cannot stand in for any of that.
//!
//! Every function is total: bad input yields an empty string, `None` or
//! `false`, never a panic.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default limit for [`validate_text`].
pub const DEFAULT_TEXT_MAX_LEN: usize = 500;
pub const PHONE_MAX_LEN: usize = 20;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;

static DANGEROUS_SQL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)['";\\]|--|/\*|\*/|union\s+select|drop\s+table|delete\s+from|insert\s+into|update\s+set|exec\s*\("#,
    )
    .expect("valid SQL pattern")
});

static DANGEROUS_XSS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<[^>]*>|javascript:|on\w+\s*=").expect("valid XSS pattern")
});

static OUTSIDE_ALLOW_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-zA-Z0-9\sáéíóúÁÉÍÓÚñÑüÜ.,!?@#%&()_-]").expect("valid allow-list pattern")
});

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

static EMAIL_STRIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['";\\<>]"#).expect("valid email strip pattern"));

static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{4})-([0-9]{2})-([0-9]{2})$").expect("valid date pattern")
});

/// Strip SQL and markup sequences from free text.
///
/// With `allow_special_chars == false` the result is further restricted to
/// letters (including Spanish accents), digits, whitespace and `.,!?@#%&()-_`.
///
/// Removing one sequence can splice together another (`-'-` becomes `--`),
/// so the filters run until nothing changes; the result is a fixpoint and
/// sanitizing it again returns it unchanged.
#[must_use]
pub fn sanitize_input(input: &str, allow_special_chars: bool) -> String {
    let mut current = input.to_owned();
    loop {
        let next = sanitize_pass(&current, allow_special_chars);
        // Each pass only removes characters, so a change always shrinks the string.
        if next == current {
            return next;
        }
        current = next;
    }
}

fn sanitize_pass(input: &str, allow_special_chars: bool) -> String {
    let without_sql = DANGEROUS_SQL.replace_all(input, "");
    let without_markup = DANGEROUS_XSS.replace_all(&without_sql, "");
    let trimmed = without_markup.trim();
    if allow_special_chars {
        return trimmed.to_owned();
    }
    OUTSIDE_ALLOW_LIST.replace_all(trimmed, "").trim().to_owned()
}

/// Normalize an email address: trimmed, lower-cased, quote and angle
/// bracket characters removed. `None` if it is not shaped like `a@b.c`.
#[must_use]
pub fn validate_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_lowercase();
    if !EMAIL_SHAPE.is_match(&normalized) {
        return None;
    }
    let stripped = EMAIL_STRIP.replace_all(&normalized, "");
    EMAIL_SHAPE.is_match(&stripped).then(|| stripped.into_owned())
}

/// Parse a finite number. Surrounding whitespace is ignored; `NaN` and
/// infinities are rejected.
#[must_use]
pub fn validate_number(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Permissively sanitize free text (names, descriptions) and cut it to
/// `max_len` characters.
#[must_use]
pub fn validate_text(input: &str, max_len: usize) -> String {
    let sanitized = sanitize_input(input, true);
    match sanitized.char_indices().nth(max_len) {
        Some((cut, _)) => sanitized[..cut].to_owned(),
        None => sanitized,
    }
}

/// Accept a `YYYY-MM-DD` calendar date.
#[must_use]
pub fn validate_date(input: &str) -> Option<String> {
    let caps = DATE_SHAPE.captures(input)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u8 = caps[2].parse().ok()?;
    let day: u8 = caps[3].parse().ok()?;
    let month = time::Month::try_from(month).ok()?;
    time::Date::from_calendar_date(year, month, day).ok()?;
    Some(input.to_owned())
}

/// Keep digits, spaces and `+-()`, at most [`PHONE_MAX_LEN`] characters.
#[must_use]
pub fn validate_phone(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '+' | '-' | '(' | ')'))
        .take(PHONE_MAX_LEN)
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Length-only password check; content rules belong to the server.
#[must_use]
pub fn is_acceptable_password(password: &str) -> bool {
    (PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&password.chars().count())
}

/// `true` if the input contains none of the sequences [`sanitize_input`]
/// would strip for SQL or markup reasons.
#[must_use]
pub fn is_input_safe(input: &str) -> bool {
    !DANGEROUS_SQL.is_match(input) && !DANGEROUS_XSS.is_match(input)
}
