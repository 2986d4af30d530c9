use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;

const CSRF_COOKIE: &str = "csrftoken";

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// CSRF token for state-changing calls made outside the bearer session:
/// the value embedded in the page wins, otherwise the `csrftoken` cookie.
pub fn csrf_token(page_value: Option<&str>, cookie_header: &str) -> Option<String> {
    if let Some(v) = page_value.map(str::trim).filter(|v| !v.is_empty()) {
        return Some(v.to_string());
    }
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(CSRF_COOKIE)?.strip_prefix('='))
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
}

/// Local wall-clock `HH:MM` for a message timestamp.
pub fn format_time(at: &DateTime<Utc>) -> String {
    format_time_in(at, &Local)
}

pub fn format_time_in<Tz>(at: &DateTime<Utc>, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(zone).format("%H:%M").to_string()
}
