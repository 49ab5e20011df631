use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref RUT_RE: Regex = Regex::new(r"^\d{7,8}[0-9K]$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Comparison key for emails: surrounding blanks dropped, lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check character for a RUT body: weighted sum over the reversed digits,
/// weights cycling 2..=7, `11 - sum % 11` with 11 → `0` and 10 → `K`.
pub fn compute_check_digit(body: &str) -> Option<char> {
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut sum = 0u32;
    let mut weight = 2u32;
    for b in body.bytes().rev() {
        sum += u32::from(b - b'0') * weight;
        weight = if weight == 7 { 2 } else { weight + 1 };
    }
    Some(match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        d => char::from_digit(d, 10)?,
    })
}

/// Canonical comparison key: no dots or dash, uppercase check character.
pub fn normalize_rut(rut: &str) -> String {
    rut.trim()
        .chars()
        .filter(|c| *c != '.' && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

/// Validates a Chilean RUT in any of `12345678-5`, `12.345.678-5`, `123456785`.
pub fn is_valid_rut(rut: &str) -> bool {
    let clean = normalize_rut(rut);
    if !RUT_RE.is_match(&clean) {
        return false;
    }
    let (body, dv) = clean.split_at(clean.len() - 1);
    compute_check_digit(body).map(|c| c.to_string()) == Some(dv.to_string())
}

/// `123456785` → `12.345.678-5`; input that is too short comes back cleaned.
pub fn format_rut(rut: &str) -> String {
    let clean: String = rut
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'k' || *c == 'K')
        .collect::<String>()
        .to_uppercase();
    if clean.len() < 2 {
        return clean;
    }
    let (body, dv) = clean.split_at(clean.len() - 1);
    let mut grouped = String::new();
    for (i, ch) in body.chars().enumerate() {
        if i > 0 && (body.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    format!("{grouped}-{dv}")
}

/// Name of the first blank field, if any.
pub fn first_missing<'a>(fields: &[(&'a str, Option<&str>)]) -> Option<&'a str> {
    fields
        .iter()
        .find(|(_, v)| v.map_or(true, |s| s.trim().is_empty()))
        .map(|(name, _)| *name)
}
