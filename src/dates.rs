use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Accepts `YYYY-MM-DD`, or a full timestamp whose first ten characters are one.
pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    Date::parse(head, ISO_DATE).ok()
}

/// Blank clears the date; anything else must parse.
pub fn parse_date_field(field: &str, raw: &str) -> Result<Option<Date>, String> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_date(raw)
        .map(Some)
        .ok_or_else(|| format!("La fecha {field} no es válida (use AAAA-MM-DD)"))
}

pub fn format_date(date: Date) -> String {
    date.format(ISO_DATE).unwrap_or_default()
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Serde adapter for optional `YYYY-MM-DD` fields; null or blank values become `None`.
pub mod iso_date_opt {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(value: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_str(&super::format_date(*d)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_date(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date {raw:?}, expected YYYY-MM-DD"))),
        }
    }
}
