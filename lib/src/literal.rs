//! Lexical forms of the XSD datatypes the accessors support.
//!
//! Serialisation always produces the canonical form, or `None` for values
//! the datatype has no lexical form for (`NaN`, infinities). Deserialisation is
//! lenient where XSD allows several spellings (`"1"` and `"true"` are both
//! true) and returns `None` for malformed input instead of failing.

use crate::consts::{XSD_BOOLEAN, XSD_DATE, XSD_DATE_TIME, XSD_DECIMAL, XSD_INTEGER, XSD_TIME};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use oxigraph::model::NamedNodeRef;

/// A Rust type stored as a typed literal.
pub trait XsdLiteral: Sized + PartialEq {
    const DATATYPE: NamedNodeRef<'static>;

    fn serialize(&self) -> Option<String>;

    fn deserialize(lexical: &str) -> Option<Self>;
}

impl XsdLiteral for bool {
    const DATATYPE: NamedNodeRef<'static> = XSD_BOOLEAN;

    fn serialize(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn deserialize(lexical: &str) -> Option<Self> {
        match lexical.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

impl XsdLiteral for DateTime<Utc> {
    const DATATYPE: NamedNodeRef<'static> = XSD_DATE_TIME;

    fn serialize(&self) -> Option<String> {
        Some(self.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    fn deserialize(lexical: &str) -> Option<Self> {
        let lexical = lexical.trim();
        if let Ok(datetime) = DateTime::parse_from_rfc3339(lexical) {
            return Some(datetime.with_timezone(&Utc));
        }
        // no timezone: read as UTC
        NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }
}

impl XsdLiteral for NaiveDate {
    const DATATYPE: NamedNodeRef<'static> = XSD_DATE;

    fn serialize(&self) -> Option<String> {
        Some(self.format("%Y-%m-%d").to_string())
    }

    fn deserialize(lexical: &str) -> Option<Self> {
        NaiveDate::parse_from_str(strip_timezone(lexical.trim()), "%Y-%m-%d").ok()
    }
}

impl XsdLiteral for NaiveTime {
    const DATATYPE: NamedNodeRef<'static> = XSD_TIME;

    fn serialize(&self) -> Option<String> {
        Some(self.format("%H:%M:%S%.f").to_string())
    }

    fn deserialize(lexical: &str) -> Option<Self> {
        NaiveTime::parse_from_str(strip_timezone(lexical.trim()), "%H:%M:%S%.f").ok()
    }
}

impl XsdLiteral for f64 {
    const DATATYPE: NamedNodeRef<'static> = XSD_DECIMAL;

    fn serialize(&self) -> Option<String> {
        self.is_finite().then(|| self.to_string())
    }

    fn deserialize(lexical: &str) -> Option<Self> {
        lexical.trim().parse::<f64>().ok().filter(|value| value.is_finite())
    }
}

impl XsdLiteral for i64 {
    const DATATYPE: NamedNodeRef<'static> = XSD_INTEGER;

    fn serialize(&self) -> Option<String> {
        Some(self.to_string())
    }

    fn deserialize(lexical: &str) -> Option<Self> {
        lexical.trim().parse::<i64>().ok()
    }
}

/// `12:00:00Z` -> `12:00:00`, `2020-01-01+02:00` -> `2020-01-01`.
fn strip_timezone(lexical: &str) -> &str {
    if let Some(stripped) = lexical.strip_suffix('Z') {
        return stripped;
    }
    let bytes = lexical.as_bytes();
    let len = bytes.len();
    if len > 6 && matches!(bytes[len - 6], b'+' | b'-') && bytes[len - 3] == b':' {
        return &lexical[..len - 6];
    }
    lexical
}
