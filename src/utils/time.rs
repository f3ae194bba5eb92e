use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Parses a backend timestamp.
///
/// RFC 3339 is preferred.  A timestamp without an offset, as a database
/// `timestamp` column renders it, is read as UTC.  Anything else is `None`.
pub fn parse_lenient(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    if let Ok(datetime) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(datetime);
    }
    let naive =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");
    PrimitiveDateTime::parse(&s.replacen(' ', "T", 1), naive)
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}

/// Timestamps that may be null, absent, or in a shape [`parse_lenient`]
/// does not know; the last two decode as `None` instead of failing the
/// whole document.
///
/// Use together with `#[serde(default)]`.
pub mod option {
    use super::*;

    /// Deserialize an optional timestamp string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?
            .as_deref()
            .and_then(parse_lenient))
    }

    /// Serialize an optional OffsetDateTime; `None` becomes null.
    pub fn serialize<S>(datetime: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match datetime {
            Some(datetime) => super::serialize(datetime, serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// Current time as unix seconds.
pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_offset_and_naive_timestamps() {
        let with_offset = parse_lenient("2025-03-01T10:00:00+00:00").unwrap();
        assert_eq!(with_offset.unix_timestamp(), 1_740_823_200);
        let naive = parse_lenient("2025-03-01T10:00:00.123456").unwrap();
        assert_eq!(naive.unix_timestamp(), 1_740_823_200);
        let spaced = parse_lenient("2025-03-01 10:00:00").unwrap();
        assert_eq!(spaced.unix_timestamp(), 1_740_823_200);
        assert_eq!(parse_lenient("yesterday"), None);
    }
}
