//! Ambient context shared by every builder.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::rngs::StdRng;

use crate::error::MaterializeError;

const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// What a builder knows besides the input document.
pub struct Ambient<'a> {
    /// Default `apiVersion` when the input carries none.
    pub api_version: &'a str,
    pub kind: &'a str,
    pub name: &'a str,
    /// `None` for cluster-scoped kinds.
    pub namespace: Option<&'a str>,
    pub now: DateTime<Utc>,
    pub rng: &'a mut StdRng,
}

impl Ambient<'_> {
    /// RFC 3339 timestamp with second precision, as the API server formats it.
    pub fn timestamp(&self) -> String {
        self.now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    pub fn missing(&self, field: &str) -> MaterializeError {
        MaterializeError::MissingField {
            kind: self.kind.to_string(),
            name: self.name.to_string(),
            field: field.to_string(),
        }
    }

    pub fn invalid(&self, field: &str, reason: &str) -> MaterializeError {
        MaterializeError::InvalidField {
            kind: self.kind.to_string(),
            name: self.name.to_string(),
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Random lowercase alphanumeric string, as used in generated names.
pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())] as char)
        .collect()
}

pub fn random_digits<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn suffixes_use_name_safe_chars() {
        let mut rng = StdRng::seed_from_u64(1);
        let s = random_suffix(&mut rng, 32);
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));

        let d = random_digits(&mut rng, 12);
        assert_eq!(d.len(), 12);
        assert!(d.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn timestamp_format() {
        let mut rng = StdRng::seed_from_u64(1);
        let amb = Ambient {
            api_version: "v1",
            kind: "Pod",
            name: "p",
            namespace: Some("default"),
            now: DateTime::parse_from_rfc3339("2018-06-06T08:00:59.123Z")
                .unwrap()
                .with_timezone(&Utc),
            rng: &mut rng,
        };
        assert_eq!(amb.timestamp(), "2018-06-06T08:00:59Z");
    }
}
