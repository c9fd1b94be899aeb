//! Serialization adapter
//!
//! The only shape of the collection the owning form ever sees: its urls, in
//! order, either comma-joined or as a list. Commas inside urls are not
//! escaped; file names containing one never get this far.

use serde::{Deserialize, Serialize};

use crate::model::{AttachmentRecord, SerializationKind};

pub const SEPARATOR: char = ',';

/// Value handed to the owning form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedValue {
    Joined(String),
    List(Vec<String>),
}

impl SerializedValue {
    /// Value for an empty collection
    pub fn empty(kind: SerializationKind) -> Self {
        match kind {
            SerializationKind::JoinedString => Self::Joined(String::new()),
            SerializationKind::List => Self::List(Vec::new()),
        }
    }

    pub fn kind(&self) -> SerializationKind {
        match self {
            Self::Joined(_) => SerializationKind::JoinedString,
            Self::List(_) => SerializationKind::List,
        }
    }

    /// Urls in order; empty segments of a joined string are skipped
    pub fn urls(&self) -> Vec<String> {
        match self {
            Self::Joined(joined) => joined
                .split(SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            Self::List(urls) => urls.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Joined(joined) => joined.split(SEPARATOR).all(str::is_empty),
            Self::List(urls) => urls.is_empty(),
        }
    }
}

impl std::fmt::Display for SerializedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Joined(joined) => f.write_str(joined),
            Self::List(urls) => write!(f, "[{}]", urls.join(", ")),
        }
    }
}

pub fn serialize(records: &[AttachmentRecord], kind: SerializationKind) -> SerializedValue {
    let urls = records.iter().map(|r| r.url.clone());
    match kind {
        SerializationKind::JoinedString => {
            SerializedValue::Joined(urls.collect::<Vec<_>>().join(","))
        }
        SerializationKind::List => SerializedValue::List(urls.collect()),
    }
}

/// Positional `existing-` records for a hydration value
pub fn deserialize(value: &SerializedValue) -> Vec<AttachmentRecord> {
    value
        .urls()
        .into_iter()
        .enumerate()
        .map(|(seq, url)| AttachmentRecord::existing(seq, url))
        .collect()
}

/// Parse a comma-joined value
pub fn parse_joined(joined: &str) -> Vec<AttachmentRecord> {
    deserialize(&SerializedValue::Joined(joined.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttachmentId;
    use proptest::prelude::*;

    fn records(urls: &[&str]) -> Vec<AttachmentRecord> {
        urls.iter()
            .enumerate()
            .map(|(i, url)| AttachmentRecord::new(AttachmentId::server(format!("s{}", i)), "n", *url))
            .collect()
    }

    #[test]
    fn test_joined_string() {
        let value = serialize(
            &records(&["/img/a.png", "https://cdn.example.com/b.jpg"]),
            SerializationKind::JoinedString,
        );
        assert_eq!(
            value,
            SerializedValue::Joined("/img/a.png,https://cdn.example.com/b.jpg".to_string())
        );
    }

    #[test]
    fn test_list() {
        let value = serialize(&records(&["/img/a.png"]), SerializationKind::List);
        assert_eq!(value, SerializedValue::List(vec!["/img/a.png".to_string()]));
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(
            serialize(&[], SerializationKind::JoinedString),
            SerializedValue::empty(SerializationKind::JoinedString)
        );
        assert_eq!(
            serialize(&[], SerializationKind::List),
            SerializedValue::empty(SerializationKind::List)
        );
        assert!(SerializedValue::Joined(String::new()).is_empty());
        assert!(parse_joined("").is_empty());
    }

    #[test]
    fn test_parse_joined_positions() {
        let parsed = parse_joined("https://cdn.example.com/a.png,/img/b.jpg");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id.as_str(), "existing-0");
        assert_eq!(parsed[0].name, "a");
        assert_eq!(parsed[1].id.as_str(), "existing-1");
        assert_eq!(parsed[1].url, "/img/b.jpg");
    }

    #[test]
    fn test_parse_skips_empty_segments() {
        let parsed = parse_joined("a.png,,b.png,");
        let urls: Vec<_> = parsed.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_json_shape() {
        let joined = serde_json::to_string(&SerializedValue::Joined("a,b".to_string())).unwrap();
        assert_eq!(joined, "\"a,b\"");

        let list = serde_json::to_string(&SerializedValue::List(vec!["a".to_string()])).unwrap();
        assert_eq!(list, "[\"a\"]");

        let back: SerializedValue = serde_json::from_str("[\"x\",\"y\"]").unwrap();
        assert_eq!(back.kind(), SerializationKind::List);
    }

    fn url_strategy() -> impl Strategy<Value = String> {
        "[a-z0-9:/._-]{1,40}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Serializing then parsing yields the same urls, in order, for both kinds
        #[test]
        fn prop_round_trip_preserves_urls(urls in prop::collection::vec(url_strategy(), 0..12)) {
            let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
            let original = records(&refs);

            for kind in [SerializationKind::JoinedString, SerializationKind::List] {
                let back = deserialize(&serialize(&original, kind));
                let back_urls: Vec<String> = back.into_iter().map(|r| r.url).collect();
                prop_assert_eq!(&back_urls, &urls);
            }
        }
    }
}
