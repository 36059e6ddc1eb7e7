//! Method-agnostic decentralized identifiers and their URL extensions.
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// An error relating to DID or DID URL parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DIDError {
    /// Malformed DID.
    #[error("Invalid DID: {0}.")]
    InvalidDid(&'static str),
    /// Malformed DID URL.
    #[error("Invalid DID URL: {0}.")]
    InvalidDidUrl(&'static str),
}

/// A parsed `did:<method-name>:<method-specific-id>` identifier.
///
/// Immutable once parsed; equality is structural equality of the normalized
/// string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DID {
    method_name: String,
    method_specific_id: String,
}

impl DID {
    /// The URI scheme common to all DIDs.
    pub const SCHEME: &'static str = "did";

    /// Parses a DID from its canonical string form.
    ///
    /// Inputs carrying a URL tail (path, query or fragment) are rejected;
    /// use [`DIDUrl::parse`] for those.
    pub fn parse(input: &str) -> Result<Self, DIDError> {
        let rest = input
            .strip_prefix("did:")
            .ok_or(DIDError::InvalidDid("scheme must be 'did'"))?;
        let (method_name, method_specific_id) = rest
            .split_once(':')
            .ok_or(DIDError::InvalidDid("missing method-specific id"))?;
        if method_specific_id.contains(['/', '?', '#']) {
            return Err(DIDError::InvalidDid("unexpected DID URL tail"));
        }
        Self::new(method_name, method_specific_id)
    }

    /// Constructs a DID from its two components, validating the grammar of each.
    pub fn new(method_name: &str, method_specific_id: &str) -> Result<Self, DIDError> {
        validate_method_name(method_name)?;
        validate_method_id(method_specific_id)?;
        Ok(Self {
            method_name: method_name.to_owned(),
            method_specific_id: method_specific_id.to_owned(),
        })
    }

    /// Constructs a DID whose method-specific id is `<network>:<tag>`, with the
    /// tag derived from a public key (base58-encoded SHA-256 digest).
    pub fn new_with_network(
        method_name: &str,
        network: &str,
        public_key: &[u8],
    ) -> Result<Self, DIDError> {
        if network.is_empty() || !network.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(DIDError::InvalidDid("invalid network name"));
        }
        let digest = Sha256::digest(public_key);
        let tag = bs58::encode(digest).into_string();
        Self::new(method_name, &format!("{}:{}", network, tag))
    }

    /// The method name, e.g. `example` in `did:example:123`.
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// The method-specific id, e.g. `123` in `did:example:123`.
    pub fn method_specific_id(&self) -> &str {
        &self.method_specific_id
    }

    /// Converts into a [`DIDUrl`] with an empty path, query and fragment.
    pub fn to_url(&self) -> DIDUrl {
        DIDUrl {
            did: self.clone(),
            path: None,
            query: None,
            fragment: None,
        }
    }

    /// Joins a `/`-, `?`- or `#`-prefixed segment onto this DID.
    pub fn join(&self, segment: &str) -> Result<DIDUrl, DIDError> {
        let mut url = self.to_url();
        url.join(segment)?;
        Ok(url)
    }
}

impl Display for DID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            Self::SCHEME,
            self.method_name,
            self.method_specific_id
        )
    }
}

impl FromStr for DID {
    type Err = DIDError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DID {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DID {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A DID with optional path, query and fragment, composed left-to-right as
/// `did<path>?<query>#<fragment>`.
///
/// The path is stored with its leading `/`; the query and fragment are stored
/// without their `?`/`#` delimiters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DIDUrl {
    did: DID,
    path: Option<String>,
    query: Option<String>,
    fragment: Option<String>,
}

impl DIDUrl {
    /// Parses a DID URL; a bare DID (no tail) is accepted.
    pub fn parse(input: &str) -> Result<Self, DIDError> {
        let tail_start = input.find(['/', '?', '#']);
        let (did_part, tail) = match tail_start {
            Some(idx) => (&input[..idx], &input[idx..]),
            None => (input, ""),
        };
        let mut url = DID::parse(did_part)?.to_url();
        if !tail.is_empty() {
            url.join(tail)?;
        }
        Ok(url)
    }

    pub fn did(&self) -> &DID {
        &self.did
    }

    /// The path including its leading `/`, if set.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The query without its leading `?`, if set.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The fragment without its leading `#`, if set.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Sets or clears the path. A path must start with `/`.
    pub fn set_path(&mut self, value: Option<&str>) -> Result<(), DIDError> {
        match value {
            None => self.path = None,
            Some(path) => {
                if !path.starts_with('/') || !path.chars().all(is_path_char) {
                    return Err(DIDError::InvalidDidUrl("invalid path"));
                }
                self.path = Some(path.to_owned());
            }
        }
        Ok(())
    }

    /// Sets or clears the query. A leading `?` is stripped.
    pub fn set_query(&mut self, value: Option<&str>) -> Result<(), DIDError> {
        match value {
            None => self.query = None,
            Some(query) => {
                let query = query.strip_prefix('?').unwrap_or(query);
                if query.is_empty() || !query.chars().all(is_query_char) {
                    return Err(DIDError::InvalidDidUrl("invalid query"));
                }
                self.query = Some(query.to_owned());
            }
        }
        Ok(())
    }

    /// Sets or clears the fragment. A leading `#` is stripped.
    pub fn set_fragment(&mut self, value: Option<&str>) -> Result<(), DIDError> {
        match value {
            None => self.fragment = None,
            Some(fragment) => {
                let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
                if fragment.is_empty() || !fragment.chars().all(is_fragment_char) {
                    return Err(DIDError::InvalidDidUrl("invalid fragment"));
                }
                self.fragment = Some(fragment.to_owned());
            }
        }
        Ok(())
    }

    /// Joins a segment onto this DID URL, replacing by position:
    /// a `/` segment replaces the path and clears the query and fragment, a
    /// `?` segment replaces the query and clears the fragment, and a `#`
    /// segment replaces only the fragment.
    pub fn join(&mut self, segment: &str) -> Result<(), DIDError> {
        match segment.chars().next() {
            Some('/') => {
                let (path, rest) = split_tail(segment, &['?', '#']);
                self.set_path(Some(path))?;
                self.query = None;
                self.fragment = None;
                if !rest.is_empty() {
                    self.join(rest)?;
                }
            }
            Some('?') => {
                let (query, rest) = split_tail(segment, &['#']);
                self.set_query(Some(query))?;
                self.fragment = None;
                if !rest.is_empty() {
                    self.join(rest)?;
                }
            }
            Some('#') => self.set_fragment(Some(segment))?,
            _ => {
                return Err(DIDError::InvalidDidUrl(
                    "segment must start with '/', '?' or '#'",
                ))
            }
        }
        Ok(())
    }
}

/// Splits `input` at the first occurrence of any delimiter, keeping the
/// delimiter with the remainder.
fn split_tail<'a>(input: &'a str, delimiters: &[char]) -> (&'a str, &'a str) {
    match input.find(delimiters) {
        Some(idx) => (&input[..idx], &input[idx..]),
        None => (input, ""),
    }
}

impl Display for DIDUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.did)?;
        if let Some(path) = &self.path {
            write!(f, "{}", path)?;
        }
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

impl FromStr for DIDUrl {
    type Err = DIDError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DID> for DIDUrl {
    fn from(did: DID) -> Self {
        did.to_url()
    }
}

impl Serialize for DIDUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DIDUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn validate_method_name(name: &str) -> Result<(), DIDError> {
    if name.is_empty() {
        return Err(DIDError::InvalidDid("empty method name"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(DIDError::InvalidDid(
            "method name must match [a-z0-9]+",
        ));
    }
    Ok(())
}

fn validate_method_id(id: &str) -> Result<(), DIDError> {
    if id.is_empty() {
        return Err(DIDError::InvalidDid("empty method-specific id"));
    }
    if id.starts_with(':') || id.ends_with(':') {
        return Err(DIDError::InvalidDid(
            "empty leading or trailing colon segment",
        ));
    }
    let bytes = id.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' | ':' => i += 1,
            '%' => {
                // A percent sign must head a two-hex-digit escape.
                if i + 2 >= bytes.len()
                    || !bytes[i + 1].is_ascii_hexdigit()
                    || !bytes[i + 2].is_ascii_hexdigit()
                {
                    return Err(DIDError::InvalidDid("incomplete percent-encoding"));
                }
                i += 3;
            }
            _ => return Err(DIDError::InvalidDid("disallowed character")),
        }
    }
    Ok(())
}

fn is_path_char(c: char) -> bool {
    is_pchar(c) || c == '/'
}

fn is_query_char(c: char) -> bool {
    is_pchar(c) || c == '/' || c == '?'
}

fn is_fragment_char(c: char) -> bool {
    is_pchar(c) || c == '/' || c == '?'
}

fn is_pchar(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | '.' | '_' | '~' | '%' | ':' | '@' | '!' | '$' | '&' | '\'' | '(' | ')' | '*'
                | '+' | ',' | ';' | '='
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        for s in [
            "did:example:123",
            "did:vrc:main:8dQhw429",
            "did:web:w3c-ccg.github.io:user:alice",
            "did:example:abc%20def",
        ] {
            assert_eq!(DID::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn parse_rejects_malformed() {
        // Wrong scheme.
        assert!(DID::parse("DID:example:123").is_err());
        assert!(DID::parse("key:example:123").is_err());
        // Empty or invalid method name.
        assert!(DID::parse("did::123").is_err());
        assert!(DID::parse("did:Example:123").is_err());
        assert!(DID::parse("did:exa_mple:123").is_err());
        // Invalid method-specific id.
        assert!(DID::parse("did:example:").is_err());
        assert!(DID::parse("did:example::123").is_err());
        assert!(DID::parse("did:example:123:").is_err());
        assert!(DID::parse("did:example:a/b").is_err());
        assert!(DID::parse("did:example:a%2").is_err());
        // URL tails are not DIDs.
        assert!(DID::parse("did:example:123#key-1").is_err());
    }

    #[test]
    fn parse_did_url_round_trip() {
        for s in [
            "did:example:123",
            "did:example:123#key-1",
            "did:example:123?service=agent",
            "did:example:123/path/sub?service=agent#frag",
        ] {
            assert_eq!(DIDUrl::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn join_requires_leading_delimiter() {
        let mut url = DIDUrl::parse("did:example:123").unwrap();
        assert_eq!(
            url.join("key-1"),
            Err(DIDError::InvalidDidUrl(
                "segment must start with '/', '?' or '#'"
            ))
        );
    }

    #[test]
    fn join_path_clears_query_and_fragment() {
        let mut url = DIDUrl::parse("did:example:123?q=1#frag").unwrap();
        url.join("/path").unwrap();
        assert_eq!(url.to_string(), "did:example:123/path");
        assert!(url.query().is_none());
        assert!(url.fragment().is_none());
    }

    #[test]
    fn join_query_clears_fragment() {
        let mut url = DIDUrl::parse("did:example:123/path#frag").unwrap();
        url.join("?q=1").unwrap();
        assert_eq!(url.to_string(), "did:example:123/path?q=1");
        assert_eq!(url.path(), Some("/path"));
        assert!(url.fragment().is_none());
    }

    #[test]
    fn join_fragment_overwrites_fragment_only() {
        let mut url = DIDUrl::parse("did:example:123/path?q=1#old").unwrap();
        url.join("#new").unwrap();
        assert_eq!(url.to_string(), "did:example:123/path?q=1#new");
    }

    #[test]
    fn join_compound_segment() {
        let mut url = DIDUrl::parse("did:example:123#frag").unwrap();
        url.join("/path?q=1#new").unwrap();
        assert_eq!(url.to_string(), "did:example:123/path?q=1#new");
    }

    #[test]
    fn new_with_network() {
        let did = DID::new_with_network("vrc", "main", &[0u8; 32]).unwrap();
        assert_eq!(did.method_name(), "vrc");
        let (network, tag) = did.method_specific_id().split_once(':').unwrap();
        assert_eq!(network, "main");
        assert!(!tag.is_empty());
        // Deterministic over the key bytes.
        assert_eq!(did, DID::new_with_network("vrc", "main", &[0u8; 32]).unwrap());
        // Invalid network labels are rejected.
        assert!(DID::new_with_network("vrc", "Main", &[0u8; 32]).is_err());
        assert!(DID::new_with_network("vrc", "", &[0u8; 32]).is_err());
    }

    #[test]
    fn serde_as_string() {
        let url = DIDUrl::parse("did:example:123#key-1").unwrap();
        let json = serde_json::to_string(&url).unwrap();
        assert_eq!(json, r#""did:example:123#key-1""#);
        let back: DIDUrl = serde_json::from_str(&json).unwrap();
        assert_eq!(back, url);
    }
}
