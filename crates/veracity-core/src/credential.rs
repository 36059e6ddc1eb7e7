//! The verifiable-credential data model.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::did::{DIDError, DIDUrl};
use crate::one_or_many::OneOrMany;
use crate::proof::Proof;
use crate::revocation::RevocationBitmap;

/// An error relating to the credential data model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Malformed or unexpected `credentialStatus` content.
    #[error("Invalid credential status: {0}.")]
    InvalidStatus(&'static str),
    /// Wrapped error for a malformed DID or DID URL.
    #[error("A wrapped DID error: {0}")]
    DIDError(#[from] DIDError),
}

/// A JSON-LD context entry: a URI or an inline object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Context {
    Url(String),
    Object(BTreeMap<String, Value>),
}

/// The issuer member: a URI string or an object with an `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Issuer {
    Url(String),
    Object {
        id: String,
        #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty", default)]
        properties: BTreeMap<String, Value>,
    },
}

impl Issuer {
    /// The issuer URI in either representation.
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Object { id, .. } => id,
        }
    }
}

/// A credential subject: an optional id plus arbitrary claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, Value>,
}

/// A `credentialStatus` entry referencing a status service by DID URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, Value>,
}

/// A parsed `RevocationBitmap2022` status entry: the service URL plus the
/// credential's index in the bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationBitmapStatus {
    pub service_url: DIDUrl,
    pub index: u32,
}

impl RevocationBitmapStatus {
    const INDEX_PROPERTY: &'static str = "revocationBitmapIndex";

    /// Constructs the corresponding `credentialStatus` entry.
    pub fn to_status(&self) -> Status {
        let mut properties = BTreeMap::new();
        properties.insert(
            Self::INDEX_PROPERTY.to_owned(),
            Value::String(self.index.to_string()),
        );
        Status {
            id: self.service_url.to_string(),
            type_: RevocationBitmap::TYPE.to_owned(),
            properties,
        }
    }
}

impl TryFrom<&Status> for RevocationBitmapStatus {
    type Error = CredentialError;

    fn try_from(status: &Status) -> Result<Self, Self::Error> {
        if status.type_ != RevocationBitmap::TYPE {
            return Err(CredentialError::InvalidStatus("unexpected status type"));
        }
        let service_url = DIDUrl::parse(&status.id)?;
        let index = match status.properties.get(Self::INDEX_PROPERTY) {
            Some(Value::String(s)) => s
                .parse::<u32>()
                .map_err(|_| CredentialError::InvalidStatus("index is not a u32"))?,
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or(CredentialError::InvalidStatus("index is not a u32"))?,
            _ => return Err(CredentialError::InvalidStatus("missing revocationBitmapIndex")),
        };
        Ok(Self { service_url, index })
    }
}

/// A verifiable credential. Immutable once constructed; validation never
/// mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "@context")]
    pub context: OneOrMany<Context>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub types: OneOrMany<String>,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: OneOrMany<Subject>,
    pub issuer: Issuer,
    #[serde(rename = "issuanceDate")]
    pub issuance_date: DateTime<Utc>,
    #[serde(rename = "expirationDate", skip_serializing_if = "Option::is_none", default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(
        rename = "credentialStatus",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub credential_status: Option<Status>,
    #[serde(
        rename = "nonTransferable",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub non_transferable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub proof: Option<Proof>,
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, Value>,
}

impl Credential {
    /// The JSON-LD context every credential must list first.
    pub const BASE_CONTEXT: &'static str = "https://www.w3.org/2018/credentials/v1";
    /// The type every credential must carry.
    pub const BASE_TYPE: &'static str = "VerifiableCredential";

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
