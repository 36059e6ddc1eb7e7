//! DID document service entries.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::did::{DIDError, DIDUrl};
use crate::one_or_many::OneOrMany;

/// A service endpoint: a single URL, a set of URLs, or a map of named URL sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceEndpoint {
    One(String),
    Set(Vec<String>),
    Map(BTreeMap<String, Vec<String>>),
}

impl From<String> for ServiceEndpoint {
    fn from(url: String) -> Self {
        Self::One(url)
    }
}

/// An endpoint record associated with the DID subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: DIDUrl,
    #[serde(rename = "type")]
    pub type_: OneOrMany<String>,
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: ServiceEndpoint,
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, Value>,
}

impl Service {
    /// Constructs a service. The id must carry a fragment so the service is
    /// addressable within its document.
    pub fn new(
        id: DIDUrl,
        type_: impl Into<OneOrMany<String>>,
        service_endpoint: ServiceEndpoint,
    ) -> Result<Self, DIDError> {
        if id.fragment().is_none() {
            return Err(DIDError::InvalidDidUrl("service id requires a fragment"));
        }
        Ok(Self {
            id,
            type_: type_.into(),
            service_endpoint,
            properties: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> &DIDUrl {
        &self.id
    }

    /// Whether `candidate` appears among this service's types.
    pub fn has_type(&self, candidate: &str) -> bool {
        self.type_.any(|t| t == candidate)
    }
}
