//! Named, typed, owned public-key records addressable by DID URL.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::did::{DID, DIDError, DIDUrl};
use crate::method::{MethodData, MethodType};

/// A public key record owned by a DID document.
///
/// Mutating `id`, `controller`, `type` or `data` after insertion into a
/// document does not re-validate id uniqueness; re-insert to enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMethod {
    pub id: DIDUrl,
    pub controller: DID,
    #[serde(rename = "type")]
    pub type_: MethodType,
    #[serde(flatten)]
    pub data: MethodData,
    /// Dynamic custom members. Setting reserved member names here shadows
    /// nothing on serialization but corrupts the JSON; treat as unchecked.
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, Value>,
}

impl VerificationMethod {
    /// Constructs a method identified as `<did>#<fragment>` and controlled by `did`.
    pub fn new(
        did: DID,
        type_: MethodType,
        data: MethodData,
        fragment: &str,
    ) -> Result<Self, DIDError> {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let id = did.join(&format!("#{}", fragment))?;
        Ok(Self {
            id,
            controller: did,
            type_,
            data,
            properties: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> &DIDUrl {
        &self.id
    }

    pub fn controller(&self) -> &DID {
        &self.controller
    }

    pub fn type_(&self) -> MethodType {
        self.type_
    }

    pub fn data(&self) -> &MethodData {
        &self.data
    }

    /// Unchecked access to the custom-properties side-channel.
    pub fn properties_mut_unchecked(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.properties
    }
}

/// An entry in a verification-relationship array: either a method embedded
/// directly in the relationship, or a reference into the document's general
/// verification-method set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodRef {
    Embedded(VerificationMethod),
    Referenced(DIDUrl),
}

impl MethodRef {
    /// The id this entry answers to, regardless of variant.
    pub fn id(&self) -> &DIDUrl {
        match self {
            Self::Embedded(method) => &method.id,
            Self::Referenced(id) => id,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::Embedded(_))
    }
}

impl From<VerificationMethod> for MethodRef {
    fn from(method: VerificationMethod) -> Self {
        Self::Embedded(method)
    }
}

impl From<DIDUrl> for MethodRef {
    fn from(id: DIDUrl) -> Self {
        Self::Referenced(id)
    }
}
