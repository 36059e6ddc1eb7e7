//! The verifiable-presentation data model.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::credential::{Context, Credential};
use crate::one_or_many::OneOrMany;
use crate::proof::Proof;

/// A verifiable presentation: credentials bundled and signed by a holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(rename = "@context")]
    pub context: OneOrMany<Context>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub types: OneOrMany<String>,
    #[serde(
        rename = "verifiableCredential",
        skip_serializing_if = "Vec::is_empty",
        default
    )]
    pub verifiable_credential: Vec<Credential>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub holder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub proof: Option<Proof>,
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, Value>,
}

impl Presentation {
    /// The JSON-LD context every presentation must list first.
    pub const BASE_CONTEXT: &'static str = "https://www.w3.org/2018/credentials/v1";
    /// The type every presentation must carry.
    pub const BASE_TYPE: &'static str = "VerifiablePresentation";

    /// Constructs an empty presentation for `holder`.
    pub fn new(holder: String) -> Self {
        Self {
            context: OneOrMany::One(Context::Url(Self::BASE_CONTEXT.to_owned())),
            id: None,
            types: OneOrMany::One(Self::BASE_TYPE.to_owned()),
            verifiable_credential: Vec::new(),
            holder: Some(holder),
            proof: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{TEST_CREDENTIAL, TEST_PRESENTATION};

    #[test]
    fn fixture_round_trip() {
        let presentation = Presentation::from_json(TEST_PRESENTATION).unwrap();
        assert_eq!(presentation.holder.as_deref(), Some("did:example:holder"));
        assert_eq!(presentation.verifiable_credential.len(), 1);
        let json = serde_json::to_value(&presentation).unwrap();
        let back: Presentation = serde_json::from_value(json).unwrap();
        assert_eq!(back, presentation);
    }

    #[test]
    fn new_carries_base_vocabulary() {
        let mut presentation = Presentation::new("did:example:holder".to_owned());
        presentation
            .verifiable_credential
            .push(Credential::from_json(TEST_CREDENTIAL).unwrap());
        assert!(presentation
            .types
            .contains(&Presentation::BASE_TYPE.to_owned()));
        let json = serde_json::to_value(&presentation).unwrap();
        assert_eq!(json["@context"], Presentation::BASE_CONTEXT);
        assert_eq!(json["holder"], "did:example:holder");
    }
}
