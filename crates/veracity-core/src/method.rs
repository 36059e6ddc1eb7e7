//! Closed vocabularies for verification-method capabilities and key material.
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error relating to verification-method vocabulary or key material.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MethodError {
    /// Unknown scope, type or encoding name.
    #[error("Unknown value for {0}: {1}.")]
    UnknownValue(&'static str, String),
    /// Key material could not be decoded.
    #[error("Invalid key material: {0}.")]
    InvalidKeyMaterial(&'static str),
    /// A verification-method JWK must not carry private components.
    #[error("Private components are not permitted in a verification-method JWK.")]
    PrivateKeyMaterial,
}

/// What a verification method may be used for.
///
/// `VerificationMethod` denotes the general (embedded) set; the other five
/// variants denote verification relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodScope {
    VerificationMethod,
    Authentication,
    AssertionMethod,
    KeyAgreement,
    CapabilityDelegation,
    CapabilityInvocation,
}

impl MethodScope {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VerificationMethod => "VerificationMethod",
            Self::Authentication => "Authentication",
            Self::AssertionMethod => "AssertionMethod",
            Self::KeyAgreement => "KeyAgreement",
            Self::CapabilityDelegation => "CapabilityDelegation",
            Self::CapabilityInvocation => "CapabilityInvocation",
        }
    }
}

impl Default for MethodScope {
    fn default() -> Self {
        Self::VerificationMethod
    }
}

impl Display for MethodScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodScope {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VerificationMethod" => Ok(Self::VerificationMethod),
            "Authentication" => Ok(Self::Authentication),
            "AssertionMethod" => Ok(Self::AssertionMethod),
            "KeyAgreement" => Ok(Self::KeyAgreement),
            "CapabilityDelegation" => Ok(Self::CapabilityDelegation),
            "CapabilityInvocation" => Ok(Self::CapabilityInvocation),
            other => Err(MethodError::UnknownValue("MethodScope", other.to_owned())),
        }
    }
}

/// The signature suite of a verification method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodType {
    Ed25519VerificationKey2018,
    X25519KeyAgreementKey2019,
    JsonWebKey2020,
}

impl MethodType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ed25519VerificationKey2018 => "Ed25519VerificationKey2018",
            Self::X25519KeyAgreementKey2019 => "X25519KeyAgreementKey2019",
            Self::JsonWebKey2020 => "JsonWebKey2020",
        }
    }
}

impl Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodType {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ed25519VerificationKey2018" => Ok(Self::Ed25519VerificationKey2018),
            "X25519KeyAgreementKey2019" => Ok(Self::X25519KeyAgreementKey2019),
            "JsonWebKey2020" => Ok(Self::JsonWebKey2020),
            other => Err(MethodError::UnknownValue("MethodType", other.to_owned())),
        }
    }
}

/// A minimal JSON Web Key. Verification methods must not carry the private
/// component `d`; [`Jwk::new_public`] enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

impl Jwk {
    /// Constructs a public JWK over an OKP curve point.
    pub fn new_public(kty: &str, crv: &str, x: &str) -> Self {
        Self {
            kty: kty.to_owned(),
            crv: Some(crv.to_owned()),
            x: Some(x.to_owned()),
            y: None,
            d: None,
        }
    }

    /// Whether the key carries a private component.
    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }
}

/// The encoding of a verification method's public key material.
///
/// The variant name doubles as the JSON member name, so this enum flattens
/// directly into the verification-method object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodData {
    #[serde(rename = "publicKeyBase58")]
    PublicKeyBase58(String),
    #[serde(rename = "publicKeyMultibase")]
    PublicKeyMultibase(String),
    #[serde(rename = "publicKeyJwk")]
    PublicKeyJwk(Jwk),
}

impl MethodData {
    /// Encodes raw key bytes as base58.
    pub fn new_base58(bytes: &[u8]) -> Self {
        Self::PublicKeyBase58(bs58::encode(bytes).into_string())
    }

    /// Encodes raw key bytes as base58 multibase (`z` prefix).
    pub fn new_multibase(bytes: &[u8]) -> Self {
        Self::PublicKeyMultibase(format!("z{}", bs58::encode(bytes).into_string()))
    }

    /// Constructs JWK key material, rejecting private components.
    pub fn new_jwk(jwk: Jwk) -> Result<Self, MethodError> {
        if jwk.is_private() {
            return Err(MethodError::PrivateKeyMaterial);
        }
        Ok(Self::PublicKeyJwk(jwk))
    }

    /// Decodes the raw public key bytes.
    ///
    /// For JWKs this decodes the base64url `x` coordinate (OKP keys).
    pub fn try_decode(&self) -> Result<Vec<u8>, MethodError> {
        match self {
            Self::PublicKeyBase58(s) => bs58::decode(s)
                .into_vec()
                .map_err(|_| MethodError::InvalidKeyMaterial("not base58")),
            Self::PublicKeyMultibase(s) => {
                // Only the base58-btc multibase prefix is supported.
                let tail = s
                    .strip_prefix('z')
                    .ok_or(MethodError::InvalidKeyMaterial("unsupported multibase prefix"))?;
                bs58::decode(tail)
                    .into_vec()
                    .map_err(|_| MethodError::InvalidKeyMaterial("not base58"))
            }
            Self::PublicKeyJwk(jwk) => {
                let x = jwk
                    .x
                    .as_deref()
                    .ok_or(MethodError::InvalidKeyMaterial("missing x coordinate"))?;
                base64::decode_config(x, base64::URL_SAFE_NO_PAD)
                    .map_err(|_| MethodError::InvalidKeyMaterial("not base64url"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_string_round_trip() {
        for scope in [
            MethodScope::VerificationMethod,
            MethodScope::Authentication,
            MethodScope::AssertionMethod,
            MethodScope::KeyAgreement,
            MethodScope::CapabilityDelegation,
            MethodScope::CapabilityInvocation,
        ] {
            assert_eq!(MethodScope::from_str(scope.as_str()).unwrap(), scope);
        }
        assert!(MethodScope::from_str("assertionMethod").is_err());
    }

    #[test]
    fn method_data_decode_round_trip() {
        let key = [7u8; 32];
        assert_eq!(MethodData::new_base58(&key).try_decode().unwrap(), key);
        assert_eq!(MethodData::new_multibase(&key).try_decode().unwrap(), key);

        let jwk = Jwk::new_public("OKP", "Ed25519", &base64::encode_config(key, base64::URL_SAFE_NO_PAD));
        let data = MethodData::new_jwk(jwk).unwrap();
        assert_eq!(data.try_decode().unwrap(), key);
    }

    #[test]
    fn private_jwk_rejected() {
        let mut jwk = Jwk::new_public("OKP", "Ed25519", "AA");
        jwk.d = Some("secret".to_owned());
        assert_eq!(
            MethodData::new_jwk(jwk),
            Err(MethodError::PrivateKeyMaterial)
        );
    }

    #[test]
    fn method_data_serializes_by_member_name() {
        let data = MethodData::new_base58(&[1, 2, 3]);
        let json = serde_json::to_value(&data).unwrap();
        assert!(json.get("publicKeyBase58").is_some());
    }
}
