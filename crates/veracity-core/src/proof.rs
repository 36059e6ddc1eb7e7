//! Detached JCS proofs and the injected signature-verification seam.
//!
//! Signing inputs are the JCS (RFC 8785) canonicalization of the value with
//! its `proof` member removed. The core only verifies; key generation and
//! signing live behind the caller's storage, except for the [`sign_jcs_ed25519`]
//! helper used when issuing.
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::did::DIDUrl;
use crate::method::{MethodError, MethodType};
use crate::verification_method::VerificationMethod;

/// An error relating to proof creation or verification.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The proof type is not a supported suite.
    #[error("Unsupported proof type: {0}.")]
    UnsupportedProofType(String),
    /// The verification method's type cannot verify this suite.
    #[error("Unsupported verification method type: {0}.")]
    UnsupportedMethodType(String),
    /// Wrapped error for undecodable key material.
    #[error("A wrapped key material error: {0}")]
    KeyMaterial(#[from] MethodError),
    /// The decoded public key has the wrong length.
    #[error("Invalid public key length; expected 32 bytes.")]
    InvalidKeyLength,
    /// The signature value is not valid base58 or has the wrong length.
    #[error("Invalid signature encoding.")]
    InvalidSignatureEncoding,
    /// The signature does not verify against the method's public key.
    #[error("Signature verification failed.")]
    InvalidSignature,
    /// The signing input could not be canonicalized.
    #[error("Canonicalization failed: {0}.")]
    Canonicalization(String),
}

/// A detached proof over the JCS canonicalization of its parent object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(rename = "verificationMethod")]
    pub verification_method: String,
    #[serde(rename = "signatureValue")]
    pub signature_value: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created: Option<DateTime<Utc>>,
}

impl Proof {
    /// The only proof suite produced and verified by this crate.
    pub const TYPE: &'static str = "JcsEd25519Signature2020";
}

/// The JCS canonical byte form of `value`, used as the signing input.
///
/// Callers must strip the `proof` member before canonicalizing.
pub fn signing_input<T: Serialize>(value: &T) -> Result<Vec<u8>, ProofError> {
    serde_jcs::to_string(value)
        .map(String::into_bytes)
        .map_err(|e| ProofError::Canonicalization(e.to_string()))
}

/// Verifies a raw signature for a verification method; injected into the
/// validators so key handling stays outside the core.
pub trait SignatureVerify {
    fn verify(
        &self,
        method: &VerificationMethod,
        msg: &[u8],
        signature: &[u8],
    ) -> Result<(), ProofError>;
}

impl<T: SignatureVerify + ?Sized> SignatureVerify for &T {
    fn verify(
        &self,
        method: &VerificationMethod,
        msg: &[u8],
        signature: &[u8],
    ) -> Result<(), ProofError> {
        (**self).verify(method, msg, signature)
    }
}

/// The default verifier: Ed25519 over the method's decoded public key.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verify;

impl SignatureVerify for Ed25519Verify {
    fn verify(
        &self,
        method: &VerificationMethod,
        msg: &[u8],
        signature: &[u8],
    ) -> Result<(), ProofError> {
        match method.type_ {
            MethodType::Ed25519VerificationKey2018 | MethodType::JsonWebKey2020 => {}
            other => return Err(ProofError::UnsupportedMethodType(other.to_string())),
        }
        let key_bytes = method.data.try_decode()?;
        let key_bytes: [u8; 32] = key_bytes
            .as_slice()
            .try_into()
            .map_err(|_| ProofError::InvalidKeyLength)?;
        let key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
            .map_err(|_| ProofError::KeyMaterial(MethodError::InvalidKeyMaterial("not an Ed25519 point")))?;
        let signature: [u8; 64] = signature
            .try_into()
            .map_err(|_| ProofError::InvalidSignatureEncoding)?;
        let signature = ed25519_dalek::Signature::from_bytes(&signature);
        key.verify(msg, &signature)
            .map_err(|_| ProofError::InvalidSignature)
    }
}

/// Signs the JCS canonicalization of `value` (which must already have its
/// `proof` member removed), producing a `JcsEd25519Signature2020` proof that
/// names `method_id` as its verification method.
pub fn sign_jcs_ed25519<T: Serialize>(
    value: &T,
    method_id: &DIDUrl,
    signing_key: &ed25519_dalek::SigningKey,
) -> Result<Proof, ProofError> {
    let msg = signing_input(value)?;
    let signature = signing_key.sign(&msg);
    Ok(Proof {
        type_: Proof::TYPE.to_owned(),
        verification_method: method_id.to_string(),
        signature_value: bs58::encode(signature.to_bytes()).into_string(),
        created: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::DID;
    use crate::method::MethodData;

    fn keypair() -> (ed25519_dalek::SigningKey, VerificationMethod) {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(&[1u8; 32]);
        let method = VerificationMethod::new(
            DID::parse("did:example:signer").unwrap(),
            MethodType::Ed25519VerificationKey2018,
            MethodData::new_base58(signing_key.verifying_key().as_bytes()),
            "key-1",
        )
        .unwrap();
        (signing_key, method)
    }

    #[test]
    fn sign_and_verify() {
        let (signing_key, method) = keypair();
        let value = serde_json::json!({"b": 2, "a": 1});
        let proof = sign_jcs_ed25519(&value, &method.id, &signing_key).unwrap();
        assert_eq!(proof.type_, Proof::TYPE);
        assert_eq!(proof.verification_method, "did:example:signer#key-1");

        let msg = signing_input(&value).unwrap();
        let signature = bs58::decode(&proof.signature_value).into_vec().unwrap();
        Ed25519Verify.verify(&method, &msg, &signature).unwrap();
    }

    #[test]
    fn canonicalization_orders_members() {
        // Key order must not affect the signing input.
        let a = serde_json::json!({"b": 2, "a": 1});
        let b = serde_json::json!({"a": 1, "b": 2});
        assert_eq!(signing_input(&a).unwrap(), signing_input(&b).unwrap());
    }

    #[test]
    fn tampered_message_fails() {
        let (signing_key, method) = keypair();
        let value = serde_json::json!({"claim": "original"});
        let proof = sign_jcs_ed25519(&value, &method.id, &signing_key).unwrap();
        let signature = bs58::decode(&proof.signature_value).into_vec().unwrap();

        let tampered = signing_input(&serde_json::json!({"claim": "tampered"})).unwrap();
        assert!(matches!(
            Ed25519Verify.verify(&method, &tampered, &signature),
            Err(ProofError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_key_type_and_lengths() {
        let (signing_key, mut method) = keypair();
        let value = serde_json::json!({"claim": true});
        let msg = signing_input(&value).unwrap();
        let proof = sign_jcs_ed25519(&value, &method.id, &signing_key).unwrap();
        let signature = bs58::decode(&proof.signature_value).into_vec().unwrap();

        assert!(matches!(
            Ed25519Verify.verify(&method, &msg, &signature[..63]),
            Err(ProofError::InvalidSignatureEncoding)
        ));

        method.type_ = MethodType::X25519KeyAgreementKey2019;
        assert!(matches!(
            Ed25519Verify.verify(&method, &msg, &signature),
            Err(ProofError::UnsupportedMethodType(_))
        ));

        method.type_ = MethodType::Ed25519VerificationKey2018;
        method.data = MethodData::new_base58(&[0u8; 16]);
        assert!(matches!(
            Ed25519Verify.verify(&method, &msg, &signature),
            Err(ProofError::InvalidKeyLength)
        ));
    }
}
