//! Stateless validation pipeline for verifiable credentials.
use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credential::{Credential, RevocationBitmapStatus};
use crate::did::{DID, DIDError};
use crate::document::Document;
use crate::method::MethodScope;
use crate::proof::{signing_input, Ed25519Verify, Proof, ProofError, SignatureVerify};
use crate::revocation::RevocationBitmap;
use crate::validation::{run_units, FailFast, ValidationUnit};

/// An error raised by a single failing validation check.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required credential member is missing or malformed.
    #[error("The credential structure is invalid: {0}.")]
    Structure(&'static str),
    /// A required presentation member is missing or malformed.
    #[error("The presentation structure is invalid: {0}.")]
    PresentationStructure(&'static str),
    /// The credential expired before the earliest accepted expiry date.
    #[error("The credential is expired.")]
    ExpiredCredential,
    /// The credential was issued after the latest accepted issuance date.
    #[error("The credential was issued after the latest accepted issuance date.")]
    PrematureCredential,
    /// The issuer member could not be parsed as a DID.
    #[error("Invalid issuer: {0}")]
    InvalidIssuer(DIDError),
    /// The presentation carries no holder member.
    #[error("The presentation has no holder.")]
    MissingHolder,
    /// The holder member could not be parsed as a DID.
    #[error("Invalid holder: {0}")]
    InvalidHolder(DIDError),
    /// No trusted issuer document matches the credential's issuer.
    #[error("The credential issuer is not among the trusted issuer documents.")]
    UntrustedIssuer,
    /// The proof names a method absent from the trusted document.
    #[error("Verification method not found: {0}.")]
    MethodNotFound(String),
    /// The credential or presentation carries no proof.
    #[error("No proof is present.")]
    MissingProof,
    /// Wrapped error for a failed or malformed signature.
    #[error("A wrapped proof error: {0}")]
    Signature(ProofError),
    /// The credential's index is set in the issuer's revocation bitmap.
    #[error("The credential is revoked (bitmap index {0}).")]
    Revoked(u32),
    /// The status type is unknown and the status check is strict.
    #[error("Unsupported credential status type: {0}.")]
    UnsupportedStatusType(String),
    /// The status entry could not be resolved or decoded.
    #[error("The credential status could not be checked: {0}.")]
    InvalidStatus(String),
    /// A credential subject does not match the presentation holder.
    #[error("Credential subject {0} does not match the presentation holder.")]
    SubjectHolderRelationship(String),
}

/// Every error encountered while validating one credential.
#[derive(Debug, Default)]
pub struct CompoundCredentialValidationError {
    pub validation_errors: Vec<ValidationError>,
}

impl Display for CompoundCredentialValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self
            .validation_errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "Credential validation failed: {}", errors)
    }
}

impl std::error::Error for CompoundCredentialValidationError {}

/// How `credentialStatus` entries are treated during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCheck {
    /// Check supported status types; reject unsupported ones.
    Strict,
    /// Check supported status types; ignore unsupported ones.
    SkipUnsupported,
    /// Do not check the status at all.
    SkipAll,
}

impl Default for StatusCheck {
    fn default() -> Self {
        Self::Strict
    }
}

/// Policy options for credential validation. Pure configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialValidationOptions {
    /// Credentials expiring before this instant are rejected; defaults to the
    /// time of validation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub earliest_expiry_date: Option<DateTime<Utc>>,
    /// Credentials issued after this instant are rejected; defaults to the
    /// time of validation.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latest_issuance_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: StatusCheck,
}

impl CredentialValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn earliest_expiry_date(mut self, timestamp: DateTime<Utc>) -> Self {
        self.earliest_expiry_date = Some(timestamp);
        self
    }

    pub fn latest_issuance_date(mut self, timestamp: DateTime<Utc>) -> Self {
        self.latest_issuance_date = Some(timestamp);
        self
    }

    pub fn status_check(mut self, status: StatusCheck) -> Self {
        self.status = status;
        self
    }
}

/// Validates credentials against trusted issuer documents.
///
/// Stateless apart from the injected signature verifier; every check is also
/// exposed as a standalone function.
#[derive(Debug, Clone, Default)]
pub struct CredentialValidator<V: SignatureVerify = Ed25519Verify> {
    verifier: V,
}

impl CredentialValidator {
    pub fn new() -> Self {
        Self {
            verifier: Ed25519Verify,
        }
    }

    /// Checks required members per the VC data model: the base context first,
    /// the base type present, a non-empty issuer and at least one subject.
    pub fn check_structure(credential: &Credential) -> Result<(), ValidationError> {
        match credential.context.first() {
            Some(crate::credential::Context::Url(url)) if url == Credential::BASE_CONTEXT => {}
            _ => return Err(ValidationError::Structure("missing base context")),
        }
        if !credential.types.contains(&Credential::BASE_TYPE.to_owned()) {
            return Err(ValidationError::Structure("missing base type"));
        }
        if credential.credential_subject.is_empty() {
            return Err(ValidationError::Structure("missing credential subject"));
        }
        if credential.issuer.url().is_empty() {
            return Err(ValidationError::Structure("empty issuer"));
        }
        Ok(())
    }

    /// Fails with `PrematureCredential` if the credential was issued after
    /// `timestamp`.
    pub fn check_issued_on_or_before(
        credential: &Credential,
        timestamp: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if credential.issuance_date > timestamp {
            return Err(ValidationError::PrematureCredential);
        }
        Ok(())
    }

    /// Fails with `ExpiredCredential` if the credential expires before
    /// `timestamp`. Credentials without an expiration date never expire.
    pub fn check_expires_on_or_after(
        credential: &Credential,
        timestamp: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        if let Some(expiration_date) = credential.expiration_date {
            if expiration_date < timestamp {
                return Err(ValidationError::ExpiredCredential);
            }
        }
        Ok(())
    }

    /// Parses the issuer member into a DID. A hard prerequisite: signature and
    /// status checks cannot run without it.
    pub fn extract_issuer(credential: &Credential) -> Result<DID, ValidationError> {
        DID::parse(credential.issuer.url()).map_err(ValidationError::InvalidIssuer)
    }

    /// Checks the credential's `credentialStatus` against the issuer's
    /// embedded revocation bitmap, honouring the `StatusCheck` policy.
    pub fn check_status(
        credential: &Credential,
        trusted_issuers: &[&Document],
        status_check: StatusCheck,
    ) -> Result<(), ValidationError> {
        if status_check == StatusCheck::SkipAll {
            return Ok(());
        }
        let status = match &credential.credential_status {
            Some(status) => status,
            None => return Ok(()),
        };
        if status.type_ != RevocationBitmap::TYPE {
            return match status_check {
                StatusCheck::Strict => {
                    Err(ValidationError::UnsupportedStatusType(status.type_.clone()))
                }
                _ => Ok(()),
            };
        }
        let status = RevocationBitmapStatus::try_from(status)
            .map_err(|e| ValidationError::InvalidStatus(e.to_string()))?;
        let issuer_doc = trusted_issuers
            .iter()
            .find(|doc| doc.id() == status.service_url.did())
            .ok_or_else(|| {
                ValidationError::InvalidStatus("no trusted issuer document matches the status service".to_owned())
            })?;
        let service = issuer_doc
            .resolve_service(&status.service_url.to_string())
            .ok_or_else(|| {
                ValidationError::InvalidStatus("revocation service not found".to_owned())
            })?;
        if !service.has_type(RevocationBitmap::TYPE) {
            return Err(ValidationError::InvalidStatus(
                "service is not a RevocationBitmap2022".to_owned(),
            ));
        }
        let bitmap = RevocationBitmap::from_endpoint(&service.service_endpoint)
            .map_err(|e| ValidationError::InvalidStatus(e.to_string()))?;
        if bitmap.is_revoked(status.index) {
            return Err(ValidationError::Revoked(status.index));
        }
        Ok(())
    }
}

impl<V: SignatureVerify> CredentialValidator<V> {
    /// Constructs a validator around an injected signature verifier.
    pub fn with_verifier(verifier: V) -> Self {
        Self { verifier }
    }

    /// Verifies the credential proof against the matching trusted issuer
    /// document, restricted to assertion-capable methods.
    pub fn verify_signature(
        &self,
        credential: &Credential,
        trusted_issuers: &[&Document],
    ) -> Result<(), ValidationError> {
        let issuer_did = CredentialValidator::extract_issuer(credential)?;
        let issuer_doc = trusted_issuers
            .iter()
            .find(|doc| doc.id() == &issuer_did)
            .ok_or(ValidationError::UntrustedIssuer)?;
        let proof = credential
            .proof
            .as_ref()
            .ok_or(ValidationError::MissingProof)?;
        let mut unsigned = credential.clone();
        unsigned.proof = None;
        verify_proof(&self.verifier, proof, &unsigned, issuer_doc, MethodScope::AssertionMethod)
    }

    /// Runs the full pipeline (structure, time window, issuer extraction,
    /// signature, status) under the given aggregation policy.
    pub fn validate(
        &self,
        credential: &Credential,
        issuer: &Document,
        options: &CredentialValidationOptions,
        fail_fast: FailFast,
    ) -> Result<(), CompoundCredentialValidationError> {
        self.validate_extended(credential, &[issuer], options, fail_fast)
    }

    /// As [`Self::validate`], against any of several trusted issuer documents.
    pub fn validate_extended(
        &self,
        credential: &Credential,
        trusted_issuers: &[&Document],
        options: &CredentialValidationOptions,
        fail_fast: FailFast,
    ) -> Result<(), CompoundCredentialValidationError> {
        let expiry_bound = options.earliest_expiry_date.unwrap_or_else(Utc::now);
        let issuance_bound = options.latest_issuance_date.unwrap_or_else(Utc::now);
        let units = vec![
            ValidationUnit::hard(|| CredentialValidator::check_structure(credential)),
            ValidationUnit::soft(move || {
                CredentialValidator::check_expires_on_or_after(credential, expiry_bound)
            }),
            ValidationUnit::soft(move || {
                CredentialValidator::check_issued_on_or_before(credential, issuance_bound)
            }),
            ValidationUnit::hard(|| CredentialValidator::extract_issuer(credential).map(|_| ())),
            ValidationUnit::soft(|| self.verify_signature(credential, trusted_issuers)),
            ValidationUnit::soft(|| {
                CredentialValidator::check_status(credential, trusted_issuers, options.status)
            }),
        ];
        let validation_errors = run_units(fail_fast, units);
        if validation_errors.is_empty() {
            Ok(())
        } else {
            Err(CompoundCredentialValidationError { validation_errors })
        }
    }
}

/// Resolves the proof's verification method in `document` under `scope` and
/// verifies the signature over the JCS form of `unsigned`.
pub(crate) fn verify_proof<T: serde::Serialize>(
    verifier: &dyn SignatureVerify,
    proof: &Proof,
    unsigned: &T,
    document: &Document,
    scope: MethodScope,
) -> Result<(), ValidationError> {
    if proof.type_ != Proof::TYPE {
        return Err(ValidationError::Signature(ProofError::UnsupportedProofType(
            proof.type_.clone(),
        )));
    }
    let method = document
        .resolve_method(&proof.verification_method, Some(scope))
        .ok_or_else(|| ValidationError::MethodNotFound(proof.verification_method.clone()))?;
    let signature = bs58::decode(&proof.signature_value)
        .into_vec()
        .map_err(|_| ValidationError::Signature(ProofError::InvalidSignatureEncoding))?;
    let msg = signing_input(unsigned).map_err(ValidationError::Signature)?;
    verifier
        .verify(method, &msg, &signature)
        .map_err(ValidationError::Signature)
}
