//! Stateless validation pipeline for verifiable presentations.
use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::credential::Context;
use crate::did::DID;
use crate::document::Document;
use crate::method::MethodScope;
use crate::presentation::Presentation;
use crate::proof::{Ed25519Verify, SignatureVerify};
use crate::validation::{run_units, FailFast, ValidationUnit};
use crate::vc::{
    CompoundCredentialValidationError, CredentialValidationOptions, CredentialValidator,
    ValidationError,
};

/// How credential subjects must relate to the presentation holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectHolderRelationship {
    /// Every credential subject must equal the holder.
    AlwaysSubject,
    /// Subjects must equal the holder only on credentials declaring
    /// `nonTransferable: true`.
    SubjectOnNonTransferable,
    /// No relationship is required.
    Any,
}

impl Default for SubjectHolderRelationship {
    fn default() -> Self {
        Self::AlwaysSubject
    }
}

/// Policy options for presentation validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresentationValidationOptions {
    /// Options applied to every embedded credential.
    #[serde(default)]
    pub shared_validation_options: CredentialValidationOptions,
    #[serde(default)]
    pub subject_holder_relationship: SubjectHolderRelationship,
}

impl PresentationValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared_validation_options(mut self, options: CredentialValidationOptions) -> Self {
        self.shared_validation_options = options;
        self
    }

    pub fn subject_holder_relationship(mut self, mode: SubjectHolderRelationship) -> Self {
        self.subject_holder_relationship = mode;
        self
    }
}

/// Every error encountered while validating a presentation: presentation-level
/// failures plus, per embedded credential index, that credential's failures.
#[derive(Debug, Default)]
pub struct CompoundPresentationValidationError {
    pub presentation_validation_errors: Vec<ValidationError>,
    pub credential_errors: BTreeMap<usize, CompoundCredentialValidationError>,
}

impl Display for CompoundPresentationValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let presentation_errors = self
            .presentation_validation_errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        let credential_errors = self
            .credential_errors
            .iter()
            .map(|(index, error)| format!("credential {}: {}", index, error))
            .collect::<Vec<_>>()
            .join("; ");
        write!(
            f,
            "Presentation validation failed: {}{}{}",
            presentation_errors,
            if presentation_errors.is_empty() || credential_errors.is_empty() {
                ""
            } else {
                "; "
            },
            credential_errors
        )
    }
}

impl std::error::Error for CompoundPresentationValidationError {}

/// Validates presentations and their embedded credentials.
#[derive(Debug, Clone, Default)]
pub struct PresentationValidator<V: SignatureVerify = Ed25519Verify> {
    verifier: V,
}

impl PresentationValidator {
    pub fn new() -> Self {
        Self {
            verifier: Ed25519Verify,
        }
    }

    /// Checks required members: the base context first and the base type.
    pub fn check_structure(presentation: &Presentation) -> Result<(), ValidationError> {
        match presentation.context.first() {
            Some(Context::Url(url)) if url == Presentation::BASE_CONTEXT => {}
            _ => {
                return Err(ValidationError::PresentationStructure(
                    "missing base context",
                ))
            }
        }
        if !presentation
            .types
            .contains(&Presentation::BASE_TYPE.to_owned())
        {
            return Err(ValidationError::PresentationStructure("missing base type"));
        }
        Ok(())
    }

    /// Parses the holder member into a DID. A hard prerequisite for the
    /// signature and relationship checks.
    pub fn extract_holder(presentation: &Presentation) -> Result<DID, ValidationError> {
        let holder = presentation
            .holder
            .as_deref()
            .ok_or(ValidationError::MissingHolder)?;
        DID::parse(holder).map_err(ValidationError::InvalidHolder)
    }

    /// Compares every credential subject against the presentation holder
    /// according to the configured relationship mode.
    pub fn check_subject_holder_relationship(
        presentation: &Presentation,
        relationship: SubjectHolderRelationship,
    ) -> Result<(), ValidationError> {
        if relationship == SubjectHolderRelationship::Any {
            return Ok(());
        }
        let holder = presentation
            .holder
            .as_deref()
            .ok_or(ValidationError::MissingHolder)?;
        for credential in &presentation.verifiable_credential {
            let must_match = match relationship {
                SubjectHolderRelationship::AlwaysSubject => true,
                SubjectHolderRelationship::SubjectOnNonTransferable => {
                    credential.non_transferable == Some(true)
                }
                SubjectHolderRelationship::Any => false,
            };
            if !must_match {
                continue;
            }
            for subject in credential.credential_subject.iter() {
                if subject.id.as_deref() != Some(holder) {
                    return Err(ValidationError::SubjectHolderRelationship(
                        subject.id.clone().unwrap_or_else(|| "<no id>".to_owned()),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl<V: SignatureVerify> PresentationValidator<V> {
    /// Constructs a validator around an injected signature verifier.
    pub fn with_verifier(verifier: V) -> Self {
        Self { verifier }
    }

    /// Verifies the presentation proof against the holder's document,
    /// restricted to authentication-capable methods.
    pub fn verify_presentation_signature(
        &self,
        presentation: &Presentation,
        holder: &Document,
    ) -> Result<(), ValidationError> {
        let proof = presentation
            .proof
            .as_ref()
            .ok_or(ValidationError::MissingProof)?;
        let mut unsigned = presentation.clone();
        unsigned.proof = None;
        crate::vc::verify_proof(
            &self.verifier,
            proof,
            &unsigned,
            holder,
            MethodScope::Authentication,
        )
    }

    /// Runs the presentation-level pipeline, then validates every embedded
    /// credential with the shared options under the same policy.
    pub fn validate(
        &self,
        presentation: &Presentation,
        holder: &Document,
        trusted_issuers: &[&Document],
        options: &PresentationValidationOptions,
        fail_fast: FailFast,
    ) -> Result<(), CompoundPresentationValidationError> {
        let units = vec![
            ValidationUnit::hard(|| PresentationValidator::check_structure(presentation)),
            ValidationUnit::hard(|| {
                PresentationValidator::extract_holder(presentation).map(|_| ())
            }),
            ValidationUnit::soft(|| self.verify_presentation_signature(presentation, holder)),
            ValidationUnit::soft(|| {
                PresentationValidator::check_subject_holder_relationship(
                    presentation,
                    options.subject_holder_relationship,
                )
            }),
        ];
        let presentation_validation_errors = run_units(fail_fast, units);

        let mut credential_errors = BTreeMap::new();
        let presentation_ok =
            presentation_validation_errors.is_empty() || fail_fast == FailFast::AllErrors;
        if presentation_ok {
            let credential_validator = CredentialValidator::with_verifier(&self.verifier);
            for (index, credential) in presentation.verifiable_credential.iter().enumerate() {
                if let Err(error) = credential_validator.validate_extended(
                    credential,
                    trusted_issuers,
                    &options.shared_validation_options,
                    fail_fast,
                ) {
                    credential_errors.insert(index, error);
                    if fail_fast == FailFast::FirstError {
                        break;
                    }
                }
            }
        }

        if presentation_validation_errors.is_empty() && credential_errors.is_empty() {
            Ok(())
        } else {
            Err(CompoundPresentationValidationError {
                presentation_validation_errors,
                credential_errors,
            })
        }
    }
}
