//! End-to-end validation scenarios with real Ed25519 keys.
use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use ed25519_dalek::SigningKey;

use veracity_core::credential::{Context, Credential, Issuer, RevocationBitmapStatus, Subject};
use veracity_core::did::DID;
use veracity_core::document::Document;
use veracity_core::method::{MethodData, MethodScope, MethodType};
use veracity_core::one_or_many::OneOrMany;
use veracity_core::presentation::Presentation;
use veracity_core::proof::sign_jcs_ed25519;
use veracity_core::revocation::RevocationBitmap;
use veracity_core::vc::{
    CredentialValidationOptions, CredentialValidator, ValidationError,
};
use veracity_core::verification_method::VerificationMethod;
use veracity_core::vp::{
    PresentationValidationOptions, PresentationValidator, SubjectHolderRelationship,
};
use veracity_core::FailFast;

/// A DID document with one general verification method attached to `scope`
/// by reference, plus the matching signing key.
fn actor(did: &str, seed: u8, scope: MethodScope) -> (Document, SigningKey) {
    let did = DID::parse(did).unwrap();
    let signing_key = SigningKey::from_bytes(&[seed; 32]);
    let method = VerificationMethod::new(
        did.clone(),
        MethodType::Ed25519VerificationKey2018,
        MethodData::new_base58(signing_key.verifying_key().as_bytes()),
        "sign-key",
    )
    .unwrap();
    let mut document = Document::new(did);
    document
        .insert_method(method, MethodScope::VerificationMethod)
        .unwrap();
    assert!(document.attach_method_relationship("sign-key", scope));
    (document, signing_key)
}

fn unsigned_credential(issuer: &DID, subject: &str) -> Credential {
    Credential {
        context: OneOrMany::One(Context::Url(Credential::BASE_CONTEXT.to_owned())),
        id: Some("https://example.edu/credentials/42".to_owned()),
        types: OneOrMany::One(Credential::BASE_TYPE.to_owned()),
        credential_subject: OneOrMany::One(Subject {
            id: Some(subject.to_owned()),
            properties: BTreeMap::new(),
        }),
        issuer: Issuer::Url(issuer.to_string()),
        issuance_date: Utc::now() - Duration::hours(1),
        expiration_date: None,
        credential_status: None,
        non_transferable: None,
        proof: None,
        properties: BTreeMap::new(),
    }
}

fn sign_credential(credential: &mut Credential, issuer: &DID, signing_key: &SigningKey) {
    let method_id = issuer.join("#sign-key").unwrap();
    let proof = sign_jcs_ed25519(credential, &method_id, signing_key).unwrap();
    credential.proof = Some(proof);
}

#[test]
fn signed_credential_validates() {
    let (issuer_doc, signing_key) = actor("did:example:issuer", 1, MethodScope::AssertionMethod);
    let mut credential = unsigned_credential(issuer_doc.id(), "did:example:subject");
    sign_credential(&mut credential, issuer_doc.id(), &signing_key);

    CredentialValidator::new()
        .validate(
            &credential,
            &issuer_doc,
            &CredentialValidationOptions::default(),
            FailFast::FirstError,
        )
        .unwrap();
}

#[test]
fn tampered_credential_fails_signature_check() {
    let (issuer_doc, signing_key) = actor("did:example:issuer", 1, MethodScope::AssertionMethod);
    let mut credential = unsigned_credential(issuer_doc.id(), "did:example:subject");
    sign_credential(&mut credential, issuer_doc.id(), &signing_key);
    credential.credential_subject = OneOrMany::One(Subject {
        id: Some("did:example:mallory".to_owned()),
        properties: BTreeMap::new(),
    });

    let error = CredentialValidator::new()
        .validate(
            &credential,
            &issuer_doc,
            &CredentialValidationOptions::default(),
            FailFast::AllErrors,
        )
        .unwrap_err();
    assert_eq!(error.validation_errors.len(), 1);
    assert!(matches!(
        error.validation_errors[0],
        ValidationError::Signature(_)
    ));
}

#[test]
fn key_without_assertion_scope_is_rejected() {
    // The signing key is attached to keyAgreement only.
    let (issuer_doc, signing_key) = actor("did:example:issuer", 1, MethodScope::KeyAgreement);
    let mut credential = unsigned_credential(issuer_doc.id(), "did:example:subject");
    sign_credential(&mut credential, issuer_doc.id(), &signing_key);

    let error = CredentialValidator::new()
        .validate(
            &credential,
            &issuer_doc,
            &CredentialValidationOptions::default(),
            FailFast::AllErrors,
        )
        .unwrap_err();
    assert!(error
        .validation_errors
        .iter()
        .any(|e| matches!(e, ValidationError::MethodNotFound(_))));
}

#[test]
fn expired_credential_yields_a_single_error() {
    let (issuer_doc, signing_key) = actor("did:example:issuer", 1, MethodScope::AssertionMethod);
    let mut credential = unsigned_credential(issuer_doc.id(), "did:example:subject");
    credential.expiration_date = Some(Utc::now() - Duration::minutes(5));
    sign_credential(&mut credential, issuer_doc.id(), &signing_key);

    let error = CredentialValidator::new()
        .validate(
            &credential,
            &issuer_doc,
            &CredentialValidationOptions::default(),
            FailFast::AllErrors,
        )
        .unwrap_err();
    assert_eq!(error.validation_errors.len(), 1);
    assert!(matches!(
        error.validation_errors[0],
        ValidationError::ExpiredCredential
    ));
}

#[test]
fn revoked_credential_is_rejected_and_unrevoked_index_passes() {
    let (mut issuer_doc, signing_key) =
        actor("did:example:issuer", 1, MethodScope::AssertionMethod);
    let service_url = issuer_doc.id().join("#revocation").unwrap();

    let mut bitmap = RevocationBitmap::new();
    bitmap.revoke(5);
    assert!(issuer_doc.insert_service(bitmap.to_service(service_url.clone()).unwrap()));

    for (index, revoked) in [(5u32, true), (6u32, false)] {
        let mut credential = unsigned_credential(issuer_doc.id(), "did:example:subject");
        credential.credential_status = Some(
            RevocationBitmapStatus {
                service_url: service_url.clone(),
                index,
            }
            .to_status(),
        );
        sign_credential(&mut credential, issuer_doc.id(), &signing_key);

        let result = CredentialValidator::new().validate(
            &credential,
            &issuer_doc,
            &CredentialValidationOptions::default(),
            FailFast::AllErrors,
        );
        if revoked {
            let error = result.unwrap_err();
            assert_eq!(error.validation_errors.len(), 1);
            assert!(matches!(
                error.validation_errors[0],
                ValidationError::Revoked(5)
            ));
        } else {
            result.unwrap();
        }
    }
}

#[test]
fn signed_presentation_validates() {
    let (issuer_doc, issuer_key) = actor("did:example:issuer", 1, MethodScope::AssertionMethod);
    let (holder_doc, holder_key) = actor("did:example:holder", 2, MethodScope::Authentication);

    let mut credential = unsigned_credential(issuer_doc.id(), "did:example:holder");
    sign_credential(&mut credential, issuer_doc.id(), &issuer_key);

    let mut presentation = Presentation::new("did:example:holder".to_owned());
    presentation.verifiable_credential.push(credential);
    let method_id = holder_doc.id().join("#sign-key").unwrap();
    presentation.proof = Some(sign_jcs_ed25519(&presentation, &method_id, &holder_key).unwrap());

    PresentationValidator::new()
        .validate(
            &presentation,
            &holder_doc,
            &[&issuer_doc],
            &PresentationValidationOptions::default(),
            FailFast::FirstError,
        )
        .unwrap();
}

#[test]
fn subject_holder_mismatch_is_policed_per_mode() {
    let (issuer_doc, issuer_key) = actor("did:example:issuer", 1, MethodScope::AssertionMethod);
    let (holder_doc, holder_key) = actor("did:example:holder", 2, MethodScope::Authentication);

    // The credential's subject is not the holder.
    let mut credential = unsigned_credential(issuer_doc.id(), "did:example:subject");
    sign_credential(&mut credential, issuer_doc.id(), &issuer_key);

    let mut presentation = Presentation::new("did:example:holder".to_owned());
    presentation.verifiable_credential.push(credential);
    let method_id = holder_doc.id().join("#sign-key").unwrap();
    presentation.proof = Some(sign_jcs_ed25519(&presentation, &method_id, &holder_key).unwrap());

    let error = PresentationValidator::new()
        .validate(
            &presentation,
            &holder_doc,
            &[&issuer_doc],
            &PresentationValidationOptions::default(),
            FailFast::AllErrors,
        )
        .unwrap_err();
    assert!(error
        .presentation_validation_errors
        .iter()
        .any(|e| matches!(e, ValidationError::SubjectHolderRelationship(_))));
    assert!(error.credential_errors.is_empty());

    // The transferable credential passes the relaxed modes.
    for mode in [
        SubjectHolderRelationship::SubjectOnNonTransferable,
        SubjectHolderRelationship::Any,
    ] {
        PresentationValidator::new()
            .validate(
                &presentation,
                &holder_doc,
                &[&issuer_doc],
                &PresentationValidationOptions::default().subject_holder_relationship(mode),
                FailFast::AllErrors,
            )
            .unwrap();
    }
}

#[test]
fn untrusted_issuer_is_rejected() {
    let (issuer_doc, issuer_key) = actor("did:example:issuer", 1, MethodScope::AssertionMethod);
    let (other_doc, _) = actor("did:example:other", 3, MethodScope::AssertionMethod);

    let mut credential = unsigned_credential(issuer_doc.id(), "did:example:subject");
    sign_credential(&mut credential, issuer_doc.id(), &issuer_key);

    let error = CredentialValidator::new()
        .validate(
            &credential,
            &other_doc,
            &CredentialValidationOptions::default(),
            FailFast::AllErrors,
        )
        .unwrap_err();
    assert!(error
        .validation_errors
        .iter()
        .any(|e| matches!(e, ValidationError::UntrustedIssuer)));
}
