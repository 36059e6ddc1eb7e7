//! The method-agnostic DID document: verification methods, services and
//! verification relationships, resolvable by query.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::did::{DID, DIDUrl};
use crate::method::MethodScope;
use crate::one_or_many::OneOrMany;
use crate::revocation::{RevocationBitmap, RevocationError};
use crate::service::Service;
use crate::verification_method::{MethodRef, VerificationMethod};

/// An error relating to DID document mutation or lookup.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// A method with the same id is already present in the document.
    #[error("A verification method with id {0} already exists.")]
    MethodAlreadyExists(String),
    /// No method matched the query.
    #[error("Verification method not found: {0}.")]
    MethodNotFound(String),
    /// The resolved service is not of the expected type.
    #[error("Invalid service: {0}.")]
    InvalidService(&'static str),
    /// Wrapped revocation-bitmap error.
    #[error("A wrapped revocation error: {0}")]
    RevocationError(#[from] RevocationError),
}

/// A DID document.
///
/// Each verification-relationship array holds either a [`DIDUrl`] reference
/// into the general `verificationMethod` set or a method embedded in (and
/// owned by) that relationship alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    id: DID,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    controller: Option<OneOrMany<DID>>,
    #[serde(rename = "alsoKnownAs", skip_serializing_if = "Vec::is_empty", default)]
    also_known_as: Vec<String>,
    #[serde(
        rename = "verificationMethod",
        skip_serializing_if = "Vec::is_empty",
        default
    )]
    verification_method: Vec<VerificationMethod>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    authentication: Vec<MethodRef>,
    #[serde(rename = "assertionMethod", skip_serializing_if = "Vec::is_empty", default)]
    assertion_method: Vec<MethodRef>,
    #[serde(rename = "keyAgreement", skip_serializing_if = "Vec::is_empty", default)]
    key_agreement: Vec<MethodRef>,
    #[serde(
        rename = "capabilityDelegation",
        skip_serializing_if = "Vec::is_empty",
        default
    )]
    capability_delegation: Vec<MethodRef>,
    #[serde(
        rename = "capabilityInvocation",
        skip_serializing_if = "Vec::is_empty",
        default
    )]
    capability_invocation: Vec<MethodRef>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    service: Vec<Service>,
    #[serde(flatten, skip_serializing_if = "BTreeMap::is_empty", default)]
    properties: BTreeMap<String, Value>,
}

impl Document {
    /// Constructs an empty document for the given DID.
    pub fn new(id: DID) -> Self {
        Self {
            id,
            controller: None,
            also_known_as: Vec::new(),
            verification_method: Vec::new(),
            authentication: Vec::new(),
            assertion_method: Vec::new(),
            key_agreement: Vec::new(),
            capability_delegation: Vec::new(),
            capability_invocation: Vec::new(),
            service: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn id(&self) -> &DID {
        &self.id
    }

    pub fn controller(&self) -> Option<&OneOrMany<DID>> {
        self.controller.as_ref()
    }

    pub fn set_controller(&mut self, controller: Option<OneOrMany<DID>>) {
        self.controller = controller;
    }

    pub fn also_known_as(&self) -> &[String] {
        &self.also_known_as
    }

    pub fn also_known_as_mut(&mut self) -> &mut Vec<String> {
        &mut self.also_known_as
    }

    pub fn verification_method(&self) -> &[VerificationMethod] {
        &self.verification_method
    }

    pub fn service(&self) -> &[Service] {
        &self.service
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Unchecked access to the custom-properties side-channel. Keys that
    /// collide with reserved DID Core members produce invalid JSON on
    /// serialization.
    pub fn properties_mut_unchecked(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.properties
    }

    /// The relationship array for a scope, or `None` for the general set.
    fn relationship(&self, scope: MethodScope) -> Option<&Vec<MethodRef>> {
        match scope {
            MethodScope::VerificationMethod => None,
            MethodScope::Authentication => Some(&self.authentication),
            MethodScope::AssertionMethod => Some(&self.assertion_method),
            MethodScope::KeyAgreement => Some(&self.key_agreement),
            MethodScope::CapabilityDelegation => Some(&self.capability_delegation),
            MethodScope::CapabilityInvocation => Some(&self.capability_invocation),
        }
    }

    fn relationship_mut(&mut self, scope: MethodScope) -> Option<&mut Vec<MethodRef>> {
        match scope {
            MethodScope::VerificationMethod => None,
            MethodScope::Authentication => Some(&mut self.authentication),
            MethodScope::AssertionMethod => Some(&mut self.assertion_method),
            MethodScope::KeyAgreement => Some(&mut self.key_agreement),
            MethodScope::CapabilityDelegation => Some(&mut self.capability_delegation),
            MethodScope::CapabilityInvocation => Some(&mut self.capability_invocation),
        }
    }

    const RELATIONSHIPS: [MethodScope; 5] = [
        MethodScope::Authentication,
        MethodScope::AssertionMethod,
        MethodScope::KeyAgreement,
        MethodScope::CapabilityDelegation,
        MethodScope::CapabilityInvocation,
    ];

    /// Whether any method (general or embedded) answers to `id`.
    fn contains_method_id(&self, id: &DIDUrl) -> bool {
        self.verification_method.iter().any(|m| &m.id == id)
            || Self::RELATIONSHIPS.iter().any(|scope| {
                self.relationship(*scope)
                    .into_iter()
                    .flatten()
                    .any(|entry| entry.is_embedded() && entry.id() == id)
            })
    }

    /// Inserts a method under the given scope.
    ///
    /// `MethodScope::VerificationMethod` inserts into the general set; a
    /// relationship scope embeds the method in that relationship. Fails
    /// without modifying the document if the id collides with any existing
    /// method id, embedded or general.
    pub fn insert_method(
        &mut self,
        method: VerificationMethod,
        scope: MethodScope,
    ) -> Result<(), DocumentError> {
        if self.contains_method_id(&method.id) {
            return Err(DocumentError::MethodAlreadyExists(method.id.to_string()));
        }
        match self.relationship_mut(scope) {
            None => self.verification_method.push(method),
            Some(relationship) => relationship.push(MethodRef::Embedded(method)),
        }
        Ok(())
    }

    /// Removes a method from the general set, stripping any reference to it
    /// from all five relationship arrays. Embedded methods are independent
    /// owned copies and are left untouched.
    pub fn remove_method(&mut self, id: &DIDUrl) -> Option<VerificationMethod> {
        let index = self.verification_method.iter().position(|m| &m.id == id)?;
        let method = self.verification_method.remove(index);
        for scope in Self::RELATIONSHIPS {
            if let Some(relationship) = self.relationship_mut(scope) {
                relationship.retain(|entry| entry.is_embedded() || entry.id() != id);
            }
        }
        Some(method)
    }

    /// Attaches a relationship to a method in the general set by reference.
    ///
    /// Returns `false` when nothing changed: the query matches no method in
    /// the general set (embedded methods are not referenceable), the scope is
    /// the general set itself, or the relationship is already attached.
    pub fn attach_method_relationship(&mut self, query: &str, scope: MethodScope) -> bool {
        if scope == MethodScope::VerificationMethod {
            return false;
        }
        let id = match self
            .verification_method
            .iter()
            .find(|m| matches_query(&m.id, query))
        {
            Some(method) => method.id.clone(),
            None => return false,
        };
        // relationship_mut is Some for every non-general scope.
        let relationship = match self.relationship_mut(scope) {
            Some(relationship) => relationship,
            None => return false,
        };
        if relationship.iter().any(|entry| entry.id() == &id) {
            return false;
        }
        relationship.push(MethodRef::Referenced(id));
        true
    }

    /// Detaches a referenced relationship from a method in the general set.
    ///
    /// Returns `false` when nothing changed; embedded entries are never
    /// removed by this operation.
    pub fn detach_method_relationship(&mut self, query: &str, scope: MethodScope) -> bool {
        if scope == MethodScope::VerificationMethod {
            return false;
        }
        let id = match self
            .verification_method
            .iter()
            .find(|m| matches_query(&m.id, query))
        {
            Some(method) => method.id.clone(),
            None => return false,
        };
        let relationship = match self.relationship_mut(scope) {
            Some(relationship) => relationship,
            None => return false,
        };
        let before = relationship.len();
        relationship.retain(|entry| entry.is_embedded() || entry.id() != &id);
        relationship.len() != before
    }

    /// Resolves a verification method by query.
    ///
    /// The query is a full DID URL string or a bare fragment (`"key-1"` is
    /// equivalent to `"#key-1"`). Without a scope only the general set is
    /// scanned; with a relationship scope, references are dereferenced into
    /// the general set and embedded methods compared directly. The first
    /// match wins.
    pub fn resolve_method(
        &self,
        query: &str,
        scope: Option<MethodScope>,
    ) -> Option<&VerificationMethod> {
        match scope {
            None | Some(MethodScope::VerificationMethod) => self
                .verification_method
                .iter()
                .find(|m| matches_query(&m.id, query)),
            Some(scope) => self
                .relationship(scope)?
                .iter()
                .filter_map(|entry| self.deref_method(entry))
                .find(|m| matches_query(&m.id, query)),
        }
    }

    /// Mutable variant of [`Self::resolve_method`].
    pub fn resolve_method_mut(
        &mut self,
        query: &str,
        scope: Option<MethodScope>,
    ) -> Option<&mut VerificationMethod> {
        // Locate first, then reborrow mutably.
        enum Location {
            General(DIDUrl),
            Embedded(usize),
        }
        let location = match scope {
            None | Some(MethodScope::VerificationMethod) => self
                .verification_method
                .iter()
                .find(|m| matches_query(&m.id, query))
                .map(|m| Location::General(m.id.clone())),
            Some(scope) => {
                self.relationship(scope)?
                    .iter()
                    .enumerate()
                    .find_map(|(index, entry)| match entry {
                        MethodRef::Embedded(method) if matches_query(&method.id, query) => {
                            Some(Location::Embedded(index))
                        }
                        MethodRef::Referenced(id) => self
                            .verification_method
                            .iter()
                            .find(|m| &m.id == id && matches_query(&m.id, query))
                            .map(|m| Location::General(m.id.clone())),
                        _ => None,
                    })
            }
        }?;
        match location {
            Location::General(id) => self.verification_method.iter_mut().find(|m| m.id == id),
            Location::Embedded(index) => {
                // The scope is a relationship scope whenever an embedded index
                // was recorded.
                match self.relationship_mut(scope?)?.get_mut(index) {
                    Some(MethodRef::Embedded(method)) => Some(method),
                    _ => None,
                }
            }
        }
    }

    fn deref_method<'a>(&'a self, entry: &'a MethodRef) -> Option<&'a VerificationMethod> {
        match entry {
            MethodRef::Embedded(method) => Some(method),
            MethodRef::Referenced(id) => self.verification_method.iter().find(|m| &m.id == id),
        }
    }

    /// All methods visible under a scope: the general set plus every embedded
    /// method for `None`, the general set alone for the general scope, and the
    /// dereferenced relationship array otherwise.
    pub fn methods(&self, scope: Option<MethodScope>) -> Vec<&VerificationMethod> {
        match scope {
            None => {
                let mut methods: Vec<&VerificationMethod> = self.verification_method.iter().collect();
                for scope in Self::RELATIONSHIPS {
                    for entry in self.relationship(scope).into_iter().flatten() {
                        if let MethodRef::Embedded(method) = entry {
                            methods.push(method);
                        }
                    }
                }
                methods
            }
            Some(MethodScope::VerificationMethod) => self.verification_method.iter().collect(),
            Some(scope) => self
                .relationship(scope)
                .into_iter()
                .flatten()
                .filter_map(|entry| self.deref_method(entry))
                .collect(),
        }
    }

    /// Inserts a service; returns `false` (and leaves the document unchanged)
    /// if a service with the same id exists.
    pub fn insert_service(&mut self, service: Service) -> bool {
        if self.service.iter().any(|s| s.id == service.id) {
            return false;
        }
        self.service.push(service);
        true
    }

    /// Removes the service with the given id; returns `false` if absent.
    pub fn remove_service(&mut self, id: &DIDUrl) -> bool {
        let before = self.service.len();
        self.service.retain(|s| &s.id != id);
        self.service.len() != before
    }

    /// Resolves a service by full DID URL or bare fragment query.
    pub fn resolve_service(&self, query: &str) -> Option<&Service> {
        self.service.iter().find(|s| matches_query(&s.id, query))
    }

    /// Marks `indices` as revoked in the `RevocationBitmap2022` service
    /// matching `service_query`, re-encoding the endpoint in place. A missing
    /// service is a no-op, not an error.
    pub fn revoke_credentials(
        &mut self,
        service_query: &str,
        indices: &[u32],
    ) -> Result<(), DocumentError> {
        self.update_revocation_bitmap(service_query, |bitmap| {
            for index in indices {
                bitmap.revoke(*index);
            }
        })
    }

    /// Clears `indices` in the `RevocationBitmap2022` service matching
    /// `service_query`. A missing service is a no-op, not an error.
    pub fn unrevoke_credentials(
        &mut self,
        service_query: &str,
        indices: &[u32],
    ) -> Result<(), DocumentError> {
        self.update_revocation_bitmap(service_query, |bitmap| {
            for index in indices {
                bitmap.unrevoke(*index);
            }
        })
    }

    fn update_revocation_bitmap(
        &mut self,
        service_query: &str,
        f: impl FnOnce(&mut RevocationBitmap),
    ) -> Result<(), DocumentError> {
        let service = match self
            .service
            .iter_mut()
            .find(|s| matches_query(&s.id, service_query))
        {
            Some(service) => service,
            None => return Ok(()),
        };
        if !service.has_type(RevocationBitmap::TYPE) {
            return Err(DocumentError::InvalidService(
                "not a RevocationBitmap2022 service",
            ));
        }
        let mut bitmap = RevocationBitmap::from_endpoint(&service.service_endpoint)?;
        f(&mut bitmap);
        service.service_endpoint = bitmap.to_endpoint()?;
        Ok(())
    }
}

/// Whether `id` answers to `query`: a `did:`-prefixed query must equal the
/// full canonical form, anything else is compared against the fragment with
/// an optional leading `#`.
fn matches_query(id: &DIDUrl, query: &str) -> bool {
    if query.starts_with("did:") {
        id.to_string() == query
    } else {
        id.fragment() == Some(query.strip_prefix('#').unwrap_or(query))
    }
}
