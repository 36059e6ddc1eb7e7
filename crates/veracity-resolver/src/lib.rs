//! Thin multi-method DID resolution.
//!
//! The resolver owns no method-specific logic. Callers attach one
//! [`ResolutionHandler`] per DID method and the resolver dispatches on the
//! parsed method name, with conveniences for gathering the documents a
//! credential or presentation validation needs.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use thiserror::Error;
use tracing::debug;

use veracity_core::credential::Credential;
use veracity_core::did::{DIDError, DID};
use veracity_core::document::Document;
use veracity_core::presentation::Presentation;

/// An error relating to DID resolution.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// No handler is attached for the DID method.
    #[error("No resolution handler attached for DID method: {0}.")]
    UnsupportedMethodName(String),
    /// Wrapped error for an input that is not a valid DID.
    #[error("A wrapped DID parse error: {0}")]
    ParseFailure(#[from] DIDError),
    /// A handler failed to produce a document.
    #[error("A resolution handler failed: {0}.")]
    HandlerFailure(String),
    /// The presentation names no holder to resolve.
    #[error("Presentation has no holder.")]
    MissingHolder,
    /// The credential issuer is not a valid DID.
    #[error("Credential issuer is not a valid DID: {0}.")]
    InvalidIssuer(String),
}

/// Resolves DIDs of a single method to their documents.
///
/// Implementations carry the network or storage access for one DID method;
/// [`Resolver`] dispatches to them by method name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResolutionHandler: Send + Sync {
    /// The method name this handler serves, without the `did:` prefix.
    fn method(&self) -> &str;
    /// Fetches the DID document for `did`.
    async fn resolve(&self, did: &DID) -> Result<Document, ResolverError>;
}

/// Multi-method resolver dispatching on the DID method name.
#[derive(Default)]
pub struct Resolver {
    handlers: HashMap<String, Arc<dyn ResolutionHandler>>,
}

impl Resolver {
    /// Constructs a resolver with no attached handlers.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Attaches a handler, replacing any existing handler for the same method.
    pub fn attach_handler(&mut self, handler: Arc<dyn ResolutionHandler>) {
        self.handlers.insert(handler.method().to_owned(), handler);
    }

    /// The method names with an attached handler.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Resolves a parsed DID via the handler for its method.
    pub async fn resolve(&self, did: &DID) -> Result<Document, ResolverError> {
        let handler = self
            .handlers
            .get(did.method_name())
            .ok_or_else(|| ResolverError::UnsupportedMethodName(did.method_name().to_owned()))?;
        debug!(%did, method = did.method_name(), "dispatching DID resolution");
        handler.resolve(did).await
    }

    /// Parses `did` and resolves it.
    pub async fn resolve_str(&self, did: &str) -> Result<Document, ResolverError> {
        self.resolve(&DID::parse(did)?).await
    }

    /// Resolves the document of the credential's issuer.
    pub async fn resolve_credential_issuer(
        &self,
        credential: &Credential,
    ) -> Result<Document, ResolverError> {
        let issuer = DID::parse(credential.issuer.url())
            .map_err(|_| ResolverError::InvalidIssuer(credential.issuer.url().to_owned()))?;
        self.resolve(&issuer).await
    }

    /// Resolves the document of the presentation's holder.
    pub async fn resolve_presentation_holder(
        &self,
        presentation: &Presentation,
    ) -> Result<Document, ResolverError> {
        let holder = presentation
            .holder
            .as_deref()
            .ok_or(ResolverError::MissingHolder)?;
        self.resolve(&DID::parse(holder)?).await
    }

    /// Resolves the documents of all distinct credential issuers in the
    /// presentation, concurrently. Each distinct issuer is resolved once.
    pub async fn resolve_presentation_issuers(
        &self,
        presentation: &Presentation,
    ) -> Result<Vec<Document>, ResolverError> {
        let mut issuers: Vec<DID> = Vec::new();
        for credential in &presentation.verifiable_credential {
            let issuer = DID::parse(credential.issuer.url())
                .map_err(|_| ResolverError::InvalidIssuer(credential.issuer.url().to_owned()))?;
            if !issuers.contains(&issuer) {
                issuers.push(issuer);
            }
        }
        debug!(count = issuers.len(), "resolving presentation issuers");
        try_join_all(issuers.iter().map(|issuer| self.resolve(issuer))).await
    }
}
