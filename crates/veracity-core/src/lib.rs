//! Method-agnostic DID document model and credential validation core.
pub mod credential;
pub mod data;
pub mod did;
pub mod document;
pub mod method;
pub mod one_or_many;
pub mod presentation;
pub mod proof;
pub mod revocation;
pub mod service;
mod validation;
pub mod vc;
pub mod verification_method;
pub mod vp;

pub use validation::FailFast;
