//! Veracity: method-agnostic DID documents, verifiable credentials and a
//! pluggable resolver, re-exported from the workspace crates.
pub use veracity_core::*;
pub use veracity_resolver as resolver;
