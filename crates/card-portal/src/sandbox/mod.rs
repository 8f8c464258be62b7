//! In-memory implementation of the remote REST service.
//!
//! `SandboxStore` is both a `PortalBackend` for in-process use and the state behind
//! `sandbox_router`, which speaks the same paths and payloads as the real service. The API
//! binary serves it for local development; tests drive it through `HttpPortalClient`.

mod router;
mod store;

pub use router::{sandbox_router, SandboxApi};
pub use store::{SandboxError, SandboxFaults, SandboxStore, StoredUpload};
