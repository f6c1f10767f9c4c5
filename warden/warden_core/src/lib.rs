//! # Warden Core
//!
//! `warden_core` provides the fundamental building blocks shared by the
//! Warden process runtime: strongly-typed identifiers and the error
//! hierarchy used throughout the system.
//!
//! ## Core Principles
//!
//! 1. **Typed identifiers**: process endpoints and grant handles are both
//!    plain integers at the boundary with the privileged component, so each
//!    gets its own newtype to keep them from being mixed up in call
//!    signatures.
//!
//! 2. **Typed errors**: every fallible operation returns a subsystem error
//!    enum; the root [`Error`] type wraps them for uniform handling at the
//!    top level. Nothing in the runtime core is fatal to the process.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all Warden components
//! - **id**: Strongly-typed identifier types

pub mod error;
pub mod id;

// Re-export key types for convenience
pub use error::{Error, GrantError, Result, SyncError};
pub use id::{Handle, ProcessId};
