//! Strongly-typed identifiers for the Warden process runtime.
//!
//! This module provides the identifier types used throughout the system.
//! Both are thin wrappers around small integers: process endpoints are
//! indices into the privileged component's process table, and grant
//! handles are indices into one process's grant table. Wrapping them in
//! distinct newtypes ensures the two can never be swapped in a call
//! signature.
//!
//! # Examples
//!
//! ```
//! use warden_core::id::{Handle, ProcessId};
//!
//! let endpoint = ProcessId::from_raw(7);
//! assert_eq!(endpoint.raw(), 7);
//!
//! let handle = Handle::from_raw(0);
//! assert_eq!(handle.index(), 0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a process endpoint.
///
/// Endpoints name the parties of a grant: the granting process, the
/// grantee, and (for relayed grants) the third party whose memory is
/// involved. The runtime treats the value as opaque; it is assigned by
/// the privileged component when the process is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Create an endpoint identifier from its raw value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw endpoint value.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle identifying one live grant within a grant table.
///
/// A handle is the opaque value a granter passes to a grantee over the
/// message transport. Internally it is the index of the grant's slot;
/// a handle stays bound to the same slot for the grant's whole lifetime
/// (table growth never moves a slot), and the index may be reused after
/// the grant is revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle(u32);

impl Handle {
    /// Create a handle from its raw value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw handle value.
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// The table slot index this handle names.
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
