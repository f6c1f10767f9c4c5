//! Grant variants.
//!
//! A grant is a recorded authorization letting one process's memory be
//! accessed by another, possibly relayed through a third party. The
//! variants are a tagged union with per-variant payloads, so no code can
//! read a field that does not apply to the kind at hand.

use warden_core::id::{Handle, ProcessId};

use super::access::{AccessMode, Region};

/// One recorded authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// The table owner grants a region of its own memory to `grantee`.
    Direct {
        /// The process allowed to access the region
        grantee: ProcessId,
        /// The granted region of the owner's memory
        region: Region,
        /// The operations the grantee may perform
        access: AccessMode,
    },

    /// Re-points to an existing grant on another party's table, extending
    /// a trust chain without re-specifying range or access rights.
    ///
    /// The remote handle is recorded verbatim and carries no access mask
    /// of its own; it inherits whatever the referenced grant allows. The
    /// privileged copy routine resolves the chain at copy time.
    Indirect {
        /// The process allowed to use the relayed grant
        grantee: ProcessId,
        /// The process on whose table the referenced grant lives
        granter: ProcessId,
        /// The referenced grant's handle on `granter`'s table
        remote: Handle,
    },

    /// A privileged variant authorizing access into a third party's
    /// memory, not the recording process's own. Intended for relays that
    /// already hold the privilege to speak for `granter`; the privilege
    /// check itself happens in the privileged component at copy time.
    Magic {
        /// The process allowed to access the region
        grantee: ProcessId,
        /// The process that owns the memory
        granter: ProcessId,
        /// The granted region of `granter`'s memory
        region: Region,
        /// The operations the grantee may perform
        access: AccessMode,
    },
}

impl Grant {
    /// The process this grant authorizes.
    pub fn grantee(&self) -> ProcessId {
        match self {
            Self::Direct { grantee, .. }
            | Self::Indirect { grantee, .. }
            | Self::Magic { grantee, .. } => *grantee,
        }
    }

    /// The granting endpoint as recorded.
    ///
    /// A direct grant records no granter of its own (the granter is the
    /// owner of the table the grant lives in), so this returns `None`
    /// for it.
    pub fn granter(&self) -> Option<ProcessId> {
        match self {
            Self::Direct { .. } => None,
            Self::Indirect { granter, .. } | Self::Magic { granter, .. } => Some(*granter),
        }
    }

    /// A short name for the grant kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Indirect { .. } => "indirect",
            Self::Magic { .. } => "magic",
        }
    }
}

/// The two endpoints of a grant, as reported by lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    /// The granting process
    pub granter: ProcessId,
    /// The process the grant authorizes
    pub grantee: ProcessId,
}
