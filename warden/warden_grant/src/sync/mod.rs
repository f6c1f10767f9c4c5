//! Privileged-view synchronization.
//!
//! The privileged component that performs validated copies keeps its own
//! cached record of where every process's grant table lives. That cache
//! and the table itself must never disagree: a relocation or resize is
//! not authoritative until the privileged side has accepted it, and the
//! table installs new storage only after acceptance.
//!
//! This module defines the contract as a trait rather than an exported
//! raw pointer, so the handshake is explicit at the one place it happens.

mod in_memory;

pub use in_memory::InMemorySync;

use warden_core::error::SyncError;

/// Address and capacity of a grant table's backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLocation {
    /// Address of the first slot
    pub addr: usize,
    /// Number of slots
    pub capacity: usize,
}

impl TableLocation {
    /// Creates a new table location
    pub const fn new(addr: usize, capacity: usize) -> Self {
        Self { addr, capacity }
    }
}

/// The privileged collaborator's view of one table's storage.
///
/// `set_table` must be called on every relocation or resize, and again
/// after the table's memory has been duplicated into a new execution
/// context. Acceptance is the precondition for the announced storage to
/// be considered authoritative; on rejection the caller must keep using
/// its previous storage unchanged.
pub trait PrivilegeSync {
    /// Announce the table's current backing storage.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the privileged component refuses the
    /// announced location. The caller's table state must be left exactly
    /// as it was before the call.
    fn set_table(&mut self, location: TableLocation) -> Result<(), SyncError>;
}
