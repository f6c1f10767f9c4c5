//! # Warden Grant
//!
//! This crate implements the Warden runtime's capability grant tables.
//! A grant is a revocable authorization letting one process permit
//! another process, or a relay acting on a third party's behalf, to
//! read and/or write a bounded region of memory, without exposing any
//! broader address-space access.
//!
//! Each process owns one [`GrantTable`]; the handle identifying a grant
//! travels to the grantee over the message transport, and the privileged
//! component validates the handle against the granter's table when it
//! performs the actual copy. Neither the transport nor the copy routine
//! lives here: this crate is the table, its lifecycle, and the contract
//! that keeps the privileged component's cached view of the table's
//! storage in agreement with the table itself.
//!
//! ## Core Components
//!
//! - **Model**: the grant variants (direct, indirect, magic), access
//!   rights, and memory regions
//! - **Table**: the growable slot table: allocation, growth, lookup,
//!   disable, revoke, batch reservation
//! - **Sync**: the [`PrivilegeSync`] handshake announced on every
//!   relocation, resize, and context duplication
//!
//! ## Usage Example
//!
//! ```rust
//! use warden_core::id::ProcessId;
//! use warden_grant::model::{AccessMode, Region};
//! use warden_grant::sync::InMemorySync;
//! use warden_grant::table::GrantTable;
//!
//! // The privileged side's view; the table takes a clone of it
//! let sync = InMemorySync::new();
//! let mut table = GrantTable::new(ProcessId::from_raw(1), Box::new(sync.clone()));
//!
//! // Let process 7 read 64 bytes of our memory at 0x1000
//! let handle = table
//!     .grant_direct(ProcessId::from_raw(7), Region::new(0x1000, 64), AccessMode::READ)
//!     .unwrap();
//!
//! // The first allocation grew the table; the privileged side was told
//! assert_eq!(sync.location(), Some(table.location()));
//!
//! // Withdraw the authorization and free the slot
//! table.revoke(handle).unwrap();
//! ```

pub mod model;
pub mod sync;
pub mod table;

pub use model::{AccessMode, Endpoints, Grant, Region};
pub use sync::{InMemorySync, PrivilegeSync, TableLocation};
pub use table::{GrantTable, TableConfig};
