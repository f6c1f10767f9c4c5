//! The grant table: an indexed, growable store of revocable grants.
//!
//! Every process owns exactly one [`GrantTable`], threaded through its
//! runtime context. Handles index the table directly; the table only ever
//! grows, and growth never changes the index of an existing handle.
//!
//! Two properties are load-bearing here:
//!
//! - **The privileged handshake.** The component that performs validated
//!   copies caches the table's address and capacity. New backing storage
//!   is installed only after [`PrivilegeSync::set_table`] accepts it; on
//!   rejection the new storage is discarded and the old table stays
//!   authoritative, so the two views can never disagree.
//! - **Slot reuse order.** Allocation scans linearly from index 0 and
//!   hands out the lowest free slot, so freed slots are reused
//!   lowest-index-first. The scan is O(capacity) per allocation; table
//!   size tracks live grants rather than traffic volume, so this is an
//!   accepted cost and deliberately not a free-list.
//!
//! The table is single-threaded and synchronous: no operation blocks,
//! awaits, or times out. If threads within one process share a table,
//! the caller serializes access.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use warden_core::error::{GrantError, SyncError};
use warden_core::id::{Handle, ProcessId};

use crate::model::{AccessMode, Endpoints, Grant, Region};
use crate::sync::{PrivilegeSync, TableLocation};

/// Configuration for a process's grant table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableConfig {
    /// Number of slots to reserve at construction.
    pub initial_capacity: usize,

    /// Ceiling on the number of slots; growth past it fails the same way
    /// backing-storage exhaustion would. `None` means unbounded.
    pub max_slots: Option<usize>,
}

/// Lifecycle state of one table slot.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// Not occupied; the index is free for reuse.
    Free,

    /// Occupied by a batch reservation that has not been filled in yet.
    /// Never honorable.
    Reserved,

    /// Occupied by a grant. `valid` is cleared by `disable`; once cleared
    /// the grant is no longer honorable and the only remaining transition
    /// is revocation.
    Active { grant: Grant, valid: bool },
}

impl Slot {
    fn is_free(&self) -> bool {
        matches!(self, Slot::Free)
    }
}

/// A process-local, growable table of revocable grants.
///
/// # Examples
///
/// ```
/// use warden_core::id::ProcessId;
/// use warden_grant::model::{AccessMode, Region};
/// use warden_grant::sync::InMemorySync;
/// use warden_grant::table::GrantTable;
///
/// let sync = InMemorySync::new();
/// let mut table = GrantTable::new(ProcessId::from_raw(1), Box::new(sync.clone()));
///
/// let handle = table
///     .grant_direct(ProcessId::from_raw(7), Region::new(0x1000, 64), AccessMode::READ)
///     .unwrap();
///
/// let endpoints = table.lookup(handle).unwrap();
/// assert_eq!(endpoints.granter, ProcessId::from_raw(1));
/// assert_eq!(endpoints.grantee, ProcessId::from_raw(7));
///
/// table.revoke(handle).unwrap();
/// assert!(table.lookup(handle).is_err());
/// ```
pub struct GrantTable {
    /// The process this table belongs to; granter of every direct grant
    owner: ProcessId,
    /// Backing storage; the length is the table's capacity
    slots: Vec<Slot>,
    config: TableConfig,
    sync: Box<dyn PrivilegeSync>,
}

impl GrantTable {
    /// Create an empty table owned by `owner`.
    ///
    /// The table starts with capacity zero; the privileged side first
    /// learns a storage location when the table grows.
    pub fn new(owner: ProcessId, sync: Box<dyn PrivilegeSync>) -> Self {
        Self {
            owner,
            slots: Vec::new(),
            config: TableConfig::default(),
            sync,
        }
    }

    /// Create a table with the given configuration.
    ///
    /// A nonzero `initial_capacity` is announced to the privileged side
    /// immediately, since the storage exists from the start.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the initial announcement is refused;
    /// no table is constructed in that case.
    pub fn with_config(
        owner: ProcessId,
        config: TableConfig,
        mut sync: Box<dyn PrivilegeSync>,
    ) -> Result<Self, SyncError> {
        let mut slots = Vec::new();
        if config.initial_capacity > 0 {
            slots = vec![Slot::Free; config.initial_capacity];
            sync.set_table(TableLocation::new(slots.as_ptr() as usize, slots.len()))?;
        }
        Ok(Self {
            owner,
            slots,
            config,
            sync,
        })
    }

    /// The process that owns this table.
    pub fn owner(&self) -> ProcessId {
        self.owner
    }

    /// Current number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of unoccupied slots.
    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_free()).count()
    }

    /// Number of filled grants, honorable or disabled.
    pub fn active_grants(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Active { .. }))
            .count()
    }

    /// Returns true if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Slot::is_free)
    }

    /// The backing storage as the privileged side must know it.
    pub fn location(&self) -> TableLocation {
        TableLocation::new(self.slots.as_ptr() as usize, self.slots.len())
    }

    /// Record a grant of a region of the owner's own memory.
    ///
    /// # Errors
    ///
    /// - [`GrantError::InvalidArgument`] if `access` is empty or carries
    ///   unknown bits, or if the region's end overflows the address space.
    /// - [`GrantError::Exhausted`] if no slot is free and the table could
    ///   not grow. The table is unchanged in every error case.
    pub fn grant_direct(
        &mut self,
        grantee: ProcessId,
        region: Region,
        access: AccessMode,
    ) -> Result<Handle, GrantError> {
        validate_region_access(&region, access)?;
        let handle = self.allocate_slot()?;
        self.slots[handle.index()] = Slot::Active {
            grant: Grant::Direct {
                grantee,
                region,
                access,
            },
            valid: true,
        };
        trace!("direct grant {} recorded for grantee {}", handle, grantee);
        Ok(handle)
    }

    /// Record a delegation to an existing grant on `granter`'s table.
    ///
    /// The remote handle is recorded verbatim: whether it actually names
    /// a grant on `granter`'s table is checked by the privileged copy
    /// routine when the chain is resolved, not here. Because the relay
    /// inherits whatever the referenced grant allows, callers must treat
    /// this as a capability-widening operation with no automatic
    /// narrowing of rights.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::Exhausted`] if no slot is free and the table
    /// could not grow.
    pub fn grant_indirect(
        &mut self,
        grantee: ProcessId,
        granter: ProcessId,
        remote: Handle,
    ) -> Result<Handle, GrantError> {
        let handle = self.allocate_slot()?;
        self.slots[handle.index()] = Slot::Active {
            grant: Grant::Indirect {
                grantee,
                granter,
                remote,
            },
            valid: true,
        };
        trace!(
            "indirect grant {} recorded: grantee {}, remote {} on {}",
            handle,
            grantee,
            remote,
            granter
        );
        Ok(handle)
    }

    /// Record a privileged grant into a third party's memory.
    ///
    /// This records intent only. It is meant for relays that are entitled
    /// to speak for `granter`; the entitlement itself is enforced by the
    /// privileged component at copy time.
    ///
    /// # Errors
    ///
    /// Same as [`GrantTable::grant_direct`].
    pub fn grant_magic(
        &mut self,
        grantee: ProcessId,
        granter: ProcessId,
        region: Region,
        access: AccessMode,
    ) -> Result<Handle, GrantError> {
        validate_region_access(&region, access)?;
        let handle = self.allocate_slot()?;
        self.slots[handle.index()] = Slot::Active {
            grant: Grant::Magic {
                grantee,
                granter,
                region,
                access,
            },
            valid: true,
        };
        trace!(
            "magic grant {} recorded: grantee {}, granter {}",
            handle,
            grantee,
            granter
        );
        Ok(handle)
    }

    /// Fill a batch-reserved slot with a validated grant.
    ///
    /// # Errors
    ///
    /// - [`GrantError::InvalidArgument`] under the same rules as the
    ///   direct constructors, for region-carrying grants.
    /// - [`GrantError::InvalidHandle`] unless the slot is a pending
    ///   reservation. Filled or free slots are never overwritten.
    pub fn assign(&mut self, handle: Handle, grant: Grant) -> Result<(), GrantError> {
        if let Grant::Direct { region, access, .. } | Grant::Magic { region, access, .. } = &grant
        {
            validate_region_access(region, *access)?;
        }
        match self.slots.get_mut(handle.index()) {
            Some(slot @ Slot::Reserved) => {
                *slot = Slot::Active { grant, valid: true };
                trace!("reserved slot {} filled", handle);
                Ok(())
            }
            _ => Err(GrantError::InvalidHandle(handle)),
        }
    }

    /// The endpoints of an active, honorable grant.
    ///
    /// For a direct grant the granter is this table's owner; for indirect
    /// and magic grants both endpoints are returned exactly as recorded.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidHandle`] if the index is out of
    /// range, the slot is unoccupied or only reserved, or the grant has
    /// been disabled.
    pub fn lookup(&self, handle: Handle) -> Result<Endpoints, GrantError> {
        let grant = self.grant(handle)?;
        Ok(Endpoints {
            granter: grant.granter().unwrap_or(self.owner),
            grantee: grant.grantee(),
        })
    }

    /// The grant behind an active, honorable handle.
    ///
    /// This is the read-only surface the privileged copy routine consumes
    /// once it has been handed a handle to validate.
    ///
    /// # Errors
    ///
    /// Same rules as [`GrantTable::lookup`].
    pub fn grant(&self, handle: Handle) -> Result<&Grant, GrantError> {
        match self.slots.get(handle.index()) {
            Some(Slot::Active { grant, valid: true }) => Ok(grant),
            _ => Err(GrantError::InvalidHandle(handle)),
        }
    }

    /// Stop honoring a grant while keeping its slot occupied.
    ///
    /// Idempotent: disabling an already-disabled grant succeeds. There is
    /// no way to make a disabled grant honorable again; the slot stays
    /// occupied until [`GrantTable::revoke`] frees it.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidHandle`] if the slot is unoccupied or
    /// the index is out of range.
    pub fn disable(&mut self, handle: Handle) -> Result<(), GrantError> {
        match self.slots.get_mut(handle.index()) {
            None | Some(Slot::Free) => Err(GrantError::InvalidHandle(handle)),
            // A reservation is not honorable to begin with
            Some(Slot::Reserved) => Ok(()),
            Some(Slot::Active { valid, .. }) => {
                *valid = false;
                trace!("grant {} disabled", handle);
                Ok(())
            }
        }
    }

    /// Free a slot, making its index available for reuse.
    ///
    /// Not idempotent: revoking a handle whose slot is already free is an
    /// error, unlike [`GrantTable::disable`].
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidHandle`] if the slot is already free
    /// or the index is out of range.
    pub fn revoke(&mut self, handle: Handle) -> Result<(), GrantError> {
        match self.slots.get_mut(handle.index()) {
            None | Some(Slot::Free) => Err(GrantError::InvalidHandle(handle)),
            Some(slot) => {
                *slot = Slot::Free;
                trace!("grant {} revoked", handle);
                Ok(())
            }
        }
    }

    /// Reserve up to `n` slots for the caller to fill in with
    /// [`GrantTable::assign`].
    ///
    /// Best-effort: if growth fails partway, the handles reserved so far
    /// are returned as a success value, deliberately distinct from the
    /// hard-failing single-grant calls, so bulk callers can use what they
    /// got and retry for the rest later.
    pub fn allocate_batch(&mut self, n: usize) -> Vec<Handle> {
        let mut handles = Vec::with_capacity(n);
        for _ in 0..n {
            match self.allocate_slot() {
                Ok(handle) => {
                    self.slots[handle.index()] = Slot::Reserved;
                    handles.push(handle);
                }
                Err(_) => break,
            }
        }
        if handles.len() < n {
            debug!("batch reservation satisfied {} of {} slots", handles.len(), n);
        }
        handles
    }

    /// Re-announce the current backing storage to the privileged side.
    ///
    /// Required whenever the table's memory has been duplicated into a
    /// new execution context, and harmless at any other time: the call is
    /// idempotent and modifies nothing on the table side.
    ///
    /// # Errors
    ///
    /// Returns the [`SyncError`] reported by the privileged component;
    /// the table itself is left untouched.
    pub fn reload(&mut self) -> Result<(), SyncError> {
        let location = self.location();
        self.sync.set_table(location)?;
        debug!(
            "grant table of {} re-announced: {} slots",
            self.owner, location.capacity
        );
        Ok(())
    }

    /// Active, honorable grants in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Grant)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Active { grant, valid: true } => {
                    Some((Handle::from_raw(index as u32), grant))
                }
                _ => None,
            })
    }

    /// Find the lowest free slot, growing the table if none remains.
    fn allocate_slot(&mut self) -> Result<Handle, GrantError> {
        if let Some(index) = self.slots.iter().position(Slot::is_free) {
            return Ok(Handle::from_raw(index as u32));
        }
        // The table is full; the first slot past the old end is free
        // immediately after a successful growth step.
        let index = self.slots.len();
        self.grow()?;
        Ok(Handle::from_raw(index as u32))
    }

    /// Replace the backing storage with a doubled copy.
    ///
    /// The new storage becomes authoritative only once the privileged
    /// side accepts it; on rejection it is discarded and the old table
    /// remains in place, untouched.
    fn grow(&mut self) -> Result<(), GrantError> {
        let old_capacity = self.slots.len();
        let new_capacity = (old_capacity + 1) * 2;

        if let Some(limit) = self.config.max_slots {
            if new_capacity > limit {
                warn!(
                    "grant table of {} cannot grow from {} to {} slots: ceiling is {}",
                    self.owner, old_capacity, new_capacity, limit
                );
                return Err(GrantError::Exhausted);
            }
        }

        let mut new_slots = Vec::with_capacity(new_capacity);
        new_slots.extend_from_slice(&self.slots);
        new_slots.resize(new_capacity, Slot::Free);

        let location = TableLocation::new(new_slots.as_ptr() as usize, new_capacity);
        if let Err(err) = self.sync.set_table(location) {
            warn!(
                "privileged side refused grown grant table of {} ({} -> {} slots): {}",
                self.owner, old_capacity, new_capacity, err
            );
            return Err(GrantError::Exhausted);
        }

        debug!(
            "grant table of {} grown from {} to {} slots",
            self.owner, old_capacity, new_capacity
        );
        self.slots = new_slots;
        Ok(())
    }
}

/// Check the rules every region-carrying grant must satisfy.
fn validate_region_access(region: &Region, access: AccessMode) -> Result<(), GrantError> {
    if access.is_empty() {
        return Err(GrantError::InvalidArgument(
            "access rights must include read or write".into(),
        ));
    }
    if !AccessMode::all().contains(access) {
        return Err(GrantError::InvalidArgument(format!(
            "unknown access bits {:#010b}",
            access.bits()
        )));
    }
    if region.end().is_none() {
        return Err(GrantError::InvalidArgument(format!(
            "region {:#x}+{} overflows the address space",
            region.base, region.len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::InMemorySync;

    fn endpoint(raw: u32) -> ProcessId {
        ProcessId::from_raw(raw)
    }

    fn table_with_sync() -> (GrantTable, InMemorySync) {
        let sync = InMemorySync::new();
        let table = GrantTable::new(endpoint(1), Box::new(sync.clone()));
        (table, sync)
    }

    #[test]
    fn test_grant_and_lookup() {
        let (mut table, _sync) = table_with_sync();

        let handle = table
            .grant_direct(endpoint(7), Region::new(0x1000, 64), AccessMode::READ)
            .unwrap();

        let endpoints = table.lookup(handle).unwrap();
        assert_eq!(endpoints.granter, endpoint(1));
        assert_eq!(endpoints.grantee, endpoint(7));

        // The read-only accessor exposes the recorded payload
        match table.grant(handle).unwrap() {
            Grant::Direct {
                grantee,
                region,
                access,
            } => {
                assert_eq!(*grantee, endpoint(7));
                assert_eq!(*region, Region::new(0x1000, 64));
                assert_eq!(*access, AccessMode::READ);
            }
            other => panic!("unexpected grant variant: {:?}", other),
        }
    }

    #[test]
    fn test_empty_access_is_rejected() {
        let (mut table, _sync) = table_with_sync();

        let err = table
            .grant_direct(endpoint(7), Region::new(0x1000, 64), AccessMode::empty())
            .unwrap_err();
        assert!(matches!(err, GrantError::InvalidArgument(_)));

        // Nothing was allocated
        assert_eq!(table.capacity(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_unknown_access_bits_are_rejected() {
        let (mut table, _sync) = table_with_sync();

        let bogus = AccessMode::from_bits_retain(0b0000_0100);
        let err = table
            .grant_direct(endpoint(7), Region::new(0x1000, 64), bogus)
            .unwrap_err();
        assert!(matches!(err, GrantError::InvalidArgument(_)));
    }

    #[test]
    fn test_overflowing_region_is_rejected() {
        let (mut table, _sync) = table_with_sync();

        let err = table
            .grant_magic(
                endpoint(2),
                endpoint(3),
                Region::new(usize::MAX, 2),
                AccessMode::WRITE,
            )
            .unwrap_err();
        assert!(matches!(err, GrantError::InvalidArgument(_)));
    }

    #[test]
    fn test_revoked_slot_is_reused_lowest_first() {
        let (mut table, _sync) = table_with_sync();

        let region = Region::new(0x1000, 64);
        let h0 = table.grant_direct(endpoint(7), region, AccessMode::READ).unwrap();
        let h1 = table.grant_direct(endpoint(8), region, AccessMode::READ).unwrap();
        let h2 = table.grant_direct(endpoint(9), region, AccessMode::READ).unwrap();
        assert_eq!((h0.index(), h1.index(), h2.index()), (0, 1, 2));

        table.revoke(h1).unwrap();
        table.revoke(h0).unwrap();

        // The scan starts at index 0, so the lowest freed slot wins
        let reused = table.grant_direct(endpoint(10), region, AccessMode::WRITE).unwrap();
        assert_eq!(reused.index(), 0);
    }

    #[test]
    fn test_disable_is_idempotent_and_one_way() {
        let (mut table, _sync) = table_with_sync();

        let handle = table
            .grant_direct(endpoint(7), Region::new(0x1000, 64), AccessMode::READ)
            .unwrap();

        table.disable(handle).unwrap();
        assert!(matches!(
            table.lookup(handle),
            Err(GrantError::InvalidHandle(_))
        ));

        // Disabling again succeeds and changes nothing
        table.disable(handle).unwrap();
        assert_eq!(table.active_grants(), 1);

        // The slot is still occupied, so revocation still works
        table.revoke(handle).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_disable_requires_occupied_slot() {
        let (mut table, _sync) = table_with_sync();

        let err = table.disable(Handle::from_raw(0)).unwrap_err();
        assert!(matches!(err, GrantError::InvalidHandle(_)));

        let handle = table
            .grant_direct(endpoint(7), Region::new(0x1000, 64), AccessMode::READ)
            .unwrap();
        table.revoke(handle).unwrap();
        let err = table.disable(handle).unwrap_err();
        assert!(matches!(err, GrantError::InvalidHandle(_)));
    }

    #[test]
    fn test_revoke_is_not_idempotent() {
        let (mut table, _sync) = table_with_sync();

        let handle = table
            .grant_direct(endpoint(7), Region::new(0x1000, 64), AccessMode::READ)
            .unwrap();
        table.revoke(handle).unwrap();

        let err = table.revoke(handle).unwrap_err();
        assert_eq!(err, GrantError::InvalidHandle(handle));
    }

    #[test]
    fn test_assign_fills_only_reservations() {
        let (mut table, _sync) = table_with_sync();

        let handles = table.allocate_batch(2);
        assert_eq!(handles.len(), 2);

        // Reservations are occupied but not honorable
        assert!(table.lookup(handles[0]).is_err());
        assert_eq!(table.free_slots(), 0);

        table
            .assign(
                handles[0],
                Grant::Direct {
                    grantee: endpoint(7),
                    region: Region::new(0x1000, 64),
                    access: AccessMode::READ,
                },
            )
            .unwrap();
        assert_eq!(table.lookup(handles[0]).unwrap().grantee, endpoint(7));

        // A filled slot cannot be assigned again
        let err = table
            .assign(
                handles[0],
                Grant::Indirect {
                    grantee: endpoint(2),
                    granter: endpoint(9),
                    remote: Handle::from_raw(3),
                },
            )
            .unwrap_err();
        assert!(matches!(err, GrantError::InvalidHandle(_)));

        // Neither can a free one
        table.revoke(handles[1]).unwrap();
        let err = table
            .assign(
                handles[1],
                Grant::Indirect {
                    grantee: endpoint(2),
                    granter: endpoint(9),
                    remote: Handle::from_raw(3),
                },
            )
            .unwrap_err();
        assert!(matches!(err, GrantError::InvalidHandle(_)));
    }

    #[test]
    fn test_assign_validates_region_grants() {
        let (mut table, _sync) = table_with_sync();

        let handles = table.allocate_batch(1);
        let err = table
            .assign(
                handles[0],
                Grant::Magic {
                    grantee: endpoint(2),
                    granter: endpoint(9),
                    region: Region::new(0x2000, 32),
                    access: AccessMode::empty(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, GrantError::InvalidArgument(_)));

        // The reservation survives a failed assignment
        table
            .assign(
                handles[0],
                Grant::Magic {
                    grantee: endpoint(2),
                    granter: endpoint(9),
                    region: Region::new(0x2000, 32),
                    access: AccessMode::WRITE,
                },
            )
            .unwrap();
    }

    #[test]
    fn test_slot_ceiling_exhausts_allocation() {
        let sync = InMemorySync::new();
        let config = TableConfig {
            initial_capacity: 2,
            max_slots: Some(2),
        };
        let mut table =
            GrantTable::with_config(endpoint(1), config, Box::new(sync.clone())).unwrap();

        let region = Region::new(0x1000, 64);
        table.grant_direct(endpoint(7), region, AccessMode::READ).unwrap();
        table.grant_direct(endpoint(8), region, AccessMode::READ).unwrap();

        let err = table
            .grant_direct(endpoint(9), region, AccessMode::READ)
            .unwrap_err();
        assert_eq!(err, GrantError::Exhausted);

        // The failed growth changed nothing: capacity, contents, and the
        // privileged view all stay as they were.
        assert_eq!(table.capacity(), 2);
        assert_eq!(table.active_grants(), 2);
        assert_eq!(sync.accepted(), 1);
    }

    #[test]
    fn test_iter_skips_disabled_and_reserved() {
        let (mut table, _sync) = table_with_sync();

        let region = Region::new(0x1000, 64);
        let h0 = table.grant_direct(endpoint(7), region, AccessMode::READ).unwrap();
        let h1 = table.grant_direct(endpoint(8), region, AccessMode::READ).unwrap();
        table.allocate_batch(1);
        table.disable(h1).unwrap();

        let visible: Vec<Handle> = table.iter().map(|(handle, _)| handle).collect();
        assert_eq!(visible, vec![h0]);
    }

    #[test]
    fn test_config_serde() {
        let config = TableConfig {
            initial_capacity: 4,
            max_slots: Some(64),
        };
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: TableConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }
}
