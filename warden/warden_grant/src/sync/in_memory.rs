use std::cell::RefCell;
use std::rc::Rc;

use warden_core::error::SyncError;

use super::{PrivilegeSync, TableLocation};

/// The cached view held on behalf of the privileged side.
#[derive(Debug, Default)]
struct SyncState {
    /// Last accepted location, if any
    location: Option<TableLocation>,
    /// Number of accepted announcements
    accepted: usize,
    /// When set, refuse every announcement
    rejecting: bool,
}

/// An in-memory implementation of the [`PrivilegeSync`] trait.
///
/// This stands in for the privileged component within a single process:
/// it caches the last accepted table location the way the privileged side
/// would, and can be told to refuse announcements so callers can exercise
/// the rejection path.
///
/// Clones share the same state. The table takes one clone; the creating
/// code keeps another to inspect what the privileged side currently
/// believes. Like the grant table itself, this type is single-threaded;
/// callers serialize access.
#[derive(Debug, Clone, Default)]
pub struct InMemorySync {
    state: Rc<RefCell<SyncState>>,
}

impl InMemorySync {
    /// Creates a new view with nothing announced yet
    pub fn new() -> Self {
        Self::default()
    }

    /// The last accepted table location, if any announcement succeeded.
    pub fn location(&self) -> Option<TableLocation> {
        self.state.borrow().location
    }

    /// Number of announcements accepted so far.
    pub fn accepted(&self) -> usize {
        self.state.borrow().accepted
    }

    /// Make every subsequent announcement fail (or succeed again).
    ///
    /// While rejecting, the cached view keeps whatever was last accepted,
    /// exactly as the real privileged side would after refusing an
    /// update.
    pub fn set_rejecting(&self, rejecting: bool) {
        self.state.borrow_mut().rejecting = rejecting;
    }
}

impl PrivilegeSync for InMemorySync {
    fn set_table(&mut self, location: TableLocation) -> Result<(), SyncError> {
        let mut state = self.state.borrow_mut();
        if state.rejecting {
            return Err(SyncError::Rejected("announcement refused".into()));
        }
        state.location = Some(location);
        state.accepted += 1;
        Ok(())
    }
}
