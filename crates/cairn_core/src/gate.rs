//! Deletion gate: keeps obsolete files on disk while they are referenced.
//!
//! Background maintenance may delete a table file the moment it becomes
//! obsolete. A checkpoint about to link or copy that file must hold the
//! gate closed. The gate is a reference count so several checkpoints can
//! hold it at once.

use crate::engine::Engine;
use crate::error::CoreResult;
use parking_lot::Mutex;
use tracing::{debug, warn};

/// Engine-side reference count of outstanding deletion suspensions.
///
/// Engines embed one of these and forward
/// [`Engine::disable_file_deletions`] and
/// [`Engine::enable_file_deletions`] to it.
#[derive(Debug, Default)]
pub struct FileDeletionGate {
    disabled: Mutex<u64>,
}

impl FileDeletionGate {
    /// Creates an open gate (deletions enabled).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes one share. Deletions stay disabled until every share is returned.
    pub fn disable(&self) {
        let mut disabled = self.disabled.lock();
        *disabled += 1;
        debug!(holders = *disabled, "file deletions disabled");
    }

    /// Returns one share, or every share with `force`.
    ///
    /// Returns true if deletions are enabled afterwards. Enabling an
    /// already-open gate is a no-op.
    pub fn enable(&self, force: bool) -> bool {
        let mut disabled = self.disabled.lock();
        if force {
            *disabled = 0;
        } else {
            *disabled = disabled.saturating_sub(1);
        }
        debug!(holders = *disabled, force, "file deletions enable requested");
        *disabled == 0
    }

    /// Returns true if no share is outstanding.
    #[must_use]
    pub fn deletions_enabled(&self) -> bool {
        *self.disabled.lock() == 0
    }

    /// Number of outstanding shares.
    #[must_use]
    pub fn disable_count(&self) -> u64 {
        *self.disabled.lock()
    }
}

/// Scoped share of an engine's deletion gate.
///
/// Acquired with [`DeletionGuard::acquire`] and returned exactly once,
/// either by [`DeletionGuard::release`] or on drop.
#[must_use = "dropping the guard re-enables file deletions"]
pub struct DeletionGuard<'a, E: Engine + ?Sized> {
    engine: &'a E,
    held: bool,
}

impl<'a, E: Engine + ?Sized> DeletionGuard<'a, E> {
    /// Disables file deletions on `engine`.
    ///
    /// # Errors
    ///
    /// Returns the engine's error; no share is held in that case.
    pub fn acquire(engine: &'a E) -> CoreResult<Self> {
        engine.disable_file_deletions()?;
        Ok(Self { engine, held: true })
    }

    /// Re-enables file deletions now.
    ///
    /// # Errors
    ///
    /// Returns the engine's error. The share counts as returned either way.
    pub fn release(mut self) -> CoreResult<()> {
        self.held = false;
        self.engine.enable_file_deletions(false)
    }
}

impl<E: Engine + ?Sized> Drop for DeletionGuard<'_, E> {
    fn drop(&mut self) {
        if self.held {
            self.held = false;
            if let Err(e) = self.engine.enable_file_deletions(false) {
                warn!(error = %e, "failed to re-enable file deletions");
            }
        }
    }
}
