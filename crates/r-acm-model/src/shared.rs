//! ---
//! acm_section: "02-policy-model"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Reader/writer wrapper sharing one model between threads."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::Model;

/// Cloneable handle to a model guarded by a reader/writer lock.
///
/// Queries take the read lock and run concurrently. Every mutation, and any
/// mutation followed by its incremental role-link update, must happen under a
/// single write lock so readers never observe a half-applied batch.
#[derive(Debug, Clone, Default)]
pub struct SharedModel {
    inner: Arc<RwLock<Model>>,
}

impl SharedModel {
    pub fn new(model: Model) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    /// Acquire the read lock.
    pub fn read(&self) -> RwLockReadGuard<'_, Model> {
        self.inner.read()
    }

    /// Acquire the write lock.
    pub fn write(&self) -> RwLockWriteGuard<'_, Model> {
        self.inner.write()
    }

    /// Run `f` under the read lock.
    pub fn with_read<R>(&self, f: impl FnOnce(&Model) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` under the write lock.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut Model) -> R) -> R {
        f(&mut self.inner.write())
    }
}

impl From<Model> for SharedModel {
    fn from(model: Model) -> Self {
        Self::new(model)
    }
}
