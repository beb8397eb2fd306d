use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Managed CPU buffer.
///
/// A fixed-length run of `f32` shared by every [`Tensor`](crate::Tensor) that views it.
/// Cloning the handle shares the storage, so a write through one view is visible through
/// all of them. The length is fixed at construction.
#[derive(Clone)]
pub struct CompactArray {
    inner: Arc<RwLock<Box<[f32]>>>,
}

impl CompactArray {
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data.into_boxed_slice())),
        }
    }

    pub fn from_slice(data: &[f32]) -> Self {
        Self::from_vec(data.to_vec())
    }

    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![0.; len])
    }

    /// Number of elements held.
    pub fn size(&self) -> usize {
        self.read().len()
    }

    /// Read access to the stored elements.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[f32]>> {
        self.read()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.read().to_vec()
    }

    /// Takes a read lock that cannot deadlock against another read lock held by this thread.
    pub fn read(&self) -> RwLockReadGuard<'_, Box<[f32]>> {
        self.inner.read_recursive()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Box<[f32]>> {
        self.inner.write()
    }

    /// True if both handles refer to the same storage.
    pub fn ptr_eq(&self, other: &CompactArray) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of handles currently sharing this storage.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn deep_clone(&self) -> Self {
        Self::from_vec(self.to_vec())
    }

    pub fn dump(&self, full: bool) -> String {
        let data = self.read();
        let length = if data.len() < 64 { data.len() } else { 64 };
        if full || data.len() <= 2 * length {
            format!("{:?}", &data[..])
        } else {
            format!("{:?}...{:?}", &data[..length], &data[data.len() - length..])
        }
    }
}

impl From<Vec<f32>> for CompactArray {
    fn from(data: Vec<f32>) -> Self {
        Self::from_vec(data)
    }
}

impl PartialEq for CompactArray {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        *self.read() == *other.read()
    }
}

impl std::fmt::Debug for CompactArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactArray")
            .field("size", &self.size())
            .field("data", &self.dump(false))
            .finish()
    }
}
