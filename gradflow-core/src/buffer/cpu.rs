use super::RawBuffer;
use crate::types::Element;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Buffer holding elements in main memory.
#[derive(Debug)]
pub struct CpuBuffer<T: Element> {
    data: RwLock<Vec<T>>,
}

impl<T: Element> CpuBuffer<T> {
    /// Wraps an existing vector without copying it.
    pub fn new(data: Vec<T>) -> Self {
        CpuBuffer {
            data: RwLock::new(data),
        }
    }

    /// Acquires a read lock on the host data.
    /// Panics if the RwLock is poisoned.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.data.read().expect("RwLock poisoned")
    }

    /// Acquires a write lock on the host data.
    /// Panics if the RwLock is poisoned.
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<T>> {
        self.data.write().expect("RwLock poisoned")
    }
}

impl<T: Element> RawBuffer<T> for CpuBuffer<T> {
    fn allocate_zeroed(len: usize) -> Self {
        CpuBuffer::new(vec![T::zero(); len])
    }

    fn from_host(values: Vec<T>) -> Self {
        CpuBuffer::new(values)
    }

    fn to_host(&self) -> Vec<T> {
        self.read().clone()
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn fill(&self, value: T) {
        self.write().iter_mut().for_each(|x| *x = value);
    }

    fn duplicate(&self) -> Self {
        CpuBuffer::new(self.read().clone())
    }

    fn launch<R>(&self, kernel: impl FnOnce(&[T]) -> R) -> R {
        kernel(self.read().as_slice())
    }

    fn launch_mut<R>(&self, kernel: impl FnOnce(&mut [T]) -> R) -> R {
        kernel(self.write().as_mut_slice())
    }
}
