//! # Storage backends
//!
//! Two interchangeable raw-buffer representations sit behind the [`RawBuffer`]
//! contract: [`CpuBuffer`] in main memory and [`GpuBuffer`] in accelerator memory.
//! A [`Backend`] marker type (`Cpu` or `Gpu`) selects one of them at the type level,
//! so a `Variable<T, R, Gpu>` can never be handed to code expecting host data.
//!
//! Buffers are always shared through `Arc`. Mutation (zero-fill, in-place fill,
//! gradient accumulation) goes through the buffer's own lock, which lets every view
//! and erased node holding the same `Arc` observe it.

use crate::device::StorageDevice;
use crate::types::Element;
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

mod cpu;
mod gpu;

pub use cpu::CpuBuffer;
pub use gpu::{copy_device_to_host, copy_host_to_device, GpuBuffer};

/// Contract shared by host and accelerator buffers.
///
/// Element order and count are preserved by every conversion. Allocation failure is
/// not recoverable at this layer.
pub trait RawBuffer<T: Element>: Debug + Send + Sync + Sized + 'static {
    /// Returns a `len`-element buffer filled with the additive identity.
    fn allocate_zeroed(len: usize) -> Self;

    /// Builds a buffer in this memory space from host values.
    fn from_host(values: Vec<T>) -> Self;

    /// Copies the whole buffer to host memory.
    fn to_host(&self) -> Vec<T>;

    /// Number of elements.
    fn len(&self) -> usize;

    /// Returns true if the buffer holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sets every element to `value`.
    fn fill(&self, value: T);

    /// Sets every element to the additive identity.
    fn zero_fill(&self) {
        self.fill(T::zero());
    }

    /// Returns an independent copy. The copy never aliases `self`.
    fn duplicate(&self) -> Self;

    /// Runs a read-only kernel over the buffer contents in its own memory space.
    fn launch<R>(&self, kernel: impl FnOnce(&[T]) -> R) -> R;

    /// Runs a kernel that may write the buffer contents in its own memory space.
    fn launch_mut<R>(&self, kernel: impl FnOnce(&mut [T]) -> R) -> R;
}

/// Type-level selection of a memory space.
pub trait Backend: Debug + Default + Clone + Copy + Send + Sync + 'static {
    /// Runtime tag for this memory space.
    const DEVICE: StorageDevice;

    /// The buffer type used for elements of type `T` in this memory space.
    type Buffer<T: Element>: RawBuffer<T>;
}

/// Main-memory backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cpu;

/// Accelerator-memory backend.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Gpu;

impl Backend for Cpu {
    const DEVICE: StorageDevice = StorageDevice::CPU;
    type Buffer<T: Element> = CpuBuffer<T>;
}

impl Backend for Gpu {
    const DEVICE: StorageDevice = StorageDevice::GPU;
    type Buffer<T: Element> = GpuBuffer<T>;
}

/// Converts a buffer from backend `S` to backend `D`.
///
/// When `S` and `D` are the same backend the very same `Arc` is returned: no copy is
/// made and writes through either handle stay visible to both.
pub fn transfer<T: Element, S: Backend, D: Backend>(buffer: &Arc<S::Buffer<T>>) -> Arc<D::Buffer<T>> {
    let erased: Arc<dyn Any + Send + Sync> = buffer.clone();
    match erased.downcast::<D::Buffer<T>>() {
        Ok(same) => same,
        Err(_) => {
            log::trace!(
                "transfer: {:?} -> {:?}, {} elements of {:?}",
                S::DEVICE,
                D::DEVICE,
                buffer.len(),
                T::DTYPE
            );
            Arc::new(<D::Buffer<T> as RawBuffer<T>>::from_host(buffer.to_host()))
        }
    }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod tests;
