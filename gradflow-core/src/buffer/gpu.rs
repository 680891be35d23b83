use super::{CpuBuffer, RawBuffer};
use crate::types::Element;
use log::trace;
use std::sync::RwLock;

/// Buffer holding elements in accelerator memory.
///
/// The contents are never handed out as a host slice. They are reached only through
/// kernel launches ([`RawBuffer::launch`], [`RawBuffer::launch_mut`]) or through the
/// explicit copies [`copy_host_to_device`] / [`copy_device_to_host`].
#[derive(Debug)]
pub struct GpuBuffer<T: Element> {
    memory: RwLock<Box<[T]>>,
}

impl<T: Element> GpuBuffer<T> {
    fn from_boxed(memory: Box<[T]>) -> Self {
        GpuBuffer {
            memory: RwLock::new(memory),
        }
    }

    fn size_bytes(&self) -> usize {
        self.len() * T::DTYPE.size_of()
    }
}

impl<T: Element> RawBuffer<T> for GpuBuffer<T> {
    fn allocate_zeroed(len: usize) -> Self {
        trace!("device alloc: {} bytes ({:?})", len * T::DTYPE.size_of(), T::DTYPE);
        GpuBuffer::from_boxed(vec![T::zero(); len].into_boxed_slice())
    }

    fn from_host(values: Vec<T>) -> Self {
        trace!("copy host -> device: {} bytes", values.len() * T::DTYPE.size_of());
        GpuBuffer::from_boxed(values.into_boxed_slice())
    }

    fn to_host(&self) -> Vec<T> {
        trace!("copy device -> host: {} bytes", self.size_bytes());
        self.memory.read().expect("RwLock poisoned").to_vec()
    }

    fn len(&self) -> usize {
        self.memory.read().expect("RwLock poisoned").len()
    }

    fn fill(&self, value: T) {
        self.launch_mut(|mem| mem.iter_mut().for_each(|x| *x = value));
    }

    fn duplicate(&self) -> Self {
        trace!("copy device -> device: {} bytes", self.size_bytes());
        let copy = self.memory.read().expect("RwLock poisoned").clone();
        GpuBuffer::from_boxed(copy)
    }

    fn launch<R>(&self, kernel: impl FnOnce(&[T]) -> R) -> R {
        let mem = self.memory.read().expect("RwLock poisoned");
        trace!("device kernel launch (read) over {} elements", mem.len());
        kernel(&mem[..])
    }

    fn launch_mut<R>(&self, kernel: impl FnOnce(&mut [T]) -> R) -> R {
        let mut mem = self.memory.write().expect("RwLock poisoned");
        trace!("device kernel launch (write) over {} elements", mem.len());
        kernel(&mut mem[..])
    }
}

/// Copies a host buffer into a new accelerator buffer.
pub fn copy_host_to_device<T: Element>(host: &CpuBuffer<T>) -> GpuBuffer<T> {
    GpuBuffer::from_host(host.to_host())
}

/// Copies an accelerator buffer into a new host buffer.
pub fn copy_device_to_host<T: Element>(device: &GpuBuffer<T>) -> CpuBuffer<T> {
    CpuBuffer::new(device.to_host())
}
