/// Represents the physical location where variable data is stored.
///
/// This is the runtime counterpart of the [`Backend`](crate::buffer::Backend)
/// marker types; erased nodes carry it so that a restore to the wrong backend can
/// be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageDevice {
    /// Data is stored in main system memory (RAM).
    /// This is the default device.
    #[default]
    CPU,
    /// Data is stored in accelerator memory and is only reachable through kernel
    /// launches or explicit host/device copies.
    GPU,
}
