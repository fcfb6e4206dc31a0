//! Climate units: state model, command vocabulary and the per-device
//! reconciliation controller.

mod command;
mod device;
pub mod mappings;
mod state;
#[cfg(test)]
pub(crate) mod testing;

pub use command::Command;
pub use device::display_id;
pub use device::Device;
pub use device::DeviceError;
pub use device::SyncState;
pub use device::COMPONENT;
pub use device::MANUFACTURER;
pub use device::PUSH_SETTLE;
pub use mappings::Vocabulary;
pub use state::State;
