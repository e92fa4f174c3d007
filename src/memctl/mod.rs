pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod helpers;
pub mod persist;
#[cfg(feature = "serial")]
pub mod serial;
pub mod shadow;
pub mod sim;
pub mod sync;
pub(crate) mod table;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

pub use client::{ClientOptions, MemoryClient, Verification};
pub use codec::{Frame, Header};
pub use config::Config;
pub use error::{FramingError, MemctlError, Result, ValidationError};
#[cfg(feature = "serial")]
pub use serial::SerialTransport;
pub use shadow::{ShadowMemory, ShadowPaths};
pub use sim::SimulatedDevice;
pub use sync::{SyncPolicy, SyncReport};
pub use transport::Transport;
pub use types::{Device, Op, Region, Word};

pub mod prelude {
    #[cfg(feature = "serial")]
    pub use super::SerialTransport;
    pub use super::{
        ClientOptions, Config, Device, FramingError, MemctlError, MemoryClient, Region,
        ShadowMemory, ShadowPaths, SimulatedDevice, SyncPolicy, SyncReport, Transport,
        ValidationError, Verification, Word,
    };
}
