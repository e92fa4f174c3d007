//! Test support utilities - only compiled in test builds.

use std::time::Duration;

use crate::memctl::{
    client::{ClientOptions, MemoryClient},
    shadow::ShadowMemory,
    sim::SimulatedDevice,
    types::{Device, Word},
};

/// Default options with no reset delay.
pub fn test_options() -> ClientOptions {
    ClientOptions {
        reset_settle: Duration::ZERO,
        ..ClientOptions::default()
    }
}

/// A client wired to a fresh simulated device with an all-zero shadow.
pub fn test_client(device: Device) -> MemoryClient<SimulatedDevice> {
    MemoryClient::new(
        SimulatedDevice::new(device),
        ShadowMemory::new(device),
        test_options(),
    )
    .unwrap()
}

/// Parses word literals, panicking on bad input.
pub fn words(text: &[&str]) -> Vec<Word> {
    text.iter().map(|w| w.parse().unwrap()).collect()
}
