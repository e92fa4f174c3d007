//! Host-side client for a soft memory controller on an iCE40 FPGA.
//!
//! The controller sits behind a byte-oriented serial link and exposes two
//! memory technologies: block RAM (BRAM) and, on parts that have it,
//! single-port RAM (SPRAM). This crate frames read/write requests for it,
//! keeps a host-side shadow of what the device should hold, and verifies
//! device responses against that shadow to catch lost frame alignment or
//! hardware faults.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ MemoryClient<T: Transport>                   │
//! │                                              │
//! │  read / write / verify / warm-boot / reset   │
//! │  sync_device (bounded probe loop)            │
//! │                                              │
//! │   ┌────────────┐   ┌──────────────────────┐  │
//! │   │ codec      │   │ ShadowMemory         │  │
//! │   │ (pure)     │   │ BRAM + SPRAM tables, │  │
//! │   │            │   │ dirty blocks, files  │  │
//! │   └────────────┘   └──────────────────────┘  │
//! └──────────────────────┬───────────────────────┘
//!                        │ frames
//!          ┌─────────────┴─────────────┐
//!          ▼                           ▼
//!   SerialTransport             SimulatedDevice
//!   (feature "serial")          (software model)
//! ```
//!
//! - **Writes** are optimistic: the shadow is updated as soon as the frame is
//!   flushed.
//! - **Reads** only observe; they never change the shadow.
//! - **Verify** succeeds only if content matches the shadow *and* no surplus
//!   bytes follow the response.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use ice_memctl::prelude::*;
//!
//! let options = ClientOptions {
//!     reset_settle: Duration::ZERO,
//!     ..ClientOptions::default()
//! };
//! let mut client = MemoryClient::new(
//!     SimulatedDevice::new(Device::Up5k),
//!     ShadowMemory::new(Device::Up5k),
//!     options,
//! )
//! .unwrap();
//!
//! client.write_hex(Region::Bram, 1, 0, "aaaa bbbb").unwrap();
//! assert!(client.verify(Region::Bram, 1, 0, 2).unwrap());
//!
//! let words = client.read(Region::Bram, 1, 0, 2).unwrap();
//! assert_eq!(words[1].to_string(), "bbbb");
//! ```

#![deny(unsafe_code)]

pub mod memctl;

pub mod prelude {
    pub use crate::memctl::prelude::*;
}
