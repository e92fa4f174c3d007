//! Recovering frame alignment after an uncertain reset.
//!
//! The device's frame parser may hold a partial frame when the link opens.
//! Probe traffic eventually consumes it: keep verifying a small span that is
//! always valid until one verify comes back clean. This is a heuristic, not a
//! proof of alignment, so the loop is bounded.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::memctl::{
    client::{MemoryClient, Verification},
    error::{MemctlError, Result},
    helpers::MAX_REQUEST_WORDS,
    transport::Transport,
    types::Region,
};

/// Probe block and address: always valid on every supported device.
const PROBE_BLOCK: u8 = 0;
const PROBE_ADDRESS: u16 = 0;

/// Schedule for [`MemoryClient::sync_device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    /// Seed for probe sizes, so a run is reproducible.
    pub seed: u64,
    /// Probes to try before giving up.
    pub max_attempts: usize,
    /// Largest probe, in words.
    pub max_probe_words: usize,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            seed: 0,
            max_attempts: 256,
            max_probe_words: 10,
        }
    }
}

/// How a successful synchronisation went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Probes sent, including the one that matched.
    pub attempts: usize,
}

impl<T: Transport> MemoryClient<T> {
    /// Probes BRAM block 0 until a verify succeeds.
    ///
    /// Each probe reads a pseudo-random number of words from the start of
    /// BRAM block 0 and verifies them against the shadow, so the shadow must
    /// hold the device's real contents there.
    ///
    /// # Errors
    /// * [`MemctlError::SyncExhausted`] - no probe matched within
    ///   `max_attempts`
    /// * [`MemctlError::Transport`] - the link failed; probing stops at once
    pub fn sync_device(&mut self) -> Result<SyncReport> {
        let policy = self.options().sync;
        let upper = policy
            .max_probe_words
            .clamp(1, Region::Bram.words_per_block().min(MAX_REQUEST_WORDS));
        let mut rng = StdRng::seed_from_u64(policy.seed);

        for attempt in 1..=policy.max_attempts {
            let size = rng.gen_range(1..=upper);
            match self.verify_detailed(Region::Bram, PROBE_BLOCK, PROBE_ADDRESS, size)? {
                Verification::Match => {
                    info!(attempt, "device synchronised");
                    return Ok(SyncReport { attempts: attempt });
                }
                outcome => warn!(attempt, size, ?outcome, "sync probe failed"),
            }
        }

        error!(attempts = policy.max_attempts, "device did not synchronise");
        Err(MemctlError::SyncExhausted {
            attempts: policy.max_attempts,
        })
    }
}
