use std::{thread, time::Duration};

use tracing::{debug, error, info, trace, warn};

use crate::memctl::{
    codec,
    error::{FramingError, MemctlError, Result, ValidationError},
    helpers::{check_block, check_size, word_span},
    shadow::ShadowMemory,
    sync::SyncPolicy,
    transport::Transport,
    types::{Device, Region, Word},
};

/// Tunables for a [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// How long the reset line is held asserted.
    pub reset_settle: Duration,
    /// Words per frame when bulk-initialising SPRAM (1..=256).
    pub init_chunk_words: usize,
    /// Probe schedule for [`MemoryClient::sync_device`].
    pub sync: SyncPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            reset_settle: Duration::from_millis(100),
            init_chunk_words: 16,
            sync: SyncPolicy::default(),
        }
    }
}

/// Outcome of comparing a device read against the shadow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Content matched and nothing was left on the link.
    Match,
    /// Framing was intact but the device holds different data.
    Mismatch {
        expected: Vec<Word>,
        received: Vec<Word>,
    },
    /// The response was short, or bytes followed it. Client and device no
    /// longer agree on frame boundaries.
    Framing(FramingError),
}

impl Verification {
    pub fn is_match(&self) -> bool {
        matches!(self, Verification::Match)
    }
}

/// Stateful client for the FPGA memory controller.
///
/// Owns the link and the shadow memory. Requests are strictly sequential:
/// each one discards stale link buffers, sends a complete frame and, for
/// reads, waits for the complete response before returning.
pub struct MemoryClient<T: Transport> {
    transport: T,
    shadow: ShadowMemory,
    options: ClientOptions,
}

impl<T: Transport> core::fmt::Debug for MemoryClient<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryClient")
            .field("shadow", &self.shadow)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> MemoryClient<T> {
    /// Creates a client and pulses the device reset so framing starts clean.
    pub fn new(transport: T, shadow: ShadowMemory, options: ClientOptions) -> Result<Self> {
        check_size(options.init_chunk_words)?;
        if options.sync.max_attempts == 0 {
            return Err(MemctlError::Config(
                "sync.max_attempts must be positive".into(),
            ));
        }

        let mut client = Self {
            transport,
            shadow,
            options,
        };
        client.reset()?;
        Ok(client)
    }

    pub fn device(&self) -> Device {
        self.shadow.device()
    }

    pub fn shadow(&self) -> &ShadowMemory {
        &self.shadow
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_parts(self) -> (T, ShadowMemory) {
        (self.transport, self.shadow)
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.transport.discard_buffers()?;
        trace!(frame = %hex::encode(frame), "tx");
        self.transport.send(frame)?;
        self.transport.flush()?;
        Ok(())
    }

    /// Sends a read request and returns the raw response, which is short if
    /// the transport timed out.
    fn exchange_read(
        &mut self,
        region: Region,
        block: u8,
        address: u16,
        size: usize,
    ) -> Result<Vec<u8>> {
        word_span(self.device(), region, block, address, size)?;
        let frame = codec::encode_read_request(region, block, address, size)?;
        self.send_frame(&frame)?;

        let raw = self.transport.recv_exact(codec::response_len(size))?;
        trace!(response = %hex::encode(&raw), "rx");
        Ok(raw)
    }

    fn send_write(&mut self, region: Region, block: u8, address: u16, words: &[Word]) -> Result<()> {
        word_span(self.device(), region, block, address, words.len())?;
        let frame = codec::encode_write_request(region, block, address, words)?;
        self.send_frame(&frame)
    }

    /// Reads `size` words starting at `address` of `block`.
    ///
    /// Observes only: the shadow is never touched.
    ///
    /// # Errors
    /// * [`MemctlError::Validation`] - bad coordinates, before any I/O
    /// * [`MemctlError::Framing`] - the response was short (timeout)
    /// * [`MemctlError::Transport`] - the link failed
    pub fn read(&mut self, region: Region, block: u8, address: u16, size: usize) -> Result<Vec<Word>> {
        debug!(%region, block, address, size, "read");
        let raw = self.exchange_read(region, block, address, size)?;
        codec::decode_response(&raw, size).map_err(|err| {
            warn!(%region, block, address, size, %err, "read framing error");
            MemctlError::from(err)
        })
    }

    /// Writes `words` starting at `address` of `block`.
    ///
    /// Once the frame is flushed the shadow is updated as if the device had
    /// accepted it. Nothing confirms that until a later [`verify`](Self::verify).
    pub fn write(&mut self, region: Region, block: u8, address: u16, words: &[Word]) -> Result<()> {
        debug!(%region, block, address, size = words.len(), "write");
        self.send_write(region, block, address, words)?;
        self.shadow.store(region, block, address, words)
    }

    /// Parses `payload` with [`Word::parse_payload`] and writes it.
    pub fn write_hex(&mut self, region: Region, block: u8, address: u16, payload: &str) -> Result<()> {
        let words = Word::parse_payload(payload)?;
        self.write(region, block, address, &words)
    }

    /// Reads a span and compares it with the shadow, also checking that no
    /// bytes followed the response.
    ///
    /// Content and framing problems are reported in the returned
    /// [`Verification`], never as errors.
    pub fn verify_detailed(
        &mut self,
        region: Region,
        block: u8,
        address: u16,
        size: usize,
    ) -> Result<Verification> {
        let raw = self.exchange_read(region, block, address, size)?;

        let outcome = match codec::decode_response(&raw, size) {
            Err(err) => Verification::Framing(err),
            Ok(received) => {
                // Trailing bytes mean the frame boundary moved, so the
                // content cannot be trusted either
                let surplus = self.transport.drain_pending()?;
                let expected = self.shadow.words(region, block, address, size)?;
                if !surplus.is_empty() {
                    debug!(surplus = %hex::encode(&surplus), "bytes after response");
                    Verification::Framing(FramingError::SurplusBytes(surplus.len()))
                } else if received != expected {
                    Verification::Mismatch {
                        expected: expected.to_vec(),
                        received,
                    }
                } else {
                    Verification::Match
                }
            }
        };

        match &outcome {
            Verification::Match => debug!(%region, block, address, size, "verify match"),
            Verification::Mismatch { expected, received } => warn!(
                %region,
                block,
                address,
                size,
                ?expected,
                ?received,
                "verify mismatch"
            ),
            Verification::Framing(err) => {
                warn!(%region, block, address, size, %err, "verify framing error")
            }
        }
        Ok(outcome)
    }

    /// Returns true if the device holds exactly what the shadow expects and
    /// nothing extra was received.
    pub fn verify(&mut self, region: Region, block: u8, address: u16, size: usize) -> Result<bool> {
        Ok(self.verify_detailed(region, block, address, size)?.is_match())
    }

    /// Reads a span from the device and adopts it into the shadow.
    pub fn refresh_shadow(
        &mut self,
        region: Region,
        block: u8,
        address: u16,
        size: usize,
    ) -> Result<Vec<Word>> {
        let words = self.read(region, block, address, size)?;
        self.shadow.store(region, block, address, &words)?;
        Ok(words)
    }

    /// Reboots the device into configuration `image` (0..=3), then resets.
    ///
    /// The device does not answer this frame.
    pub fn trigger_warmboot(&mut self, image: u8) -> Result<()> {
        let byte = codec::encode_warmboot(image)?;
        info!(image, "triggering warm-boot");
        self.send_frame(&[byte])?;
        self.reset()
    }

    /// Pulses the reset line, then discards anything left on the link.
    pub fn reset(&mut self) -> Result<()> {
        info!(settle = ?self.options.reset_settle, "resetting device");
        self.transport.set_reset(true)?;
        thread::sleep(self.options.reset_settle);
        self.transport.set_reset(false)?;
        self.transport.discard_buffers()?;
        Ok(())
    }

    /// Writes the shadow to its backing files. No link I/O.
    pub fn save_shadow(&mut self) -> Result<()> {
        self.shadow.save()
    }

    /// Reloads the shadow from its backing files, discarding unsaved changes.
    /// No link I/O.
    pub fn load_shadow(&mut self) -> Result<()> {
        self.shadow.reload()
    }

    /// Loads the shadow's whole SPRAM image into the device.
    ///
    /// Sends chunks of `init_chunk_words` words, verifying each one before
    /// the next. The first failed verify aborts with
    /// [`MemctlError::InitAborted`]; chunks sent before it stay on the device.
    pub fn init_region(&mut self, region: Region) -> Result<()> {
        if region != Region::Spram {
            return Err(ValidationError::NotInitialisable(region).into());
        }
        check_block(self.device(), region, 0)?;

        let chunk = self.options.init_chunk_words;
        let words_per_block = region.words_per_block();
        for block in 0..self.device().block_count(region) {
            let mut offset = 0;
            while offset < words_per_block {
                let size = chunk.min(words_per_block - offset);
                let address = offset as u16;
                let words = self.shadow.words(region, block, address, size)?.to_vec();

                self.send_write(region, block, address, &words)?;
                if !self.verify(region, block, address, size)? {
                    error!(%region, block, address, "initialisation aborted");
                    return Err(MemctlError::InitAborted {
                        region,
                        block,
                        address,
                    });
                }
                offset += size;
            }
            info!(%region, block, "block initialised");
        }
        Ok(())
    }
}

macro_rules! impl_region_shortcuts {
    ($($region:ident),+) => {
        paste::paste! {
            impl<T: Transport> MemoryClient<T> {
                $(
                    #[doc = "[`read`](Self::read) on [`Region::" $region "`]."]
                    pub fn [<read_ $region:lower>](
                        &mut self,
                        block: u8,
                        address: u16,
                        size: usize,
                    ) -> Result<Vec<Word>> {
                        self.read(Region::$region, block, address, size)
                    }

                    #[doc = "[`write`](Self::write) on [`Region::" $region "`]."]
                    pub fn [<write_ $region:lower>](
                        &mut self,
                        block: u8,
                        address: u16,
                        words: &[Word],
                    ) -> Result<()> {
                        self.write(Region::$region, block, address, words)
                    }

                    #[doc = "[`verify`](Self::verify) on [`Region::" $region "`]."]
                    pub fn [<verify_ $region:lower>](
                        &mut self,
                        block: u8,
                        address: u16,
                        size: usize,
                    ) -> Result<bool> {
                        self.verify(Region::$region, block, address, size)
                    }
                )+
            }
        }
    };
}

impl_region_shortcuts!(Bram, Spram);
