//! Software model of the FPGA memory controller.
//!
//! [`SimulatedDevice`] implements [`Transport`] by parsing request frames the
//! way the controller does, byte by byte, and answering reads from its own
//! memory. Its parser keeps partial frames across host buffer flushes, exactly
//! like the hardware, so misaligned traffic desynchronises it until a reset.
//! Faults can be injected into responses to exercise recovery paths.

use std::{collections::VecDeque, io};

use tracing::trace;

use crate::memctl::{
    codec::{
        Header, decode_address, decode_size, decode_warmboot, request_prefix_len, response_len,
    },
    transport::Transport,
    types::{Device, Op, Region, Word},
};

#[derive(Debug, Default)]
struct Faults {
    slip_reads: usize,
    truncate_next: usize,
    surplus_next: Vec<u8>,
    drop_writes: bool,
    disconnected: bool,
}

/// In-memory stand-in for the controller on the other end of the link.
#[derive(Debug)]
pub struct SimulatedDevice {
    device: Device,
    bram: Vec<Word>,
    spram: Vec<Word>,
    parser: Vec<u8>,
    rx: VecDeque<u8>,
    in_reset: bool,
    resets: usize,
    warmboots: Vec<u8>,
    frames: usize,
    sent: Vec<u8>,
    faults: Faults,
}

impl SimulatedDevice {
    /// Creates a device with every word `0000`.
    pub fn new(device: Device) -> Self {
        Self {
            device,
            bram: vec![Word::ZERO; device.region_words(Region::Bram)],
            spram: vec![Word::ZERO; device.region_words(Region::Spram)],
            parser: Vec::new(),
            rx: VecDeque::new(),
            in_reset: false,
            resets: 0,
            warmboots: Vec::new(),
            frames: 0,
            sent: Vec::new(),
            faults: Faults::default(),
        }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    fn memory(&self, region: Region) -> &[Word] {
        match region {
            Region::Bram => &self.bram,
            Region::Spram => &self.spram,
        }
    }

    fn memory_mut(&mut self, region: Region) -> &mut [Word] {
        match region {
            Region::Bram => &mut self.bram,
            Region::Spram => &mut self.spram,
        }
    }

    /// Replaces the start of a region's contents, block-major.
    pub fn load_region(&mut self, region: Region, words: &[Word]) {
        let mem = self.memory_mut(region);
        let len = words.len().min(mem.len());
        mem[..len].copy_from_slice(&words[..len]);
    }

    /// Returns device memory at a span.
    ///
    /// # Panics
    /// Panics if the span is outside the device's memory.
    pub fn peek(&self, region: Region, block: u8, address: u16, size: usize) -> &[Word] {
        let start = block as usize * region.words_per_block() + address as usize;
        &self.memory(region)[start..start + size]
    }

    /// Overwrites device memory directly, bypassing the link.
    ///
    /// # Panics
    /// Panics if the span is outside the device's memory.
    pub fn poke(&mut self, region: Region, block: u8, address: u16, words: &[Word]) {
        let start = block as usize * region.words_per_block() + address as usize;
        self.memory_mut(region)[start..start + words.len()].copy_from_slice(words);
    }

    /// Prefixes each of the next `count` read responses with a garbage byte,
    /// as if the frame boundary had slipped by one.
    pub fn slip_next_reads(&mut self, count: usize) {
        self.faults.slip_reads = count;
    }

    /// Drops the last `bytes` bytes of the next read response.
    pub fn truncate_next_read(&mut self, bytes: usize) {
        self.faults.truncate_next = bytes;
    }

    /// Appends `bytes` after the next read response.
    pub fn append_to_next_read(&mut self, bytes: &[u8]) {
        self.faults.surplus_next = bytes.to_vec();
    }

    /// Makes the device accept write frames without storing them.
    pub fn drop_writes(&mut self, drop: bool) {
        self.faults.drop_writes = drop;
    }

    /// Fails every subsequent transport call, as an unplugged cable would.
    pub fn disconnect(&mut self) {
        self.faults.disconnected = true;
    }

    /// Feeds bytes into the device's frame parser as line noise.
    pub fn inject_noise(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.receive(byte);
        }
    }

    /// Warm-boot images triggered so far, in order.
    pub fn warmboots(&self) -> &[u8] {
        &self.warmboots
    }

    /// Number of times the reset line was asserted.
    pub fn resets(&self) -> usize {
        self.resets
    }

    /// Number of complete memory frames the device executed.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Every byte the host sent, in order.
    pub fn sent(&self) -> &[u8] {
        &self.sent
    }

    fn check_link(&self) -> io::Result<()> {
        if self.faults.disconnected {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected"));
        }
        Ok(())
    }

    fn receive(&mut self, byte: u8) {
        if self.in_reset {
            return;
        }
        self.parser.push(byte);

        if self.parser.len() == 1 {
            if let Some(image) = decode_warmboot(byte) {
                trace!(image, "simulated warm-boot");
                self.warmboots.push(image);
                self.parser.clear();
                return;
            }
        }

        let header = Header::decode(self.parser[0]);
        let prefix = request_prefix_len(header.region);
        if self.parser.len() < prefix {
            return;
        }
        let size = decode_size(self.parser[prefix - 1]);
        let total = match header.op {
            Op::Read => prefix,
            Op::Write => prefix + response_len(size),
        };
        if self.parser.len() < total {
            return;
        }

        let frame = core::mem::take(&mut self.parser);
        self.execute(header, &frame, prefix, size);
    }

    fn execute(&mut self, header: Header, frame: &[u8], prefix: usize, size: usize) {
        let region = header.region;
        let address = decode_address(region, &frame[1..prefix - 1]);
        let words_per_block = region.words_per_block();
        if header.block >= self.device.block_count(region)
            || address as usize + size > words_per_block
        {
            trace!(?header, address, size, "simulated device ignoring invalid frame");
            return;
        }
        self.frames += 1;
        let start = header.block as usize * words_per_block + address as usize;

        match header.op {
            Op::Read => {
                let mut response = Vec::with_capacity(response_len(size) + 1);
                if self.faults.slip_reads > 0 {
                    self.faults.slip_reads -= 1;
                    response.push(0xff);
                }
                for word in &self.memory(region)[start..start + size] {
                    response.extend_from_slice(&word.to_be_bytes());
                }
                let truncate = core::mem::take(&mut self.faults.truncate_next);
                response.truncate(response.len().saturating_sub(truncate));
                response.append(&mut self.faults.surplus_next);
                self.rx.extend(response);
            }
            Op::Write => {
                if self.faults.drop_writes {
                    return;
                }
                let words: Vec<Word> = frame[prefix..]
                    .chunks_exact(2)
                    .map(|pair| Word::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                self.memory_mut(region)[start..start + size].copy_from_slice(&words);
            }
        }
    }
}

impl Transport for SimulatedDevice {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.check_link()?;
        self.sent.extend_from_slice(bytes);
        for &byte in bytes {
            self.receive(byte);
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check_link()
    }

    fn recv_exact(&mut self, len: usize) -> io::Result<Vec<u8>> {
        self.check_link()?;
        let take = len.min(self.rx.len());
        Ok(self.rx.drain(..take).collect())
    }

    fn drain_pending(&mut self) -> io::Result<Vec<u8>> {
        self.check_link()?;
        Ok(self.rx.drain(..).collect())
    }

    fn discard_buffers(&mut self) -> io::Result<()> {
        self.check_link()?;
        self.rx.clear();
        Ok(())
    }

    fn set_reset(&mut self, asserted: bool) -> io::Result<()> {
        self.check_link()?;
        if asserted && !self.in_reset {
            self.resets += 1;
            self.parser.clear();
        }
        self.in_reset = asserted;
        Ok(())
    }
}
