use std::io;

/// A point-to-point byte stream to the controller plus its reset line.
///
/// Reads are bounded by a timeout the implementation owns. A timed-out read
/// is not an error at this level: it returns the bytes that did arrive and
/// the caller decides what a short read means.
pub trait Transport {
    /// Queues `bytes` for sending.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Blocks until everything queued has been sent.
    fn flush(&mut self) -> io::Result<()>;

    /// Reads `len` bytes, returning fewer only if the timeout elapsed first.
    fn recv_exact(&mut self, len: usize) -> io::Result<Vec<u8>>;

    /// Returns whatever is already buffered without waiting.
    fn drain_pending(&mut self) -> io::Result<Vec<u8>>;

    /// Discards unread input and unsent output.
    fn discard_buffers(&mut self) -> io::Result<()>;

    /// Drives the hardware reset line.
    fn set_reset(&mut self, asserted: bool) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).send(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn recv_exact(&mut self, len: usize) -> io::Result<Vec<u8>> {
        (**self).recv_exact(len)
    }

    fn drain_pending(&mut self) -> io::Result<Vec<u8>> {
        (**self).drain_pending()
    }

    fn discard_buffers(&mut self) -> io::Result<()> {
        (**self).discard_buffers()
    }

    fn set_reset(&mut self, asserted: bool) -> io::Result<()> {
        (**self).set_reset(asserted)
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).send(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn recv_exact(&mut self, len: usize) -> io::Result<Vec<u8>> {
        (**self).recv_exact(len)
    }

    fn drain_pending(&mut self) -> io::Result<Vec<u8>> {
        (**self).drain_pending()
    }

    fn discard_buffers(&mut self) -> io::Result<()> {
        (**self).discard_buffers()
    }

    fn set_reset(&mut self, asserted: bool) -> io::Result<()> {
        (**self).set_reset(asserted)
    }
}
