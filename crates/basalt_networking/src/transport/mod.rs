//! # Transport Layer
//!
//! Non-blocking byte-stream I/O underneath the frame codecs.
//!
//! ## Design
//!
//! - Reads and writes never park the task; "not ready" surfaces as
//!   [`io::ErrorKind::WouldBlock`] and the caller decides how long to yield
//! - The connection loop owns exactly one transport; nothing is shared
//! - Statistics are collected at this layer so every backend reports the same

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::Instant;

/// A non-blocking, ordered byte stream.
///
/// Implementations return `WouldBlock` instead of waiting, and `Ok(0)` from
/// [`Transport::try_read`] only when the peer has closed the stream.
pub trait Transport {
    /// Reads whatever is available into `buf`.
    ///
    /// # Errors
    ///
    /// `WouldBlock` when nothing is available yet, or any socket error.
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes as much of `buf` as the socket accepts right now.
    ///
    /// # Errors
    ///
    /// `WouldBlock` when the send buffer is full, or any socket error.
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl Transport for TcpStream {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        TcpStream::try_read(self, buf)
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        TcpStream::try_write(self, buf)
    }
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Successful non-empty reads.
    pub reads: u64,
    /// Reads that found nothing to do.
    pub idle_polls: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Complete frames decoded.
    pub frames_received: u64,
    /// Frames written.
    pub frames_sent: u64,
    /// Receive errors.
    pub recv_errors: u64,
    /// Send errors.
    pub send_errors: u64,
}

/// Wraps a [`Transport`] and counts everything that passes through it.
#[derive(Debug)]
pub struct MeteredTransport<T> {
    inner: T,
    stats: TransportStats,
}

impl<T: Transport> MeteredTransport<T> {
    /// Wraps `inner` with zeroed statistics.
    #[must_use]
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            stats: TransportStats::default(),
        }
    }

    /// Polls for incoming bytes.
    ///
    /// Returns `Ok(None)` if nothing is available yet, `Ok(Some(0))` once
    /// the peer has closed the stream.
    ///
    /// # Errors
    ///
    /// Any socket error other than `WouldBlock` and `Interrupted`.
    pub fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.inner.try_read(buf) {
            Ok(0) => Ok(Some(0)),
            Ok(n) => {
                self.stats.reads += 1;
                self.stats.bytes_received += n as u64;
                Ok(Some(n))
            }
            Err(e) if is_not_ready(&e) => {
                self.stats.idle_polls += 1;
                Ok(None)
            }
            Err(e) => {
                self.stats.recv_errors += 1;
                Err(e)
            }
        }
    }

    /// Writes one whole frame, yielding for `poll_interval` whenever the
    /// socket is not ready.
    ///
    /// The socket must accept at least one byte every `stall_limit`.
    ///
    /// # Errors
    ///
    /// `WriteZero` if the socket stops accepting bytes, `TimedOut` if it
    /// stays not-ready for `stall_limit`, or any socket error.
    pub async fn send_frame(
        &mut self,
        frame: &[u8],
        poll_interval: Duration,
        stall_limit: Duration,
    ) -> io::Result<()> {
        let mut written = 0;
        let mut last_progress = Instant::now();
        while written < frame.len() {
            match self.inner.try_write(&frame[written..]) {
                Ok(0) => {
                    self.stats.send_errors += 1;
                    return Err(io::ErrorKind::WriteZero.into());
                }
                Ok(n) => {
                    written += n;
                    self.stats.bytes_sent += n as u64;
                    last_progress = Instant::now();
                }
                Err(e) if is_not_ready(&e) => {
                    if last_progress.elapsed() >= stall_limit {
                        self.stats.send_errors += 1;
                        return Err(io::ErrorKind::TimedOut.into());
                    }
                    tokio::time::sleep(poll_interval).await;
                }
                Err(e) => {
                    self.stats.send_errors += 1;
                    return Err(e);
                }
            }
        }
        self.stats.frames_sent += 1;
        Ok(())
    }

    /// Counts frames decoded from bytes this transport delivered.
    pub fn record_frames(&mut self, count: u64) {
        self.stats.frames_received += count;
    }

    /// Returns statistics.
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        &self.stats
    }

    /// Returns the wrapped transport.
    #[must_use]
    pub const fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Unwraps the transport, discarding statistics.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn is_not_ready(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
