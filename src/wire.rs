// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Big-endian framing over an async byte stream.
//!
//! The RFB protocol transmits every multi-byte integer in network byte order
//! regardless of host endianness. [`RfbInStream`] and [`RfbOutStream`] are
//! thin adapters that provide typed reads and writes over the two halves of
//! the connection. Reads loop until the requested byte count arrives or the
//! stream fails; a partial read is never surfaced to callers.
//!
//! Both halves carry an optional deadline (15 seconds by default at the
//! session layer). A read or flush that exceeds it fails with
//! `io::ErrorKind::TimedOut`.

use bytes::{BufMut, BytesMut};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Typed big-endian reader over the read half of a connection.
pub struct RfbInStream<R> {
    inner: R,
    timeout: Option<Duration>,
}

impl<R: AsyncRead + Unpin> RfbInStream<R> {
    /// Wraps a stream with no read deadline.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            timeout: None,
        }
    }

    /// Sets the deadline applied to every subsequent read.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Consumes the adapter, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    async fn read_full(&mut self, buf: &mut [u8]) -> io::Result<()> {
        match self.timeout {
            Some(deadline) => {
                match tokio::time::timeout(deadline, self.inner.read_exact(buf)).await {
                    Ok(result) => result.map(|_| ()),
                    Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out")),
                }
            }
            None => self.inner.read_exact(buf).await.map(|_| ()),
        }
    }

    pub async fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_full(&mut buf).await?;
        Ok(buf[0])
    }

    pub async fn read_u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_full(&mut buf).await?;
        Ok(u16::from_be_bytes(buf))
    }

    pub async fn read_u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_full(&mut buf).await?;
        Ok(u32::from_be_bytes(buf))
    }

    pub async fn read_i32(&mut self) -> io::Result<i32> {
        let mut buf = [0u8; 4];
        self.read_full(&mut buf).await?;
        Ok(i32::from_be_bytes(buf))
    }

    /// Fills `buf` completely from the stream.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.read_full(buf).await
    }

    /// Reads exactly `n` bytes into a fresh buffer.
    pub async fn read_bytes(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_full(&mut buf).await?;
        Ok(buf)
    }

    /// Reads and discards `n` padding bytes.
    pub async fn read_padding(&mut self, n: usize) -> io::Result<()> {
        let mut buf = [0u8; 8];
        let mut remaining = n;
        while remaining > 0 {
            let chunk = remaining.min(buf.len());
            self.read_full(&mut buf[..chunk]).await?;
            remaining -= chunk;
        }
        Ok(())
    }
}

/// Typed big-endian writer over the write half of a connection.
///
/// Writes accumulate in an internal [`BytesMut`] and hit the wire on
/// [`flush`](Self::flush), so a multi-field message is sent as one segment.
pub struct RfbOutStream<W> {
    inner: W,
    buf: BytesMut,
    timeout: Option<Duration>,
}

impl<W: AsyncWrite + Unpin> RfbOutStream<W> {
    /// Wraps a stream with no write deadline.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(4096),
            timeout: None,
        }
    }

    /// Sets the deadline applied to every subsequent flush.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Consumes the adapter, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Queues `n` zero bytes of padding.
    pub fn write_padding(&mut self, n: usize) {
        self.buf.put_bytes(0, n);
    }

    /// Writes all buffered bytes to the stream and flushes it.
    pub async fn flush(&mut self) -> io::Result<()> {
        let deadline = self.timeout;
        let pending = self.buf.split();
        let write = async {
            self.inner.write_all(&pending).await?;
            self.inner.flush().await
        };
        match deadline {
            Some(deadline) => match tokio::time::timeout(deadline, write).await {
                Ok(result) => result,
                Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
            },
            None => write.await,
        }
    }
}
