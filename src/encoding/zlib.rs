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

//! Persistent zlib inflate substream for ZRLE.
//!
//! RFC 6143 defines the ZRLE payload as one continuous zlib stream spanning
//! the whole session: each rectangle contributes a length-prefixed chunk of
//! compressed bytes, and the inflate dictionary carries over from one
//! rectangle to the next. The inflater here is therefore created once per
//! connection and NEVER reset — resetting it between rectangles is the
//! classic ZRLE corruption bug.
//!
//! The read cursor, by contrast, rewinds at every rectangle: a decoder may
//! only consume what its own chunk inflated to.

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::{Result, VncError};

/// Spare output capacity maintained ahead of every inflate call.
const INFLATE_CHUNK: usize = 64 * 1024;

/// A byte-oriented reader over the inflated ZRLE stream.
pub struct ZrleInflater {
    inflater: Decompress,
    buf: Vec<u8>,
    pos: usize,
}

impl Default for ZrleInflater {
    fn default() -> Self {
        Self::new()
    }
}

impl ZrleInflater {
    /// Creates the session's inflate context (zlib-wrapped stream).
    pub fn new() -> Self {
        Self {
            inflater: Decompress::new(true),
            buf: Vec::with_capacity(INFLATE_CHUNK),
            pos: 0,
        }
    }

    /// Feeds one rectangle's compressed chunk into the shared zlib stream
    /// and rewinds the read cursor to the start of its inflated output.
    ///
    /// # Errors
    ///
    /// [`VncError::Encoding`] when the chunk is not valid zlib data for the
    /// current stream state.
    pub fn begin_rectangle(&mut self, compressed: &[u8]) -> Result<()> {
        self.buf.clear();
        self.pos = 0;

        let mut consumed = 0;
        while consumed < compressed.len() {
            if self.buf.capacity() - self.buf.len() < 4096 {
                self.buf.reserve(INFLATE_CHUNK);
            }
            let before_in = self.inflater.total_in();
            let before_out = self.inflater.total_out();
            let status = self
                .inflater
                .decompress_vec(&compressed[consumed..], &mut self.buf, FlushDecompress::Sync)
                .map_err(|e| VncError::Encoding(format!("zlib inflate failed: {e}")))?;
            consumed += (self.inflater.total_in() - before_in) as usize;
            let produced = (self.inflater.total_out() - before_out) as usize;

            match status {
                // The server never finalizes the session stream, but a
                // stream end is not a decode failure either.
                Status::StreamEnd => break,
                Status::Ok | Status::BufError => {
                    if produced == 0 && consumed < compressed.len() {
                        return Err(VncError::Encoding(
                            "zlib inflate stalled mid-chunk".to_string(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Bytes of the current rectangle's inflated output not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reads one byte of inflated data.
    pub fn read_u8(&mut self) -> Result<u8> {
        let bytes = self.read_bytes(1)?;
        Ok(bytes[0])
    }

    /// Reads exactly `n` bytes of inflated data.
    ///
    /// # Errors
    ///
    /// [`VncError::Encoding`] when the rectangle's inflated output is
    /// exhausted — the decoder asked for more than the server sent.
    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        if self.remaining() < n {
            return Err(VncError::Encoding(format!(
                "ZRLE substream exhausted: wanted {n} bytes, {} left",
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compress, Compression, FlushCompress};

    /// Compresses `data` as the next chunk of a persistent deflate stream,
    /// the way a VNC server feeds ZRLE rectangles.
    fn compress_chunk(compressor: &mut Compress, data: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; data.len() + 1024];
        let before_out = compressor.total_out();
        compressor
            .compress(data, &mut out, FlushCompress::Sync)
            .unwrap();
        out.truncate((compressor.total_out() - before_out) as usize);
        out
    }

    #[test]
    fn inflates_a_single_chunk() {
        let mut compressor = Compress::new(Compression::default(), true);
        let chunk = compress_chunk(&mut compressor, b"hello zrle");

        let mut inflater = ZrleInflater::new();
        inflater.begin_rectangle(&chunk).unwrap();
        assert_eq!(inflater.remaining(), 10);
        assert_eq!(inflater.read_bytes(5).unwrap(), b"hello");
        assert_eq!(inflater.read_u8().unwrap(), b' ');
        assert_eq!(inflater.read_bytes(4).unwrap(), b"zrle");
        assert_eq!(inflater.remaining(), 0);
    }

    #[test]
    fn zlib_state_persists_across_rectangles() {
        // The second chunk is mid-stream deflate output with no zlib header;
        // it only inflates if the session keeps one continuous stream.
        let mut compressor = Compress::new(Compression::default(), true);
        let first = compress_chunk(&mut compressor, b"first rectangle");
        let second = compress_chunk(&mut compressor, b"second rectangle");

        let mut inflater = ZrleInflater::new();
        inflater.begin_rectangle(&first).unwrap();
        assert_eq!(inflater.read_bytes(15).unwrap(), b"first rectangle");

        inflater.begin_rectangle(&second).unwrap();
        assert_eq!(inflater.read_bytes(16).unwrap(), b"second rectangle");
    }

    #[test]
    fn cursor_rewinds_per_rectangle() {
        let mut compressor = Compress::new(Compression::default(), true);
        let first = compress_chunk(&mut compressor, b"aaaa");
        let second = compress_chunk(&mut compressor, b"bbbb");

        let mut inflater = ZrleInflater::new();
        inflater.begin_rectangle(&first).unwrap();
        assert_eq!(inflater.read_u8().unwrap(), b'a');
        // Unread bytes of the previous rectangle do not leak into the next.
        inflater.begin_rectangle(&second).unwrap();
        assert_eq!(inflater.read_bytes(4).unwrap(), b"bbbb");
    }

    #[test]
    fn reading_past_the_rectangle_is_an_error() {
        let mut compressor = Compress::new(Compression::default(), true);
        let chunk = compress_chunk(&mut compressor, b"xy");

        let mut inflater = ZrleInflater::new();
        inflater.begin_rectangle(&chunk).unwrap();
        inflater.read_bytes(2).unwrap();
        assert!(matches!(
            inflater.read_u8(),
            Err(VncError::Encoding(_))
        ));
    }

    #[test]
    fn garbage_input_is_rejected() {
        let mut inflater = ZrleInflater::new();
        let err = inflater.begin_rectangle(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(matches!(err, Err(VncError::Encoding(_))));
    }
}
