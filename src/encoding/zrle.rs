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

//! ZRLE (Zlib Run-Length Encoding) implementation for VNC.
//!
//! Each ZRLE rectangle arrives as a `u32` length followed by that many
//! compressed bytes belonging to the session's single zlib stream. The
//! inflated payload subdivides the rectangle into 64x64 tiles, row-major,
//! each introduced by a subencoding byte:
//!
//! - `0`: raw tile, `tw*th` CPIXELs
//! - `1`: solid tile, one CPIXEL
//! - `2..=16`: packed palette, indices at 1, 2 or 4 bits, row-padded
//! - `128`: plain RLE, runs of `(CPIXEL, length)`
//! - `130..=255`: palette RLE, palette of `s - 128` entries
//!
//! Values `17..=127` and `129` do not exist in the protocol and abort the
//! connection. Pixels inside the stream use the CPIXEL form (see
//! [`crate::pixel::PixelReader`]).

use tokio::io::AsyncRead;

use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::pixel::PixelReader;
use crate::protocol::Rectangle;
use crate::wire::RfbInStream;

use super::zlib::ZrleInflater;

const TILE_SIZE: u16 = 64;

/// Compressed chunks larger than this are treated as hostile input.
const MAX_COMPRESSED_LEN: u32 = 64 * 1024 * 1024;

/// Decodes a ZRLE rectangle.
///
/// Reads the length-prefixed compressed chunk from the main connection,
/// feeds it into the session's persistent inflater and decodes the tiles
/// from the inflated output.
pub async fn decode<R: AsyncRead + Unpin>(
    rect: &Rectangle,
    stream: &mut RfbInStream<R>,
    reader: &PixelReader,
    inflater: &mut ZrleInflater,
    fb: &mut Framebuffer,
) -> Result<()> {
    let compressed_len = stream.read_u32().await?;
    if compressed_len > MAX_COMPRESSED_LEN {
        return Err(VncError::Protocol(format!(
            "ZRLE compressed length {compressed_len} exceeds the {MAX_COMPRESSED_LEN} byte cap"
        )));
    }
    let compressed = stream.read_bytes(compressed_len as usize).await?;
    inflater.begin_rectangle(&compressed)?;

    for tile_y in (0..rect.height).step_by(usize::from(TILE_SIZE)) {
        for tile_x in (0..rect.width).step_by(usize::from(TILE_SIZE)) {
            let tile_w = TILE_SIZE.min(rect.width - tile_x);
            let tile_h = TILE_SIZE.min(rect.height - tile_y);
            decode_tile(
                inflater,
                reader,
                fb,
                rect.x + tile_x,
                rect.y + tile_y,
                tile_w,
                tile_h,
            )?;
        }
    }
    Ok(())
}

fn decode_tile(
    inflater: &mut ZrleInflater,
    reader: &PixelReader,
    fb: &mut Framebuffer,
    x0: u16,
    y0: u16,
    tile_w: u16,
    tile_h: u16,
) -> Result<()> {
    let subencoding = inflater.read_u8()?;
    match subencoding {
        0 => decode_raw_tile(inflater, reader, fb, x0, y0, tile_w, tile_h),
        1 => {
            let color = read_cpixel(inflater, reader, fb)?;
            fb.fill_rect(x0, y0, tile_w, tile_h, color);
            Ok(())
        }
        2..=16 => decode_packed_palette_tile(
            inflater,
            reader,
            fb,
            x0,
            y0,
            tile_w,
            tile_h,
            usize::from(subencoding),
        ),
        128 => decode_plain_rle_tile(inflater, reader, fb, x0, y0, tile_w, tile_h),
        130..=255 => decode_palette_rle_tile(
            inflater,
            reader,
            fb,
            x0,
            y0,
            tile_w,
            tile_h,
            usize::from(subencoding - 128),
        ),
        invalid => Err(VncError::Encoding(format!(
            "invalid ZRLE subencoding {invalid}"
        ))),
    }
}

fn read_cpixel(
    inflater: &mut ZrleInflater,
    reader: &PixelReader,
    fb: &Framebuffer,
) -> Result<u32> {
    let raw = inflater.read_bytes(reader.cpixel_len())?;
    Ok(reader.read_cpixel(raw, fb.color_map()))
}

fn read_palette(
    inflater: &mut ZrleInflater,
    reader: &PixelReader,
    fb: &Framebuffer,
    size: usize,
) -> Result<Vec<u32>> {
    let mut palette = Vec::with_capacity(size);
    for _ in 0..size {
        palette.push(read_cpixel(inflater, reader, fb)?);
    }
    Ok(palette)
}

/// Reads an RLE run length: `1 + sum` of bytes, each `255` byte adding 255
/// and continuing the chain, the first byte below 255 terminating it.
fn read_run_length(inflater: &mut ZrleInflater) -> Result<usize> {
    let mut length = 1usize;
    loop {
        let byte = inflater.read_u8()?;
        length += usize::from(byte);
        if byte != 255 {
            return Ok(length);
        }
    }
}

fn decode_raw_tile(
    inflater: &mut ZrleInflater,
    reader: &PixelReader,
    fb: &mut Framebuffer,
    x0: u16,
    y0: u16,
    tile_w: u16,
    tile_h: u16,
) -> Result<()> {
    for dy in 0..tile_h {
        for dx in 0..tile_w {
            let color = read_cpixel(inflater, reader, fb)?;
            fb.set_pixel(x0 + dx, y0 + dy, color);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decode_packed_palette_tile(
    inflater: &mut ZrleInflater,
    reader: &PixelReader,
    fb: &mut Framebuffer,
    x0: u16,
    y0: u16,
    tile_w: u16,
    tile_h: u16,
    palette_size: usize,
) -> Result<()> {
    let palette = read_palette(inflater, reader, fb, palette_size)?;
    let bits: u32 = match palette_size {
        2 => 1,
        3..=4 => 2,
        _ => 4,
    };
    let mask = (1u8 << bits) - 1;

    // Indices are bit-packed most-significant first, padded to a whole byte
    // at the end of every tile row.
    for dy in 0..tile_h {
        let mut byte = 0u8;
        let mut bits_left = 0u32;
        for dx in 0..tile_w {
            if bits_left == 0 {
                byte = inflater.read_u8()?;
                bits_left = 8;
            }
            bits_left -= bits;
            let index = usize::from((byte >> bits_left) & mask);
            let color = *palette.get(index).ok_or_else(|| {
                VncError::Encoding(format!(
                    "ZRLE packed index {index} outside palette of {palette_size}"
                ))
            })?;
            fb.set_pixel(x0 + dx, y0 + dy, color);
        }
    }
    Ok(())
}

fn decode_plain_rle_tile(
    inflater: &mut ZrleInflater,
    reader: &PixelReader,
    fb: &mut Framebuffer,
    x0: u16,
    y0: u16,
    tile_w: u16,
    tile_h: u16,
) -> Result<()> {
    let total = usize::from(tile_w) * usize::from(tile_h);
    let mut filled = 0usize;
    while filled < total {
        let color = read_cpixel(inflater, reader, fb)?;
        let run = read_run_length(inflater)?;
        if filled + run > total {
            return Err(VncError::Encoding(format!(
                "ZRLE run of {run} overflows a {tile_w}x{tile_h} tile"
            )));
        }
        fill_run(fb, x0, y0, tile_w, filled, run, color);
        filled += run;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decode_palette_rle_tile(
    inflater: &mut ZrleInflater,
    reader: &PixelReader,
    fb: &mut Framebuffer,
    x0: u16,
    y0: u16,
    tile_w: u16,
    tile_h: u16,
    palette_size: usize,
) -> Result<()> {
    let palette = read_palette(inflater, reader, fb, palette_size)?;
    let total = usize::from(tile_w) * usize::from(tile_h);
    let mut filled = 0usize;
    while filled < total {
        let index_byte = inflater.read_u8()?;
        let run = if index_byte & 0x80 != 0 {
            read_run_length(inflater)?
        } else {
            1
        };
        let index = usize::from(index_byte & 0x7F);
        let color = *palette.get(index).ok_or_else(|| {
            VncError::Encoding(format!(
                "ZRLE RLE index {index} outside palette of {palette_size}"
            ))
        })?;
        if filled + run > total {
            return Err(VncError::Encoding(format!(
                "ZRLE run of {run} overflows a {tile_w}x{tile_h} tile"
            )));
        }
        fill_run(fb, x0, y0, tile_w, filled, run, color);
        filled += run;
    }
    Ok(())
}

/// Writes a run of `len` pixels starting at linear tile offset `start`,
/// wrapping across tile rows.
fn fill_run(fb: &mut Framebuffer, x0: u16, y0: u16, tile_w: u16, start: usize, len: usize, color: u32) {
    for i in start..start + len {
        let dx = (i % usize::from(tile_w)) as u16;
        let dy = (i / usize::from(tile_w)) as u16;
        fb.set_pixel(x0 + dx, y0 + dy, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PixelFormat;
    use crate::wire::RfbOutStream;
    use flate2::{Compress, Compression, FlushCompress};

    // Little-endian RGB888 CPIXELs: [blue, green, red] on the wire.
    const RED: [u8; 3] = [0x00, 0x00, 0xFF];
    const GREEN: [u8; 3] = [0x00, 0xFF, 0x00];
    const BLUE: [u8; 3] = [0xFF, 0x00, 0x00];

    fn compress_chunk(compressor: &mut Compress, data: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; data.len() + 1024];
        let before_out = compressor.total_out();
        compressor
            .compress(data, &mut out, FlushCompress::Sync)
            .unwrap();
        out.truncate((compressor.total_out() - before_out) as usize);
        out
    }

    async fn run_decode(
        payload: &[u8],
        compressor: &mut Compress,
        inflater: &mut ZrleInflater,
        fb: &mut Framebuffer,
        rect: Rectangle,
    ) -> Result<()> {
        let (a, b) = tokio::io::duplex(1 << 20);
        let mut out = RfbOutStream::new(a);
        let mut stream = RfbInStream::new(b);

        let chunk = compress_chunk(compressor, payload);
        out.write_u32(chunk.len() as u32);
        out.write_bytes(&chunk);
        out.flush().await.unwrap();

        let reader = PixelReader::new(*fb.format());
        decode(&rect, &mut stream, &reader, inflater, fb).await
    }

    fn fb(w: u16, h: u16) -> Framebuffer {
        Framebuffer::new(w, h, PixelFormat::rgb888(), String::new())
    }

    fn rect(w: u16, h: u16) -> Rectangle {
        Rectangle {
            x: 0,
            y: 0,
            width: w,
            height: h,
            encoding: 16,
        }
    }

    #[tokio::test]
    async fn solid_tile() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut inflater = ZrleInflater::new();
        let mut fb = fb(3, 2);

        let mut payload = vec![1u8];
        payload.extend_from_slice(&RED);
        run_decode(&payload, &mut compressor, &mut inflater, &mut fb, rect(3, 2))
            .await
            .unwrap();
        assert!(fb.pixels().iter().all(|&p| p == 0xFFFF_0000));
    }

    #[tokio::test]
    async fn raw_tile() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut inflater = ZrleInflater::new();
        let mut fb = fb(2, 2);

        let mut payload = vec![0u8];
        for cpixel in [RED, GREEN, BLUE, RED] {
            payload.extend_from_slice(&cpixel);
        }
        run_decode(&payload, &mut compressor, &mut inflater, &mut fb, rect(2, 2))
            .await
            .unwrap();
        assert_eq!(fb.get_pixel(0, 0), 0xFFFF_0000);
        assert_eq!(fb.get_pixel(1, 0), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(0, 1), 0xFF00_00FF);
        assert_eq!(fb.get_pixel(1, 1), 0xFFFF_0000);
    }

    #[tokio::test]
    async fn packed_palette_tile_one_bit_indices() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut inflater = ZrleInflater::new();
        let mut fb = fb(3, 2);

        // Palette {red, green}; rows are bit-packed MSB-first, one byte per
        // row: row 0 = [0,1,0] -> 0b0100_0000, row 1 = [1,1,0] -> 0b1100_0000.
        let mut payload = vec![2u8];
        payload.extend_from_slice(&RED);
        payload.extend_from_slice(&GREEN);
        payload.push(0b0100_0000);
        payload.push(0b1100_0000);
        run_decode(&payload, &mut compressor, &mut inflater, &mut fb, rect(3, 2))
            .await
            .unwrap();
        assert_eq!(fb.get_pixel(0, 0), 0xFFFF_0000);
        assert_eq!(fb.get_pixel(1, 0), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(2, 0), 0xFFFF_0000);
        assert_eq!(fb.get_pixel(0, 1), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(1, 1), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(2, 1), 0xFFFF_0000);
    }

    #[tokio::test]
    async fn packed_palette_tile_two_bit_indices() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut inflater = ZrleInflater::new();
        let mut fb = fb(5, 1);

        // Palette of 3 -> 2-bit indices. Row [0,1,2,1,0] packs into two
        // bytes: 0b00_01_10_01 and 0b00_000000.
        let mut payload = vec![3u8];
        payload.extend_from_slice(&RED);
        payload.extend_from_slice(&GREEN);
        payload.extend_from_slice(&BLUE);
        payload.push(0b0001_1001);
        payload.push(0b0000_0000);
        run_decode(&payload, &mut compressor, &mut inflater, &mut fb, rect(5, 1))
            .await
            .unwrap();
        assert_eq!(fb.get_pixel(0, 0), 0xFFFF_0000);
        assert_eq!(fb.get_pixel(1, 0), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(2, 0), 0xFF00_00FF);
        assert_eq!(fb.get_pixel(3, 0), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(4, 0), 0xFFFF_0000);
    }

    #[tokio::test]
    async fn plain_rle_tile() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut inflater = ZrleInflater::new();
        let mut fb = fb(4, 2);

        // Run of 5 red (wraps the row), then 3 green.
        let mut payload = vec![128u8];
        payload.extend_from_slice(&RED);
        payload.push(4); // run length 1 + 4 = 5
        payload.extend_from_slice(&GREEN);
        payload.push(2); // run length 1 + 2 = 3
        run_decode(&payload, &mut compressor, &mut inflater, &mut fb, rect(4, 2))
            .await
            .unwrap();
        assert_eq!(fb.get_pixel(3, 0), 0xFFFF_0000);
        assert_eq!(fb.get_pixel(0, 1), 0xFFFF_0000);
        assert_eq!(fb.get_pixel(1, 1), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(3, 1), 0xFF00_FF00);
    }

    #[tokio::test]
    async fn palette_rle_tile() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut inflater = ZrleInflater::new();
        let mut fb = fb(2, 2);

        // Palette {red, green}: run of 3 of index 1, then a single index 0.
        let mut payload = vec![130u8];
        payload.extend_from_slice(&RED);
        payload.extend_from_slice(&GREEN);
        payload.push(0x81); // index 1, run follows
        payload.push(2); // run length 1 + 2 = 3
        payload.push(0x00); // index 0, length 1
        run_decode(&payload, &mut compressor, &mut inflater, &mut fb, rect(2, 2))
            .await
            .unwrap();
        assert_eq!(fb.get_pixel(0, 0), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(1, 0), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(0, 1), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(1, 1), 0xFFFF_0000);
    }

    #[tokio::test]
    async fn long_run_length_chain() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut inflater = ZrleInflater::new();
        let mut fb = fb(64, 5);

        // 64*5 = 320 pixels = 1 + 255 + 64 -> bytes [255, 64].
        let mut payload = vec![128u8];
        payload.extend_from_slice(&BLUE);
        payload.push(255);
        payload.push(64);
        run_decode(&payload, &mut compressor, &mut inflater, &mut fb, rect(64, 5))
            .await
            .unwrap();
        assert!(fb.pixels().iter().all(|&p| p == 0xFF00_00FF));
    }

    #[tokio::test]
    async fn invalid_subencoding_is_fatal() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut inflater = ZrleInflater::new();
        let mut fb = fb(2, 2);

        let err = run_decode(&[17u8], &mut compressor, &mut inflater, &mut fb, rect(2, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, VncError::Encoding(_)));
        assert!(fb.pixels().iter().all(|&p| p == 0));

        let mut inflater = ZrleInflater::new();
        let mut compressor = Compress::new(Compression::default(), true);
        let err = run_decode(&[129u8], &mut compressor, &mut inflater, &mut fb, rect(2, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, VncError::Encoding(_)));
    }

    #[tokio::test]
    async fn oversize_compressed_length_is_rejected_before_reading() {
        let (a, b) = tokio::io::duplex(64);
        let mut out = RfbOutStream::new(a);
        let mut stream = RfbInStream::new(b);
        out.write_u32(MAX_COMPRESSED_LEN + 1);
        out.flush().await.unwrap();

        let mut fb = fb(2, 2);
        let reader = PixelReader::new(*fb.format());
        let mut inflater = ZrleInflater::new();
        let err = decode(&rect(2, 2), &mut stream, &reader, &mut inflater, &mut fb)
            .await
            .unwrap_err();
        assert!(matches!(err, VncError::Protocol(_)));
    }

    #[tokio::test]
    async fn multi_tile_rectangle_spans_one_chunk() {
        let mut compressor = Compress::new(Compression::default(), true);
        let mut inflater = ZrleInflater::new();
        let mut fb = fb(65, 1);

        // Two tiles: a 64x1 solid red and a 1x1 solid green, one chunk.
        let mut payload = vec![1u8];
        payload.extend_from_slice(&RED);
        payload.push(1);
        payload.extend_from_slice(&GREEN);
        run_decode(&payload, &mut compressor, &mut inflater, &mut fb, rect(65, 1))
            .await
            .unwrap();
        assert_eq!(fb.get_pixel(63, 0), 0xFFFF_0000);
        assert_eq!(fb.get_pixel(64, 0), 0xFF00_FF00);
    }
}
