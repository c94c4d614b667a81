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

//! Raw encoding: `width * height` wire pixels, row-major, no compression.

use tokio::io::AsyncRead;

use crate::error::Result;
use crate::framebuffer::Framebuffer;
use crate::pixel::PixelReader;
use crate::protocol::Rectangle;
use crate::wire::RfbInStream;

/// Decodes a Raw rectangle, reading one row of wire pixels at a time.
pub async fn decode<R: AsyncRead + Unpin>(
    rect: &Rectangle,
    stream: &mut RfbInStream<R>,
    reader: &PixelReader,
    fb: &mut Framebuffer,
) -> Result<()> {
    let bpp = reader.bytes_per_pixel();
    let mut row = vec![0u8; usize::from(rect.width) * bpp];
    for y in 0..rect.height {
        stream.read_exact(&mut row).await?;
        for x in 0..rect.width {
            let offset = usize::from(x) * bpp;
            let argb = reader.read(&row[offset..offset + bpp], fb.color_map());
            fb.set_pixel(rect.x + x, rect.y + y, argb);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PixelFormat;
    use crate::wire::RfbOutStream;

    #[tokio::test]
    async fn two_by_two_big_endian_rgb888() {
        let (a, b) = tokio::io::duplex(256);
        let mut out = RfbOutStream::new(a);
        let mut stream = RfbInStream::new(b);

        #[rustfmt::skip]
        out.write_bytes(&[
            0x00, 0x00, 0x00, 0xFF,
            0x00, 0x00, 0xFF, 0x00,
            0x00, 0xFF, 0x00, 0x00,
            0xFF, 0x00, 0x00, 0x00,
        ]);
        out.flush().await.unwrap();

        let format = PixelFormat {
            big_endian: true,
            ..PixelFormat::rgb888()
        };
        let reader = PixelReader::new(format);
        let mut fb = Framebuffer::new(2, 2, format, String::new());
        let rect = Rectangle {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
            encoding: 0,
        };

        decode(&rect, &mut stream, &reader, &mut fb).await.unwrap();
        assert_eq!(fb.get_pixel(0, 0), 0xFF00_00FF);
        assert_eq!(fb.get_pixel(1, 0), 0xFF00_FF00);
        assert_eq!(fb.get_pixel(0, 1), 0xFFFF_0000);
        assert_eq!(fb.get_pixel(1, 1), 0xFF00_0000);
    }

    #[tokio::test]
    async fn offset_rectangle_lands_in_place() {
        let (a, b) = tokio::io::duplex(64);
        let mut out = RfbOutStream::new(a);
        let mut stream = RfbInStream::new(b);

        // One 8bpp true-color pixel at (2,1).
        out.write_bytes(&[0b0000_0111]);
        out.flush().await.unwrap();

        let format = PixelFormat {
            bits_per_pixel: 8,
            depth: 8,
            big_endian: false,
            true_color: true,
            red_max: 7,
            green_max: 7,
            blue_max: 3,
            red_shift: 0,
            green_shift: 3,
            blue_shift: 6,
        };
        let reader = PixelReader::new(format);
        let mut fb = Framebuffer::new(4, 4, format, String::new());
        let rect = Rectangle {
            x: 2,
            y: 1,
            width: 1,
            height: 1,
            encoding: 0,
        };

        decode(&rect, &mut stream, &reader, &mut fb).await.unwrap();
        assert_eq!(fb.get_pixel(2, 1), 0xFFFF_0000);
        assert_eq!(fb.get_pixel(0, 0), 0);
    }
}
