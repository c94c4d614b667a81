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

//! CoRRE encoding: RRE with `u8` subrect geometry.
//!
//! Rectangles using CoRRE are at most 255 pixels wide and tall, so each
//! subrect record packs position and size into single bytes.

use tokio::io::AsyncRead;

use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::pixel::PixelReader;
use crate::protocol::Rectangle;
use crate::wire::RfbInStream;

use super::read_wire_pixel;

/// Decodes a CoRRE rectangle: `u32` subrect count, background pixel, then
/// `count` records of `(pixel, u8 x, u8 y, u8 w, u8 h)`.
pub async fn decode<R: AsyncRead + Unpin>(
    rect: &Rectangle,
    stream: &mut RfbInStream<R>,
    reader: &PixelReader,
    fb: &mut Framebuffer,
) -> Result<()> {
    let count = stream.read_u32().await?;
    let background = read_wire_pixel(stream, reader, fb).await?;
    fb.fill_rect(rect.x, rect.y, rect.width, rect.height, background);

    for _ in 0..count {
        let pixel = read_wire_pixel(stream, reader, fb).await?;
        let x = u16::from(stream.read_u8().await?);
        let y = u16::from(stream.read_u8().await?);
        let w = u16::from(stream.read_u8().await?);
        let h = u16::from(stream.read_u8().await?);
        if x + w > rect.width || y + h > rect.height {
            return Err(VncError::Encoding(format!(
                "CoRRE subrect {w}x{h} at ({x},{y}) overflows its {}x{} rectangle",
                rect.width, rect.height
            )));
        }
        fb.fill_rect(rect.x + x, rect.y + y, w, h, pixel);
    }
    Ok(())
}
