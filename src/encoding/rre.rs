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

//! RRE (Rise-and-Run-length) encoding: a background colour plus a list of
//! solid subrectangles.

use tokio::io::AsyncRead;

use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::pixel::PixelReader;
use crate::protocol::Rectangle;
use crate::wire::RfbInStream;

use super::read_wire_pixel;

/// Decodes an RRE rectangle: `u32` subrect count, background pixel, then
/// `count` records of `(pixel, u16 x, u16 y, u16 w, u16 h)`.
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
        let x = stream.read_u16().await?;
        let y = stream.read_u16().await?;
        let w = stream.read_u16().await?;
        let h = stream.read_u16().await?;
        if u32::from(x) + u32::from(w) > u32::from(rect.width)
            || u32::from(y) + u32::from(h) > u32::from(rect.height)
        {
            return Err(VncError::Encoding(format!(
                "RRE subrect {w}x{h} at ({x},{y}) overflows its {}x{} rectangle",
                rect.width, rect.height
            )));
        }
        fb.fill_rect(rect.x + x, rect.y + y, w, h, pixel);
    }
    Ok(())
}
