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

//! VNC Hextile encoding implementation.
//!
//! Hextile divides the rectangle into 16x16 tiles, row-major, the last tile
//! in a row or column possibly smaller. Each tile starts with a subencoding
//! mask byte; background and foreground colours carry over from tile to tile
//! until a tile re-specifies them.

use tokio::io::AsyncRead;

use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::pixel::PixelReader;
use crate::protocol::Rectangle;
use crate::wire::RfbInStream;

use super::read_wire_pixel;

/// Subencoding bit: entire tile is raw pixels; all other bits are ignored.
const HEXTILE_RAW: u8 = 1;
/// Subencoding bit: a new background pixel precedes the tile body.
const HEXTILE_BACKGROUND_SPECIFIED: u8 = 2;
/// Subencoding bit: a new foreground pixel precedes the subrects.
const HEXTILE_FOREGROUND_SPECIFIED: u8 = 4;
/// Subencoding bit: a subrect count byte and subrects follow.
const HEXTILE_ANY_SUBRECTS: u8 = 8;
/// Subencoding bit: each subrect carries its own pixel.
const HEXTILE_SUBRECTS_COLOURED: u8 = 16;

/// Decodes a Hextile rectangle.
pub async fn decode<R: AsyncRead + Unpin>(
    rect: &Rectangle,
    stream: &mut RfbInStream<R>,
    reader: &PixelReader,
    fb: &mut Framebuffer,
) -> Result<()> {
    let mut background = 0u32;
    let mut foreground = 0u32;

    for tile_y in (0..rect.height).step_by(16) {
        for tile_x in (0..rect.width).step_by(16) {
            let tile_w = 16.min(rect.width - tile_x);
            let tile_h = 16.min(rect.height - tile_y);
            let x0 = rect.x + tile_x;
            let y0 = rect.y + tile_y;

            let subencoding = stream.read_u8().await?;

            if subencoding & HEXTILE_RAW != 0 {
                let bpp = reader.bytes_per_pixel();
                let mut row = vec![0u8; usize::from(tile_w) * bpp];
                for dy in 0..tile_h {
                    stream.read_exact(&mut row).await?;
                    for dx in 0..tile_w {
                        let offset = usize::from(dx) * bpp;
                        let argb = reader.read(&row[offset..offset + bpp], fb.color_map());
                        fb.set_pixel(x0 + dx, y0 + dy, argb);
                    }
                }
                continue;
            }

            if subencoding & HEXTILE_BACKGROUND_SPECIFIED != 0 {
                background = read_wire_pixel(stream, reader, fb).await?;
            }
            fb.fill_rect(x0, y0, tile_w, tile_h, background);

            if subencoding & HEXTILE_FOREGROUND_SPECIFIED != 0 {
                if subencoding & HEXTILE_SUBRECTS_COLOURED != 0 {
                    return Err(VncError::Encoding(
                        "Hextile tile sets ForegroundSpecified together with SubrectsColoured"
                            .to_string(),
                    ));
                }
                foreground = read_wire_pixel(stream, reader, fb).await?;
            }

            if subencoding & HEXTILE_ANY_SUBRECTS == 0 {
                continue;
            }
            let count = stream.read_u8().await?;
            for _ in 0..count {
                let color = if subencoding & HEXTILE_SUBRECTS_COLOURED != 0 {
                    read_wire_pixel(stream, reader, fb).await?
                } else {
                    foreground
                };
                let xy = stream.read_u8().await?;
                let wh = stream.read_u8().await?;
                let sx = u16::from(xy >> 4);
                let sy = u16::from(xy & 0x0F);
                let sw = u16::from(wh >> 4) + 1;
                let sh = u16::from(wh & 0x0F) + 1;
                if sx + sw > tile_w || sy + sh > tile_h {
                    return Err(VncError::Encoding(format!(
                        "Hextile subrect {sw}x{sh} at ({sx},{sy}) overflows its {tile_w}x{tile_h} tile"
                    )));
                }
                fb.fill_rect(x0 + sx, y0 + sy, sw, sh, color);
            }
        }
    }
    Ok(())
}
