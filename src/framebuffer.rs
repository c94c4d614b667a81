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

//! The client-side mirror of the server's framebuffer.
//!
//! The framebuffer is created once from the `ServerInit` geometry and never
//! resized; rectangle decoders write decoded ARGB pixels into it and the
//! host reads it back after each update event. Indexed pixel formats consult
//! the attached 256-entry colour map.

use log::warn;

use crate::protocol::PixelFormat;

/// A 256-entry colour map for indexed pixel formats.
///
/// Entries are 8-bit RGB triples. Entries the server never set decode as
/// black.
#[derive(Debug, Clone)]
pub struct ColorMap {
    entries: [(u8, u8, u8); 256],
}

impl Default for ColorMap {
    fn default() -> Self {
        Self {
            entries: [(0, 0, 0); 256],
        }
    }
}

impl ColorMap {
    /// Stores one entry from a `SetColourMapEntries` record.
    ///
    /// Wire channels are 16-bit and scale down as `value * 255 / 65535`.
    pub fn set_entry(&mut self, index: u8, red: u16, green: u16, blue: u16) {
        let scale = |v: u16| -> u8 { (u32::from(v) * 255 / 65535) as u8 };
        self.entries[usize::from(index)] = (scale(red), scale(green), scale(blue));
    }

    /// Looks up an entry as an opaque ARGB word.
    pub fn lookup(&self, index: u8) -> u32 {
        let (r, g, b) = self.entries[usize::from(index)];
        0xFF00_0000 | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }
}

/// The remote desktop's geometry, pixel buffer, format and colour map.
///
/// Pixels are stored as 32-bit ARGB words regardless of the wire format.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u16,
    height: u16,
    pixels: Vec<u32>,
    format: PixelFormat,
    color_map: ColorMap,
    desktop_name: String,
}

impl Framebuffer {
    /// Allocates a framebuffer for the geometry announced in `ServerInit`.
    pub fn new(width: u16, height: u16, format: PixelFormat, desktop_name: String) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; usize::from(width) * usize::from(height)],
            format,
            color_map: ColorMap::default(),
            desktop_name,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// The desktop name the server announced.
    pub fn desktop_name(&self) -> &str {
        &self.desktop_name
    }

    /// The active wire pixel format.
    pub fn format(&self) -> &PixelFormat {
        &self.format
    }

    /// Replaces the active pixel format (after a `SetPixelFormat` override).
    pub fn set_format(&mut self, format: PixelFormat) {
        self.format = format;
    }

    /// The colour map for indexed formats.
    pub fn color_map(&self) -> &ColorMap {
        &self.color_map
    }

    /// Mutable access for `SetColourMapEntries` handling.
    pub fn color_map_mut(&mut self) -> &mut ColorMap {
        &mut self.color_map
    }

    /// The ARGB pixel buffer, row-major.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// True when the rectangle lies entirely inside the framebuffer.
    pub fn contains_rect(&self, x: u16, y: u16, w: u16, h: u16) -> bool {
        u32::from(x) + u32::from(w) <= u32::from(self.width)
            && u32::from(y) + u32::from(h) <= u32::from(self.height)
    }

    /// Reads one pixel; out-of-bounds coordinates return black.
    pub fn get_pixel(&self, x: u16, y: u16) -> u32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.pixels[usize::from(y) * usize::from(self.width) + usize::from(x)]
    }

    /// Writes one ARGB pixel. Out-of-bounds writes are dropped with a
    /// warning rather than corrupting neighbouring rows.
    pub fn set_pixel(&mut self, x: u16, y: u16, argb: u32) {
        if x >= self.width || y >= self.height {
            warn!("dropping out-of-bounds pixel write at ({x},{y})");
            return;
        }
        self.pixels[usize::from(y) * usize::from(self.width) + usize::from(x)] = argb;
    }

    /// Fills a rectangle with a solid ARGB colour, clipped to the buffer.
    pub fn fill_rect(&mut self, x: u16, y: u16, w: u16, h: u16, argb: u32) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        let stride = usize::from(self.width);
        for row in y..y_end {
            let start = usize::from(row) * stride + usize::from(x);
            let end = usize::from(row) * stride + usize::from(x_end);
            self.pixels[start..end].fill(argb);
        }
    }

    /// Copies a `w`x`h` region from `(src_x, src_y)` to `(dst_x, dst_y)`.
    ///
    /// Overlapping regions copy as if staged through a scratch buffer: rows
    /// walk bottom-up when the destination sits below the source, and each
    /// row uses memmove semantics for the horizontal overlap.
    pub fn copy_rect(&mut self, src_x: u16, src_y: u16, dst_x: u16, dst_y: u16, w: u16, h: u16) {
        if !self.contains_rect(src_x, src_y, w, h) || !self.contains_rect(dst_x, dst_y, w, h) {
            warn!(
                "dropping out-of-bounds copy {w}x{h} from ({src_x},{src_y}) to ({dst_x},{dst_y})"
            );
            return;
        }
        let stride = usize::from(self.width);
        let width = usize::from(w);
        let rows = 0..usize::from(h);

        let copy_row = |pixels: &mut [u32], row: usize| {
            let src =
                (usize::from(src_y) + row) * stride + usize::from(src_x);
            let dst =
                (usize::from(dst_y) + row) * stride + usize::from(dst_x);
            pixels.copy_within(src..src + width, dst);
        };

        if dst_y > src_y {
            for row in rows.rev() {
                copy_row(&mut self.pixels, row);
            }
        } else {
            for row in rows {
                copy_row(&mut self.pixels, row);
            }
        }
    }
}
