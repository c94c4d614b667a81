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

//! CopyRect encoding: move a region of the framebuffer.
//!
//! The payload is just the source coordinates; the pixels come from the
//! framebuffer itself, which is why rectangles of one update must be decoded
//! in server order.

use tokio::io::AsyncRead;

use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::protocol::Rectangle;
use crate::wire::RfbInStream;

/// Decodes a CopyRect rectangle (`u16 src_x, u16 src_y`).
pub async fn decode<R: AsyncRead + Unpin>(
    rect: &Rectangle,
    stream: &mut RfbInStream<R>,
    fb: &mut Framebuffer,
) -> Result<()> {
    let src_x = stream.read_u16().await?;
    let src_y = stream.read_u16().await?;
    if !fb.contains_rect(src_x, src_y, rect.width, rect.height) {
        return Err(VncError::Protocol(format!(
            "CopyRect source {}x{} at ({src_x},{src_y}) overflows the framebuffer",
            rect.width, rect.height
        )));
    }
    fb.copy_rect(src_x, src_y, rect.x, rect.y, rect.width, rect.height);
    Ok(())
}
