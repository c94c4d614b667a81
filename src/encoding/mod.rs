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

//! VNC rectangle decoders.
//!
//! One decoder per supported encoding, each consuming exactly its
//! rectangle's on-wire payload and writing ARGB pixels into the
//! framebuffer. Dispatch is a plain sum type; there is no trait object in
//! the decode path.

use tokio::io::AsyncRead;

use crate::error::{Result, VncError};
use crate::framebuffer::Framebuffer;
use crate::pixel::PixelReader;
use crate::protocol::{
    Rectangle, ENCODING_COPYRECT, ENCODING_CORRE, ENCODING_HEXTILE, ENCODING_RAW, ENCODING_RRE,
    ENCODING_ZRLE,
};
use crate::wire::RfbInStream;

pub mod copyrect;
pub mod corre;
pub mod hextile;
pub mod raw;
pub mod rre;
pub mod zlib;
pub mod zrle;

pub use zlib::ZrleInflater;

/// The encodings advertised to the server, in client preference order.
///
/// CoRRE is decoded when a server sends it anyway but is intentionally not
/// advertised: several servers ship broken CoRRE encoders.
pub const PREFERRED_ENCODINGS: [i32; 5] = [
    ENCODING_ZRLE,
    ENCODING_HEXTILE,
    ENCODING_RRE,
    ENCODING_COPYRECT,
    ENCODING_RAW,
];

/// The rectangle encodings this client can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingType {
    Raw,
    CopyRect,
    Rre,
    CoRre,
    Hextile,
    Zrle,
}

impl EncodingType {
    /// Maps a wire encoding number to a decoder, or `None` for encodings
    /// this client does not speak.
    pub fn from_wire(encoding: i32) -> Option<Self> {
        match encoding {
            ENCODING_RAW => Some(Self::Raw),
            ENCODING_COPYRECT => Some(Self::CopyRect),
            ENCODING_RRE => Some(Self::Rre),
            ENCODING_CORRE => Some(Self::CoRre),
            ENCODING_HEXTILE => Some(Self::Hextile),
            ENCODING_ZRLE => Some(Self::Zrle),
            _ => None,
        }
    }

    /// The wire encoding number.
    pub fn to_wire(self) -> i32 {
        match self {
            Self::Raw => ENCODING_RAW,
            Self::CopyRect => ENCODING_COPYRECT,
            Self::Rre => ENCODING_RRE,
            Self::CoRre => ENCODING_CORRE,
            Self::Hextile => ENCODING_HEXTILE,
            Self::Zrle => ENCODING_ZRLE,
        }
    }
}

/// Decodes one rectangle's payload into the framebuffer.
///
/// The rectangle geometry is validated against the framebuffer first; a
/// rectangle that overflows it is invalid data from the server and aborts
/// the connection.
pub async fn decode_rectangle<R: AsyncRead + Unpin>(
    rect: &Rectangle,
    encoding: EncodingType,
    stream: &mut RfbInStream<R>,
    reader: &PixelReader,
    inflater: &mut ZrleInflater,
    fb: &mut Framebuffer,
) -> Result<()> {
    if !fb.contains_rect(rect.x, rect.y, rect.width, rect.height) {
        return Err(VncError::Protocol(format!(
            "rectangle {}x{} at ({},{}) overflows the {}x{} framebuffer",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            fb.width(),
            fb.height()
        )));
    }
    match encoding {
        EncodingType::Raw => raw::decode(rect, stream, reader, fb).await,
        EncodingType::CopyRect => copyrect::decode(rect, stream, fb).await,
        EncodingType::Rre => rre::decode(rect, stream, reader, fb).await,
        EncodingType::CoRre => corre::decode(rect, stream, reader, fb).await,
        EncodingType::Hextile => hextile::decode(rect, stream, reader, fb).await,
        EncodingType::Zrle => zrle::decode(rect, stream, reader, inflater, fb).await,
    }
}

/// Reads one wire pixel from the main connection.
pub(crate) async fn read_wire_pixel<R: AsyncRead + Unpin>(
    stream: &mut RfbInStream<R>,
    reader: &PixelReader,
    fb: &Framebuffer,
) -> Result<u32> {
    let mut raw = [0u8; 4];
    let len = reader.bytes_per_pixel();
    stream.read_exact(&mut raw[..len]).await?;
    Ok(reader.read(&raw[..len], fb.color_map()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_mapping_round_trips() {
        for encoding in [
            EncodingType::Raw,
            EncodingType::CopyRect,
            EncodingType::Rre,
            EncodingType::CoRre,
            EncodingType::Hextile,
            EncodingType::Zrle,
        ] {
            assert_eq!(EncodingType::from_wire(encoding.to_wire()), Some(encoding));
        }
        assert_eq!(EncodingType::from_wire(7), None); // Tight
        assert_eq!(EncodingType::from_wire(-239), None); // cursor pseudo-encoding
    }

    #[test]
    fn preference_order() {
        assert_eq!(PREFERRED_ENCODINGS, [16, 5, 2, 1, 0]);
    }

    #[tokio::test]
    async fn overflowing_rectangle_is_fatal() {
        use crate::protocol::PixelFormat;
        let (_a, b) = tokio::io::duplex(64);
        let mut stream = RfbInStream::new(b);
        let reader = PixelReader::new(PixelFormat::rgb888());
        let mut inflater = ZrleInflater::new();
        let mut fb = Framebuffer::new(4, 4, PixelFormat::rgb888(), String::new());

        let rect = Rectangle {
            x: 2,
            y: 2,
            width: 3,
            height: 3,
            encoding: ENCODING_RAW,
        };
        let err = decode_rectangle(
            &rect,
            EncodingType::Raw,
            &mut stream,
            &reader,
            &mut inflater,
            &mut fb,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, VncError::Protocol(_)));
    }
}
