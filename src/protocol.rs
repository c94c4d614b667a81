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

//! VNC Remote Framebuffer (RFB) protocol constants and wire structures.
//!
//! This module provides the fundamental building blocks for VNC protocol
//! communication as seen from the client side: protocol version negotiation,
//! security handshake messages, the `ServerInit` exchange, and the typed
//! client-to-server messages. It implements the RFB protocol as specified in
//! RFC 6143.
//!
//! # Protocol Overview
//!
//! The VNC RFB protocol operates in the following phases:
//! 1. **Protocol Version** - Server and client agree on protocol version
//! 2. **Security Handshake** - Authentication method selection and execution
//! 3. **Initialization** - Exchange of framebuffer parameters and capabilities
//! 4. **Normal Operation** - Ongoing message exchange for input events and screen updates

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Result, VncError};
use crate::wire::{RfbInStream, RfbOutStream};

// Client-to-Server Message Types

/// Message type: Client requests to change the pixel format.
pub const CLIENT_MSG_SET_PIXEL_FORMAT: u8 = 0;

/// Message type: Client specifies supported encodings, ordered by preference.
pub const CLIENT_MSG_SET_ENCODINGS: u8 = 2;

/// Message type: Client requests a framebuffer update (incremental or full).
pub const CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST: u8 = 3;

/// Message type: Client sends a keyboard event.
pub const CLIENT_MSG_KEY_EVENT: u8 = 4;

/// Message type: Client sends a pointer (mouse) event.
pub const CLIENT_MSG_POINTER_EVENT: u8 = 5;

/// Message type: Client sends cut text (clipboard data).
pub const CLIENT_MSG_CLIENT_CUT_TEXT: u8 = 6;

// Server-to-Client Message Types

/// Message type: Server sends a framebuffer update.
///
/// Contains one or more rectangles of pixel data representing screen changes.
/// This is the primary message for transmitting visual updates to the client.
pub const SERVER_MSG_FRAMEBUFFER_UPDATE: u8 = 0;

/// Message type: Server sets colour map entries.
///
/// Used for indexed color modes to define the color palette.
pub const SERVER_MSG_SET_COLOUR_MAP_ENTRIES: u8 = 1;

/// Message type: Server sends a bell (beep) notification.
pub const SERVER_MSG_BELL: u8 = 2;

/// Message type: Server sends cut text (clipboard data).
pub const SERVER_MSG_SERVER_CUT_TEXT: u8 = 3;

// Encoding Types

/// Encoding type: Raw (uncompressed pixel data).
pub const ENCODING_RAW: i32 = 0;

/// Encoding type: Copy Rectangle.
///
/// Instructs the client to copy a rectangular region from one location
/// to another on the screen. Highly efficient for scrolling operations.
pub const ENCODING_COPYRECT: i32 = 1;

/// Encoding type: Rise-and-Run-length Encoding.
pub const ENCODING_RRE: i32 = 2;

/// Encoding type: Compact RRE (u8 subrect geometry, rectangles <= 255 wide/tall).
pub const ENCODING_CORRE: i32 = 4;

/// Encoding type: Hextile (16x16 tiles with per-tile subencoding).
pub const ENCODING_HEXTILE: i32 = 5;

/// Encoding type: Zlib Run-Length Encoding (64x64 tiles over a persistent
/// zlib stream).
pub const ENCODING_ZRLE: i32 = 16;

// Security Types

/// Security type: Invalid/Unknown.
///
/// Indicates an error or unsupported security mechanism.
pub const SECURITY_TYPE_INVALID: u8 = 0;

/// Security type: None (no authentication).
pub const SECURITY_TYPE_NONE: u8 = 1;

/// Security type: VNC Authentication.
///
/// Standard VNC authentication using DES-encrypted challenge-response.
/// The server sends a 16-byte challenge, which the client encrypts with
/// the password and returns.
pub const SECURITY_TYPE_VNC_AUTH: u8 = 2;

// Security Results

/// Security result: Authentication successful.
pub const SECURITY_RESULT_OK: u32 = 0;

/// Security result: Authentication failed.
pub const SECURITY_RESULT_FAILED: u32 = 1;

/// The repeater proxy-ID frame is always exactly this many bytes.
pub const REPEATER_ID_FRAME_LEN: usize = 250;

/// Quirk table for non-standard protocol version banners.
///
/// Apple Remote Desktop announces `RFB 003.889`. It currently speaks 3.8,
/// but some deployments may end up requiring 3.3, so the mapping is kept
/// configurable per session rather than hard-coded.
#[derive(Debug, Clone, Copy)]
pub struct VersionQuirks {
    /// Negotiated minor version for the Apple `RFB 003.889` banner.
    pub apple_banner_minor: u8,
}

impl Default for VersionQuirks {
    fn default() -> Self {
        Self {
            apple_banner_minor: 8,
        }
    }
}

/// Outcome of parsing the 12-byte server version banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerBanner {
    /// A speakable protocol version, reduced to minor 3, 7 or 8.
    Version(u8),
    /// `RFB 000.000`: an UltraVNC-style repeater is asking for a proxy ID.
    Repeater,
}

/// Parses the server's 12-byte `ProtocolVersion` banner.
///
/// Accepts `RFB 003.00N` with N in {3, 6, 7, 8, 9} (mapped to minors 3, 3,
/// 7, 8, 8), `RFB 004.001` as 3.8, `RFB 003.889` via the quirk table, and
/// `RFB 000.000` as a repeater indicator.
///
/// # Errors
///
/// [`VncError::UnsupportedVersion`] carrying the received banner for any
/// other content.
pub fn parse_server_banner(banner: &[u8; 12], quirks: &VersionQuirks) -> Result<ServerBanner> {
    let unsupported =
        || VncError::UnsupportedVersion(String::from_utf8_lossy(banner).trim_end().to_string());

    if &banner[0..4] != b"RFB " || banner[7] != b'.' || banner[11] != b'\n' {
        return Err(unsupported());
    }
    let major: u32 = std::str::from_utf8(&banner[4..7])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(unsupported)?;
    let minor: u32 = std::str::from_utf8(&banner[8..11])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(unsupported)?;

    match (major, minor) {
        (0, 0) => Ok(ServerBanner::Repeater),
        (3, 3 | 6) => Ok(ServerBanner::Version(3)),
        (3, 7) => Ok(ServerBanner::Version(7)),
        (3, 8 | 9) => Ok(ServerBanner::Version(8)),
        (3, 889) => Ok(ServerBanner::Version(quirks.apple_banner_minor)),
        (4, 1) => Ok(ServerBanner::Version(8)),
        _ => Err(unsupported()),
    }
}

/// Formats the client's reply banner for a negotiated minor version.
pub fn client_banner(minor: u8) -> [u8; 12] {
    let mut banner = *b"RFB 003.000\n";
    banner[10] = b'0' + minor;
    banner
}

/// The pixel format used on the wire, as defined by RFC 6143 section 7.4.
///
/// `red_max`/`green_max`/`blue_max` give the channel value ranges and
/// `*_shift` the bit positions inside the pixel word. When `true_color` is
/// false the pixel value is an index into the colour map instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormat {
    /// Bits per pixel on the wire: 8, 16 or 32.
    pub bits_per_pixel: u8,
    /// Number of useful bits in the pixel value.
    pub depth: u8,
    /// True if multi-byte pixels are sent most-significant byte first.
    pub big_endian: bool,
    /// True for direct colour, false for colour-map (indexed) mode.
    pub true_color: bool,
    /// Maximum red value.
    pub red_max: u16,
    /// Maximum green value.
    pub green_max: u16,
    /// Maximum blue value.
    pub blue_max: u16,
    /// Bit position of the red channel.
    pub red_shift: u8,
    /// Bit position of the green channel.
    pub green_shift: u8,
    /// Bit position of the blue channel.
    pub blue_shift: u8,
}

impl PixelFormat {
    /// The common 32bpp true-color RGB888 format (little-endian).
    pub fn rgb888() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian: false,
            true_color: true,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    /// Parses a pixel format from its 16-byte wire form (including the
    /// trailing 3 bytes of padding).
    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        Self {
            bits_per_pixel: bytes[0],
            depth: bytes[1],
            big_endian: bytes[2] != 0,
            true_color: bytes[3] != 0,
            red_max: u16::from_be_bytes([bytes[4], bytes[5]]),
            green_max: u16::from_be_bytes([bytes[6], bytes[7]]),
            blue_max: u16::from_be_bytes([bytes[8], bytes[9]]),
            red_shift: bytes[10],
            green_shift: bytes[11],
            blue_shift: bytes[12],
            // bytes[13..16] are padding
        }
    }

    /// Serializes to the 16-byte wire form.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0] = self.bits_per_pixel;
        bytes[1] = self.depth;
        bytes[2] = u8::from(self.big_endian);
        bytes[3] = u8::from(self.true_color);
        bytes[4..6].copy_from_slice(&self.red_max.to_be_bytes());
        bytes[6..8].copy_from_slice(&self.green_max.to_be_bytes());
        bytes[8..10].copy_from_slice(&self.blue_max.to_be_bytes());
        bytes[10] = self.red_shift;
        bytes[11] = self.green_shift;
        bytes[12] = self.blue_shift;
        bytes
    }

    /// Number of bytes one pixel occupies on the wire.
    pub fn bytes_per_pixel(&self) -> usize {
        usize::from(self.bits_per_pixel / 8)
    }

    /// Checks the structural invariants a server-supplied format must hold.
    pub fn is_valid(&self) -> bool {
        matches!(self.bits_per_pixel, 8 | 16 | 32)
            && self.depth > 0
            && self.depth <= self.bits_per_pixel
            && (!self.true_color
                || (self.red_shift < 32 && self.green_shift < 32 && self.blue_shift < 32))
    }

    /// Returns the preset format a client may request for a given
    /// `(bits_per_pixel, depth)` pair, or `None` to keep the server's
    /// advertised format.
    pub fn preset(bits_per_pixel: u8, depth: u8) -> Option<Self> {
        let (red_max, green_max, blue_max, red_shift, green_shift, blue_shift) =
            match (bits_per_pixel, depth) {
                (16, 16) | (16, 8) => (31, 63, 31, 11, 5, 0),
                (8, 8) => (7, 7, 3, 0, 3, 6),
                (8, 6) => (3, 3, 3, 4, 2, 0),
                (8, 3) => (1, 1, 1, 2, 1, 0),
                _ => return None,
            };
        Some(Self {
            bits_per_pixel,
            depth,
            big_endian: false,
            true_color: false,
            red_max,
            green_max,
            blue_max,
            red_shift,
            green_shift,
            blue_shift,
        })
    }
}

/// A rectangle header inside a `FramebufferUpdate` message.
///
/// Each framebuffer update contains one or more rectangles, each with its
/// own encoding type. The payload that follows the header is interpreted by
/// the decoder selected by `encoding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    /// X coordinate of the top-left corner.
    pub x: u16,
    /// Y coordinate of the top-left corner.
    pub y: u16,
    /// Width of the rectangle in pixels.
    pub width: u16,
    /// Height of the rectangle in pixels.
    pub height: u16,
    /// The encoding type used for this rectangle's pixel data.
    pub encoding: i32,
}

impl Rectangle {
    /// Reads a rectangle header (8 bytes of geometry + 4 bytes of encoding).
    pub async fn read_from<R: AsyncRead + Unpin>(stream: &mut RfbInStream<R>) -> Result<Self> {
        Ok(Self {
            x: stream.read_u16().await?,
            y: stream.read_u16().await?,
            width: stream.read_u16().await?,
            height: stream.read_u16().await?,
            encoding: stream.read_i32().await?,
        })
    }
}

/// The `ServerInit` message sent by the server after security negotiation.
#[derive(Debug, Clone)]
pub struct ServerInit {
    /// The width of the framebuffer in pixels.
    pub framebuffer_width: u16,
    /// The height of the framebuffer in pixels.
    pub framebuffer_height: u16,
    /// The pixel format the server will use until the client overrides it.
    pub pixel_format: PixelFormat,
    /// The name of the desktop.
    pub name: String,
}

impl ServerInit {
    /// Reads a `ServerInit` message.
    ///
    /// The format follows the RFB protocol specification:
    /// - 2 bytes: framebuffer width
    /// - 2 bytes: framebuffer height
    /// - 16 bytes: pixel format
    /// - 4 bytes: name length
    /// - N bytes: name string (UTF-8)
    pub async fn read_from<R: AsyncRead + Unpin>(stream: &mut RfbInStream<R>) -> Result<Self> {
        let framebuffer_width = stream.read_u16().await?;
        let framebuffer_height = stream.read_u16().await?;
        let mut format_bytes = [0u8; 16];
        stream.read_exact(&mut format_bytes).await?;
        let pixel_format = PixelFormat::from_bytes(&format_bytes);
        let name_len = stream.read_u32().await? as usize;
        if name_len > 4096 {
            return Err(VncError::Protocol(format!(
                "ServerInit desktop name too long: {name_len} bytes"
            )));
        }
        let name_bytes = stream.read_bytes(name_len).await?;
        let name = String::from_utf8_lossy(&name_bytes).into_owned();
        Ok(Self {
            framebuffer_width,
            framebuffer_height,
            pixel_format,
            name,
        })
    }
}

/// Reads the server-supplied failure reason string (`u32` length + UTF-8).
pub async fn read_failure_reason<R: AsyncRead + Unpin>(
    stream: &mut RfbInStream<R>,
) -> Result<String> {
    let len = stream.read_u32().await? as usize;
    if len > 4096 {
        return Err(VncError::Protocol(format!(
            "failure reason too long: {len} bytes"
        )));
    }
    let bytes = stream.read_bytes(len).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads the list of security types the server offers.
///
/// On protocol 3.3 the server picks the type itself and sends it as a single
/// `u32`; on 3.7+ it sends a `u8` count followed by that many type bytes. An
/// empty list (or type 0 on 3.3) means the connection was rejected and a
/// failure reason follows.
///
/// # Errors
///
/// [`VncError::HandshakeRejected`] with the server's reason on rejection.
pub async fn read_security_types<R: AsyncRead + Unpin>(
    stream: &mut RfbInStream<R>,
    minor: u8,
) -> Result<Vec<u8>> {
    if minor == 3 {
        let chosen = stream.read_u32().await?;
        if chosen == u32::from(SECURITY_TYPE_INVALID) {
            let reason = read_failure_reason(stream).await?;
            return Err(VncError::HandshakeRejected(reason));
        }
        let chosen = u8::try_from(chosen).map_err(|_| {
            VncError::Protocol(format!("server chose out-of-range security type {chosen}"))
        })?;
        Ok(vec![chosen])
    } else {
        let count = stream.read_u8().await?;
        if count == 0 {
            let reason = read_failure_reason(stream).await?;
            return Err(VncError::HandshakeRejected(reason));
        }
        let types = stream.read_bytes(usize::from(count)).await?;
        Ok(types)
    }
}

/// Picks the security type to use from the server's offer.
///
/// Returns the FIRST supported type in server order. A server offering
/// `[None, VncAuth]` therefore negotiates `None` even when the caller holds
/// a password.
pub fn choose_security_type(offered: &[u8]) -> Option<u8> {
    offered
        .iter()
        .copied()
        .find(|t| matches!(*t, SECURITY_TYPE_NONE | SECURITY_TYPE_VNC_AUTH))
}

/// Writes the 250-byte repeater proxy-ID frame.
///
/// The UltraVNC repeater protocol expects `ID:<proxy>` followed by a
/// newline, null-padded to exactly [`REPEATER_ID_FRAME_LEN`] bytes.
///
/// # Errors
///
/// [`VncError::InvalidOperation`] when the ID does not fit in the frame.
pub fn write_repeater_id<W: AsyncWrite + Unpin>(
    stream: &mut RfbOutStream<W>,
    proxy_id: &str,
) -> Result<()> {
    let id_string = format!("ID:{proxy_id}\n");
    if id_string.len() > REPEATER_ID_FRAME_LEN {
        return Err(VncError::InvalidOperation(
            "repeater ID too long for the 250-byte frame".to_string(),
        ));
    }
    let mut frame = [0u8; REPEATER_ID_FRAME_LEN];
    frame[..id_string.len()].copy_from_slice(id_string.as_bytes());
    stream.write_bytes(&frame);
    Ok(())
}

/// Queues a `ClientInit` message (`u8 shared`).
pub fn write_client_init<W: AsyncWrite + Unpin>(stream: &mut RfbOutStream<W>, shared: bool) {
    stream.write_u8(u8::from(shared));
}

/// Queues a `SetPixelFormat` message.
pub fn write_set_pixel_format<W: AsyncWrite + Unpin>(
    stream: &mut RfbOutStream<W>,
    format: &PixelFormat,
) {
    stream.write_u8(CLIENT_MSG_SET_PIXEL_FORMAT);
    stream.write_padding(3);
    stream.write_bytes(&format.to_bytes());
}

/// Queues a `SetEncodings` message with the given encodings in preference
/// order.
#[allow(clippy::cast_possible_truncation)] // encoding lists are a handful of entries
pub fn write_set_encodings<W: AsyncWrite + Unpin>(stream: &mut RfbOutStream<W>, encodings: &[i32]) {
    stream.write_u8(CLIENT_MSG_SET_ENCODINGS);
    stream.write_padding(1);
    stream.write_u16(encodings.len() as u16);
    for &encoding in encodings {
        stream.write_i32(encoding);
    }
}

/// Queues a `FramebufferUpdateRequest` message.
pub fn write_framebuffer_update_request<W: AsyncWrite + Unpin>(
    stream: &mut RfbOutStream<W>,
    incremental: bool,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
) {
    stream.write_u8(CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST);
    stream.write_u8(u8::from(incremental));
    stream.write_u16(x);
    stream.write_u16(y);
    stream.write_u16(width);
    stream.write_u16(height);
}

/// Queues a `KeyEvent` message.
pub fn write_key_event<W: AsyncWrite + Unpin>(
    stream: &mut RfbOutStream<W>,
    keysym: u32,
    down: bool,
) {
    stream.write_u8(CLIENT_MSG_KEY_EVENT);
    stream.write_u8(u8::from(down));
    stream.write_padding(2);
    stream.write_u32(keysym);
}

/// Queues a `PointerEvent` message.
///
/// Button mask bits: 1=left, 2=middle, 4=right, 8=wheel-up, 16=wheel-down.
pub fn write_pointer_event<W: AsyncWrite + Unpin>(
    stream: &mut RfbOutStream<W>,
    button_mask: u8,
    x: u16,
    y: u16,
) {
    stream.write_u8(CLIENT_MSG_POINTER_EVENT);
    stream.write_u8(button_mask);
    stream.write_u16(x);
    stream.write_u16(y);
}

/// Queues a `ClientCutText` message.
#[allow(clippy::cast_possible_truncation)] // cut text length is bounded by the caller
pub fn write_client_cut_text<W: AsyncWrite + Unpin>(stream: &mut RfbOutStream<W>, text: &str) {
    stream.write_u8(CLIENT_MSG_CLIENT_CUT_TEXT);
    stream.write_padding(3);
    stream.write_u32(text.len() as u32);
    stream.write_bytes(text.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banner(text: &str) -> [u8; 12] {
        text.as_bytes().try_into().unwrap()
    }

    #[test]
    fn banner_minor_mapping() {
        let quirks = VersionQuirks::default();
        let cases = [
            ("RFB 003.003\n", 3),
            ("RFB 003.006\n", 3),
            ("RFB 003.007\n", 7),
            ("RFB 003.008\n", 8),
            ("RFB 003.009\n", 8),
            ("RFB 004.001\n", 8),
            ("RFB 003.889\n", 8),
        ];
        for (text, minor) in cases {
            assert_eq!(
                parse_server_banner(&banner(text), &quirks).unwrap(),
                ServerBanner::Version(minor),
                "{text:?}"
            );
        }
    }

    #[test]
    fn banner_repeater_and_rejects() {
        let quirks = VersionQuirks::default();
        assert_eq!(
            parse_server_banner(&banner("RFB 000.000\n"), &quirks).unwrap(),
            ServerBanner::Repeater
        );
        for text in [
            "RFB 002.000\n",
            "RFB 003.004\n",
            "RFB 003.005\n",
            "HTTP/1.1 200",
            "RFB 003-008\n",
        ] {
            let err = parse_server_banner(&banner(text), &quirks).unwrap_err();
            assert!(matches!(err, VncError::UnsupportedVersion(_)), "{text:?}");
        }
    }

    #[test]
    fn apple_banner_quirk_is_configurable() {
        let quirks = VersionQuirks {
            apple_banner_minor: 3,
        };
        assert_eq!(
            parse_server_banner(&banner("RFB 003.889\n"), &quirks).unwrap(),
            ServerBanner::Version(3)
        );
    }

    #[test]
    fn client_banner_form() {
        assert_eq!(&client_banner(3), b"RFB 003.003\n");
        assert_eq!(&client_banner(7), b"RFB 003.007\n");
        assert_eq!(&client_banner(8), b"RFB 003.008\n");
    }

    #[test]
    fn pixel_format_wire_round_trip() {
        let format = PixelFormat {
            bits_per_pixel: 16,
            depth: 16,
            big_endian: true,
            true_color: true,
            red_max: 31,
            green_max: 63,
            blue_max: 31,
            red_shift: 11,
            green_shift: 5,
            blue_shift: 0,
        };
        assert_eq!(PixelFormat::from_bytes(&format.to_bytes()), format);
    }

    #[test]
    fn preset_table() {
        let p = PixelFormat::preset(16, 16).unwrap();
        assert_eq!(
            (
                p.red_max,
                p.green_max,
                p.blue_max,
                p.red_shift,
                p.green_shift,
                p.blue_shift
            ),
            (31, 63, 31, 11, 5, 0)
        );
        assert!(!p.true_color);
        assert_eq!(PixelFormat::preset(16, 8).unwrap().red_shift, 11);
        let p = PixelFormat::preset(8, 8).unwrap();
        assert_eq!((p.red_max, p.green_max, p.blue_max), (7, 7, 3));
        assert_eq!((p.red_shift, p.green_shift, p.blue_shift), (0, 3, 6));
        let p = PixelFormat::preset(8, 6).unwrap();
        assert_eq!((p.red_max, p.red_shift, p.green_shift), (3, 4, 2));
        let p = PixelFormat::preset(8, 3).unwrap();
        assert_eq!((p.red_max, p.red_shift, p.green_shift), (1, 2, 1));
        assert!(PixelFormat::preset(32, 24).is_none());
        assert!(PixelFormat::preset(24, 24).is_none());
    }

    #[test]
    fn security_choice_is_first_match_in_server_order() {
        assert_eq!(choose_security_type(&[1, 2]), Some(1));
        assert_eq!(choose_security_type(&[2, 1]), Some(2));
        assert_eq!(choose_security_type(&[19, 2]), Some(2));
        assert_eq!(choose_security_type(&[19, 20]), None);
        assert_eq!(choose_security_type(&[]), None);
    }

    #[tokio::test]
    async fn client_message_wire_layouts() {
        let (a, b) = tokio::io::duplex(4096);
        let mut out = RfbOutStream::new(a);
        let mut inp = RfbInStream::new(b);

        write_key_event(&mut out, 0xFF0D, true);
        write_pointer_event(&mut out, 0x01, 10, 20);
        write_client_cut_text(&mut out, "hi");
        write_framebuffer_update_request(&mut out, true, 0, 0, 800, 600);
        out.flush().await.unwrap();

        assert_eq!(
            inp.read_bytes(8).await.unwrap(),
            vec![4, 1, 0, 0, 0x00, 0x00, 0xFF, 0x0D]
        );
        assert_eq!(inp.read_bytes(6).await.unwrap(), vec![5, 0x01, 0, 10, 0, 20]);
        assert_eq!(
            inp.read_bytes(10).await.unwrap(),
            vec![6, 0, 0, 0, 0, 0, 0, 2, b'h', b'i']
        );
        assert_eq!(
            inp.read_bytes(10).await.unwrap(),
            vec![3, 1, 0, 0, 0, 0, 3, 32, 2, 88]
        );
    }

    #[tokio::test]
    async fn set_encodings_preference_order_on_the_wire() {
        let (a, b) = tokio::io::duplex(4096);
        let mut out = RfbOutStream::new(a);
        let mut inp = RfbInStream::new(b);

        write_set_encodings(&mut out, &crate::encoding::PREFERRED_ENCODINGS);
        out.flush().await.unwrap();

        assert_eq!(inp.read_u8().await.unwrap(), CLIENT_MSG_SET_ENCODINGS);
        inp.read_padding(1).await.unwrap();
        assert_eq!(inp.read_u16().await.unwrap(), 5);
        let mut listed = Vec::new();
        for _ in 0..5 {
            listed.push(inp.read_i32().await.unwrap());
        }
        assert_eq!(listed, vec![16, 5, 2, 1, 0]);
    }

    #[tokio::test]
    async fn repeater_frame_is_exactly_250_bytes() {
        let (a, b) = tokio::io::duplex(4096);
        let mut out = RfbOutStream::new(a);
        let mut inp = RfbInStream::new(b);

        write_repeater_id(&mut out, "1234").unwrap();
        out.flush().await.unwrap();

        let frame = inp.read_bytes(REPEATER_ID_FRAME_LEN).await.unwrap();
        assert_eq!(&frame[..8], b"ID:1234\n");
        assert!(frame[8..].iter().all(|&b| b == 0));

        let too_long = "x".repeat(REPEATER_ID_FRAME_LEN);
        assert!(write_repeater_id(&mut out, &too_long).is_err());
    }

    #[tokio::test]
    async fn server_init_parsing() {
        let (a, b) = tokio::io::duplex(4096);
        let mut out = RfbOutStream::new(a);
        let mut inp = RfbInStream::new(b);

        out.write_u16(1920);
        out.write_u16(1080);
        out.write_bytes(&PixelFormat::rgb888().to_bytes());
        out.write_u32(12);
        out.write_bytes(b"Test Desktop");
        out.flush().await.unwrap();

        let init = ServerInit::read_from(&mut inp).await.unwrap();
        assert_eq!(init.framebuffer_width, 1920);
        assert_eq!(init.framebuffer_height, 1080);
        assert_eq!(init.pixel_format, PixelFormat::rgb888());
        assert_eq!(init.name, "Test Desktop");
    }

    #[tokio::test]
    async fn security_rejection_carries_reason() {
        let (a, b) = tokio::io::duplex(4096);
        let mut out = RfbOutStream::new(a);
        let mut inp = RfbInStream::new(b);

        out.write_u8(0);
        out.write_u32(8);
        out.write_bytes(b"too busy");
        out.flush().await.unwrap();

        let err = read_security_types(&mut inp, 8).await.unwrap_err();
        match err {
            VncError::HandshakeRejected(reason) => assert_eq!(reason, "too busy"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
