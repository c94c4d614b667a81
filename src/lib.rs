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

//! # rustvncclient
//!
//! A pure Rust implementation of a VNC (Virtual Network Computing) client
//! core.
//!
//! This library implements the client side of the RFB (Remote Framebuffer)
//! protocol as specified in RFC 6143: it negotiates a session with a VNC
//! server, authenticates, and maintains a live ARGB mirror of the server's
//! framebuffer by decoding incremental update rectangles while forwarding
//! local input events.
//!
//! ## Features
//!
//! - **Protocol versions**: RFB 3.3, 3.7 and 3.8 (plus the Apple 3.889 and
//!   UltraVNC repeater banners)
//! - **Security types**: None and VNC Authentication (DES challenge-response)
//! - **6 encoding types**: Raw, CopyRect, RRE, CoRRE, Hextile, ZRLE
//! - **Pixel formats**: 8/16/32-bit, true-color and colour-map, either
//!   server endianness
//! - **Async I/O**: built on Tokio; updates decode on a background reader
//!   task that emits events over a channel
//! - **Memory safe**: pure Rust, no unsafe code
//!
//! Rendering, window management, clipboard integration and bell playback
//! are host concerns: the library hands over decoded pixels and
//! [`SessionEvent`]s and stays GUI-agnostic.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rustvncclient::{SessionConfig, SessionEvent, VncSession};
//!
//! #[tokio::main]
//! async fn main() -> rustvncclient::Result<()> {
//!     let (mut session, mut events) =
//!         VncSession::new(SessionConfig::for_display("192.168.1.20", 0));
//!
//!     if session.connect().await? {
//!         session.authenticate("secret").await?;
//!     }
//!     session.initialize(32, 24).await?;
//!     session.start_updates()?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             SessionEvent::FramebufferUpdated { rect } => {
//!                 let fb = session.framebuffer().unwrap();
//!                 let fb = fb.read().await;
//!                 // blit fb.pixels() to the screen...
//!                 let _ = (rect, fb.pixels());
//!             }
//!             SessionEvent::ConnectionLost => break,
//!             _ => {}
//!         }
//!     }
//!     session.disconnect().await
//! }
//! ```

pub mod auth;
pub mod encoding;
pub mod error;
pub mod events;
pub mod framebuffer;
pub mod input;
pub mod keysym;
pub mod pixel;
pub mod protocol;
pub mod session;
pub mod wire;

pub use encoding::EncodingType;
pub use error::{Result, VncError};
pub use events::SessionEvent;
pub use framebuffer::{ColorMap, Framebuffer};
pub use input::InputPolicy;
pub use pixel::PixelReader;
pub use protocol::{PixelFormat, Rectangle, ServerInit, VersionQuirks};
pub use session::{SessionConfig, SessionState, VncSession};
