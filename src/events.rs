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

//! Session events delivered to the hosting application.
//!
//! Events are emitted from the background reader task over an unbounded
//! channel; the host decides how (and onto which thread) to marshal them.

use crate::protocol::Rectangle;

/// Events emitted by a VNC session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A rectangle of the framebuffer was updated.
    ///
    /// Emitted once per decoded rectangle, in server order. When it arrives
    /// the framebuffer already contains the decoded pixels.
    FramebufferUpdated {
        /// The invalidated region.
        rect: Rectangle,
    },

    /// The server rang its bell.
    Bell,

    /// The server published clipboard text.
    ServerCutText {
        /// Clipboard text content.
        text: String,
    },

    /// The connection is gone: read/write failure, protocol violation or
    /// server-side close. Emitted at most once per session.
    ConnectionLost,
}
