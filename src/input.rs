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

//! Input forwarding policy.

/// Decides which local input reaches the server.
///
/// The session consults the policy on every outgoing event; it can be
/// swapped at runtime to toggle a view-only mode. Clipboard text is not
/// considered input and always forwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputPolicy {
    /// Forward all key and pointer events.
    #[default]
    Full,
    /// Drop key and pointer events (view-only).
    ViewOnly,
}

impl InputPolicy {
    /// True when key and pointer events should be sent.
    pub fn allows_pointer_and_keys(self) -> bool {
        matches!(self, Self::Full)
    }
}
