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

//! X11 keysym values for `KeyEvent` messages.
//!
//! RFB key events carry X Window System keysyms. Printable characters map
//! to their code point; the special keys use the `0xFFxx` block below.

pub const BACK_SPACE: u32 = 0xFF08;
pub const TAB: u32 = 0xFF09;
pub const RETURN: u32 = 0xFF0D;
pub const ESCAPE: u32 = 0xFF1B;
pub const INSERT: u32 = 0xFF63;
pub const HOME: u32 = 0xFF50;
pub const LEFT: u32 = 0xFF51;
pub const UP: u32 = 0xFF52;
pub const RIGHT: u32 = 0xFF53;
pub const DOWN: u32 = 0xFF54;
pub const PAGE_UP: u32 = 0xFF55;
pub const PAGE_DOWN: u32 = 0xFF56;
pub const END: u32 = 0xFF57;
pub const F1: u32 = 0xFFBE;
pub const F2: u32 = 0xFFBF;
pub const F3: u32 = 0xFFC0;
pub const F4: u32 = 0xFFC1;
pub const F5: u32 = 0xFFC2;
pub const F6: u32 = 0xFFC3;
pub const F7: u32 = 0xFFC4;
pub const F8: u32 = 0xFFC5;
pub const F9: u32 = 0xFFC6;
pub const F10: u32 = 0xFFC7;
pub const F11: u32 = 0xFFC8;
pub const F12: u32 = 0xFFC9;
pub const SHIFT_L: u32 = 0xFFE1;
pub const SHIFT_R: u32 = 0xFFE2;
pub const CONTROL_L: u32 = 0xFFE3;
pub const CONTROL_R: u32 = 0xFFE4;
pub const ALT_L: u32 = 0xFFE9;
pub const ALT_R: u32 = 0xFFEA;
pub const SUPER_L: u32 = 0xFFEB;
pub const SUPER_R: u32 = 0xFFEC;
pub const DELETE: u32 = 0xFFFF;

/// Host keys with no character of their own, in the fixed RFB mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKey {
    BackSpace,
    Tab,
    Return,
    Escape,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Left,
    Up,
    Right,
    Down,
    Function(u8),
    ShiftLeft,
    ShiftRight,
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    SuperLeft,
    SuperRight,
    Delete,
}

impl HostKey {
    /// The X11 keysym transmitted for this key.
    ///
    /// `Function(n)` is defined for F1..=F12; other values fold onto F12.
    pub fn keysym(self) -> u32 {
        match self {
            Self::BackSpace => BACK_SPACE,
            Self::Tab => TAB,
            Self::Return => RETURN,
            Self::Escape => ESCAPE,
            Self::Insert => INSERT,
            Self::Home => HOME,
            Self::End => END,
            Self::PageUp => PAGE_UP,
            Self::PageDown => PAGE_DOWN,
            Self::Left => LEFT,
            Self::Up => UP,
            Self::Right => RIGHT,
            Self::Down => DOWN,
            Self::Function(n) => {
                let n = if (1..=12).contains(&n) { n } else { 12 };
                F1 + u32::from(n - 1)
            }
            Self::ShiftLeft => SHIFT_L,
            Self::ShiftRight => SHIFT_R,
            Self::ControlLeft => CONTROL_L,
            Self::ControlRight => CONTROL_R,
            Self::AltLeft => ALT_L,
            Self::AltRight => ALT_R,
            Self::SuperLeft => SUPER_L,
            Self::SuperRight => SUPER_R,
            Self::Delete => DELETE,
        }
    }
}

/// The keysym for a printable character.
///
/// Latin-1 code points map directly; everything else uses the X11 Unicode
/// keysym range (`0x0100_0000 + code point`).
pub fn keysym_for_char(c: char) -> u32 {
    let code = c as u32;
    if code < 0x100 {
        code
    } else {
        0x0100_0000 + code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_key_table() {
        assert_eq!(HostKey::BackSpace.keysym(), 0xFF08);
        assert_eq!(HostKey::Return.keysym(), 0xFF0D);
        assert_eq!(HostKey::Escape.keysym(), 0xFF1B);
        assert_eq!(HostKey::Home.keysym(), 0xFF50);
        assert_eq!(HostKey::Left.keysym(), 0xFF51);
        assert_eq!(HostKey::Down.keysym(), 0xFF54);
        assert_eq!(HostKey::Function(1).keysym(), 0xFFBE);
        assert_eq!(HostKey::Function(12).keysym(), 0xFFC9);
        assert_eq!(HostKey::Function(0).keysym(), 0xFFC9);
        assert_eq!(HostKey::Function(13).keysym(), 0xFFC9);
        assert_eq!(HostKey::ControlRight.keysym(), 0xFFE4);
        assert_eq!(HostKey::Delete.keysym(), 0xFFFF);
    }

    #[test]
    fn printable_characters_use_code_points() {
        assert_eq!(keysym_for_char('a'), 0x61);
        assert_eq!(keysym_for_char('A'), 0x41);
        assert_eq!(keysym_for_char(' '), 0x20);
        assert_eq!(keysym_for_char('é'), 0xE9);
        assert_eq!(keysym_for_char('€'), 0x0100_0000 + 0x20AC);
    }
}
