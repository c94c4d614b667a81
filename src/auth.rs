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

//! VNC authentication implementation.
//!
//! This module implements the client half of VNC Authentication (security
//! type 2) as specified in RFC 6143 Section 7.2.2. It uses DES encryption
//! with a VNC-specific bit reversal quirk for challenge-response
//! authentication.
//!
//! # Protocol
//!
//! The VNC authentication handshake works as follows:
//! 1. Server generates a 16-byte random challenge
//! 2. Server sends the challenge to the client
//! 3. Client encrypts the challenge using the password as the DES key (with bit-reversed bytes)
//! 4. Client sends the encrypted result back to the server
//! 5. Server verifies the response matches its own encryption of the challenge
//!
//! # Security Note
//!
//! VNC Authentication is a legacy protocol and has known security
//! limitations. It should only be used on trusted networks or in conjunction
//! with TLS/SSL tunneling.

use des::cipher::{BlockEncrypt, KeyInit};
use des::Des;

/// Derives the 8-byte DES key from a VNC password.
///
/// The password is truncated or zero-padded to 8 bytes and each byte has its
/// bits reversed. The reversal is the historical VNC quirk; a straight DES
/// key produces responses no VNC server accepts.
pub fn password_key(password: &str) -> [u8; 8] {
    let mut key = [0u8; 8];
    for (i, &byte) in password.as_bytes().iter().take(8).enumerate() {
        key[i] = reverse_bits(byte);
    }
    key
}

/// Computes the 16-byte response to a VNC authentication challenge.
///
/// The challenge is encrypted as two 8-byte DES blocks in ECB mode with the
/// bit-reversed password key; no padding is involved.
///
/// # Arguments
///
/// * `password` - The VNC password (only the first 8 bytes are significant).
/// * `challenge` - The 16-byte challenge received from the server.
///
/// # Returns
///
/// The 16-byte encrypted response to send back.
pub fn solve_challenge(password: &str, challenge: &[u8; 16]) -> [u8; 16] {
    let key = password_key(password);
    // An 8-byte slice is always a valid DES key, so this cannot fail.
    let cipher = Des::new_from_slice(&key).expect("8-byte key");

    let mut response = *challenge;
    for half in response.chunks_exact_mut(8) {
        let mut block = [0u8; 8];
        block.copy_from_slice(half);
        let mut block = block.into();
        cipher.encrypt_block(&mut block);
        half.copy_from_slice(&block);
    }
    response
}

/// Reverses the bits within a single byte (`bit i` moves to `bit 7-i`).
///
/// # Example
///
/// `0b10110001` (177) becomes `0b10001101` (141).
fn reverse_bits(byte: u8) -> u8 {
    let mut result = 0u8;
    for i in 0..8 {
        if byte & (1 << i) != 0 {
            result |= 1 << (7 - i);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_reversal() {
        assert_eq!(reverse_bits(0b1011_0001), 0b1000_1101);
        assert_eq!(reverse_bits(0x00), 0x00);
        assert_eq!(reverse_bits(0xFF), 0xFF);
        assert_eq!(reverse_bits(0x80), 0x01);
        for byte in 0..=u8::MAX {
            assert_eq!(reverse_bits(reverse_bits(byte)), byte);
        }
    }

    #[test]
    fn key_derivation_reverses_each_password_byte() {
        // "password" = 70 61 73 73 77 6F 72 64, reversed per byte.
        assert_eq!(
            password_key("password"),
            [0x0E, 0x86, 0xCE, 0xCE, 0xEE, 0xF6, 0x4E, 0x26]
        );
    }

    #[test]
    fn short_passwords_are_zero_padded_and_long_ones_truncated() {
        assert_eq!(password_key(""), [0u8; 8]);
        assert_eq!(password_key("a")[1..], [0u8; 7]);
        assert_eq!(password_key("abcdefgh"), password_key("abcdefghijklm"));
    }

    #[test]
    fn identical_challenge_halves_encrypt_identically() {
        // ECB mode: two equal blocks map to equal ciphertext blocks.
        let response = solve_challenge("password", &[0u8; 16]);
        assert_eq!(response[0..8], response[8..16]);
        assert_ne!(response, [0u8; 16]);
    }

    #[test]
    fn response_is_deterministic_and_password_sensitive() {
        let challenge = [
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
            0x0F, 0x10,
        ];
        assert_eq!(
            solve_challenge("secret", &challenge),
            solve_challenge("secret", &challenge)
        );
        assert_ne!(
            solve_challenge("secret", &challenge),
            solve_challenge("Secret", &challenge)
        );
    }
}
