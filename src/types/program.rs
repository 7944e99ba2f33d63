// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register programs: ordered lists of single-byte register writes.

use std::fmt;

/// A single `(address, value)` register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterWrite {
    /// Register address.
    pub address: u8,
    /// Value written to the register.
    pub value: u8,
}

impl RegisterWrite {
    /// Creates a register write.
    #[must_use]
    pub const fn new(address: u8, value: u8) -> Self {
        Self { address, value }
    }
}

impl fmt::Display for RegisterWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reg:{:#04x}={:#04x}", self.address, self.value)
    }
}

/// Ordered sequence of register writes applied to a device in order.
///
/// # Examples
///
/// ```
/// use awpa::types::{RegisterProgram, RegisterWrite};
///
/// // A trailing unpaired byte is dropped.
/// let program = RegisterProgram::from_pair_bytes(&[0x01, 0x0c, 0x03, 0x06, 0x05]);
/// assert_eq!(program.len(), 2);
/// assert_eq!(program.get(1), Some(RegisterWrite::new(0x03, 0x06)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterProgram {
    writes: Vec<RegisterWrite>,
}

impl RegisterProgram {
    /// Creates an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reinterprets interleaved `address, value` bytes as a program.
    #[must_use]
    pub fn from_pair_bytes(bytes: &[u8]) -> Self {
        bytes
            .chunks_exact(2)
            .map(|pair| RegisterWrite::new(pair[0], pair[1]))
            .collect()
    }

    /// Returns the number of writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Returns `true` if the program writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Returns the write at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<RegisterWrite> {
        self.writes.get(index).copied()
    }

    /// Returns the writes as a slice.
    #[must_use]
    pub fn writes(&self) -> &[RegisterWrite] {
        &self.writes
    }

    /// Iterates over the writes in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, RegisterWrite> {
        self.writes.iter()
    }

    /// Flattens the program back into interleaved bytes.
    #[must_use]
    pub fn to_pair_bytes(&self) -> Vec<u8> {
        self.writes
            .iter()
            .flat_map(|w| [w.address, w.value])
            .collect()
    }
}

impl FromIterator<RegisterWrite> for RegisterProgram {
    fn from_iter<I: IntoIterator<Item = RegisterWrite>>(iter: I) -> Self {
        Self {
            writes: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<RegisterWrite>> for RegisterProgram {
    fn from(writes: Vec<RegisterWrite>) -> Self {
        Self { writes }
    }
}

impl<'a> IntoIterator for &'a RegisterProgram {
    type Item = &'a RegisterWrite;
    type IntoIter = std::slice::Iter<'a, RegisterWrite>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_follow_byte_order() {
        let program = RegisterProgram::from_pair_bytes(&[0x01, 0x0e, 0x02, 0xa3]);
        assert_eq!(
            program.writes(),
            &[RegisterWrite::new(0x01, 0x0e), RegisterWrite::new(0x02, 0xa3)]
        );
    }

    #[test]
    fn odd_length_drops_final_address() {
        let program = RegisterProgram::from_pair_bytes(&[0x01]);
        assert!(program.is_empty());
    }

    #[test]
    fn flattening_restores_even_input() {
        let bytes = [0x01, 0x0e, 0x02, 0xa3, 0x03, 0x06];
        assert_eq!(RegisterProgram::from_pair_bytes(&bytes).to_pair_bytes(), bytes);
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(RegisterWrite::new(0x03, 0x02).to_string(), "reg:0x03=0x02");
    }
}
