// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Framed (self-describing) scene blobs.
//!
//! Layout, all fields little-endian `u32` unless noted:
//!
//! | offset | field            |
//! |--------|------------------|
//! | 0      | checksum         |
//! | 4      | header version   |
//! | 8      | data type        |
//! | 12     | data version     |
//! | 16     | data length      |
//! | 20     | UI version       |
//! | 24     | chip type, 8 raw bytes |
//! | 32     | address width    |
//! | 36     | value width      |
//! | 40     | device address   |
//! | 44     | reserved (16)    |
//!
//! The register list follows the header. Its offset is not a header field:
//! the region always starts at [`HEADER_LEN`] and spans the data length, so
//! [`FrameHeader::valid_data_addr`] is derived on parse and only differs
//! from `HEADER_LEN` on hand-built headers.

use crate::error::FormatError;
use crate::types::RegisterProgram;

/// Length of the frame header in bytes.
pub const HEADER_LEN: usize = 60;

/// The only header layout version understood by this decoder.
pub const HEADER_VERSION: u32 = 0x0100_0000;

/// Data type tag of a register list.
pub const DATA_TYPE_REGISTER_LIST: u32 = 0;

/// Decoded frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Checksum over every byte after the checksum field.
    pub checksum: u32,
    /// Header layout version.
    pub header_version: u32,
    /// Declared content type.
    pub data_type: u32,
    /// Version tag of the carried data.
    pub data_version: u32,
    /// UI tool version tag.
    pub ui_version: u32,
    /// Raw chip type bytes.
    pub chip_type: [u8; 8],
    /// Register address width in bytes.
    pub address_width: u32,
    /// Register value width in bytes.
    pub value_width: u32,
    /// Bus address the blob was generated for.
    pub device_address: u32,
    /// Offset of the register region inside the blob.
    pub valid_data_addr: usize,
    /// Length of the register region.
    pub valid_data_len: usize,
}

impl FrameHeader {
    /// A header describing a register list of `data_len` bytes right after
    /// the header.
    #[must_use]
    pub fn register_list(data_len: u32) -> Self {
        Self {
            checksum: 0,
            header_version: HEADER_VERSION,
            data_type: DATA_TYPE_REGISTER_LIST,
            data_version: 0,
            ui_version: 0,
            chip_type: [0; 8],
            address_width: 1,
            value_width: 1,
            device_address: 0,
            valid_data_addr: HEADER_LEN,
            valid_data_len: data_len as usize,
        }
    }

    /// Decodes the header at the start of `blob`.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::HeaderTooShort`] for blobs shorter than the
    /// header and [`FormatError::UnsupportedVersion`] for unknown layouts.
    pub fn parse(blob: &[u8]) -> Result<Self, FormatError> {
        if blob.len() < HEADER_LEN {
            return Err(FormatError::HeaderTooShort {
                needed: HEADER_LEN,
                available: blob.len(),
            });
        }

        let header_version = read_u32(blob, 4);
        if header_version != HEADER_VERSION {
            return Err(FormatError::UnsupportedVersion(header_version));
        }

        let mut chip_type = [0u8; 8];
        chip_type.copy_from_slice(&blob[24..32]);

        Ok(Self {
            checksum: read_u32(blob, 0),
            header_version,
            data_type: read_u32(blob, 8),
            data_version: read_u32(blob, 12),
            ui_version: read_u32(blob, 20),
            chip_type,
            address_width: read_u32(blob, 32),
            value_width: read_u32(blob, 36),
            device_address: read_u32(blob, 40),
            valid_data_addr: HEADER_LEN,
            valid_data_len: read_u32(blob, 16) as usize,
        })
    }

    /// Encodes the header into its 60-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        for field in [
            self.checksum,
            self.header_version,
            self.data_type,
            self.data_version,
            u32::try_from(self.valid_data_len).unwrap_or(u32::MAX),
            self.ui_version,
        ] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(&self.chip_type);
        for field in [self.address_width, self.value_width, self.device_address] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.resize(HEADER_LEN, 0);
        out
    }

    /// Describes every way the header disagrees with a one-byte register list.
    #[must_use]
    pub fn inconsistencies(&self) -> Vec<String> {
        let mut found = Vec::new();
        if self.address_width != 1 {
            found.push(format!("address width {}", self.address_width));
        }
        if self.value_width != 1 {
            found.push(format!("value width {}", self.value_width));
        }
        if self.data_type != DATA_TYPE_REGISTER_LIST {
            found.push(format!("data type {:#x}", self.data_type));
        }
        found
    }

    /// Chip name from the chip type bytes, starting at the first `'A'`.
    #[must_use]
    pub fn chip_name(&self) -> String {
        let start = self
            .chip_type
            .iter()
            .position(|&b| b == b'A')
            .unwrap_or(self.chip_type.len());
        self.chip_type[start..]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect()
    }

    /// Cuts the register region out of `blob`.
    ///
    /// A trailing odd byte in the region is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::RegionOutOfBounds`] if the region does not fit
    /// inside `blob`.
    pub fn extract_program(&self, blob: &[u8]) -> Result<RegisterProgram, FormatError> {
        let offset = self.valid_data_addr;
        let end = offset
            .checked_add(self.valid_data_len)
            .filter(|&end| end <= blob.len())
            .ok_or(FormatError::RegionOutOfBounds {
                offset,
                end: offset.saturating_add(self.valid_data_len),
                available: blob.len(),
            })?;
        Ok(RegisterProgram::from_pair_bytes(&blob[offset..end]))
    }
}

/// A framed blob split into its header and register program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedBlob {
    /// The decoded header.
    pub header: FrameHeader,
    /// Register program from the header's valid region.
    pub program: RegisterProgram,
}

/// Decodes a framed blob.
///
/// Width and content type mismatches are logged and parsing continues; only
/// a missing or unreadable header, or a region outside the blob, fail.
///
/// # Errors
///
/// Returns [`FormatError`] as described on [`FrameHeader::parse`] and
/// [`FrameHeader::extract_program`].
pub fn parse_framed(blob: &[u8]) -> Result<FramedBlob, FormatError> {
    let header = FrameHeader::parse(blob)?;

    let mismatches = header.inconsistencies();
    if !mismatches.is_empty() {
        tracing::warn!(
            mismatches = ?mismatches,
            "Frame header does not describe a byte register list, extracting anyway"
        );
    }

    tracing::debug!(
        header_version = header.header_version,
        ui_version = header.ui_version,
        data_version = header.data_version,
        chip = %header.chip_name(),
        "Frame header decoded"
    );

    let program = header.extract_program(blob)?;
    Ok(FramedBlob { header, program })
}

fn read_u32(blob: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        blob[offset],
        blob[offset + 1],
        blob[offset + 2],
        blob[offset + 3],
    ])
}
