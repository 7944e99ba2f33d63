// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoders for vendor firmware blobs.
//!
//! Scene blobs come in two encodings that carry no explicit tag:
//!
//! - **Legacy**: the whole blob is interleaved `address, value` bytes.
//! - **Framed**: a 60-byte header describing where the register list lives.
//!
//! [`detect_format`] tells them apart by checksum equality alone. A legacy
//! blob whose first four bytes happen to equal the sum of the rest is read
//! as framed; callers depend on that rule, so it is kept as is.
//!
//! Voltage tables use their own flat record layout, see [`parse_voltage_table`].

mod framed;
mod legacy;
mod vmax;

pub use framed::{FrameHeader, FramedBlob, parse_framed};
pub use legacy::parse_legacy;
pub use vmax::{VoltageThreshold, VoltageThresholdTable, parse_voltage_table};

use crate::error::FormatError;
use crate::types::RegisterProgram;

/// Encoding of a scene blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobFormat {
    /// Flat register list without a header.
    Legacy,
    /// Self-describing blob with a frame header.
    Framed,
}

/// Classifies a scene blob.
///
/// The first four bytes are read as a little-endian checksum and compared
/// against the wrapping sum of every remaining byte. Equal means
/// [`BlobFormat::Framed`], anything else is [`BlobFormat::Legacy`]. Blobs too
/// short to carry a checksum are legacy.
///
/// # Examples
///
/// ```
/// use awpa::blob::{BlobFormat, detect_format};
///
/// assert_eq!(detect_format(&[0x01, 0x0c, 0x03, 0x06]), BlobFormat::Legacy);
/// assert_eq!(detect_format(&[0x03, 0x00, 0x00, 0x00, 0x01, 0x02]), BlobFormat::Framed);
/// ```
#[must_use]
pub fn detect_format(blob: &[u8]) -> BlobFormat {
    let Some((head, rest)) = blob.split_first_chunk::<4>() else {
        return BlobFormat::Legacy;
    };
    let checksum = u32::from_le_bytes(*head);
    let computed = rest
        .iter()
        .fold(0u32, |sum, &b| sum.wrapping_add(u32::from(b)));

    tracing::trace!(checksum, computed, "Blob checksum");

    if checksum == computed {
        BlobFormat::Framed
    } else {
        BlobFormat::Legacy
    }
}

/// A decoded scene blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlob {
    /// Encoding the blob was decoded as.
    pub format: BlobFormat,
    /// Register program carried by the blob.
    pub program: RegisterProgram,
    /// Chip name from the frame header, for framed blobs.
    pub chip_name: Option<String>,
}

/// Detects the encoding of a scene blob and decodes its register program.
///
/// # Errors
///
/// Returns [`FormatError`] when a blob classified as framed has an unusable
/// header. Legacy blobs always decode.
pub fn decode_scene_blob(blob: &[u8]) -> Result<DecodedBlob, FormatError> {
    match detect_format(blob) {
        BlobFormat::Legacy => {
            tracing::debug!(len = blob.len(), "Using legacy blob parsing");
            Ok(DecodedBlob {
                format: BlobFormat::Legacy,
                program: parse_legacy(blob),
                chip_name: None,
            })
        }
        BlobFormat::Framed => {
            tracing::debug!(len = blob.len(), "Using frame header blob parsing");
            let framed = parse_framed(blob)?;
            Ok(DecodedBlob {
                format: BlobFormat::Framed,
                chip_name: Some(framed.header.chip_name()),
                program: framed.program,
            })
        }
    }
}

/// Builds a framed blob around `data` with a valid checksum.
#[cfg(test)]
pub(crate) fn framed_fixture(data: &[u8], chip: &[u8; 8]) -> Vec<u8> {
    let mut header = FrameHeader::register_list(u32::try_from(data.len()).unwrap_or(u32::MAX));
    header.chip_type = *chip;
    let mut blob = header.to_bytes();
    blob.extend_from_slice(data);
    let sum = blob[4..]
        .iter()
        .fold(0u32, |s, &b| s.wrapping_add(u32::from(b)));
    blob[..4].copy_from_slice(&sum.to_le_bytes());
    blob
}
