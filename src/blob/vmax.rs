// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Battery voltage to output ceiling (vmax) tables.

use crate::error::FormatError;

/// Size of one encoded table record.
pub const RECORD_LEN: usize = 8;

/// One table record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoltageThreshold {
    /// Lowest battery level this record applies to.
    pub min_threshold: u32,
    /// Output voltage ceiling to program at or above `min_threshold`.
    pub vmax: u32,
}

/// Ordered voltage threshold records, as stored in the blob.
///
/// # Examples
///
/// ```
/// use awpa::blob::parse_voltage_table;
///
/// let blob = [
///     0x10, 0x0e, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, // >= 3600: 0xff000000
///     0x48, 0x0d, 0x00, 0x00, 0x00, 0x00, 0x80, 0x7f, // >= 3400: 0x7f800000
/// ];
/// let table = parse_voltage_table(&blob).unwrap();
/// assert_eq!(table.vmax_for(3700), Some(0xff00_0000));
/// assert_eq!(table.vmax_for(3500), Some(0x7f80_0000));
/// assert_eq!(table.vmax_for(3000), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoltageThresholdTable {
    records: Vec<VoltageThreshold>,
}

impl VoltageThresholdTable {
    /// Returns the records in blob order.
    #[must_use]
    pub fn records(&self) -> &[VoltageThreshold] {
        &self.records
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the table has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Ceiling for a measured battery level: the `vmax` of the first record
    /// whose threshold the level reaches.
    #[must_use]
    pub fn vmax_for(&self, level: u32) -> Option<u32> {
        self.records
            .iter()
            .find(|r| level >= r.min_threshold)
            .map(|r| r.vmax)
    }
}

/// Decodes a voltage table: consecutive 8-byte records of two little-endian
/// `u32` (`min_threshold`, then `vmax`).
///
/// # Errors
///
/// Returns [`FormatError::MisalignedTable`] if the length is not a multiple
/// of 8.
pub fn parse_voltage_table(blob: &[u8]) -> Result<VoltageThresholdTable, FormatError> {
    if blob.len() % RECORD_LEN != 0 {
        return Err(FormatError::MisalignedTable(blob.len()));
    }

    let records: Vec<_> = blob
        .chunks_exact(RECORD_LEN)
        .map(|rec| VoltageThreshold {
            min_threshold: u32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]),
            vmax: u32::from_le_bytes([rec[4], rec[5], rec[6], rec[7]]),
        })
        .collect();

    for record in &records {
        tracing::debug!(
            min_threshold = record.min_threshold,
            vmax = record.vmax,
            "Voltage table record"
        );
    }

    Ok(VoltageThresholdTable { records })
}
