// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Legacy (headerless) scene blobs.

use crate::types::RegisterProgram;

/// Reads the whole blob as interleaved `address, value` pairs.
///
/// An odd-length blob loses its final address byte; this never fails.
#[must_use]
pub fn parse_legacy(blob: &[u8]) -> RegisterProgram {
    if blob.len() % 2 != 0 {
        tracing::debug!(len = blob.len(), "Odd-length legacy blob, dropping final byte");
    }
    RegisterProgram::from_pair_bytes(blob)
}
