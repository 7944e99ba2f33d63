// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Chip identification.

use std::fmt;
use std::time::Duration;

use crate::error::Error;
use crate::port::{HardwarePort, RegisterBus};
use crate::types::RegisterWrite;

/// Register holding the chip identity.
pub const CHIP_ID_REGISTER: u8 = 0x00;

/// Write that soft-resets the chip.
pub const SOFT_RESET: RegisterWrite = RegisterWrite::new(0x00, 0xaa);

/// Number of chip-id probes before giving up.
const PROBE_ATTEMPTS: u32 = 5;

/// Pause between chip-id probes.
const PROBE_DELAY: Duration = Duration::from_millis(2);

/// Supported amplifier parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    /// AW87339.
    Aw87339,
    /// AW87359.
    Aw87359,
    /// AW87369.
    Aw87369,
    /// AW87519.
    Aw87519,
    /// AW87559.
    Aw87559,
}

impl Product {
    /// Returns the part name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Aw87339 => "aw87339",
            Self::Aw87359 => "aw87359",
            Self::Aw87369 => "aw87369",
            Self::Aw87519 => "aw87519",
            Self::Aw87559 => "aw87559",
        }
    }

    /// Number of registers in the part's register map, starting at `0x00`.
    #[must_use]
    pub const fn register_count(&self) -> u8 {
        match self {
            Self::Aw87339 => 0x0b,
            Self::Aw87359 => 0x0d,
            Self::Aw87369 | Self::Aw87519 => 0x0f,
            Self::Aw87559 => 0x10,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of a probed amplifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChipIdentity {
    /// Raw chip-id register value.
    pub chip_id: u8,
    /// Part selected from the chip id.
    pub product: Product,
}

impl ChipIdentity {
    /// Maps a chip-id value to a part.
    ///
    /// `0x59` is shared by two parts; boards that wire a reset line carry
    /// the AW87519, the others the AW87359.
    ///
    /// # Examples
    ///
    /// ```
    /// use awpa::device::{ChipIdentity, Product};
    ///
    /// assert_eq!(ChipIdentity::from_chip_id(0x59, true).unwrap().product, Product::Aw87519);
    /// assert_eq!(ChipIdentity::from_chip_id(0x59, false).unwrap().product, Product::Aw87359);
    /// assert!(ChipIdentity::from_chip_id(0x00, false).is_none());
    /// ```
    #[must_use]
    pub fn from_chip_id(chip_id: u8, has_reset_line: bool) -> Option<Self> {
        let product = match chip_id {
            0x39 => Product::Aw87339,
            0x59 if has_reset_line => Product::Aw87519,
            0x59 => Product::Aw87359,
            0x69 => Product::Aw87369,
            0x5a => Product::Aw87559,
            _ => return None,
        };
        Some(Self { chip_id, product })
    }
}

/// Reads the chip-id register until it returns a supported identity.
///
/// Failed bus reads count as failed probes.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedDevice`] when every probe failed.
pub(crate) async fn probe<P: HardwarePort>(
    bus: &RegisterBus<P>,
    has_reset_line: bool,
) -> Result<ChipIdentity, Error> {
    let mut last_id = 0;
    for attempt in 1..=PROBE_ATTEMPTS {
        match bus.read(CHIP_ID_REGISTER).await {
            Ok(id) => {
                last_id = id;
                if let Some(identity) = ChipIdentity::from_chip_id(id, has_reset_line) {
                    tracing::info!(
                        chip_id = id,
                        product = %identity.product,
                        "Amplifier identified"
                    );
                    return Ok(identity);
                }
                tracing::info!(chip_id = id, attempt, "Unsupported chip id");
            }
            Err(e) => tracing::warn!(attempt, error = %e, "Chip id read failed"),
        }
        tokio::time::sleep(PROBE_DELAY).await;
    }

    tracing::error!(chip_id = last_id, "Chip id probe failed");
    Err(Error::UnrecognizedDevice { last_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::RetryPolicy;
    use crate::port::sim::SimulatedPort;

    #[test]
    fn known_ids_map_to_products() {
        let cases = [
            (0x39, Product::Aw87339),
            (0x69, Product::Aw87369),
            (0x5a, Product::Aw87559),
        ];
        for (id, product) in cases {
            assert_eq!(ChipIdentity::from_chip_id(id, false).unwrap().product, product);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn probe_finds_supported_chip() {
        let bus = RegisterBus::new(SimulatedPort::new(0x69), RetryPolicy::default());
        let identity = probe(&bus, false).await.unwrap();
        assert_eq!(identity.product, Product::Aw87369);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_gives_up_on_unknown_id() {
        let port = SimulatedPort::new(0x12);
        let bus = RegisterBus::new(port.clone(), RetryPolicy::default());

        let err = probe(&bus, false).await.unwrap_err();

        assert!(matches!(err, Error::UnrecognizedDevice { last_id: 0x12 }));
        assert_eq!(port.ops().len(), 5);
    }
}
