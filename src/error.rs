// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `awpa` library.
//!
//! Failures are split by where they originate: the register bus
//! ([`TransportError`]), the firmware blob decoders ([`FormatError`]) and the
//! blob fetch itself ([`LoadError`]). Transport and load failures are retried
//! locally; only exhaustion reaches callers.

use thiserror::Error;

use crate::store::SlotId;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// A register transaction failed after all retries.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A firmware blob could not be decoded.
    ///
    /// The loader reports decode failures through events; this variant is
    /// what `?` produces for callers of [`decode_scene_blob`] and
    /// [`parse_voltage_table`].
    ///
    /// [`decode_scene_blob`]: crate::blob::decode_scene_blob
    /// [`parse_voltage_table`]: crate::blob::parse_voltage_table
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// A firmware blob could not be obtained.
    ///
    /// Produced by `?` in callers that surface a slot's failure themselves.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// The chip-id probe never returned a supported identity.
    #[error("unrecognized device (last chip id read: {last_id:#04x})")]
    UnrecognizedDevice {
        /// The last value read from the chip-id register.
        last_id: u8,
    },

    /// No attached amplifier matches the request.
    #[error("device not found")]
    DeviceNotFound,

    /// A scene value or name that does not map to a known scene.
    #[error("invalid scene: {0}")]
    InvalidScene(String),

    /// A board description could not be parsed.
    #[error("invalid board description: {0}")]
    Config(#[from] serde_json::Error),
}

/// Register bus failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The device did not acknowledge the transaction.
    #[error("no acknowledge from register {0:#04x}")]
    Nack(u8),

    /// The underlying bus reported an error.
    #[error("bus failure: {0}")]
    Bus(String),

    /// Every attempt of a single register transaction failed.
    #[error("register {address:#04x} unreachable after {attempts} attempts: {last}")]
    Exhausted {
        /// Register address of the transaction.
        address: u8,
        /// Number of attempts made.
        attempts: u32,
        /// Error returned by the final attempt.
        last: Box<TransportError>,
    },
}

/// Firmware blob decoding failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The blob is shorter than the frame header it claims to carry.
    #[error("frame header needs {needed} bytes, blob has {available}")]
    HeaderTooShort {
        /// Bytes required by the header.
        needed: usize,
        /// Bytes present in the blob.
        available: usize,
    },

    /// The frame header uses a layout version this decoder does not know.
    #[error("unsupported frame header version {0:#010x}")]
    UnsupportedVersion(u32),

    /// The register region described by the header lies outside the blob.
    #[error("register region {offset}..{end} exceeds blob length {available}")]
    RegionOutOfBounds {
        /// Start offset of the region.
        offset: usize,
        /// End offset (exclusive) of the region.
        end: usize,
        /// Bytes present in the blob.
        available: usize,
    },

    /// A voltage table whose length is not a whole number of records.
    #[error("voltage table length {0} is not a multiple of 8")]
    MisalignedTable(usize),
}

/// Failures to obtain a usable blob for a configuration slot.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The blob source returned nothing for the requested name.
    #[error("{slot}: blob {name} not available")]
    Missing {
        /// Slot the blob was requested for.
        slot: SlotId,
        /// Requested blob name.
        name: String,
    },

    /// The blob was retrieved but could not be decoded.
    #[error("{slot}: blob {name} rejected: {source}")]
    Rejected {
        /// Slot the blob was requested for.
        slot: SlotId,
        /// Requested blob name.
        name: String,
        /// Decoder failure.
        source: FormatError,
    },
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;
