// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Retrying register access on top of a [`HardwarePort`].

use std::time::Duration;

use crate::error::TransportError;

use super::HardwarePort;

/// Default number of attempts per register transaction.
const DEFAULT_ATTEMPTS: u32 = 5;

/// Default delay between attempts.
const DEFAULT_DELAY: Duration = Duration::from_millis(2);

/// How often a single register transaction is retried.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use awpa::port::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.attempts, 5);
/// assert_eq!(policy.delay, Duration::from_millis(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

/// A [`HardwarePort`] with per-transaction retries.
#[derive(Debug)]
pub struct RegisterBus<P> {
    port: P,
    policy: RetryPolicy,
}

impl<P: HardwarePort> RegisterBus<P> {
    /// Wraps a port with the given retry policy.
    pub fn new(port: P, policy: RetryPolicy) -> Self {
        Self { port, policy }
    }

    /// Returns the wrapped port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Reads a register, retrying failed transactions.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Exhausted`] when every attempt failed.
    pub async fn read(&self, address: u8) -> Result<u8, TransportError> {
        let mut attempt = 0;
        loop {
            match self.port.read(address).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    tracing::warn!(address, attempt, error = %e, "Register read failed");
                    if attempt >= self.policy.attempts {
                        return Err(exhausted(address, attempt, e));
                    }
                    tokio::time::sleep(self.policy.delay).await;
                }
            }
        }
    }

    /// Writes a register, retrying failed transactions.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Exhausted`] when every attempt failed.
    pub async fn write(&self, address: u8, value: u8) -> Result<(), TransportError> {
        tracing::debug!(address, value, "Register write");
        let mut attempt = 0;
        loop {
            match self.port.write(address, value).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    tracing::warn!(address, value, attempt, error = %e, "Register write failed");
                    if attempt >= self.policy.attempts {
                        return Err(exhausted(address, attempt, e));
                    }
                    tokio::time::sleep(self.policy.delay).await;
                }
            }
        }
    }

    /// Drives the power rail.
    pub fn power(&self, on: bool) {
        tracing::debug!(on, "Power rail");
        self.port.power(on);
    }
}

fn exhausted(address: u8, attempts: u32, last: TransportError) -> TransportError {
    tracing::error!(address, attempts, "Register transaction retries exhausted");
    TransportError::Exhausted {
        address,
        attempts,
        last: Box::new(last),
    }
}
