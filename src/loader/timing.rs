// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

/// Delays and attempt cap of the configuration loader.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use awpa::loader::LoaderTiming;
///
/// let timing = LoaderTiming::default();
/// assert_eq!(timing.retry_delay, Duration::from_millis(2000));
/// assert_eq!(timing.max_attempts, 5);
///
/// let timing = LoaderTiming::new()
///     .with_settle_delay(Duration::from_millis(100))
///     .with_max_attempts(3);
/// assert_eq!(timing.settle_delay, Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderTiming {
    /// Delay between attach and the first batch.
    pub settle_delay: Duration,
    /// Delay before a batch that retries failed slots.
    pub retry_delay: Duration,
    /// Delay between a reload request and its batch.
    pub reload_delay: Duration,
    /// Failed loads after which a slot is no longer fetched.
    pub max_attempts: u32,
}

impl LoaderTiming {
    /// Creates the default timing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attach settle delay.
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the retry delay.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets the reload delay.
    #[must_use]
    pub fn with_reload_delay(mut self, delay: Duration) -> Self {
        self.reload_delay = delay;
        self
    }

    /// Sets the attempt cap.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Returns true if a slot with `attempts` failures should be retried.
    #[must_use]
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

impl Default for LoaderTiming {
    fn default() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            retry_delay: Duration::from_millis(2000),
            reload_delay: Duration::from_millis(10),
            max_attempts: 5,
        }
    }
}
