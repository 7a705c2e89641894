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
//
// SPDX-License-Identifier: Apache-2.0
//! Exponential backoff with full jitter.

use rand::Rng;
use std::time::Duration;

/// Largest exponent that still fits the window into `u64` seconds.
const EXPONENT_LIMIT: u32 = 62;

/// Consecutive failure counter sizing the retry delay.
///
/// After `n` consecutive failures the next delay is drawn uniformly from
/// `[0, 2^min(n, max_exponent))` seconds.
#[derive(Debug)]
pub struct Backoff {
    failures: u32,
    max_exponent: u32,
}

impl Backoff {
    pub fn new(max_exponent: u32) -> Self {
        Self {
            failures: 0,
            max_exponent: max_exponent.min(EXPONENT_LIMIT),
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Upper (exclusive) bound of the next delay.
    pub fn window(&self) -> Duration {
        Duration::from_secs(1u64 << self.failures.min(self.max_exponent))
    }

    /// Record a failure and draw the delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let window = self.window();
        self.failures = self.failures.saturating_add(1);
        rand::rng().random_range(Duration::ZERO..window)
    }

    /// Record a success.
    pub fn reset(&mut self) {
        self.failures = 0;
    }
}
