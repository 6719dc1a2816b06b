// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Seconds since the Unix epoch, the chain's only clock type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TimePointSec(pub u32);

impl TimePointSec {
    pub const MIN: TimePointSec = TimePointSec(0);
    /// Sentinel for "never": finalized withdrawals, paid-out comments.
    pub const MAX: TimePointSec = TimePointSec(u32::MAX);

    pub fn new(secs: u32) -> Self {
        TimePointSec(secs)
    }

    pub fn secs(self) -> u32 {
        self.0
    }

    pub fn saturating_add(self, secs: u32) -> Self {
        TimePointSec(self.0.saturating_add(secs))
    }

    /// Seconds elapsed since `earlier`, zero when `earlier` is in the future.
    pub fn saturating_elapsed(self, earlier: TimePointSec) -> u32 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add<u32> for TimePointSec {
    type Output = TimePointSec;
    fn add(self, secs: u32) -> TimePointSec {
        TimePointSec(self.0 + secs)
    }
}

impl AddAssign<u32> for TimePointSec {
    fn add_assign(&mut self, secs: u32) {
        self.0 += secs;
    }
}

impl Sub<TimePointSec> for TimePointSec {
    type Output = u32;
    fn sub(self, other: TimePointSec) -> u32 {
        self.0 - other.0
    }
}

impl fmt::Display for TimePointSec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
