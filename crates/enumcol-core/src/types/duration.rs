use derive_more::{Display, FromStr};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Sub, SubAssign};

///
/// Duration
/// (in microseconds, signed so intervals can run backwards)
///

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    FromStr,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[repr(transparent)]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Self = Self(0);
    pub const MIN: Self = Self(i64::MIN);
    pub const MAX: Self = Self(i64::MAX);

    // ratio constants
    const MICROS_PER_MILLI: i64 = 1_000;
    const MICROS_PER_SEC: i64 = 1_000_000;
    const SECS_PER_MIN: i64 = 60;
    const MINS_PER_HOUR: i64 = 60;

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    // ---- Constructors ----

    #[must_use]
    pub const fn from_micros(us: i64) -> Self {
        Self(us)
    }

    #[must_use]
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms * Self::MICROS_PER_MILLI)
    }

    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * Self::MICROS_PER_SEC)
    }

    #[must_use]
    pub const fn from_mins(mins: i64) -> Self {
        Self(mins * Self::SECS_PER_MIN * Self::MICROS_PER_SEC)
    }

    #[must_use]
    pub const fn from_hours(hours: i64) -> Self {
        Self(hours * Self::MINS_PER_HOUR * Self::SECS_PER_MIN * Self::MICROS_PER_SEC)
    }

    // ---- Accessors ----

    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn as_secs(self) -> i64 {
        self.0 / Self::MICROS_PER_SEC
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl From<i64> for Duration {
    fn from(us: i64) -> Self {
        Self(us)
    }
}
