//! Time stamps delivered to observers
//!
//! A [`TimeStamp`] is the playhead value at the moment it was emitted. It is
//! backed by a [`Duration`], so it can never be negative.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Immutable playhead value.
///
/// Equality, ordering and hashing follow the underlying magnitude. The
/// canonical string form is the integer microsecond count.
///
/// # Example
/// ```
/// use playhead::TimeStamp;
/// let stamp = TimeStamp::from_millis(1500);
/// assert_eq!(stamp.to_string(), "1500000");
/// assert_eq!(stamp.as_secs_f64(), 1.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeStamp(Duration);

impl TimeStamp {
    /// The zero playhead.
    pub const ZERO: TimeStamp = TimeStamp(Duration::ZERO);

    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self(Duration::from_micros(micros))
    }

    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    /// Build a stamp from seconds. Negative and non-finite inputs clamp to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_finite() && secs > 0.0 {
            Self(Duration::from_secs_f64(secs))
        } else {
            Self::ZERO
        }
    }

    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn as_micros(&self) -> u128 {
        self.0.as_micros()
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<Duration> for TimeStamp {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl From<TimeStamp> for Duration {
    fn from(stamp: TimeStamp) -> Self {
        stamp.0
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_micros())
    }
}

// Serialized as the microsecond count, matching the display form.
impl Serialize for TimeStamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let micros = u64::try_from(self.0.as_micros()).unwrap_or(u64::MAX);
        serializer.serialize_u64(micros)
    }
}

impl<'de> Deserialize<'de> for TimeStamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        u64::deserialize(deserializer).map(TimeStamp::from_micros)
    }
}
