use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::ConfigError;

/// `N` requests per `period`, parsed from strings like `10/minute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimit {
    pub requests: u32,
    #[serde(with = "period_secs")]
    pub period: Duration,
}

impl RateLimit {
    pub fn per_minute(requests: u32) -> Self {
        Self { requests, period: Duration::from_secs(60) }
    }

    /// Seconds between token refills for a bucket of this size.
    pub fn refill_interval(&self) -> Duration {
        self.period / self.requests.max(1)
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_minute(10)
    }
}

impl FromStr for RateLimit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ConfigError::InvalidRateLimit(s.to_string());

        let (count, unit) = s.split_once('/').ok_or_else(bad)?;
        let requests: u32 = count.trim().parse().map_err(|_| bad())?;
        if requests == 0 {
            return Err(bad());
        }

        let unit = unit.trim().to_ascii_lowercase();
        let unit = unit.strip_suffix('s').filter(|u| !u.is_empty()).unwrap_or(unit.as_str());
        let secs = match unit {
            "s" | "sec" | "second" => 1,
            "m" | "min" | "minute" => 60,
            "h" | "hour" => 3_600,
            "d" | "day" => 86_400,
            _ => return Err(bad()),
        };

        Ok(Self { requests, period: Duration::from_secs(secs) })
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.period.as_secs() {
            1 => "second",
            60 => "minute",
            3_600 => "hour",
            86_400 => "day",
            other => return write!(f, "{}/{}s", self.requests, other),
        };
        write!(f, "{}/{}", self.requests, unit)
    }
}

mod period_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}
