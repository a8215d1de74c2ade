//! Fixed-offset time zones and timestamp formatting.
//!
//! Zones are plain UTC offsets with a display label. No timezone database is
//! consulted, so the output never depends on tzdata being installed.

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::error::{Result, StampError};

/// Singapore Time is UTC+8 all year round.
pub const SGT_OFFSET_SECS: i32 = 8 * 3600;
pub const SGT_LABEL: &str = "SGT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    Minutes,
    Seconds,
}

impl Precision {
    fn pattern(self) -> &'static str {
        match self {
            Precision::Minutes => "%Y-%m-%d %H:%M",
            Precision::Seconds => "%Y-%m-%d %H:%M:%S",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    offset: FixedOffset,
    label: String,
}

impl Zone {
    pub fn sgt() -> Self {
        Self {
            offset: FixedOffset::east_opt(SGT_OFFSET_SECS).expect("UTC+8 is a valid offset"),
            label: SGT_LABEL.to_string(),
        }
    }

    /// Build a zone from an offset east of UTC, in minutes.
    pub fn from_minutes(offset_minutes: i32, label: impl Into<String>) -> Result<Self> {
        let offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                StampError::Config(format!(
                    "timezone offset {} minutes is out of range",
                    offset_minutes
                ))
            })?;
        let label = label.into();
        if label.trim().is_empty() {
            return Err(StampError::Config("timezone label must not be empty".into()));
        }
        Ok(Self { offset, label })
    }

    /// `YYYY-MM-DD HH:MM[:SS] LABEL` for the given instant, shifted into this zone.
    pub fn format<Tz: TimeZone>(&self, instant: &DateTime<Tz>, precision: Precision) -> String {
        let local = instant.with_timezone(&self.offset);
        format!("{} {}", local.format(precision.pattern()), self.label)
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::sgt()
    }
}
