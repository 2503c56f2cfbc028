//! Analytics clock: the single source of "now".
//!
//! RULE: No computation reads the wall clock directly.
//! `now` flows in from an AnalyticsClock so reports are reproducible.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AnalyticsClock {
    System,
    Fixed { at: NaiveDateTime },
}

impl AnalyticsClock {
    pub fn fixed(at: NaiveDateTime) -> Self {
        Self::Fixed { at }
    }

    /// Fixed at the end of the given calendar day.
    pub fn fixed_end_of_day(date: NaiveDate) -> Self {
        Self::Fixed { at: crate::period::end_of_day(date) }
    }

    pub fn now(&self) -> NaiveDateTime {
        match self {
            Self::System => Utc::now().naive_utc(),
            Self::Fixed { at } => *at,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

impl Default for AnalyticsClock {
    fn default() -> Self {
        Self::System
    }
}
