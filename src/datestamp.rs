//! Datestamp granularity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

const DAY_FORMAT: &str = "%Y-%m-%d";
const SECONDS_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The finest datestamp resolution a repository supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Granularity {
    #[serde(rename = "YYYY-MM-DD")]
    Day,
    #[serde(rename = "YYYY-MM-DDThh:mm:ssZ")]
    #[default]
    Seconds,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Day => "YYYY-MM-DD",
            Granularity::Seconds => "YYYY-MM-DDThh:mm:ssZ",
        }
    }

    /// Renders `instant` as a UTC datestamp at this granularity
    pub fn format(self, instant: &DateTime<Utc>) -> String {
        match self {
            Granularity::Day => instant.format(DAY_FORMAT).to_string(),
            Granularity::Seconds => instant.format(SECONDS_FORMAT).to_string(),
        }
    }

    /// Recognizes which of the two legal datestamp syntaxes `value` uses
    pub fn detect(value: &str) -> Option<Granularity> {
        if NaiveDate::parse_from_str(value, DAY_FORMAT).is_ok() && value.len() == 10 {
            return Some(Granularity::Day);
        }
        if NaiveDateTime::parse_from_str(value, SECONDS_FORMAT).is_ok() && value.len() == 20 {
            return Some(Granularity::Seconds);
        }
        None
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YYYY-MM-DD" => Ok(Granularity::Day),
            "YYYY-MM-DDThh:mm:ssZ" => Ok(Granularity::Seconds),
            other => Err(format!("unknown granularity '{other}'")),
        }
    }
}
