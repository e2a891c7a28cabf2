use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a finding, plus `Off` for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Off,
    Suggestion,
    Warning,
    Error,
}

impl SeverityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Off => "off",
            SeverityLevel::Suggestion => "suggestion",
            SeverityLevel::Warning => "warning",
            SeverityLevel::Error => "error",
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self != SeverityLevel::Off
    }
}

impl Default for SeverityLevel {
    fn default() -> Self {
        Self::Warning
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
