use std::{fmt, io::IsTerminal, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::logger::{
    error::LoggerError,
    object::{LoggerFormat, LoggerLevel, LoggerTimeZone},
};

/// Stream the text and JSON formats write to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerTarget {
    Stdout,
    /// Default: keeps stdout free for the run summary.
    #[default]
    Stderr,
}

impl FromStr for LoggerTarget {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            _ => Err(LoggerError::InvalidTarget(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerTarget::Stdout => "stdout",
            LoggerTarget::Stderr => "stderr",
        })
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Output format.
    pub format: LoggerFormat,
    /// Filter expression (e.g. `"info"`, `"gantry_core=debug,info"`).
    pub level: LoggerLevel,
    /// Timezone for timestamps.
    pub tz: LoggerTimeZone,
    pub target: LoggerTarget,
    /// Whether to include module/target names in log output.
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            target: LoggerTarget::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Color is used only when enabled and the selected stream is a terminal.
    pub fn should_use_color(&self) -> bool {
        self.use_color
            && match self.target {
                LoggerTarget::Stdout => std::io::stdout().is_terminal(),
                LoggerTarget::Stderr => std::io::stderr().is_terminal(),
            }
    }
}
