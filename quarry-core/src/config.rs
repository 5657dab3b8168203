use crate::{Error, Result};
use std::time::Duration;
use time::{
    format_description::{self, BorrowedFormatItem, OwnedFormatItem},
    macros::format_description,
};

/// Format of timestamp columns when none is configured, MySQL `DATETIME` text.
pub const DEFAULT_DATETIME_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Session wide settings, shared by every builder created from the session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Format used to decode timestamp columns.
    pub datetime_format: OwnedFormatItem,
    /// Deadline applied to every driver call, `None` waits indefinitely.
    pub statement_timeout: Option<Duration>,
}

impl Config {
    pub fn with_datetime_format(mut self, format: &str) -> Result<Self> {
        self.datetime_format = format_description::parse_owned::<2>(format)
            .map_err(|e| Error::Extraction(format!("invalid datetime format `{format}`: {e}")))?;
        Ok(self)
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            datetime_format: DEFAULT_DATETIME_FORMAT.into(),
            statement_timeout: None,
        }
    }
}
