//! Configuration options for the PC/SC platform

use std::time::Duration;

use pcsc::ShareMode as PcscShareMode;

/// Sharing mode used when connecting to the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Exclusive access to the card (default)
    Exclusive,
    /// Shared access to the card
    Shared,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
        }
    }
}

/// Configuration options for [`crate::TransportNativePcsc`]
#[derive(Debug, Clone)]
pub struct PcscConfig {
    /// Substring of the reader name to use; the first reader when `None`
    pub reader: Option<String>,

    /// Sharing mode for card connections
    pub share_mode: ShareMode,

    /// Length of one wait slice while polling for a card
    pub poll_interval: Duration,
}

impl Default for PcscConfig {
    fn default() -> Self {
        Self {
            reader: None,
            share_mode: ShareMode::Exclusive,
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl PcscConfig {
    pub fn with_reader(mut self, reader: impl Into<String>) -> Self {
        self.reader = Some(reader.into());
        self
    }

    pub const fn with_share_mode(mut self, share_mode: ShareMode) -> Self {
        self.share_mode = share_mode;
        self
    }

    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}
