//! WebSocket close codes
//!
//! The subset of RFC 6455 codes the gateway sends or interprets.

/// Close codes seen on gateway connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure
    Normal = 1000,
    /// Endpoint is going away (server shutdown, browser navigation)
    GoingAway = 1001,
    /// Protocol error
    Protocol = 1002,
    /// Close frame carried no status
    NoStatus = 1005,
    /// Connection dropped without a close frame
    Abnormal = 1006,
    /// Server hit an unexpected condition
    InternalError = 1011,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1000 => Some(Self::Normal),
            1001 => Some(Self::GoingAway),
            1002 => Some(Self::Protocol),
            1005 => Some(Self::NoStatus),
            1006 => Some(Self::Abnormal),
            1011 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether a peer closing with `code` ends the session cleanly.
    ///
    /// Only normal closure and going-away count; a missing status is reported.
    #[must_use]
    pub fn is_expected(code: Option<u16>) -> bool {
        matches!(
            code.and_then(Self::from_u16),
            Some(Self::Normal | Self::GoingAway)
        )
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Normal => "Normal closure",
            Self::GoingAway => "Going away",
            Self::Protocol => "Protocol error",
            Self::NoStatus => "No status received",
            Self::Abnormal => "Abnormal closure",
            Self::InternalError => "Internal error",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
