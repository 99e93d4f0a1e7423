//! Room reference as it appears in a URL path

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use crate::error::DomainError;

/// Length of a public room slug
pub const ROOM_SLUG_LENGTH: usize = 11;

/// A room addressed either by its id or by its public slug
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomRef {
    Id(Uuid),
    Slug(String),
}

impl RoomRef {
    fn is_slug(s: &str) -> bool {
        s.len() == ROOM_SLUG_LENGTH
            && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    }
}

impl FromStr for RoomRef {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = Uuid::parse_str(s) {
            return Ok(Self::Id(id));
        }
        if Self::is_slug(s) {
            return Ok(Self::Slug(s.to_string()));
        }
        Err(DomainError::InvalidRoomRef(s.to_string()))
    }
}

impl fmt::Display for RoomRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => f.write_str(slug),
        }
    }
}

impl From<Uuid> for RoomRef {
    fn from(id: Uuid) -> Self {
        Self::Id(id)
    }
}
