//! Collaborator traits (ports)

mod repositories;

pub use repositories::{MessageRepository, RepoResult, RoomDirectory, UserDirectory};
