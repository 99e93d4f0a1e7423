//! Model to entity mappers
//!
//! `From<Model> for Entity` converts database rows to domain objects.
//! Rooms have no domain entity; the directory only hands out ids.

mod message;
mod user;
