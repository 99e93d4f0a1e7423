//! Authentication utilities

mod jwt;

pub use jwt::{Authenticator, Claims, JwtService};
