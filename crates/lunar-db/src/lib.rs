//! # lunar-db
//!
//! PostgreSQL implementations of the collaborator traits defined in
//! `lunar-core`, via SQLx.
//!
//! ## Overview
//!
//! - Connection pool management and migrations
//! - Row models with SQLx `FromRow` derives
//! - Model to entity mappers
//! - [`PgUserDirectory`], [`PgRoomDirectory`] and [`PgMessageRepository`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lunar_db::{create_pool_from_env, run_migrations, PgMessageRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool_from_env().await?;
//!     run_migrations(&pool).await?;
//!     let messages = PgMessageRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, create_pool_from_env, run_migrations, DatabaseConfig, PgPool};
pub use repositories::{PgMessageRepository, PgRoomDirectory, PgUserDirectory};
