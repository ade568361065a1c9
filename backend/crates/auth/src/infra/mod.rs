//! Infrastructure Layer
//!
//! In-memory stores, the PostgreSQL credential store and demo seeding.

pub mod memory;
pub mod postgres;
pub mod seed;

pub use memory::{InMemorySessionRepository, InMemoryUserRepository};
pub use postgres::PgUserRepository;
pub use seed::parse_demo_users;
