//! Address registry backends.
//!
//! The registry is the single shared mutable resource of the service: it
//! remembers every address handed out and arbitrates destination-tag
//! ownership between concurrent allocations. `reserve` is a
//! compare-and-set; the in-memory backend settles it on a concurrent map
//! and the PostgreSQL backend on unique constraints.

pub mod memory;
pub mod postgres;

pub use memory::MemoryRegistry;
pub use postgres::{PostgresConfig, PostgresRegistry};
