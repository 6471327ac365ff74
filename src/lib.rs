//! Chain-agnostic wallet integration layer for a custodial exchange.
//!
//! The crate is organized in three layers:
//! - [`domain`]: chain-neutral types, error taxonomy and the
//!   [`domain::WalletClient`] / [`domain::BlockchainClient`] /
//!   [`domain::AddressRegistry`] traits.
//! - [`infra`]: the HTTP transport, one protocol adapter per supported
//!   chain, and the registry backends.
//! - [`app`]: the wallet service facade plus the destination-tag
//!   allocator and the deposit sweep executor built on top of it.

pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
