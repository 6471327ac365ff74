//! Shared test utilities and mocks.

pub mod mocks;

pub use mocks::{MockConfig, MockWalletClient, RecordedWithdrawal};
