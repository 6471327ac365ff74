//! Application layer containing business logic.

pub mod allocator;
pub mod service;
pub mod sweep;

pub use allocator::TagAllocator;
pub use service::WalletService;
pub use sweep::DepositSweeper;
