//! Infrastructure layer implementations.

pub mod adapters;
pub mod registry;
pub mod rpc;

pub use adapters::{DdkoinClient, RippledClient, build_blockchain_client, build_wallet_client};
pub use registry::{MemoryRegistry, PostgresConfig, PostgresRegistry};
pub use rpc::{HttpVerb, RpcTransport};
