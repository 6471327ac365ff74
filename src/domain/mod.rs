//! Domain layer containing core business types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    AdapterError, AdapterErrorKind, AllocationError, AppError, ConfigError, ConversionError,
    RegistryError, RpcError, TransportError,
};
pub use traits::{AddressRegistry, BlockchainClient, WalletClient};
pub use types::{
    AddressOptions, Amount, BlockTransaction, Chain, CreatedAddress, Currency, Deposit,
    DestinationTag, InspectedAddress, Issuer, PaymentAddress, Recipient, SpreadEntry, SpreadPlan,
    SweepEntryResult, SweepOutcome, SweepPolicy, TaggedAddress, TxEntry, UnitConverter,
    WalletConfig, Withdrawal, WithdrawalOptions, DEFAULT_RPC_TIMEOUT,
};
