//! In-process registry backend, used by tests and single-node deployments.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::{AddressRegistry, Chain, DestinationTag, RegistryError};

/// Registry state held in two concurrent maps, mirroring the two
/// uniqueness rules: one address per (chain, address) pair and one
/// owner per (chain, tag) pair.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    tags: DashMap<(Chain, u64), String>,
    addresses: DashMap<(Chain, String), Option<u64>>,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of addresses reserved so far, across all chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[async_trait]
impl AddressRegistry for MemoryRegistry {
    async fn tag_exists(&self, chain: Chain, tag: DestinationTag) -> Result<bool, RegistryError> {
        Ok(self.tags.contains_key(&(chain, tag.value())))
    }

    async fn reserve(
        &self,
        chain: Chain,
        address: &str,
        tag: Option<DestinationTag>,
    ) -> Result<bool, RegistryError> {
        if let Some(tag) = tag {
            match self.tags.entry((chain, tag.value())) {
                Entry::Occupied(_) => return Ok(false),
                Entry::Vacant(slot) => {
                    slot.insert(address.to_string());
                }
            }
        }

        match self.addresses.entry((chain, address.to_string())) {
            Entry::Occupied(_) => {
                // Another reservation already owns this exact address;
                // release the tag claimed above so it stays allocatable.
                if let Some(tag) = tag {
                    self.tags.remove(&(chain, tag.value()));
                }
                Ok(false)
            }
            Entry::Vacant(slot) => {
                slot.insert(tag.map(|t| t.value()));
                Ok(true)
            }
        }
    }
}
