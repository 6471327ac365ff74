//! Destination-tag allocation for shared-address chains.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::domain::{
    AddressRegistry, AllocationError, AppError, Chain, DestinationTag, TaggedAddress,
};

/// Default number of draws before an allocation gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;

/// Draws candidate tags and races them through the registry until one
/// reservation wins.
///
/// The tag space holds a billion candidates, so collisions stay rare at
/// realistic address counts. The attempt bound keeps a saturated or
/// misbehaving registry from spinning this loop forever.
pub struct TagAllocator {
    registry: Arc<dyn AddressRegistry>,
    max_attempts: u32,
}

impl TagAllocator {
    #[must_use]
    pub fn new(registry: Arc<dyn AddressRegistry>) -> Self {
        Self {
            registry,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the attempt bound.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Allocates a fresh tagged address on `base`.
    ///
    /// A candidate lost to a concurrent allocation is redrawn; only
    /// collisions consume attempts. Registry failures abort immediately.
    #[instrument(skip(self))]
    pub async fn allocate(&self, chain: Chain, base: &str) -> Result<TaggedAddress, AppError> {
        for attempt in 1..=self.max_attempts {
            let tag = DestinationTag::random();

            if self.registry.tag_exists(chain, tag).await? {
                debug!(%tag, attempt, "candidate tag already taken");
                continue;
            }

            let candidate = TaggedAddress {
                base: base.to_string(),
                tag: Some(tag),
            };
            if self
                .registry
                .reserve(chain, &candidate.to_string(), Some(tag))
                .await?
            {
                debug!(%tag, attempt, "tag reserved");
                return Ok(candidate);
            }

            warn!(%tag, attempt, "lost tag reservation race, drawing again");
        }

        Err(AppError::Allocation(AllocationError::Exhausted {
            chain,
            attempts: self.max_attempts,
        }))
    }
}
