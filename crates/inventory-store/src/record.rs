use common::SkuId;
use serde::{Deserialize, Serialize};

/// Version stamp of a stock record, used for optimistic concurrency control.
///
/// Every successful mutation of a record increments its version by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version a freshly seeded record starts at.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Purchasable inventory for one product variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub sku_id: SkuId,
    /// Units on hand; never negative.
    pub available: i64,
    pub version: Version,
}

/// What a compensating restore did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Stock was incremented; the record is now at this version.
    Applied(Version),
    /// This checkout attempt already restored the SKU; nothing changed.
    AlreadyApplied,
}
