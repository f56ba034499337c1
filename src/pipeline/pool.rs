//! Pool (source) address lookup.

use std::collections::BTreeMap;

use crate::chain::{Chain, ChainAddress};
use crate::error::{ChainResult, ErrorKind};
use crate::keys::KeyStore;

/// Resolves the address a chain's payouts are sent from.
pub trait PoolDirectory: Send + Sync {
    fn pool_address(&self, chain: Chain) -> ChainResult<ChainAddress>;
}

/// Pools fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticPoolDirectory {
    pools: BTreeMap<Chain, ChainAddress>,
}

impl StaticPoolDirectory {
    pub fn new(pools: BTreeMap<Chain, ChainAddress>) -> Self {
        Self { pools }
    }

    /// Configured pools, falling back to the derived address for chains
    /// without an entry.
    ///
    /// A configured pool must be controlled by a key in `keys`; otherwise
    /// this fails with [`ErrorKind::SigningKeyMissing`].
    pub fn from_config(configured: &BTreeMap<Chain, String>, keys: &KeyStore) -> ChainResult<Self> {
        let mut pools = BTreeMap::new();
        for (chain, address) in configured {
            let address = ChainAddress::parse(*chain, address)?;
            keys.signer_for(&address)?;
            pools.insert(*chain, address);
        }
        for pair in keys.iter() {
            pools.entry(pair.chain()).or_insert(*pair.address());
        }
        for (chain, address) in &pools {
            tracing::debug!(chain = %chain, pool = %address, "Pool address resolved");
        }
        Ok(Self { pools })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Chain, &ChainAddress)> {
        self.pools.iter()
    }
}

impl PoolDirectory for StaticPoolDirectory {
    fn pool_address(&self, chain: Chain) -> ChainResult<ChainAddress> {
        self.pools
            .get(&chain)
            .copied()
            .ok_or_else(|| ErrorKind::UnsupportedChain(format!("no pool address for {}", chain)))
    }
}
