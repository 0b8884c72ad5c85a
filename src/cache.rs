//! In-memory caching using moka
//!
//! The local cache is the fast tier of price persistence: every save lands
//! here first and every load looks here first. It also holds the captured
//! totals snapshots read by invoicing.

use moka::future::Cache;
use serde::Serialize;
use tracing::info;

use crate::pricing::models::{ItemList, PriceKey, ProductLine, Tier, TotalsSnapshot};

/// Default number of price records kept locally
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Local cache holding price records and totals snapshots.
///
/// Entries never expire on their own: a record written here must stay
/// readable for the rest of the session even if the remote store is down.
#[derive(Clone)]
pub struct LocalCache {
    /// Price records (cache_key -> ItemList)
    pub prices: Cache<String, ItemList>,
    /// Captured totals (totals_key -> TotalsSnapshot)
    pub totals: Cache<String, TotalsSnapshot>,
}

impl LocalCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            prices: Cache::builder().max_capacity(capacity).build(),
            // One entry per (product line, tier)
            totals: Cache::builder()
                .max_capacity((ProductLine::ALL.len() * Tier::ALL.len()) as u64)
                .build(),
        }
    }

    /// Cache key of a price record
    pub fn price_key(key: &PriceKey) -> String {
        match key.tier {
            Some(tier) => format!("price:{}:{}:{}", key.product_line, key.category, tier),
            None => format!("price:{}:{}", key.product_line, key.category),
        }
    }

    /// Cache key of a totals snapshot
    pub fn totals_key(product_line: ProductLine, tier: Tier) -> String {
        format!("totals:{}:{}", product_line, tier)
    }

    pub async fn get_items(&self, key: &PriceKey) -> Option<ItemList> {
        self.prices.get(&Self::price_key(key)).await
    }

    pub async fn put_items(&self, key: &PriceKey, items: ItemList) {
        self.prices.insert(Self::price_key(key), items).await;
    }

    pub async fn get_totals(&self, product_line: ProductLine, tier: Tier) -> Option<TotalsSnapshot> {
        self.totals.get(&Self::totals_key(product_line, tier)).await
    }

    pub async fn put_totals(&self, snapshot: TotalsSnapshot) {
        let key = Self::totals_key(snapshot.product_line, snapshot.tier);
        self.totals.insert(key, snapshot).await;
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            prices_size: self.prices.entry_count(),
            totals_size: self.totals.entry_count(),
        }
    }

    /// Drop every cached record and snapshot
    pub fn invalidate_all(&self) {
        self.prices.invalidate_all();
        self.totals.invalidate_all();
        info!("Local price cache invalidated");
    }
}

impl Default for LocalCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub prices_size: u64,
    pub totals_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::models::{Category, LineItem};
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_key_format() {
        let shared = PriceKey::new(ProductLine::Er, Category::Hotels, Tier::Five);
        assert_eq!(LocalCache::price_key(&shared), "price:ER:hotels");

        let specific = PriceKey::new(ProductLine::Kas, Category::Transport, Tier::SixSeven);
        assert_eq!(LocalCache::price_key(&specific), "price:KAS:transport:6-7");

        assert_eq!(LocalCache::totals_key(ProductLine::Za, Tier::Sixteen), "totals:ZA:16");
    }

    #[tokio::test]
    async fn test_put_then_get_items() {
        let cache = LocalCache::default();
        let key = PriceKey::new(ProductLine::Co, Category::Fly, Tier::Four);
        let items = ItemList::Lines(vec![LineItem::new("Flight", 1, dec!(90))]);

        assert!(cache.get_items(&key).await.is_none());
        cache.put_items(&key, items.clone()).await;
        assert_eq!(cache.get_items(&key).await, Some(items));

        let other_tier = PriceKey::new(ProductLine::Co, Category::Fly, Tier::Five);
        assert!(cache.get_items(&other_tier).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = LocalCache::default();
        let key = PriceKey::new(ProductLine::Co, Category::Meal, Tier::Four);
        cache.put_items(&key, ItemList::Lines(vec![])).await;

        cache.invalidate_all();
        assert!(cache.get_items(&key).await.is_none());
    }
}
