//! Read-through / write-back persistence of price records.
//!
//! Reads go local cache → remote store → category defaults. Writes go to the
//! local cache first and then to the remote store. The local write is
//! visible to the next load no matter how the remote write ends.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::LocalCache;
use crate::error::AppError;

use super::defaults::defaults_for;
use super::models::{Category, Item, ItemList, PriceKey, ProductLine, Tier};
use super::remote::RemoteStore;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Result of a save
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Written locally and to the remote store
    Saved,
    /// Written locally only; the edit is not durable yet
    Partial { reason: String },
    /// Rejected before anything was written
    Failed { reason: String },
}

impl SaveOutcome {
    pub fn is_durable(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }

    /// Message to show the operator, if any
    pub fn warning(&self) -> Option<&str> {
        match self {
            SaveOutcome::Saved => None,
            SaveOutcome::Partial { reason } | SaveOutcome::Failed { reason } => Some(reason),
        }
    }
}

/// Where a loaded record came from
#[derive(Debug, Clone, PartialEq)]
pub enum LoadSource {
    LocalCache,
    Remote,
    /// Nothing saved, or the remote read failed (`warning` is set then)
    Defaults { warning: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub items: ItemList,
    pub source: LoadSource,
}

/// Why a record changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Edit,
    Propagation,
}

/// Broadcast after every local write. Views showing `key` should reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordChanged {
    pub key: PriceKey,
    pub cause: ChangeCause,
}

/// Price persistence over a local cache and a durable remote store
pub struct PriceRepository {
    cache: LocalCache,
    remote: Arc<dyn RemoteStore>,
    changes: broadcast::Sender<RecordChanged>,
}

impl PriceRepository {
    pub fn new(cache: LocalCache, remote: Arc<dyn RemoteStore>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            cache,
            remote,
            changes,
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Subscribe to record change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<RecordChanged> {
        self.changes.subscribe()
    }

    /// Load a record, falling back to the category defaults. Never fails.
    pub async fn load(&self, product_line: ProductLine, category: Category, tier: Tier) -> ItemList {
        self.fetch(product_line, category, tier).await.items
    }

    /// Load a record and report where it came from
    pub async fn fetch(&self, product_line: ProductLine, category: Category, tier: Tier) -> Loaded {
        self.fetch_key(PriceKey::new(product_line, category, tier)).await
    }

    pub async fn fetch_key(&self, key: PriceKey) -> Loaded {
        if let Some(items) = self.cache.get_items(&key).await {
            debug!("Cache HIT for price record: {}", key);
            return Loaded {
                items,
                source: LoadSource::LocalCache,
            };
        }
        debug!("Cache MISS for price record: {}", key);

        let warning = match self.remote.fetch(&key).await {
            Ok(Some(value)) => match ItemList::decode(key.category, value) {
                Ok(items) => {
                    self.cache.put_items(&key, items.clone()).await;
                    return Loaded {
                        items,
                        source: LoadSource::Remote,
                    };
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Remote record unreadable, using defaults");
                    Some(format!("Stored prices for {} could not be read: {}", key, e))
                }
            },
            Ok(None) => {
                debug!("No saved record for {}, using defaults", key);
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Remote read failed, using defaults");
                Some(format!("Price store unavailable, showing defaults for {}", key))
            }
        };

        Loaded {
            items: defaults_for(key.category),
            source: LoadSource::Defaults { warning },
        }
    }

    /// Load the record an edit is applied to.
    ///
    /// Fails with `RemoteReadFailed` when the remote read failed and only
    /// defaults are at hand; writing those back would replace the stored
    /// record.
    pub async fn load_for_edit(&self, key: PriceKey) -> Result<ItemList, AppError> {
        let loaded = self.fetch_key(key).await;
        match loaded.source {
            LoadSource::Defaults {
                warning: Some(warning),
            } => {
                warn!(key = %key, "Edit refused, stored record unreadable");
                Err(AppError::RemoteReadFailed(warning))
            }
            _ => Ok(loaded.items),
        }
    }

    /// Save a record: local cache first, then the remote store
    pub async fn save(
        &self,
        product_line: ProductLine,
        category: Category,
        tier: Tier,
        items: ItemList,
    ) -> SaveOutcome {
        self.save_key(PriceKey::new(product_line, category, tier), items, ChangeCause::Edit)
            .await
    }

    pub(crate) async fn save_key(&self, key: PriceKey, items: ItemList, cause: ChangeCause) -> SaveOutcome {
        if let Err(e) = items.validate_for(key.category) {
            warn!(key = %key, error = %e, "Rejected price record");
            return SaveOutcome::Failed {
                reason: e.to_string(),
            };
        }

        let value = match items.to_value() {
            Ok(value) => value,
            Err(e) => {
                return SaveOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        self.cache.put_items(&key, items).await;
        // No receivers is fine
        let _ = self.changes.send(RecordChanged { key, cause });

        match self.remote.store(&key, value).await {
            Ok(()) => {
                debug!("Saved price record {}", key);
                SaveOutcome::Saved
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Remote write failed, edit kept locally");
                SaveOutcome::Partial {
                    reason: format!("Saved locally only, price store write failed: {}", e),
                }
            }
        }
    }

    /// Add an item, or replace the item with the same id
    pub async fn upsert_item(
        &self,
        product_line: ProductLine,
        category: Category,
        tier: Tier,
        item: Item,
    ) -> Result<SaveOutcome, AppError> {
        let mut items = self
            .load_for_edit(PriceKey::new(product_line, category, tier))
            .await?;
        items.upsert(item)?;
        Ok(self.save(product_line, category, tier, items).await)
    }

    /// Remove one item by id
    pub async fn remove_item(
        &self,
        product_line: ProductLine,
        category: Category,
        tier: Tier,
        id: Uuid,
    ) -> Result<SaveOutcome, AppError> {
        let mut items = self
            .load_for_edit(PriceKey::new(product_line, category, tier))
            .await?;
        if !items.remove_item(id) {
            return Err(AppError::NotFound);
        }
        Ok(self.save(product_line, category, tier, items).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::models::LineItem;
    use crate::pricing::remote::{FlakyRemoteStore, MemoryRemoteStore};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct UnreachableStore;

    #[async_trait]
    impl RemoteStore for UnreachableStore {
        async fn fetch(&self, _key: &PriceKey) -> Result<Option<serde_json::Value>, AppError> {
            Err(AppError::RemoteReadFailed("connection refused".to_string()))
        }

        async fn store(&self, _key: &PriceKey, _items: serde_json::Value) -> Result<(), AppError> {
            Err(AppError::RemoteWriteFailed("connection refused".to_string()))
        }
    }

    fn repository(remote: Arc<dyn RemoteStore>) -> PriceRepository {
        PriceRepository::new(LocalCache::default(), remote)
    }

    #[tokio::test]
    async fn test_load_missing_returns_defaults() {
        let repo = repository(Arc::new(MemoryRemoteStore::new()));

        let loaded = repo.fetch(ProductLine::Er, Category::Meal, Tier::Four).await;
        assert_eq!(loaded.items, defaults_for(Category::Meal));
        assert_eq!(loaded.source, LoadSource::Defaults { warning: None });
    }

    #[tokio::test]
    async fn test_remote_read_failure_returns_defaults_with_warning() {
        let repo = repository(Arc::new(UnreachableStore));

        let loaded = repo.fetch(ProductLine::Er, Category::Hotels, Tier::Four).await;
        assert_eq!(loaded.items, defaults_for(Category::Hotels));
        assert!(matches!(
            loaded.source,
            LoadSource::Defaults { warning: Some(_) }
        ));
    }

    #[tokio::test]
    async fn test_save_then_load_with_unreachable_remote() {
        let repo = repository(Arc::new(UnreachableStore));
        let items = ItemList::Lines(vec![LineItem::new("Transfer", 1, dec!(40))]);

        let outcome = repo
            .save(ProductLine::Co, Category::Transport, Tier::Five, items.clone())
            .await;
        assert!(matches!(outcome, SaveOutcome::Partial { .. }));
        assert!(outcome.warning().is_some());

        let loaded = repo.fetch(ProductLine::Co, Category::Transport, Tier::Five).await;
        assert_eq!(loaded.items, items);
        assert_eq!(loaded.source, LoadSource::LocalCache);
    }

    #[tokio::test]
    async fn test_remote_read_warms_cache() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let key = PriceKey::new(ProductLine::Za, Category::Show, Tier::Four);
        let items = ItemList::Lines(vec![LineItem::new("Folklore show", 1, dec!(15))]);
        remote.store(&key, items.to_value().unwrap()).await.unwrap();

        let repo = repository(remote);
        let first = repo.fetch_key(key).await;
        assert_eq!(first.source, LoadSource::Remote);
        assert_eq!(first.items, items);

        let second = repo.fetch_key(key).await;
        assert_eq!(second.source, LoadSource::LocalCache);
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_payload() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let repo = repository(remote.clone());

        let outcome = repo
            .save(ProductLine::Er, Category::Hotels, Tier::Four, ItemList::Lines(vec![]))
            .await;
        assert!(matches!(outcome, SaveOutcome::Failed { .. }));
        assert!(remote.is_empty().await);
        assert_eq!(
            repo.load(ProductLine::Er, Category::Hotels, Tier::Four).await,
            defaults_for(Category::Hotels)
        );
    }

    #[tokio::test]
    async fn test_shared_category_saved_once_for_all_tiers() {
        let repo = repository(Arc::new(MemoryRemoteStore::new()));
        let items = ItemList::Lines(vec![LineItem::new("Lunch", 5, dec!(10))]);

        let outcome = repo
            .save(ProductLine::Kas, Category::Meal, Tier::Four, items.clone())
            .await;
        assert_eq!(outcome, SaveOutcome::Saved);

        for tier in Tier::ALL {
            assert_eq!(repo.load(ProductLine::Kas, Category::Meal, tier).await, items);
        }
    }

    #[tokio::test]
    async fn test_upsert_and_remove_item() {
        let repo = repository(Arc::new(MemoryRemoteStore::new()));
        repo.save(ProductLine::Er, Category::Fly, Tier::Four, ItemList::Lines(vec![]))
            .await;

        let item = LineItem::new("Flight", 1, dec!(90));
        let outcome = repo
            .upsert_item(ProductLine::Er, Category::Fly, Tier::Four, Item::Line(item.clone()))
            .await
            .unwrap();
        assert!(outcome.is_durable());
        assert_eq!(
            repo.load(ProductLine::Er, Category::Fly, Tier::Four).await.lines(),
            &[item.clone()]
        );

        repo.remove_item(ProductLine::Er, Category::Fly, Tier::Four, item.id)
            .await
            .unwrap();
        assert!(repo.load(ProductLine::Er, Category::Fly, Tier::Four).await.is_empty());

        let missing = repo
            .remove_item(ProductLine::Er, Category::Fly, Tier::Four, item.id)
            .await;
        assert!(matches!(missing, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_save_broadcasts_change() {
        let repo = repository(Arc::new(MemoryRemoteStore::new()));
        let mut changes = repo.subscribe();

        repo.save(ProductLine::Er, Category::Railway, Tier::Sixteen, ItemList::Lines(vec![]))
            .await;

        let event = changes.recv().await.unwrap();
        assert_eq!(
            event.key,
            PriceKey::new(ProductLine::Er, Category::Railway, Tier::Sixteen)
        );
        assert_eq!(event.cause, ChangeCause::Edit);
    }

    #[tokio::test]
    async fn test_edit_after_failed_read_keeps_stored_record() {
        let remote = Arc::new(FlakyRemoteStore::default());
        let stored = ItemList::Lines(
            ["Breakfast", "Lunch", "Dinner", "Tea", "Picnic"]
                .into_iter()
                .map(|name| LineItem::new(name, 1, dec!(10)))
                .collect(),
        );
        repository(remote.clone())
            .save(ProductLine::Er, Category::Meal, Tier::Four, stored.clone())
            .await;

        // Fresh session, price store briefly unreachable
        let repo = repository(remote.clone());
        remote.fail_next_reads(1);
        let result = repo
            .upsert_item(
                ProductLine::Er,
                Category::Meal,
                Tier::Four,
                Item::Line(LineItem::new("Snack", 1, dec!(5))),
            )
            .await;
        assert!(matches!(result, Err(AppError::RemoteReadFailed(_))));

        let key = PriceKey::new(ProductLine::Er, Category::Meal, Tier::Four);
        let raw = remote.raw(&key).await.unwrap();
        assert_eq!(ItemList::decode(Category::Meal, raw).unwrap(), stored);

        // Once the store answers again the edit goes through on the real list
        repo.upsert_item(
            ProductLine::Er,
            Category::Meal,
            Tier::Four,
            Item::Line(LineItem::new("Snack", 1, dec!(5))),
        )
        .await
        .unwrap();
        assert_eq!(repo.load(ProductLine::Er, Category::Meal, Tier::Four).await.len(), 6);
    }

    #[tokio::test]
    async fn test_remove_after_failed_read_writes_nothing() {
        let remote = Arc::new(FlakyRemoteStore::default());
        let item = LineItem::new("Museum", 1, dec!(8));
        repository(remote.clone())
            .save(
                ProductLine::Co,
                Category::Sightseeing,
                Tier::Four,
                ItemList::Lines(vec![item.clone()]),
            )
            .await;

        let repo = repository(remote.clone());
        let mut changes = repo.subscribe();
        remote.fail_next_reads(1);
        let result = repo
            .remove_item(ProductLine::Co, Category::Sightseeing, Tier::Four, item.id)
            .await;
        assert!(matches!(result, Err(AppError::RemoteReadFailed(_))));
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_edit_on_unsaved_record_starts_from_defaults() {
        let repo = repository(Arc::new(MemoryRemoteStore::new()));
        let item = LineItem::new("Extra show", 1, dec!(20));

        repo.upsert_item(ProductLine::Za, Category::Show, Tier::Four, Item::Line(item))
            .await
            .unwrap();
        assert_eq!(
            repo.load(ProductLine::Za, Category::Show, Tier::Four).await.len(),
            defaults_for(Category::Show).len() + 1
        );
    }
}
