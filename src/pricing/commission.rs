//! Per-tier commission percentages of a product line.

use rust_decimal::Decimal;
use tracing::info;

use crate::error::AppError;

use super::models::{Category, CommissionTable, ItemList, PriceKey, ProductLine, Tier};
use super::repository::{PriceRepository, SaveOutcome};
use super::requests::parse_percentage;

pub struct CommissionStore<'a> {
    repo: &'a PriceRepository,
}

impl<'a> CommissionStore<'a> {
    pub fn new(repo: &'a PriceRepository) -> Self {
        Self { repo }
    }

    pub async fn table(&self, product_line: ProductLine) -> CommissionTable {
        self.repo
            .load(product_line, Category::Commission, Tier::Four)
            .await
            .commission()
            .cloned()
            .unwrap_or_default()
    }

    pub async fn percentage(&self, product_line: ProductLine, tier: Tier) -> Decimal {
        self.table(product_line).await.percentage(tier)
    }

    /// Update one tier, leaving the others as they are. Values above 100 are
    /// accepted.
    pub async fn set_percentage(
        &self,
        product_line: ProductLine,
        tier: Tier,
        percentage: Decimal,
    ) -> Result<SaveOutcome, AppError> {
        if percentage.is_sign_negative() && !percentage.is_zero() {
            return Err(AppError::validation("commission must not be negative"));
        }

        let mut table = self
            .repo
            .load_for_edit(PriceKey::new(product_line, Category::Commission, tier))
            .await?
            .commission()
            .cloned()
            .unwrap_or_default();
        table.set(tier, percentage);
        info!(%product_line, %tier, %percentage, "Commission updated");

        Ok(self
            .repo
            .save(product_line, Category::Commission, tier, ItemList::Commission(table))
            .await)
    }

    /// Same as [`set_percentage`](Self::set_percentage) for raw operator input
    pub async fn set_percentage_input(
        &self,
        product_line: ProductLine,
        tier: Tier,
        raw: &str,
    ) -> Result<SaveOutcome, AppError> {
        let percentage = parse_percentage(raw)?;
        self.set_percentage(product_line, tier, percentage).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalCache;
    use crate::pricing::remote::{FlakyRemoteStore, MemoryRemoteStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn repository() -> PriceRepository {
        PriceRepository::new(LocalCache::default(), Arc::new(MemoryRemoteStore::new()))
    }

    #[tokio::test]
    async fn test_tiers_update_independently() {
        let repo = repository();
        let store = CommissionStore::new(&repo);

        store
            .set_percentage(ProductLine::Er, Tier::Four, dec!(12))
            .await
            .unwrap();
        store
            .set_percentage(ProductLine::Er, Tier::Sixteen, dec!(8))
            .await
            .unwrap();

        assert_eq!(store.percentage(ProductLine::Er, Tier::Four).await, dec!(12));
        assert_eq!(store.percentage(ProductLine::Er, Tier::Sixteen).await, dec!(8));
        assert_eq!(store.percentage(ProductLine::Er, Tier::Five).await, dec!(0));
        // Other product lines untouched
        assert_eq!(store.percentage(ProductLine::Co, Tier::Four).await, dec!(0));
    }

    #[tokio::test]
    async fn test_no_upper_clamp() {
        let repo = repository();
        let store = CommissionStore::new(&repo);

        let outcome = store
            .set_percentage_input(ProductLine::Za, Tier::SixSeven, "150")
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(store.percentage(ProductLine::Za, Tier::SixSeven).await, dec!(150));
    }

    #[tokio::test]
    async fn test_rejects_negative_and_non_numeric() {
        let repo = repository();
        let store = CommissionStore::new(&repo);

        assert!(store
            .set_percentage(ProductLine::Er, Tier::Four, dec!(-1))
            .await
            .is_err());
        assert!(matches!(
            store
                .set_percentage_input(ProductLine::Er, Tier::Four, "abc")
                .await,
            Err(AppError::ValidationFailed(_))
        ));
        assert!(store.table(ProductLine::Er).await.iter().next().is_none());
    }

    #[tokio::test]
    async fn test_failed_read_does_not_reset_other_tiers() {
        let remote = Arc::new(FlakyRemoteStore::default());
        let first = PriceRepository::new(LocalCache::default(), remote.clone());
        CommissionStore::new(&first)
            .set_percentage(ProductLine::Kas, Tier::Four, dec!(15))
            .await
            .unwrap();

        let repo = PriceRepository::new(LocalCache::default(), remote.clone());
        let store = CommissionStore::new(&repo);
        remote.fail_next_reads(1);
        let result = store
            .set_percentage(ProductLine::Kas, Tier::Sixteen, dec!(8))
            .await;
        assert!(matches!(result, Err(AppError::RemoteReadFailed(_))));

        assert_eq!(store.percentage(ProductLine::Kas, Tier::Four).await, dec!(15));
        assert_eq!(store.percentage(ProductLine::Kas, Tier::Sixteen).await, dec!(0));
    }
}
