//! Bulk copy of tier-specific lists onto neighbouring tiers.
//!
//! Overwrites the targets, so the operator has to confirm first.

use tracing::{info, warn};

use crate::error::AppError;

use super::models::{Category, ItemList, PriceKey, ProductLine, Tier};
use super::repository::{ChangeCause, PriceRepository, SaveOutcome};

/// Fixed source → targets groups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierGroup {
    /// 4 → 5, 6-7, 8-9
    Small,
    /// 10-11 → 12-13, 14-15, 16
    Large,
}

impl TierGroup {
    pub fn source(self) -> Tier {
        match self {
            TierGroup::Small => Tier::Four,
            TierGroup::Large => Tier::TenEleven,
        }
    }

    pub fn targets(self) -> &'static [Tier] {
        match self {
            TierGroup::Small => &[Tier::Five, Tier::SixSeven, Tier::EightNine],
            TierGroup::Large => &[Tier::TwelveThirteen, Tier::FourteenFifteen, Tier::Sixteen],
        }
    }
}

/// Operator's answer to the overwrite prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

/// Result of one propagation
#[derive(Debug, Clone, PartialEq)]
pub enum PropagationReport {
    /// Declined; nothing was written
    Cancelled,
    Applied {
        category: Category,
        source: Tier,
        /// Save outcome per target tier
        targets: Vec<(Tier, SaveOutcome)>,
    },
}

impl PropagationReport {
    /// Keys whose views must reload
    pub fn reload_keys(&self, product_line: ProductLine) -> Vec<PriceKey> {
        match self {
            PropagationReport::Cancelled => Vec::new(),
            PropagationReport::Applied {
                category, targets, ..
            } => targets
                .iter()
                .map(|(tier, _)| PriceKey::new(product_line, *category, *tier))
                .collect(),
        }
    }

    /// True when every target was written to the remote store
    pub fn is_durable(&self) -> bool {
        match self {
            PropagationReport::Cancelled => true,
            PropagationReport::Applied { targets, .. } => {
                targets.iter().all(|(_, outcome)| outcome.is_durable())
            }
        }
    }
}

pub struct TierPropagator<'a> {
    repo: &'a PriceRepository,
}

impl<'a> TierPropagator<'a> {
    pub fn new(repo: &'a PriceRepository) -> Self {
        Self { repo }
    }

    /// Copy the source tier's list of `category` onto every target tier.
    ///
    /// `pending` holds unsaved edits of the source tier; they are saved
    /// before copying.
    pub async fn propagate(
        &self,
        product_line: ProductLine,
        category: Category,
        group: TierGroup,
        pending: Option<ItemList>,
        confirmation: Confirmation,
    ) -> Result<PropagationReport, AppError> {
        if category.shared_across_tiers() {
            return Err(AppError::validation(format!(
                "'{}' is shared across tiers and cannot be propagated",
                category
            )));
        }
        if confirmation == Confirmation::Declined {
            info!(%product_line, %category, "Tier propagation declined");
            return Ok(PropagationReport::Cancelled);
        }

        let source = group.source();
        if let Some(items) = pending {
            let outcome = self.repo.save(product_line, category, source, items).await;
            if let SaveOutcome::Failed { reason } = outcome {
                return Err(AppError::validation(format!(
                    "source tier {} could not be saved: {}",
                    source, reason
                )));
            }
        }

        let items = self
            .repo
            .load_for_edit(PriceKey::new(product_line, category, source))
            .await?;

        let mut targets = Vec::with_capacity(group.targets().len());
        for &tier in group.targets() {
            let key = PriceKey::new(product_line, category, tier);
            let outcome = self
                .repo
                .save_key(key, items.clone(), ChangeCause::Propagation)
                .await;
            if let Some(reason) = outcome.warning() {
                warn!(key = %key, reason, "Propagated list not durable");
            }
            targets.push((tier, outcome));
        }

        info!(
            %product_line,
            %category,
            source = %source,
            targets = targets.len(),
            items = items.len(),
            "Tier propagation applied"
        );

        Ok(PropagationReport::Applied {
            category,
            source,
            targets,
        })
    }

    /// Propagate every tier-specific category from the saved source tier
    pub async fn propagate_all(
        &self,
        product_line: ProductLine,
        group: TierGroup,
        confirmation: Confirmation,
    ) -> Result<Vec<PropagationReport>, AppError> {
        let mut reports = Vec::new();
        for category in Category::tier_specific() {
            reports.push(
                self.propagate(product_line, category, group, None, confirmation)
                    .await?,
            );
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LocalCache;
    use crate::pricing::models::LineItem;
    use crate::pricing::remote::{FlakyRemoteStore, MemoryRemoteStore};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn repository() -> PriceRepository {
        PriceRepository::new(LocalCache::default(), Arc::new(MemoryRemoteStore::new()))
    }

    fn transport(price: rust_decimal::Decimal) -> ItemList {
        ItemList::Lines(vec![LineItem::new("Bus", 1, price)])
    }

    #[tokio::test]
    async fn test_propagate_copies_to_small_group() {
        let repo = repository();
        repo.save(ProductLine::Er, Category::Transport, Tier::Four, transport(dec!(800)))
            .await;

        let report = TierPropagator::new(&repo)
            .propagate(
                ProductLine::Er,
                Category::Transport,
                TierGroup::Small,
                None,
                Confirmation::Confirmed,
            )
            .await
            .unwrap();
        assert!(report.is_durable());

        let source = repo.load(ProductLine::Er, Category::Transport, Tier::Four).await;
        for &tier in TierGroup::Small.targets() {
            assert_eq!(repo.load(ProductLine::Er, Category::Transport, tier).await, source);
        }
        // Untouched outside the group
        assert_ne!(
            repo.load(ProductLine::Er, Category::Transport, Tier::TenEleven).await,
            source
        );
    }

    #[tokio::test]
    async fn test_copies_do_not_follow_later_source_edits() {
        let repo = repository();
        let original = transport(dec!(1000));
        repo.save(ProductLine::Co, Category::Fly, Tier::TenEleven, original.clone())
            .await;

        TierPropagator::new(&repo)
            .propagate(
                ProductLine::Co,
                Category::Fly,
                TierGroup::Large,
                None,
                Confirmation::Confirmed,
            )
            .await
            .unwrap();

        repo.save(ProductLine::Co, Category::Fly, Tier::TenEleven, transport(dec!(5)))
            .await;

        for &tier in TierGroup::Large.targets() {
            assert_eq!(repo.load(ProductLine::Co, Category::Fly, tier).await, original);
        }
    }

    #[tokio::test]
    async fn test_pending_source_edits_saved_before_copy() {
        let repo = repository();
        let pending = transport(dec!(640));

        TierPropagator::new(&repo)
            .propagate(
                ProductLine::Kas,
                Category::Railway,
                TierGroup::Small,
                Some(pending.clone()),
                Confirmation::Confirmed,
            )
            .await
            .unwrap();

        assert_eq!(
            repo.load(ProductLine::Kas, Category::Railway, Tier::Four).await,
            pending
        );
        assert_eq!(
            repo.load(ProductLine::Kas, Category::Railway, Tier::EightNine).await,
            pending
        );
    }

    #[tokio::test]
    async fn test_declined_writes_nothing() {
        let repo = repository();
        let mut changes = repo.subscribe();

        let report = TierPropagator::new(&repo)
            .propagate(
                ProductLine::Za,
                Category::Transport,
                TierGroup::Small,
                Some(transport(dec!(1))),
                Confirmation::Declined,
            )
            .await
            .unwrap();

        assert_eq!(report, PropagationReport::Cancelled);
        assert!(report.reload_keys(ProductLine::Za).is_empty());
        assert!(changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_shared_category_rejected() {
        let repo = repository();
        let result = TierPropagator::new(&repo)
            .propagate(
                ProductLine::Er,
                Category::Meal,
                TierGroup::Small,
                None,
                Confirmation::Confirmed,
            )
            .await;
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_targets_announced_for_reload() {
        let repo = repository();
        let mut changes = repo.subscribe();

        let report = TierPropagator::new(&repo)
            .propagate(
                ProductLine::Er,
                Category::Transport,
                TierGroup::Large,
                None,
                Confirmation::Confirmed,
            )
            .await
            .unwrap();

        let keys = report.reload_keys(ProductLine::Er);
        assert_eq!(keys.len(), 3);
        for key in keys {
            let event = changes.recv().await.unwrap();
            assert_eq!(event.key, key);
            assert_eq!(event.cause, ChangeCause::Propagation);
        }
    }

    #[tokio::test]
    async fn test_propagate_all_covers_tier_specific_categories() {
        let repo = repository();
        let reports = TierPropagator::new(&repo)
            .propagate_all(ProductLine::Er, TierGroup::Small, Confirmation::Confirmed)
            .await
            .unwrap();

        let categories: Vec<Category> = reports
            .iter()
            .filter_map(|r| match r {
                PropagationReport::Applied { category, .. } => Some(*category),
                PropagationReport::Cancelled => None,
            })
            .collect();
        assert_eq!(
            categories,
            vec![Category::Transport, Category::Railway, Category::Fly]
        );
    }

    #[tokio::test]
    async fn test_unreadable_source_copies_nothing() {
        let remote = Arc::new(FlakyRemoteStore::default());
        let first = PriceRepository::new(LocalCache::default(), remote.clone());
        for tier in Tier::ALL {
            first
                .save(ProductLine::Za, Category::Railway, tier, transport(dec!(45)))
                .await;
        }

        let repo = PriceRepository::new(LocalCache::default(), remote.clone());
        remote.fail_next_reads(1);
        let result = TierPropagator::new(&repo)
            .propagate(
                ProductLine::Za,
                Category::Railway,
                TierGroup::Small,
                None,
                Confirmation::Confirmed,
            )
            .await;
        assert!(matches!(result, Err(AppError::RemoteReadFailed(_))));

        for &tier in TierGroup::Small.targets() {
            let key = PriceKey::new(ProductLine::Za, Category::Railway, tier);
            let raw = remote.raw(&key).await.unwrap();
            assert_eq!(
                ItemList::decode(Category::Railway, raw).unwrap().lines()[0].unit_price,
                dec!(45)
            );
        }
    }
}
