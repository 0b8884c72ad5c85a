//! Captured totals read by invoicing.
//!
//! A snapshot changes only when an operator captures one. Editing prices
//! afterwards leaves the captured numbers as they were until the next
//! capture; invoicing reads whatever was captured last.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::AppError;

use super::models::{ProductLine, Tier, TotalsSnapshot};
use super::repository::PriceRepository;
use super::services::price_all_tiers;

/// Outcome of a capture
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotCapture {
    /// Rounded totals of every tier
    pub snapshots: Vec<TotalsSnapshot>,
    /// Records that could not be read and were priced from defaults
    pub warnings: Vec<String>,
}

impl SnapshotCapture {
    /// Totals are stored for invoicing only when every record was read
    pub fn is_stored(&self) -> bool {
        self.warnings.is_empty()
    }
}

pub struct TotalsSnapshotStore<'a> {
    repo: &'a PriceRepository,
}

impl<'a> TotalsSnapshotStore<'a> {
    pub fn new(repo: &'a PriceRepository) -> Self {
        Self { repo }
    }

    /// Price every tier and store the rounded results.
    ///
    /// When a record could not be read the totals are returned with the
    /// warnings but not stored, and the previous capture stays in place.
    pub async fn capture_snapshot(&self, product_line: ProductLine) -> Result<SnapshotCapture, AppError> {
        let captured_at = Utc::now();
        let priced = price_all_tiers(self.repo, product_line).await?;

        let snapshots: Vec<TotalsSnapshot> = priced
            .value
            .iter()
            .map(|breakdown| TotalsSnapshot {
                product_line,
                tier: breakdown.tier,
                final_price: breakdown.final_price,
                single_supplement: breakdown.single_supplement_rounded(),
                captured_at,
            })
            .collect();

        if !priced.is_complete() {
            warn!(
                %product_line,
                unreadable = priced.warnings.len(),
                "Totals snapshot not stored, price records unreadable"
            );
            return Ok(SnapshotCapture {
                snapshots,
                warnings: priced.warnings,
            });
        }

        for snapshot in &snapshots {
            self.repo.cache().put_totals(snapshot.clone()).await;
        }
        info!(%product_line, tiers = snapshots.len(), "Totals snapshot captured");

        Ok(SnapshotCapture {
            snapshots,
            warnings: Vec::new(),
        })
    }

    /// Last captured totals of a tier, for invoicing
    pub async fn snapshot(&self, product_line: ProductLine, tier: Tier) -> Option<TotalsSnapshot> {
        self.repo.cache().get_totals(product_line, tier).await
    }
}
