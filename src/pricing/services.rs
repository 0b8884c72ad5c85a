//! Pricing service functions with store access.
//!
//! These gather the records a tier depends on through the repository and
//! hand them to the pure calculators. Records that could not be read are
//! priced from defaults and reported in [`Priced::warnings`].

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::AppError;

use super::calculators::{additional_cost_totals, calculate_tier, PriceBreakdown, TierInputs};
use super::models::{Category, CommissionTable, Currency, ItemList, LineItem, ProductLine, Tier};
use super::repository::{LoadSource, PriceRepository};

/// A result together with the warnings raised while loading its inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Priced<T> {
    pub value: T,
    /// One entry per record that fell back to defaults after a failed read
    pub warnings: Vec<String>,
}

impl<T> Priced<T> {
    /// True when every record came from the local cache or the price store
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Repository reads that remember read failures
struct RecordReader<'a> {
    repo: &'a PriceRepository,
    warnings: Vec<String>,
}

impl<'a> RecordReader<'a> {
    fn new(repo: &'a PriceRepository) -> Self {
        Self {
            repo,
            warnings: Vec::new(),
        }
    }

    async fn load(&mut self, product_line: ProductLine, category: Category, tier: Tier) -> ItemList {
        let loaded = self.repo.fetch(product_line, category, tier).await;
        if let LoadSource::Defaults {
            warning: Some(warning),
        } = loaded.source
        {
            self.warnings.push(warning);
        }
        loaded.items
    }

    async fn lines(&mut self, product_line: ProductLine, category: Category, tier: Tier) -> Vec<LineItem> {
        self.load(product_line, category, tier).await.lines().to_vec()
    }

    fn finish<T>(self, value: T) -> Priced<T> {
        Priced {
            value,
            warnings: self.warnings,
        }
    }
}

/// Inputs shared by every tier of a product line; tier lists left empty
async fn load_shared(reader: &mut RecordReader<'_>, product_line: ProductLine) -> TierInputs {
    // Any tier addresses the shared records
    let tier = Tier::Four;

    TierInputs {
        hotels: reader
            .load(product_line, Category::Hotels, tier)
            .await
            .hotels()
            .to_vec(),
        meal: reader.lines(product_line, Category::Meal, tier).await,
        sightseeing: reader.lines(product_line, Category::Sightseeing, tier).await,
        guide: reader.lines(product_line, Category::Guide, tier).await,
        show: reader.lines(product_line, Category::Show, tier).await,
        ..Default::default()
    }
}

async fn load_commission(reader: &mut RecordReader<'_>, product_line: ProductLine) -> CommissionTable {
    reader
        .load(product_line, Category::Commission, Tier::Four)
        .await
        .commission()
        .cloned()
        .unwrap_or_default()
}

async fn tier_inputs(
    reader: &mut RecordReader<'_>,
    product_line: ProductLine,
    tier: Tier,
    shared: &TierInputs,
    commission_percentage: Decimal,
) -> TierInputs {
    TierInputs {
        transport: reader.lines(product_line, Category::Transport, tier).await,
        railway: reader.lines(product_line, Category::Railway, tier).await,
        fly: reader.lines(product_line, Category::Fly, tier).await,
        commission_percentage,
        ..shared.clone()
    }
}

/// Load everything one tier depends on
pub async fn load_tier_inputs(
    repo: &PriceRepository,
    product_line: ProductLine,
    tier: Tier,
) -> Priced<TierInputs> {
    let mut reader = RecordReader::new(repo);
    let shared = load_shared(&mut reader, product_line).await;
    let commission = load_commission(&mut reader, product_line).await;
    let inputs = tier_inputs(&mut reader, product_line, tier, &shared, commission.percentage(tier)).await;
    reader.finish(inputs)
}

/// Price one tier from the current records
pub async fn price_tier(
    repo: &PriceRepository,
    product_line: ProductLine,
    tier: Tier,
) -> Result<Priced<PriceBreakdown>, AppError> {
    let inputs = load_tier_inputs(repo, product_line, tier).await;
    Ok(Priced {
        value: calculate_tier(&inputs.value, tier)?,
        warnings: inputs.warnings,
    })
}

/// Price every tier of a product line, shared records loaded once
pub async fn price_all_tiers(
    repo: &PriceRepository,
    product_line: ProductLine,
) -> Result<Priced<Vec<PriceBreakdown>>, AppError> {
    let mut reader = RecordReader::new(repo);
    let shared = load_shared(&mut reader, product_line).await;
    let commission = load_commission(&mut reader, product_line).await;

    let mut breakdowns = Vec::with_capacity(Tier::ALL.len());
    for tier in Tier::ALL {
        let inputs = tier_inputs(&mut reader, product_line, tier, &shared, commission.percentage(tier)).await;
        breakdowns.push(calculate_tier(&inputs, tier)?);
    }
    Ok(reader.finish(breakdowns))
}

/// Additional costs of a product line per currency
pub async fn additional_costs(
    repo: &PriceRepository,
    product_line: ProductLine,
) -> Result<Priced<BTreeMap<Currency, Decimal>>, AppError> {
    let mut reader = RecordReader::new(repo);
    let items = reader
        .load(product_line, Category::AdditionalCosts, Tier::Four)
        .await;
    let totals = additional_cost_totals(items.additional_costs())?;
    Ok(reader.finish(totals))
}
