//! Core pricing calculation functions.
//!
//! Pure functions for pricing math - no cache or store access.

use std::collections::BTreeMap;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::error::AppError;

use super::models::{AdditionalCostItem, Currency, HotelItem, LineItem, Tier};

/// Round to specified decimal places using banker's rounding (ROUND_HALF_EVEN).
///
/// Used for per-traveler figures shown next to the final price.
///
/// # Examples
/// ```
/// use rust_decimal_macros::dec;
/// use tour_pricing::pricing::round_money;
///
/// assert_eq!(round_money(dec!(2.5), 0), dec!(2));   // rounds to even
/// assert_eq!(round_money(dec!(3.5), 0), dec!(4));   // rounds to even
/// assert_eq!(round_money(dec!(1.234), 2), dec!(1.23));
/// ```
pub fn round_money(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
}

/// Round to a whole currency unit, halves away from zero.
///
/// Saturates at the `i64` bounds.
pub fn round_price(amount: Decimal) -> i64 {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

fn too_large(what: &str) -> AppError {
    AppError::validation(format!("{} is too large to price", what))
}

/// Overflow-checked sum of item totals
fn checked_sum(totals: impl IntoIterator<Item = Option<Decimal>>, what: &str) -> Result<Decimal, AppError> {
    totals
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, total| acc.checked_add(total?))
        .ok_or_else(|| too_large(what))
}

/// Hotel cost per traveler: double-occupancy total split between two guests
pub fn hotel_per_traveler(items: &[HotelItem]) -> Result<Decimal, AppError> {
    Ok(checked_sum(items.iter().map(HotelItem::double_total), "hotel total")? / Decimal::TWO)
}

/// Hotel cost for a traveler in a single room
pub fn hotel_single_total(items: &[HotelItem]) -> Result<Decimal, AppError> {
    checked_sum(items.iter().map(HotelItem::single_total), "single room total")
}

/// Single-room supplement: single-room total minus the shared-room share
pub fn single_supplement(items: &[HotelItem]) -> Result<Decimal, AppError> {
    hotel_single_total(items)?
        .checked_sub(hotel_per_traveler(items)?)
        .ok_or_else(|| too_large("single supplement"))
}

/// Sum of `days × unit_price`, blank days counting as one
pub fn flat_total(items: &[LineItem]) -> Result<Decimal, AppError> {
    checked_sum(items.iter().map(LineItem::total), "item total")
}

/// Flat total divided by the tier's representative headcount
pub fn per_traveler_share(items: &[LineItem], tier: Tier) -> Result<Decimal, AppError> {
    Ok(flat_total(items)? / Decimal::from(tier.headcount()))
}

/// Commission markup on a base price
pub fn commission_amount(base_price: Decimal, percentage: Decimal) -> Result<Decimal, AppError> {
    base_price
        .checked_mul(percentage / Decimal::ONE_HUNDRED)
        .ok_or_else(|| too_large("commission"))
}

/// Additional costs summed per currency as `unit_price × headcount`.
///
/// These never enter the per-traveler price.
pub fn additional_cost_totals(items: &[AdditionalCostItem]) -> Result<BTreeMap<Currency, Decimal>, AppError> {
    let mut totals = BTreeMap::new();
    for item in items {
        let current = totals.get(&item.currency).copied().unwrap_or(Decimal::ZERO);
        let total = item
            .total()
            .and_then(|total| current.checked_add(total))
            .ok_or_else(|| too_large("additional cost total"))?;
        totals.insert(item.currency, total);
    }
    Ok(totals)
}

/// Everything the calculator needs to price one tier
#[derive(Debug, Clone, Default)]
pub struct TierInputs {
    pub hotels: Vec<HotelItem>,
    /// Tier-specific list
    pub transport: Vec<LineItem>,
    /// Tier-specific list
    pub railway: Vec<LineItem>,
    /// Tier-specific list
    pub fly: Vec<LineItem>,
    pub meal: Vec<LineItem>,
    pub sightseeing: Vec<LineItem>,
    pub guide: Vec<LineItem>,
    pub show: Vec<LineItem>,
    pub commission_percentage: Decimal,
}

/// Per-traveler breakdown and final price of one tier
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    pub tier: Tier,
    pub hotel_per_traveler: Decimal,
    pub hotel_single_total: Decimal,
    pub single_supplement: Decimal,
    pub transport_per_traveler: Decimal,
    pub railway_per_traveler: Decimal,
    pub fly_per_traveler: Decimal,
    pub meal_per_traveler: Decimal,
    pub sightseeing_per_traveler: Decimal,
    pub guide_per_traveler: Decimal,
    pub show_per_traveler: Decimal,
    pub base_price: Decimal,
    pub commission_percentage: Decimal,
    pub commission_amount: Decimal,
    pub final_price: i64,
}

impl PriceBreakdown {
    pub fn single_supplement_rounded(&self) -> i64 {
        round_price(self.single_supplement)
    }
}

/// Price one tier.
///
/// Transport, flights and the guide are split by headcount. Railway, meals,
/// sightseeing and shows are added flat per traveler. Amounts too large for
/// `Decimal` fail with `ValidationFailed`.
pub fn calculate_tier(inputs: &TierInputs, tier: Tier) -> Result<PriceBreakdown, AppError> {
    let hotel_per_traveler = hotel_per_traveler(&inputs.hotels)?;
    let hotel_single_total = hotel_single_total(&inputs.hotels)?;
    let transport_per_traveler = per_traveler_share(&inputs.transport, tier)?;
    // Not divided by headcount. Historical prices depend on it.
    let railway_per_traveler = flat_total(&inputs.railway)?;
    let fly_per_traveler = per_traveler_share(&inputs.fly, tier)?;
    let meal_per_traveler = flat_total(&inputs.meal)?;
    let sightseeing_per_traveler = flat_total(&inputs.sightseeing)?;
    let guide_per_traveler = per_traveler_share(&inputs.guide, tier)?;
    let show_per_traveler = flat_total(&inputs.show)?;

    let base_price = checked_sum(
        [
            hotel_per_traveler,
            transport_per_traveler,
            railway_per_traveler,
            fly_per_traveler,
            meal_per_traveler,
            sightseeing_per_traveler,
            guide_per_traveler,
            show_per_traveler,
        ]
        .map(Some),
        "base price",
    )?;

    let commission_amount = commission_amount(base_price, inputs.commission_percentage)?;
    let final_price = base_price
        .checked_add(commission_amount)
        .ok_or_else(|| too_large("final price"))?;
    let single_supplement = hotel_single_total
        .checked_sub(hotel_per_traveler)
        .ok_or_else(|| too_large("single supplement"))?;

    Ok(PriceBreakdown {
        tier,
        hotel_per_traveler,
        hotel_single_total,
        single_supplement,
        transport_per_traveler,
        railway_per_traveler,
        fly_per_traveler,
        meal_per_traveler,
        sightseeing_per_traveler,
        guide_per_traveler,
        show_per_traveler,
        base_price,
        commission_percentage: inputs.commission_percentage,
        commission_amount,
        final_price: round_price(final_price),
    })
}
