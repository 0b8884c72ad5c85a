//! Response DTOs for the price store endpoints.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::calculators::{round_money, PriceBreakdown};
use super::models::{Currency, ProductLine, Tier};

/// Body of `GET /prices`
#[derive(Debug, Serialize, Deserialize)]
pub struct PricesResponse {
    pub items: serde_json::Value,
}

/// Per-traveler breakdown of one tier, figures rounded to cents
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierQuoteResponse {
    pub tier: Tier,
    pub headcount: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub hotel_per_traveler: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub transport_per_traveler: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub railway_per_traveler: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub fly_per_traveler: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub meal_per_traveler: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub sightseeing_per_traveler: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub guide_per_traveler: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub show_per_traveler: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub base_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub commission_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub commission_amount: Decimal,
    pub final_price: i64,
    pub single_supplement: i64,
}

impl From<&PriceBreakdown> for TierQuoteResponse {
    fn from(b: &PriceBreakdown) -> Self {
        Self {
            tier: b.tier,
            headcount: b.tier.headcount(),
            hotel_per_traveler: round_money(b.hotel_per_traveler, 2),
            transport_per_traveler: round_money(b.transport_per_traveler, 2),
            railway_per_traveler: round_money(b.railway_per_traveler, 2),
            fly_per_traveler: round_money(b.fly_per_traveler, 2),
            meal_per_traveler: round_money(b.meal_per_traveler, 2),
            sightseeing_per_traveler: round_money(b.sightseeing_per_traveler, 2),
            guide_per_traveler: round_money(b.guide_per_traveler, 2),
            show_per_traveler: round_money(b.show_per_traveler, 2),
            base_price: round_money(b.base_price, 2),
            commission_percentage: b.commission_percentage,
            commission_amount: round_money(b.commission_amount, 2),
            final_price: b.final_price,
            single_supplement: b.single_supplement_rounded(),
        }
    }
}

/// Quote for every tier of a product line
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub product_line: ProductLine,
    pub tiers: Vec<TierQuoteResponse>,
    /// Additional costs per currency, outside the per-traveler price
    pub additional_costs: BTreeMap<Currency, String>,
    /// Records priced from defaults because they could not be read
    pub warnings: Vec<String>,
}

/// Health check body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
}
