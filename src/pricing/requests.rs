//! Request DTOs for the price store protocol and the editing boundary.
//!
//! Everything entering the engine as text is parsed here; non-numeric input
//! is rejected with `ValidationFailed` before it reaches the calculator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

use super::models::{
    AdditionalCostItem, Category, Currency, HotelItem, LineItem, PriceKey, ProductLine, Tier,
};

/// Query of `GET /prices`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricesQuery {
    pub product_line: String,
    pub category: String,
    #[serde(default)]
    pub tier: Option<String>,
}

impl PricesQuery {
    pub fn into_key(self) -> Result<PriceKey, AppError> {
        parse_key(&self.product_line, &self.category, self.tier.as_deref())
    }
}

/// Body of `PUT /prices`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutPricesRequest {
    pub product_line: String,
    pub category: String,
    #[serde(default)]
    pub tier: Option<String>,
    pub items: serde_json::Value,
}

impl PutPricesRequest {
    pub fn for_key(key: &PriceKey, items: serde_json::Value) -> Self {
        Self {
            product_line: key.product_line.code().to_string(),
            category: key.category.wire_name(),
            tier: key.tier.map(|tier| tier.id().to_string()),
            items,
        }
    }

    pub fn key(&self) -> Result<PriceKey, AppError> {
        parse_key(&self.product_line, &self.category, self.tier.as_deref())
    }
}

fn parse_key(product_line: &str, category: &str, tier: Option<&str>) -> Result<PriceKey, AppError> {
    let product_line: ProductLine = product_line.parse()?;
    let category: Category = category.parse()?;

    if category.shared_across_tiers() {
        return PriceKey::shared(product_line, category);
    }

    let tier: Tier = tier
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::validation(format!("category '{}' requires a tier", category)))?
        .parse()?;
    Ok(PriceKey::new(product_line, category, tier))
}

// ==================== field parsing ====================

/// Parse a money amount typed by an operator. Blank means zero.
pub fn parse_amount(field: &str, raw: &str) -> Result<Decimal, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let amount: Decimal = raw
        .parse()
        .map_err(|_| AppError::validation(format!("{} must be a number, got '{}'", field, raw)))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::validation(format!("{} must not be negative", field)));
    }
    Ok(amount)
}

/// Parse a whole count. Blank yields `blank`.
pub fn parse_count(field: &str, raw: &str, blank: u32) -> Result<u32, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(blank);
    }
    raw.parse()
        .map_err(|_| AppError::validation(format!("{} must be a whole number, got '{}'", field, raw)))
}

/// Parse a commission percentage. No upper bound.
pub fn parse_percentage(raw: &str) -> Result<Decimal, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::validation("commission must not be blank"));
    }
    parse_amount("commission", raw)
}

// ==================== editor inputs ====================

/// A non-hotel row as typed in the editor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub days: String,
    #[serde(default)]
    pub unit_price: String,
}

impl TryFrom<LineItemInput> for LineItem {
    type Error = AppError;

    fn try_from(input: LineItemInput) -> Result<Self, Self::Error> {
        Ok(LineItem {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            name: input.name.trim().to_string(),
            days: parse_count("days", &input.days, 1)?,
            unit_price: parse_amount("unit price", &input.unit_price)?,
        })
    }
}

/// A hotel row as typed in the editor. Blank days exclude the row.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelItemInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub days: String,
    #[serde(default)]
    pub double_occupancy_price: String,
    #[serde(default)]
    pub single_room_price: String,
}

impl TryFrom<HotelItemInput> for HotelItem {
    type Error = AppError;

    fn try_from(input: HotelItemInput) -> Result<Self, Self::Error> {
        Ok(HotelItem {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            name: input.name.trim().to_string(),
            days: parse_count("days", &input.days, 0)?,
            double_occupancy_price: parse_amount("double occupancy price", &input.double_occupancy_price)?,
            single_room_price: parse_amount("single room price", &input.single_room_price)?,
        })
    }
}

/// An additional cost row as typed in the editor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalCostInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub unit_price: String,
    #[serde(default)]
    pub headcount: String,
    pub currency: String,
}

impl TryFrom<AdditionalCostInput> for AdditionalCostItem {
    type Error = AppError;

    fn try_from(input: AdditionalCostInput) -> Result<Self, Self::Error> {
        let headcount = parse_count("headcount", &input.headcount, 1)?;
        if headcount == 0 {
            return Err(AppError::validation("headcount must be at least 1"));
        }
        Ok(AdditionalCostItem {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            name: input.name.trim().to_string(),
            unit_price: parse_amount("unit price", &input.unit_price)?,
            headcount,
            currency: input.currency.parse::<Currency>()?,
        })
    }
}
