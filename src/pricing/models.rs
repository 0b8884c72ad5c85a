//! Pricing data model: product lines, categories, tiers and the item lists
//! stored per (product line, category, tier).

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

// ==================== Product lines ====================

/// Tour brand a price configuration belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductLine {
    #[serde(rename = "ER")]
    Er,
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "KAS")]
    Kas,
    #[serde(rename = "ZA")]
    Za,
}

impl ProductLine {
    pub const ALL: [ProductLine; 4] = [
        ProductLine::Er,
        ProductLine::Co,
        ProductLine::Kas,
        ProductLine::Za,
    ];

    pub fn code(self) -> &'static str {
        match self {
            ProductLine::Er => "ER",
            ProductLine::Co => "CO",
            ProductLine::Kas => "KAS",
            ProductLine::Za => "ZA",
        }
    }
}

impl fmt::Display for ProductLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ProductLine {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ProductLine::ALL
            .into_iter()
            .find(|line| line.code().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::validation(format!("unknown product line '{}'", s)))
    }
}

// ==================== Categories ====================

/// Shape of the payload a category stores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Hotels,
    LineItems,
    AdditionalCosts,
    Commission,
}

/// Static definition of a cost category.
///
/// `shared_across_tiers` decides whether a record is keyed per tier or holds
/// one list for every tier. New categories must declare it here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub shared_across_tiers: bool,
    pub payload: PayloadKind,
}

/// Cost category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Hotels,
    Transport,
    Railway,
    Fly,
    Meal,
    Sightseeing,
    Guide,
    Show,
    AdditionalCosts,
    Commission,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Hotels,
        Category::Transport,
        Category::Railway,
        Category::Fly,
        Category::Meal,
        Category::Sightseeing,
        Category::Guide,
        Category::Show,
        Category::AdditionalCosts,
        Category::Commission,
    ];

    pub const fn definition(self) -> CategoryDefinition {
        match self {
            Category::Hotels => CategoryDefinition {
                key: "hotels",
                label: "Hotels",
                shared_across_tiers: true,
                payload: PayloadKind::Hotels,
            },
            Category::Transport => CategoryDefinition {
                key: "transport",
                label: "Transport",
                shared_across_tiers: false,
                payload: PayloadKind::LineItems,
            },
            Category::Railway => CategoryDefinition {
                key: "railway",
                label: "Railway",
                shared_across_tiers: false,
                payload: PayloadKind::LineItems,
            },
            Category::Fly => CategoryDefinition {
                key: "fly",
                label: "Flights",
                shared_across_tiers: false,
                payload: PayloadKind::LineItems,
            },
            Category::Meal => CategoryDefinition {
                key: "meal",
                label: "Meals",
                shared_across_tiers: true,
                payload: PayloadKind::LineItems,
            },
            Category::Sightseeing => CategoryDefinition {
                key: "sightseeing",
                label: "Sightseeing",
                shared_across_tiers: true,
                payload: PayloadKind::LineItems,
            },
            Category::Guide => CategoryDefinition {
                key: "guide",
                label: "Guide",
                shared_across_tiers: true,
                payload: PayloadKind::LineItems,
            },
            Category::Show => CategoryDefinition {
                key: "show",
                label: "Shows",
                shared_across_tiers: true,
                payload: PayloadKind::LineItems,
            },
            Category::AdditionalCosts => CategoryDefinition {
                key: "additionalCosts",
                label: "Additional costs",
                shared_across_tiers: true,
                payload: PayloadKind::AdditionalCosts,
            },
            Category::Commission => CategoryDefinition {
                key: "commission",
                label: "Commission",
                shared_across_tiers: true,
                payload: PayloadKind::Commission,
            },
        }
    }

    pub fn key(self) -> &'static str {
        self.definition().key
    }

    pub fn shared_across_tiers(self) -> bool {
        self.definition().shared_across_tiers
    }

    pub fn payload_kind(self) -> PayloadKind {
        self.definition().payload
    }

    /// Category name as sent to the remote store (upper-cased)
    pub fn wire_name(self) -> String {
        self.key().to_ascii_uppercase()
    }

    /// Categories that hold an independent list per tier
    pub fn tier_specific() -> impl Iterator<Item = Category> {
        Category::ALL
            .into_iter()
            .filter(|category| !category.shared_across_tiers())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Category {
    type Err = AppError;

    /// Accepts both the camelCase key and the upper-cased wire name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|category| category.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::validation(format!("unknown category '{}'", s)))
    }
}

// ==================== Tiers ====================

/// Group-size bucket used to divide shared costs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6-7")]
    SixSeven,
    #[serde(rename = "8-9")]
    EightNine,
    #[serde(rename = "10-11")]
    TenEleven,
    #[serde(rename = "12-13")]
    TwelveThirteen,
    #[serde(rename = "14-15")]
    FourteenFifteen,
    #[serde(rename = "16")]
    Sixteen,
}

impl Tier {
    pub const ALL: [Tier; 8] = [
        Tier::Four,
        Tier::Five,
        Tier::SixSeven,
        Tier::EightNine,
        Tier::TenEleven,
        Tier::TwelveThirteen,
        Tier::FourteenFifteen,
        Tier::Sixteen,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Tier::Four => "4",
            Tier::Five => "5",
            Tier::SixSeven => "6-7",
            Tier::EightNine => "8-9",
            Tier::TenEleven => "10-11",
            Tier::TwelveThirteen => "12-13",
            Tier::FourteenFifteen => "14-15",
            Tier::Sixteen => "16",
        }
    }

    /// Representative headcount: the lower bound of the bucket
    pub fn headcount(self) -> u32 {
        match self {
            Tier::Four => 4,
            Tier::Five => 5,
            Tier::SixSeven => 6,
            Tier::EightNine => 8,
            Tier::TenEleven => 10,
            Tier::TwelveThirteen => 12,
            Tier::FourteenFifteen => 14,
            Tier::Sixteen => 16,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Tier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Tier::ALL
            .into_iter()
            .find(|tier| tier.id() == s)
            .ok_or_else(|| AppError::validation(format!("unknown tier '{}'", s)))
    }
}

// ==================== Items ====================

/// A priced row in a non-hotel category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: Uuid,
    pub name: String,
    /// 0 means "not filled in" and counts as one day
    #[serde(default)]
    pub days: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    pub fn new(name: impl Into<String>, days: u32, unit_price: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            days,
            unit_price,
        }
    }

    pub fn effective_days(&self) -> u32 {
        if self.days == 0 {
            1
        } else {
            self.days
        }
    }

    /// `None` when the total overflows
    pub fn total(&self) -> Option<Decimal> {
        Decimal::from(self.effective_days()).checked_mul(self.unit_price)
    }
}

/// A hotel row priced per room type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelItem {
    pub id: Uuid,
    pub name: String,
    /// Nights; 0 excludes the row from every hotel aggregate
    #[serde(default)]
    pub days: u32,
    pub double_occupancy_price: Decimal,
    pub single_room_price: Decimal,
}

impl HotelItem {
    pub fn new(
        name: impl Into<String>,
        days: u32,
        double_occupancy_price: Decimal,
        single_room_price: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            days,
            double_occupancy_price,
            single_room_price,
        }
    }

    pub fn double_total(&self) -> Option<Decimal> {
        Decimal::from(self.days).checked_mul(self.double_occupancy_price)
    }

    pub fn single_total(&self) -> Option<Decimal> {
        Decimal::from(self.days).checked_mul(self.single_room_price)
    }
}

/// Currency of an additional cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Uzs,
    Eur,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Uzs => "UZS",
            Currency::Eur => "EUR",
        }
    }
}

impl FromStr for Currency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "UZS" => Ok(Currency::Uzs),
            "EUR" => Ok(Currency::Eur),
            other => Err(AppError::validation(format!("unknown currency '{}'", other))),
        }
    }
}

/// Cost priced per head, independent of tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalCostItem {
    pub id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub headcount: u32,
    pub currency: Currency,
}

impl AdditionalCostItem {
    pub fn new(
        name: impl Into<String>,
        unit_price: Decimal,
        headcount: u32,
        currency: Currency,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            unit_price,
            headcount,
            currency,
        }
    }

    pub fn total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.headcount))
    }
}

/// Commission percentage per tier. Tiers without an entry are 0%.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommissionTable(BTreeMap<Tier, Decimal>);

impl CommissionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percentage(&self, tier: Tier) -> Decimal {
        self.0.get(&tier).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn set(&mut self, tier: Tier, percentage: Decimal) {
        self.0.insert(tier, percentage);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, Decimal)> + '_ {
        self.0.iter().map(|(tier, pct)| (*tier, *pct))
    }
}

impl FromIterator<(Tier, Decimal)> for CommissionTable {
    fn from_iter<I: IntoIterator<Item = (Tier, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A single editable row, used for per-item upserts
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Hotel(HotelItem),
    Line(LineItem),
    AdditionalCost(AdditionalCostItem),
}

impl Item {
    pub fn id(&self) -> Uuid {
        match self {
            Item::Hotel(item) => item.id,
            Item::Line(item) => item.id,
            Item::AdditionalCost(item) => item.id,
        }
    }
}

/// Payload of one price record. The variant is fixed by the category.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemList {
    Hotels(Vec<HotelItem>),
    Lines(Vec<LineItem>),
    AdditionalCosts(Vec<AdditionalCostItem>),
    Commission(CommissionTable),
}

impl ItemList {
    pub fn empty(kind: PayloadKind) -> Self {
        match kind {
            PayloadKind::Hotels => ItemList::Hotels(Vec::new()),
            PayloadKind::LineItems => ItemList::Lines(Vec::new()),
            PayloadKind::AdditionalCosts => ItemList::AdditionalCosts(Vec::new()),
            PayloadKind::Commission => ItemList::Commission(CommissionTable::new()),
        }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            ItemList::Hotels(_) => PayloadKind::Hotels,
            ItemList::Lines(_) => PayloadKind::LineItems,
            ItemList::AdditionalCosts(_) => PayloadKind::AdditionalCosts,
            ItemList::Commission(_) => PayloadKind::Commission,
        }
    }

    /// Decode a stored JSON payload using the category's payload kind
    pub fn decode(category: Category, value: serde_json::Value) -> Result<Self, AppError> {
        let list = match category.payload_kind() {
            PayloadKind::Hotels => ItemList::Hotels(serde_json::from_value(value)?),
            PayloadKind::LineItems => ItemList::Lines(serde_json::from_value(value)?),
            PayloadKind::AdditionalCosts => {
                ItemList::AdditionalCosts(serde_json::from_value(value)?)
            }
            PayloadKind::Commission => ItemList::Commission(serde_json::from_value(value)?),
        };
        Ok(list)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, AppError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn len(&self) -> usize {
        match self {
            ItemList::Hotels(items) => items.len(),
            ItemList::Lines(items) => items.len(),
            ItemList::AdditionalCosts(items) => items.len(),
            ItemList::Commission(table) => table.0.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn item_ids(&self) -> Vec<Uuid> {
        match self {
            ItemList::Hotels(items) => items.iter().map(|i| i.id).collect(),
            ItemList::Lines(items) => items.iter().map(|i| i.id).collect(),
            ItemList::AdditionalCosts(items) => items.iter().map(|i| i.id).collect(),
            ItemList::Commission(_) => Vec::new(),
        }
    }

    pub fn hotels(&self) -> &[HotelItem] {
        match self {
            ItemList::Hotels(items) => items,
            _ => &[],
        }
    }

    pub fn lines(&self) -> &[LineItem] {
        match self {
            ItemList::Lines(items) => items,
            _ => &[],
        }
    }

    pub fn additional_costs(&self) -> &[AdditionalCostItem] {
        match self {
            ItemList::AdditionalCosts(items) => items,
            _ => &[],
        }
    }

    pub fn commission(&self) -> Option<&CommissionTable> {
        match self {
            ItemList::Commission(table) => Some(table),
            _ => None,
        }
    }

    /// Check the payload can be stored under `category`
    pub fn validate_for(&self, category: Category) -> Result<(), AppError> {
        if self.kind() != category.payload_kind() {
            return Err(AppError::validation(format!(
                "{:?} payload cannot be stored under category '{}'",
                self.kind(),
                category
            )));
        }

        let mut seen = HashSet::new();
        for id in self.item_ids() {
            if !seen.insert(id) {
                return Err(AppError::validation(format!(
                    "duplicate item id {} in '{}'",
                    id, category
                )));
            }
        }

        let negative = match self {
            ItemList::Hotels(items) => items.iter().any(|i| {
                i.double_occupancy_price.is_sign_negative() || i.single_room_price.is_sign_negative()
            }),
            ItemList::Lines(items) => items.iter().any(|i| i.unit_price.is_sign_negative()),
            ItemList::AdditionalCosts(items) => {
                if items.iter().any(|i| i.headcount == 0) {
                    return Err(AppError::validation("headcount must be at least 1"));
                }
                items.iter().any(|i| i.unit_price.is_sign_negative())
            }
            ItemList::Commission(table) => table.iter().any(|(_, pct)| pct.is_sign_negative()),
        };
        if negative {
            return Err(AppError::validation(format!(
                "negative amount in '{}'",
                category
            )));
        }

        Ok(())
    }

    /// Replace the item with the same id, or append it
    pub fn upsert(&mut self, item: Item) -> Result<(), AppError> {
        fn put<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T) -> bool) {
            match items.iter_mut().find(|existing| same(existing)) {
                Some(existing) => *existing = item,
                None => items.push(item),
            }
        }

        let id = item.id();
        match (self, item) {
            (ItemList::Hotels(items), Item::Hotel(item)) => put(items, item, |i| i.id == id),
            (ItemList::Lines(items), Item::Line(item)) => put(items, item, |i| i.id == id),
            (ItemList::AdditionalCosts(items), Item::AdditionalCost(item)) => {
                put(items, item, |i| i.id == id)
            }
            (list, _) => {
                return Err(AppError::validation(format!(
                    "item does not fit a {:?} list",
                    list.kind()
                )))
            }
        }
        Ok(())
    }

    /// Remove one item by id. Returns false when no item had that id.
    pub fn remove_item(&mut self, id: Uuid) -> bool {
        fn drop_id<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
            let before = items.len();
            items.retain(|i| !matches(i));
            items.len() != before
        }

        match self {
            ItemList::Hotels(items) => drop_id(items, |i| i.id == id),
            ItemList::Lines(items) => drop_id(items, |i| i.id == id),
            ItemList::AdditionalCosts(items) => drop_id(items, |i| i.id == id),
            ItemList::Commission(_) => false,
        }
    }
}

// ==================== Keys and records ====================

/// Storage key of a price record.
///
/// Shared categories carry no tier; tier-specific ones always do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceKey {
    pub product_line: ProductLine,
    pub category: Category,
    pub tier: Option<Tier>,
}

impl PriceKey {
    pub fn new(product_line: ProductLine, category: Category, tier: Tier) -> Self {
        Self {
            product_line,
            category,
            tier: (!category.shared_across_tiers()).then_some(tier),
        }
    }

    /// Key of a shared record, independent of any tier.
    ///
    /// Tier-specific categories have no shared record and are rejected.
    pub fn shared(product_line: ProductLine, category: Category) -> Result<Self, AppError> {
        if !category.shared_across_tiers() {
            return Err(AppError::validation(format!(
                "category '{}' requires a tier",
                category
            )));
        }
        Ok(Self {
            product_line,
            category,
            tier: None,
        })
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tier {
            Some(tier) => write!(f, "{}/{}/{}", self.product_line, self.category, tier),
            None => write!(f, "{}/{}", self.product_line, self.category),
        }
    }
}

/// Row of the durable `price_configs` table
#[derive(Debug, Clone, FromRow)]
pub struct PriceConfigRow {
    pub product_line: String,
    pub category: String,
    /// Empty for shared categories
    pub tier: String,
    pub items: sqlx::types::Json<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

/// Final numbers for one (product line, tier), captured on request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsSnapshot {
    pub product_line: ProductLine,
    pub tier: Tier,
    pub final_price: i64,
    pub single_supplement: i64,
    pub captured_at: DateTime<Utc>,
}
