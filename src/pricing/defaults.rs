//! Fallback item sets used when no record has been saved yet.
//!
//! Ids are fixed so that two reads of the defaults compare equal and an edit
//! of a default row keeps its identity once saved.

use rust_decimal_macros::dec;
use uuid::Uuid;

use super::models::{
    AdditionalCostItem, Category, CommissionTable, Currency, HotelItem, ItemList, LineItem,
};

fn default_id(category: Category, index: u128) -> Uuid {
    let prefix = Category::ALL
        .iter()
        .position(|c| *c == category)
        .unwrap_or_default() as u128;
    Uuid::from_u128(0xD3FA_0000_0000_0000_0000_0000_0000_0000 | (prefix << 16) | index)
}

fn line(category: Category, index: u128, name: &str, days: u32, unit_price: rust_decimal::Decimal) -> LineItem {
    LineItem {
        id: default_id(category, index),
        name: name.to_string(),
        days,
        unit_price,
    }
}

/// Default list for a category
pub fn defaults_for(category: Category) -> ItemList {
    match category {
        Category::Hotels => ItemList::Hotels(vec![
            HotelItem {
                id: default_id(category, 1),
                name: "Tashkent hotel".to_string(),
                days: 2,
                double_occupancy_price: dec!(70),
                single_room_price: dec!(60),
            },
            HotelItem {
                id: default_id(category, 2),
                name: "Samarkand hotel".to_string(),
                days: 2,
                double_occupancy_price: dec!(80),
                single_room_price: dec!(65),
            },
            HotelItem {
                id: default_id(category, 3),
                name: "Bukhara hotel".to_string(),
                days: 2,
                double_occupancy_price: dec!(75),
                single_room_price: dec!(60),
            },
            HotelItem {
                id: default_id(category, 4),
                name: "Khiva hotel".to_string(),
                days: 1,
                double_occupancy_price: dec!(60),
                single_room_price: dec!(50),
            },
        ]),
        Category::Transport => ItemList::Lines(vec![
            line(category, 1, "Airport transfers", 2, dec!(40)),
            line(category, 2, "Bus Samarkand - Bukhara", 1, dec!(250)),
            line(category, 3, "Bus Bukhara - Khiva", 1, dec!(350)),
        ]),
        Category::Railway => ItemList::Lines(vec![
            line(category, 1, "Afrosiyob Tashkent - Samarkand", 1, dec!(30)),
        ]),
        Category::Fly => ItemList::Lines(vec![
            line(category, 1, "Flight Urgench - Tashkent", 1, dec!(90)),
        ]),
        Category::Meal => ItemList::Lines(vec![
            line(category, 1, "Lunch", 7, dec!(10)),
            line(category, 2, "Dinner", 7, dec!(12)),
        ]),
        Category::Sightseeing => ItemList::Lines(vec![
            line(category, 1, "Registan entrance", 1, dec!(8)),
            line(category, 2, "Ark fortress entrance", 1, dec!(5)),
            line(category, 3, "Itchan Kala ticket", 1, dec!(15)),
        ]),
        Category::Guide => ItemList::Lines(vec![
            line(category, 1, "Tour leader", 8, dec!(60)),
        ]),
        Category::Show => ItemList::Lines(vec![
            line(category, 1, "Folklore show", 1, dec!(15)),
        ]),
        Category::AdditionalCosts => ItemList::AdditionalCosts(vec![
            AdditionalCostItem {
                id: default_id(category, 1),
                name: "Water on the bus".to_string(),
                unit_price: dec!(5000),
                headcount: 1,
                currency: Currency::Uzs,
            },
            AdditionalCostItem {
                id: default_id(category, 2),
                name: "Camera fee".to_string(),
                unit_price: dec!(3),
                headcount: 1,
                currency: Currency::Usd,
            },
        ]),
        Category::Commission => ItemList::Commission(CommissionTable::new()),
    }
}
