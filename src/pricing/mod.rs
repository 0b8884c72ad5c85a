//! Tour pricing engine.
//!
//! Staff keep cost items per product line, category and group-size tier;
//! the engine turns them into a per-traveler sell price with commission.

pub mod calculators;
pub mod commission;
pub mod defaults;
pub mod models;
pub mod propagation;
pub mod queries;
pub mod remote;
pub mod repository;
pub mod requests;
pub mod responses;
pub mod routes;
pub mod services;
pub mod snapshots;

// Re-export commonly used items
pub use calculators::{calculate_tier, round_money, round_price, PriceBreakdown, TierInputs};
pub use commission::CommissionStore;
pub use models::{Category, ItemList, PriceKey, ProductLine, Tier, TotalsSnapshot};
pub use propagation::{Confirmation, PropagationReport, TierGroup, TierPropagator};
pub use remote::{HttpRemoteStore, MemoryRemoteStore, RemoteStore};
pub use repository::{LoadSource, Loaded, PriceRepository, RecordChanged, SaveOutcome};
pub use routes::router;
pub use services::Priced;
pub use snapshots::{SnapshotCapture, TotalsSnapshotStore};
