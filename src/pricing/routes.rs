//! HTTP handlers of the price store service.
//!
//! `GET /prices` and `PUT /prices` expose the durable store with the same
//! protocol [`HttpRemoteStore`](super::remote::HttpRemoteStore) speaks.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::cache::LocalCache;
use crate::error::{AppError, Result};
use crate::AppState;

use super::models::{ItemList, ProductLine};
use super::repository::PriceRepository;
use super::requests::{PricesQuery, PutPricesRequest};
use super::responses::{HealthResponse, PricesResponse, QuoteResponse, TierQuoteResponse};
use super::services::{additional_costs, price_all_tiers};

/// Records one quote touches: shared categories once plus three per tier
const QUOTE_CACHE_CAPACITY: u64 = 64;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/prices", get(get_prices).put(put_prices))
        .route("/quotes", get(get_quote))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.backend,
    })
}

async fn get_prices(
    State(state): State<AppState>,
    Query(query): Query<PricesQuery>,
) -> Result<Json<PricesResponse>> {
    let key = query.into_key()?;
    let items = state.store.fetch(&key).await?.ok_or(AppError::NotFound)?;
    tracing::debug!("Served price record {}", key);
    Ok(Json(PricesResponse { items }))
}

async fn put_prices(
    State(state): State<AppState>,
    Json(request): Json<PutPricesRequest>,
) -> Result<StatusCode> {
    let key = request.key()?;
    let items = ItemList::decode(key.category, request.items)?;
    items.validate_for(key.category)?;

    state.store.store(&key, items.to_value()?).await?;
    tracing::info!(key = %key, items = items.len(), "Stored price record");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteQuery {
    product_line: String,
}

/// Price every tier straight from the durable store
async fn get_quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<QuoteResponse>> {
    let product_line: ProductLine = query.product_line.parse()?;
    let repo = PriceRepository::new(LocalCache::new(QUOTE_CACHE_CAPACITY), state.store.clone());

    let tiers = price_all_tiers(&repo, product_line).await?;
    let costs = additional_costs(&repo, product_line).await?;

    let mut warnings = tiers.warnings;
    warnings.extend(costs.warnings);
    if !warnings.is_empty() {
        tracing::warn!(%product_line, unreadable = warnings.len(), "Quote priced partly from defaults");
    }

    let tiers = tiers.value.iter().map(TierQuoteResponse::from).collect();
    let additional_costs = costs
        .value
        .into_iter()
        .map(|(currency, total)| (currency, total.to_string()))
        .collect();

    Ok(Json(QuoteResponse {
        product_line,
        tiers,
        additional_costs,
        warnings,
    }))
}
