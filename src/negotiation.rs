use crate::models::{NegotiationRequest, NegotiationResult};
use crate::store::{LoadStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("load {0} not found")]
    LoadNotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Next rate to offer the carrier: split the gap toward the counter-offer
/// (or toward the ceiling when the counter exceeds it), round to the nearest
/// 100, then clamp so the result never exceeds the ceiling or the counter.
pub fn compute_next_rate(loadboard_rate: f64, maximum_rate: f64, counter_offer: f64) -> f64 {
    let target = if counter_offer > maximum_rate {
        maximum_rate
    } else {
        counter_offer
    };
    let difference = target - loadboard_rate;
    let provisional = loadboard_rate + difference / 2.0;

    let rounded = round_to_hundred(provisional);
    rounded.min(maximum_rate).min(counter_offer)
}

pub fn round_to_hundred(value: f64) -> f64 {
    (value / 100.0).round() * 100.0
}

pub async fn negotiate(
    loads: &dyn LoadStore,
    request: NegotiationRequest,
) -> Result<NegotiationResult, NegotiationError> {
    let load = loads
        .get_by_id(request.load_id)
        .await?
        .ok_or(NegotiationError::LoadNotFound(request.load_id))?;

    let new_rate = compute_next_rate(request.offered_rate, load.maximum_rate, request.counter_offer);
    tracing::debug!(
        load_id = load.load_id,
        offered_rate = request.offered_rate,
        counter_offer = request.counter_offer,
        new_rate,
        "computed next rate"
    );

    Ok(NegotiationResult { new_rate })
}
