use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use studionavi_common::api::{ApiEnvelope, AvailabilityData, AvailabilityMeta};
use studionavi_common::{ClockTime, Studio, StudioId};
use tracing::{debug, info};

use crate::{checker, db, search, ApiError, AppState};

pub async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

pub async fn search_studios(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Studio>>, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Ok(Json(vec![]));
    }

    let candidates = {
        let conn = state.conn();
        db::search_candidates(&conn, query)?
    };
    let results = search::rank(candidates, query);
    debug!(query, hits = results.len(), "studio search");
    Ok(Json(results))
}

pub async fn get_studio(
    State(state): State<AppState>,
    Path(id): Path<StudioId>,
) -> Result<Json<Studio>, ApiError> {
    let conn = state.conn();
    let studio = db::find_studio(&conn, id)?.ok_or(ApiError::StudioNotFound(id))?;
    Ok(Json(studio))
}

/// Parsed `date`, `start`, `end`, `duration` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AvailabilityQuery {
    date: NaiveDate,
    start: ClockTime,
    end: ClockTime,
    duration_hours: u32,
}

impl AvailabilityQuery {
    fn from_params(params: &HashMap<String, String>) -> Result<Self, ApiError> {
        let get = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .ok_or(ApiError::MissingParameter)
        };
        let (date, start, end, duration) = (get("date")?, get("start")?, get("end")?, get("duration")?);

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| ApiError::InvalidParameter(format!("date={}: {}", date, e)))?;
        let start: ClockTime = start
            .parse()
            .map_err(|e| ApiError::InvalidParameter(format!("start: {}", e)))?;
        let end = ClockTime::parse_end(end).map_err(|e| ApiError::InvalidParameter(format!("end: {}", e)))?;
        let duration_hours: u32 = duration
            .parse()
            .map_err(|_| ApiError::InvalidParameter(format!("duration={}", duration)))?;

        Ok(AvailabilityQuery {
            date,
            start,
            end,
            duration_hours,
        })
    }
}

pub async fn studio_availability(
    State(state): State<AppState>,
    Path(id): Path<StudioId>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiEnvelope<AvailabilityData>>, ApiError> {
    let conn = state.conn();

    let studio = db::find_studio(&conn, id)?.ok_or(ApiError::StudioNotFound(id))?;
    if !studio.has_availability {
        return Err(ApiError::NotConfigured);
    }

    let query = AvailabilityQuery::from_params(&params)?;
    let rooms = db::load_rooms_for_date(&conn, id, query.date)?;
    drop(conn);

    let ranges = checker::find_available_slots(&rooms, query.start, query.end, query.duration_hours)?;
    info!(
        studio_id = id,
        date = %query.date,
        rooms = rooms.len(),
        ranges = ranges.len(),
        "availability computed"
    );

    Ok(Json(ApiEnvelope::success(AvailabilityData {
        studio_id: id.to_string(),
        studio_name: studio.name,
        date: query.date.format("%Y-%m-%d").to_string(),
        available_ranges: ranges,
        meta: AvailabilityMeta::default(),
    })))
}
