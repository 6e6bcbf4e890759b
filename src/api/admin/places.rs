//! Mountains, trails and points of interest.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{AdminState, created, message, not_found_unless, one_of_or};
use crate::api::error::{
    ApiError, ConstraintExt, ResultExt, check_scale, optional_text, require_text,
};
use crate::db::{MountainInput, PoiInput, TrailInput};

const TRAIL_STATUSES: &[&str] = &["unknown", "open", "temporarily_closed", "closed"];

pub(super) fn routes() -> Router<AdminState> {
    Router::new()
        .route("/mountains", get(list_mountains).post(create_mountain))
        .route("/mountains/bulk-delete", post(bulk_delete_mountains))
        .route(
            "/mountains/{id}",
            get(get_mountain).put(update_mountain).delete(delete_mountain),
        )
        .route("/trails", get(list_trails).post(create_trail))
        .route(
            "/trails/{id}",
            get(get_trail).put(update_trail).delete(delete_trail),
        )
        .route("/pois", get(list_pois).post(create_poi))
        .route("/pois/{id}", get(get_poi).put(update_poi).delete(delete_poi))
}

// --- Mountains ---

#[derive(Deserialize)]
struct MountainRequest {
    name: Option<String>,
    summit_elevation_m: Option<i64>,
    administrative_location: Option<String>,
    summary: Option<String>,
    thumbnail_url: Option<String>,
    trail_variety_scale: Option<i64>,
}

impl MountainRequest {
    fn into_input(self) -> Result<MountainInput, ApiError> {
        let name = require_text(self.name.as_deref(), "Name")?;
        let summit_elevation_m = match self.summit_elevation_m {
            Some(v) if v > 0 => v,
            Some(_) => {
                return Err(ApiError::bad_request(
                    "Summit elevation must be greater than 0",
                ));
            }
            None => return Err(ApiError::bad_request("Summit elevation is required")),
        };
        Ok(MountainInput {
            name,
            summit_elevation_m,
            administrative_location: optional_text(self.administrative_location.as_deref()),
            summary: optional_text(self.summary.as_deref()),
            thumbnail_url: optional_text(self.thumbnail_url.as_deref()),
            trail_variety_scale: check_scale(
                self.trail_variety_scale,
                "Trail variety scale",
                0,
                10,
            )?,
        })
    }
}

#[derive(Deserialize)]
struct BulkDeleteRequest {
    ids: Option<Vec<i64>>,
}

async fn list_mountains(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let mountains = state
        .db
        .mountains()
        .list_summaries()
        .await
        .db_err("Failed to list mountains")?;
    Ok(Json(mountains))
}

async fn get_mountain(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let mountain = state
        .db
        .mountains()
        .get(id)
        .await
        .db_err("Failed to load mountain")?
        .ok_or_else(|| ApiError::not_found("Mountain not found"))?;
    Ok(Json(mountain))
}

async fn create_mountain(
    State(state): State<AdminState>,
    Json(payload): Json<MountainRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let id = state
        .db
        .mountains()
        .create(&input)
        .await
        .db_err("Failed to create mountain")?;
    info!(mountain_id = id, name = %input.name, "Mountain created");
    Ok(created("Mountain created", id))
}

async fn update_mountain(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(payload): Json<MountainRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let updated = state
        .db
        .mountains()
        .update(id, &input)
        .await
        .db_err("Failed to update mountain")?;
    not_found_unless(updated, "Mountain")?;
    Ok(message("Mountain updated"))
}

async fn delete_mountain(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .mountains()
        .delete(id)
        .await
        .delete_err(
            "Failed to delete mountain",
            "Mountain still has trails. Delete them first.",
        )?;
    not_found_unless(deleted, "Mountain")?;
    Ok(message("Mountain deleted"))
}

async fn bulk_delete_mountains(
    State(state): State<AdminState>,
    Json(payload): Json<BulkDeleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = payload
        .ids
        .filter(|ids| !ids.is_empty())
        .ok_or_else(|| ApiError::bad_request("ids must be a non-empty list"))?;

    let deleted = state
        .db
        .mountains()
        .delete_many(&ids)
        .await
        .delete_err(
            "Failed to delete mountains",
            "Some mountains still have trails. Nothing was deleted.",
        )?;

    info!(requested = ids.len(), deleted, "Mountains bulk deleted");
    Ok(Json(json!({ "message": "Mountains deleted", "deleted": deleted })))
}

// --- Trails ---

#[derive(Deserialize)]
struct TrailRequest {
    mountain_id: Option<i64>,
    name: Option<String>,
    entrance_location: Option<String>,
    difficulty_scale: Option<i64>,
    safety_scale: Option<i64>,
    facility_quality_scale: Option<i64>,
    campsite_quality_scale: Option<i64>,
    scenery_scale: Option<i64>,
    estimated_hours: Option<f64>,
    description: Option<String>,
    status: Option<String>,
}

impl TrailRequest {
    fn into_input(self) -> Result<TrailInput, ApiError> {
        let mountain_id = self
            .mountain_id
            .ok_or_else(|| ApiError::bad_request("Mountain ID is required"))?;
        let name = require_text(self.name.as_deref(), "Name")?;
        if self.estimated_hours.is_some_and(|h| !h.is_finite() || h < 0.0) {
            return Err(ApiError::bad_request(
                "Estimated hours must be 0 or greater",
            ));
        }
        Ok(TrailInput {
            mountain_id,
            name,
            entrance_location: optional_text(self.entrance_location.as_deref()),
            difficulty_scale: check_scale(self.difficulty_scale, "Difficulty scale", 1, 10)?,
            safety_scale: check_scale(self.safety_scale, "Safety scale", 1, 10)?,
            facility_quality_scale: check_scale(
                self.facility_quality_scale,
                "Facility quality scale",
                1,
                10,
            )?,
            campsite_quality_scale: check_scale(
                self.campsite_quality_scale,
                "Campsite quality scale",
                1,
                10,
            )?,
            scenery_scale: check_scale(self.scenery_scale, "Scenery scale", 1, 10)?,
            estimated_hours: self.estimated_hours,
            description: optional_text(self.description.as_deref()),
            status: one_of_or(self.status.as_deref(), "unknown", TRAIL_STATUSES, "status")?,
        })
    }
}

async fn list_trails(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let trails = state.db.trails().list().await.db_err("Failed to list trails")?;
    Ok(Json(trails))
}

async fn get_trail(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let trail = state
        .db
        .trails()
        .get(id)
        .await
        .db_err("Failed to load trail")?
        .ok_or_else(|| ApiError::not_found("Trail not found"))?;
    Ok(Json(trail))
}

async fn create_trail(
    State(state): State<AdminState>,
    Json(payload): Json<TrailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let id = state.db.trails().create(&input).await.write_err(
        "Failed to create trail",
        "Trail already exists",
        "Mountain does not exist",
    )?;
    info!(trail_id = id, mountain_id = input.mountain_id, "Trail created");
    Ok(created("Trail created", id))
}

async fn update_trail(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(payload): Json<TrailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let updated = state.db.trails().update(id, &input).await.write_err(
        "Failed to update trail",
        "Trail already exists",
        "Mountain does not exist",
    )?;
    not_found_unless(updated, "Trail")?;
    Ok(message("Trail updated"))
}

async fn delete_trail(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .trails()
        .delete(id)
        .await
        .delete_err("Failed to delete trail", "Trail is still in use")?;
    not_found_unless(deleted, "Trail")?;
    Ok(message("Trail deleted"))
}

// --- Points of interest ---

/// Parse `"lat,lon"` into a coordinate pair within valid ranges.
fn parse_coordinates(value: &str) -> Result<(f64, f64), ApiError> {
    let invalid = || ApiError::bad_request("Coordinates must be given as \"latitude,longitude\"");
    let (lat, lon) = value.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::bad_request("Coordinates are out of range"));
    }
    Ok((lat, lon))
}

#[derive(Deserialize)]
struct PoiRequest {
    trail_id: Option<i64>,
    name: Option<String>,
    kind: Option<String>,
    coordinates: Option<String>,
    description: Option<String>,
    #[serde(default)]
    water_available: bool,
    tent_capacity: Option<i64>,
}

impl PoiRequest {
    fn into_input(self) -> Result<PoiInput, ApiError> {
        let name = require_text(self.name.as_deref(), "Name")?;
        let kind = require_text(self.kind.as_deref(), "Kind")?;
        let (latitude, longitude) = match optional_text(self.coordinates.as_deref()) {
            Some(coords) => {
                let (lat, lon) = parse_coordinates(&coords)?;
                (Some(lat), Some(lon))
            }
            None => (None, None),
        };
        if self.tent_capacity.is_some_and(|c| c < 0) {
            return Err(ApiError::bad_request("Tent capacity must be 0 or greater"));
        }
        Ok(PoiInput {
            trail_id: self.trail_id,
            name,
            kind,
            latitude,
            longitude,
            description: optional_text(self.description.as_deref()),
            water_available: self.water_available,
            tent_capacity: self.tent_capacity,
        })
    }
}

async fn list_pois(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let pois = state
        .db
        .pois()
        .list()
        .await
        .db_err("Failed to list points of interest")?;
    Ok(Json(pois))
}

async fn get_poi(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let poi = state
        .db
        .pois()
        .get(id)
        .await
        .db_err("Failed to load point of interest")?
        .ok_or_else(|| ApiError::not_found("Point of interest not found"))?;
    Ok(Json(poi))
}

async fn create_poi(
    State(state): State<AdminState>,
    Json(payload): Json<PoiRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let id = state.db.pois().create(&input).await.write_err(
        "Failed to create point of interest",
        "Point of interest already exists",
        "Trail does not exist",
    )?;
    Ok(created("Point of interest created", id))
}

async fn update_poi(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
    Json(payload): Json<PoiRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = payload.into_input()?;
    let updated = state.db.pois().update(id, &input).await.write_err(
        "Failed to update point of interest",
        "Point of interest already exists",
        "Trail does not exist",
    )?;
    not_found_unless(updated, "Point of interest")?;
    Ok(message("Point of interest updated"))
}

async fn delete_poi(
    State(state): State<AdminState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .pois()
        .delete(id)
        .await
        .db_err("Failed to delete point of interest")?;
    not_found_unless(deleted, "Point of interest")?;
    Ok(message("Point of interest deleted"))
}
