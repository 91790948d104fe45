use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{require_manager, AuthenticatedUser},
    error::{AppError, AppResult},
    models::{Building, NewBuilding, NewUserBuilding, UserBuilding},
    routes::visitors::load_settings,
    schema::{buildings, settings, user_buildings},
    state::AppState,
};

use super::users::ImportSummary;

#[derive(Serialize)]
pub struct BuildingResponse {
    pub id: Uuid,
    pub block: String,
    pub level: String,
    pub unit: String,
    pub area: Option<String>,
    pub share_unit: Option<String>,
    pub created_at: NaiveDateTime,
}

impl From<Building> for BuildingResponse {
    fn from(value: Building) -> Self {
        Self {
            id: value.id,
            block: value.block,
            level: value.level,
            unit: value.unit,
            area: value.area,
            share_unit: value.share_unit,
            created_at: value.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct BuildingRequest {
    pub block: String,
    pub level: String,
    pub unit: String,
    pub area: Option<String>,
    pub share_unit: Option<String>,
}

pub async fn create_building(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<BuildingRequest>,
) -> AppResult<Json<BuildingResponse>> {
    validate_unit_fields(&payload)?;

    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let new_building = NewBuilding {
        id: Uuid::new_v4(),
        block: payload.block.trim().to_string(),
        level: payload.level.trim().to_string(),
        unit: payload.unit.trim().to_string(),
        area: payload.area,
        share_unit: payload.share_unit,
    };

    diesel::insert_into(buildings::table)
        .values(&new_building)
        .execute(&mut conn)?;

    let building: Building = buildings::table.find(new_building.id).first(&mut conn)?;
    info!(building_id = %building.id, block = %building.block, unit = %building.unit, "unit created");
    Ok(Json(building.into()))
}

pub async fn list_buildings(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
) -> AppResult<Json<Vec<BuildingResponse>>> {
    let mut conn = state.db()?;
    let rows: Vec<Building> = buildings::table
        .order((
            buildings::block.asc(),
            buildings::level.asc(),
            buildings::unit.asc(),
        ))
        .load(&mut conn)?;
    Ok(Json(rows.into_iter().map(BuildingResponse::from).collect()))
}

pub async fn get_building(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
    Path(building_id): Path<Uuid>,
) -> AppResult<Json<BuildingResponse>> {
    let mut conn = state.db()?;
    let building: Building = buildings::table.find(building_id).first(&mut conn)?;
    Ok(Json(building.into()))
}

pub async fn update_building(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(building_id): Path<Uuid>,
    Json(payload): Json<BuildingRequest>,
) -> AppResult<Json<BuildingResponse>> {
    validate_unit_fields(&payload)?;

    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let updated = diesel::update(buildings::table.find(building_id))
        .set((
            buildings::block.eq(payload.block.trim()),
            buildings::level.eq(payload.level.trim()),
            buildings::unit.eq(payload.unit.trim()),
            buildings::area.eq(payload.area),
            buildings::share_unit.eq(payload.share_unit),
        ))
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(AppError::not_found());
    }

    let building: Building = buildings::table.find(building_id).first(&mut conn)?;
    Ok(Json(building.into()))
}

pub async fn delete_building(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(building_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let deleted = diesel::delete(buildings::table.find(building_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    info!(building_id = %building_id, deleted_by = %caller.user_id, "unit deleted");
    Ok(Json(json!({ "message": "building deleted successfully" })))
}

#[derive(Deserialize)]
pub struct AssociationRequest {
    pub user_id: Uuid,
    pub building_id: Uuid,
}

#[derive(Serialize)]
pub struct AssociationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub building_id: Uuid,
    pub created_at: NaiveDateTime,
}

impl From<UserBuilding> for AssociationResponse {
    fn from(value: UserBuilding) -> Self {
        Self {
            id: value.id,
            user_id: value.user_id,
            building_id: value.building_id,
            created_at: value.created_at,
        }
    }
}

pub async fn create_association(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<AssociationRequest>,
) -> AppResult<Json<AssociationResponse>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let new_association = NewUserBuilding {
        id: Uuid::new_v4(),
        user_id: payload.user_id,
        building_id: payload.building_id,
    };

    match diesel::insert_into(user_buildings::table)
        .values(&new_association)
        .execute(&mut conn)
    {
        Ok(_) => {}
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::bad_request(
                "user is already associated with this building",
            ));
        }
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::ForeignKeyViolation,
            _,
        )) => {
            return Err(AppError::bad_request("unknown user or building"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    let association: UserBuilding = user_buildings::table
        .find(new_association.id)
        .first(&mut conn)?;
    info!(
        association_id = %association.id,
        user_id = %association.user_id,
        building_id = %association.building_id,
        "user-building association created"
    );
    Ok(Json(association.into()))
}

pub async fn list_associations(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> AppResult<Json<Vec<AssociationResponse>>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let rows: Vec<UserBuilding> = user_buildings::table.load(&mut conn)?;
    Ok(Json(
        rows.into_iter().map(AssociationResponse::from).collect(),
    ))
}

pub async fn get_association(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(association_id): Path<Uuid>,
) -> AppResult<Json<AssociationResponse>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let association: UserBuilding = user_buildings::table.find(association_id).first(&mut conn)?;
    Ok(Json(association.into()))
}

pub async fn update_association(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(association_id): Path<Uuid>,
    Json(payload): Json<AssociationRequest>,
) -> AppResult<Json<AssociationResponse>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let updated = diesel::update(user_buildings::table.find(association_id))
        .set((
            user_buildings::user_id.eq(payload.user_id),
            user_buildings::building_id.eq(payload.building_id),
        ))
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(AppError::not_found());
    }

    let association: UserBuilding = user_buildings::table.find(association_id).first(&mut conn)?;
    Ok(Json(association.into()))
}

pub async fn delete_association(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(association_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let deleted =
        diesel::delete(user_buildings::table.find(association_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    Ok(Json(json!({ "message": "association deleted successfully" })))
}

#[derive(Deserialize)]
pub struct BuildingsUploadRequest {
    pub builds: Vec<BuildingRequest>,
}

pub async fn upload_buildings(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<BuildingsUploadRequest>,
) -> AppResult<Json<ImportSummary>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let mut created = 0;
    let mut skipped = 0;

    for row in payload.builds {
        if row.block.trim().is_empty() || row.level.trim().is_empty() || row.unit.trim().is_empty()
        {
            skipped += 1;
            continue;
        }

        let exists: Option<Uuid> = buildings::table
            .filter(buildings::block.eq(row.block.trim()))
            .filter(buildings::level.eq(row.level.trim()))
            .filter(buildings::unit.eq(row.unit.trim()))
            .select(buildings::id)
            .first(&mut conn)
            .optional()?;
        if exists.is_some() {
            skipped += 1;
            continue;
        }

        let new_building = NewBuilding {
            id: Uuid::new_v4(),
            block: row.block.trim().to_string(),
            level: row.level.trim().to_string(),
            unit: row.unit.trim().to_string(),
            area: row.area,
            share_unit: row.share_unit,
        };
        diesel::insert_into(buildings::table)
            .values(&new_building)
            .execute(&mut conn)?;
        created += 1;
    }

    info!(created, skipped, imported_by = %caller.user_id, "unit import finished");

    Ok(Json(ImportSummary { created, skipped }))
}

#[derive(Serialize)]
pub struct PropertySettingsResponse {
    pub property_name: String,
    pub visit_days: i32,
    pub visit_hours: i32,
    pub visit_duration: i32,
    pub owner_car: i32,
}

pub async fn get_property_settings(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
) -> AppResult<Json<PropertySettingsResponse>> {
    let mut conn = state.db()?;
    let row = load_settings(&mut conn)?;
    Ok(Json(PropertySettingsResponse {
        property_name: row.property_name,
        visit_days: row.visit_days,
        visit_hours: row.visit_hours,
        visit_duration: row.visit_duration,
        owner_car: row.owner_car,
    }))
}

#[derive(Deserialize)]
pub struct PropertyNameRequest {
    pub property_name: String,
}

pub async fn update_property_settings(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<PropertyNameRequest>,
) -> AppResult<Json<PropertySettingsResponse>> {
    let name = payload.property_name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("property name must not be empty"));
    }

    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let row = load_settings(&mut conn)?;
    diesel::update(settings::table.find(row.id))
        .set(settings::property_name.eq(name))
        .execute(&mut conn)?;

    info!(updated_by = %caller.user_id, property_name = %name, "property name updated");

    let row = load_settings(&mut conn)?;
    Ok(Json(PropertySettingsResponse {
        property_name: row.property_name,
        visit_days: row.visit_days,
        visit_hours: row.visit_hours,
        visit_duration: row.visit_duration,
        owner_car: row.owner_car,
    }))
}

fn validate_unit_fields(payload: &BuildingRequest) -> AppResult<()> {
    if payload.block.trim().is_empty()
        || payload.level.trim().is_empty()
        || payload.unit.trim().is_empty()
    {
        return Err(AppError::bad_request(
            "block, level and unit must not be empty",
        ));
    }
    Ok(())
}
