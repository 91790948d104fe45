use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{require_manager, AuthenticatedUser},
    error::{AppError, AppResult},
    models::{Building, NewVehicle, Permission, User, UserBuilding, Vehicle},
    policy,
    routes::visitors::load_settings,
    schema::{buildings, permissions, user_buildings, users, vehicles},
    state::AppState,
};

#[derive(Serialize)]
pub struct OwnerRoleFlags {
    pub owner: bool,
    pub tenant: bool,
}

#[derive(Serialize, Clone)]
pub struct OwnerUnit {
    pub block: String,
    pub level: String,
    pub unit: String,
}

/// One row of the staff fleet overview: vehicle plus everything the guardhouse
/// needs to know about its owner.
#[derive(Serialize)]
pub struct VehicleOverview {
    pub id: Uuid,
    pub owner_name: String,
    pub owner_contact: Option<String>,
    pub owner_permissions: Option<OwnerRoleFlags>,
    pub owner_buildings: Vec<OwnerUnit>,
    pub plate_number: String,
    pub owner_comment: Option<String>,
    pub approved: bool,
}

pub async fn list_vehicles(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> AppResult<Json<Vec<VehicleOverview>>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let rows: Vec<(Vehicle, User)> = vehicles::table
        .inner_join(users::table)
        .order(users::username.asc())
        .load(&mut conn)?;

    let owner_ids: Vec<Uuid> = rows.iter().map(|(vehicle, _)| vehicle.owner_id).collect();

    let permission_rows: Vec<Permission> = permissions::table
        .filter(permissions::user_id.eq_any(&owner_ids))
        .load(&mut conn)?;
    let permission_map: HashMap<Uuid, Permission> = permission_rows
        .into_iter()
        .map(|row| (row.user_id, row))
        .collect();

    let association_rows: Vec<(UserBuilding, Building)> = user_buildings::table
        .inner_join(buildings::table)
        .filter(user_buildings::user_id.eq_any(&owner_ids))
        .load(&mut conn)?;
    let mut unit_map: HashMap<Uuid, Vec<OwnerUnit>> = HashMap::new();
    for (assoc, building) in association_rows {
        unit_map.entry(assoc.user_id).or_default().push(OwnerUnit {
            block: building.block,
            level: building.level,
            unit: building.unit,
        });
    }

    let response = rows
        .into_iter()
        .map(|(vehicle, owner)| VehicleOverview {
            id: vehicle.id,
            owner_name: owner.username,
            owner_contact: owner.contact,
            owner_permissions: permission_map.get(&vehicle.owner_id).map(|p| OwnerRoleFlags {
                owner: p.owner,
                tenant: p.tenant,
            }),
            owner_buildings: unit_map.get(&vehicle.owner_id).cloned().unwrap_or_default(),
            plate_number: vehicle.plate_number,
            owner_comment: vehicle.owner_comment,
            approved: vehicle.approved,
        })
        .collect();

    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct VehicleImportRow {
    pub username: String,
    pub plate_number: String,
    pub approved: Option<bool>,
    pub owner_comment: Option<String>,
}

#[derive(Deserialize)]
pub struct VehiclesUploadRequest {
    pub vehicles: Vec<VehicleImportRow>,
}

#[derive(Serialize)]
pub struct VehicleImportSummary {
    pub created: usize,
    pub skipped: usize,
    pub rejected: Vec<String>,
}

pub async fn upload_vehicles(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<VehiclesUploadRequest>,
) -> AppResult<Json<VehicleImportSummary>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let settings = load_settings(&mut conn)?;

    let mut created = 0;
    let mut skipped = 0;
    let mut rejected = Vec::new();

    for row in payload.vehicles {
        let plate = row.plate_number.trim().to_uppercase();
        if plate.is_empty() {
            skipped += 1;
            continue;
        }

        let owner: Option<User> = users::table
            .filter(users::username.eq(row.username.trim()))
            .first(&mut conn)
            .optional()?;
        let owner = owner.ok_or_else(|| {
            AppError::new(
                StatusCode::NOT_FOUND,
                format!("owner with username \"{}\" not found", row.username),
            )
        })?;

        let exists: Option<Uuid> = vehicles::table
            .filter(vehicles::owner_id.eq(owner.id))
            .filter(vehicles::plate_number.eq(&plate))
            .select(vehicles::id)
            .first(&mut conn)
            .optional()?;
        if exists.is_some() {
            skipped += 1;
            continue;
        }

        let existing_count: i64 = vehicles::table
            .filter(vehicles::owner_id.eq(owner.id))
            .count()
            .get_result(&mut conn)?;
        if let Err(err) = policy::check_vehicle_quota(&settings, existing_count) {
            rejected.push(format!("{}: {}", plate, err));
            continue;
        }

        let new_vehicle = NewVehicle {
            id: Uuid::new_v4(),
            owner_id: owner.id,
            plate_number: plate,
            approved: row.approved.unwrap_or(false),
            owner_comment: row.owner_comment,
        };
        diesel::insert_into(vehicles::table)
            .values(&new_vehicle)
            .execute(&mut conn)?;
        created += 1;
    }

    info!(
        created,
        skipped,
        rejected = rejected.len(),
        imported_by = %caller.user_id,
        "vehicle import finished"
    );

    Ok(Json(VehicleImportSummary {
        created,
        skipped,
        rejected,
    }))
}

pub async fn approve_vehicle(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(vehicle_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let updated = diesel::update(vehicles::table.find(vehicle_id))
        .set(vehicles::approved.eq(true))
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(AppError::not_found());
    }

    info!(vehicle_id = %vehicle_id, approved_by = %caller.user_id, "vehicle registration approved");
    Ok(Json(json!({ "message": "vehicle registration approved" })))
}

pub async fn delete_vehicle(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(vehicle_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let deleted = diesel::delete(vehicles::table.find(vehicle_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    info!(vehicle_id = %vehicle_id, deleted_by = %caller.user_id, "vehicle registration deleted");
    Ok(Json(
        json!({ "message": "vehicle registration deleted successfully" }),
    ))
}
