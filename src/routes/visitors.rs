use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::{password, require_manager, AuthenticatedUser},
    error::{AppError, AppResult},
    models::{NewPermission, NewUser, NewVisitor, Settings, User, Visitor},
    policy,
    schema::{permissions, settings, users, visitors},
    state::AppState,
};

/// The settings singleton is seeded by the initial migration; a missing row
/// means the database was never migrated.
pub fn load_settings(conn: &mut PgConnection) -> AppResult<Settings> {
    let row = settings::table
        .order(settings::created_at.asc())
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "settings not found"))?;
    Ok(row)
}

#[derive(Serialize)]
pub struct VisitorResponse {
    pub id: Uuid,
    pub visitor_name: String,
    pub visitor_car: Option<String>,
    pub visit_start: NaiveDateTime,
    pub visit_end: NaiveDateTime,
}

pub async fn list_own_visitors(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> AppResult<Json<Vec<VisitorResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Visitor> = visitors::table
        .filter(visitors::owner_id.eq(caller.user_id))
        .order(visitors::visit_start.asc())
        .load(&mut conn)?;

    let visitor_ids: Vec<Uuid> = rows.iter().map(|row| row.visitor_id).collect();
    let names = load_usernames(&mut conn, &visitor_ids)?;

    let response = rows
        .into_iter()
        .map(|row| VisitorResponse {
            id: row.id,
            visitor_name: names.get(&row.visitor_id).cloned().unwrap_or_default(),
            visitor_car: row.visitor_car,
            visit_start: row.visit_start,
            visit_end: row.visit_end,
        })
        .collect();

    Ok(Json(response))
}

#[derive(Serialize)]
pub struct VisitorOverview {
    pub id: Uuid,
    pub owner_name: String,
    pub visitor_name: String,
    pub visitor_car: Option<String>,
    pub visit_start: NaiveDateTime,
    pub visit_end: NaiveDateTime,
}

pub async fn list_all_visitors(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> AppResult<Json<Vec<VisitorOverview>>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let rows: Vec<Visitor> = visitors::table
        .order(visitors::visit_start.asc())
        .load(&mut conn)?;

    let mut user_ids: Vec<Uuid> = Vec::with_capacity(rows.len() * 2);
    for row in &rows {
        user_ids.push(row.owner_id);
        user_ids.push(row.visitor_id);
    }
    let names = load_usernames(&mut conn, &user_ids)?;

    let response = rows
        .into_iter()
        .map(|row| VisitorOverview {
            id: row.id,
            owner_name: names.get(&row.owner_id).cloned().unwrap_or_default(),
            visitor_name: names.get(&row.visitor_id).cloned().unwrap_or_default(),
            visitor_car: row.visitor_car,
            visit_start: row.visit_start,
            visit_end: row.visit_end,
        })
        .collect();

    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct CreateVisitorRequest {
    pub visitor_name: String,
    pub visitor_car: Option<String>,
    pub visit_start: NaiveDateTime,
    /// Defaults to `visit_start` plus the configured `visit_hours`.
    pub visit_end: Option<NaiveDateTime>,
}

pub async fn create_visitor(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<CreateVisitorRequest>,
) -> AppResult<(StatusCode, Json<VisitorResponse>)> {
    let visitor_name = payload.visitor_name.trim().to_string();
    if visitor_name.is_empty() {
        return Err(AppError::bad_request("visitor name must not be empty"));
    }

    let mut conn = state.db()?;

    let policy_settings = load_settings(&mut conn)?;
    let visit_end = payload
        .visit_end
        .unwrap_or_else(|| policy::default_visit_end(&policy_settings, payload.visit_start));
    policy::validate_visit_window(
        &policy_settings,
        Utc::now().naive_utc(),
        payload.visit_start,
        visit_end,
    )
    .map_err(|err| AppError::bad_request(err.to_string()))?;

    // Unknown visitors get an account on the fly so the guardhouse can look
    // them up later; they start with the default credential.
    let visitor_user: Option<User> = users::table
        .filter(users::username.eq(&visitor_name))
        .first(&mut conn)
        .optional()?;
    let visitor_id = match visitor_user {
        Some(user) => user.id,
        None => {
            let new_user = NewUser {
                id: Uuid::new_v4(),
                username: visitor_name.clone(),
                password_hash: password::hash_password(&state.config.default_user_password)?,
                email: None,
                first_name: None,
                last_name: None,
                contact: None,
                address: None,
            };
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                diesel::insert_into(users::table)
                    .values(&new_user)
                    .execute(conn)?;
                diesel::insert_into(permissions::table)
                    .values(&NewPermission::defaults_for(new_user.id))
                    .execute(conn)?;
                Ok(())
            })?;
            info!(user_id = %new_user.id, username = %visitor_name, "visitor account auto-created");
            new_user.id
        }
    };

    let new_visitor = NewVisitor {
        id: Uuid::new_v4(),
        owner_id: caller.user_id,
        visitor_id,
        visitor_car: payload.visitor_car,
        visit_start: payload.visit_start,
        visit_end,
    };
    diesel::insert_into(visitors::table)
        .values(&new_visitor)
        .execute(&mut conn)?;

    let row: Visitor = visitors::table.find(new_visitor.id).first(&mut conn)?;
    info!(
        visitor_record = %row.id,
        owner_id = %caller.user_id,
        visit_start = %row.visit_start,
        visit_end = %row.visit_end,
        "visit registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(VisitorResponse {
            id: row.id,
            visitor_name,
            visitor_car: row.visitor_car,
            visit_start: row.visit_start,
            visit_end: row.visit_end,
        }),
    ))
}

#[derive(Deserialize)]
pub struct UpdateVisitorRequest {
    pub visitor_car: Option<String>,
    pub visit_start: NaiveDateTime,
    pub visit_end: NaiveDateTime,
}

pub async fn update_visitor(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(visitor_record_id): Path<Uuid>,
    Json(payload): Json<UpdateVisitorRequest>,
) -> AppResult<Json<VisitorResponse>> {
    let mut conn = state.db()?;

    // Owners may only touch their own registrations.
    let existing: Visitor = visitors::table
        .find(visitor_record_id)
        .filter(visitors::owner_id.eq(caller.user_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let policy_settings = load_settings(&mut conn)?;
    policy::validate_visit_window(
        &policy_settings,
        Utc::now().naive_utc(),
        payload.visit_start,
        payload.visit_end,
    )
    .map_err(|err| AppError::bad_request(err.to_string()))?;

    diesel::update(visitors::table.find(existing.id))
        .set((
            visitors::visitor_car.eq(payload.visitor_car),
            visitors::visit_start.eq(payload.visit_start),
            visitors::visit_end.eq(payload.visit_end),
        ))
        .execute(&mut conn)?;

    let row: Visitor = visitors::table.find(existing.id).first(&mut conn)?;
    let names = load_usernames(&mut conn, &[row.visitor_id])?;

    Ok(Json(VisitorResponse {
        id: row.id,
        visitor_name: names.get(&row.visitor_id).cloned().unwrap_or_default(),
        visitor_car: row.visitor_car,
        visit_start: row.visit_start,
        visit_end: row.visit_end,
    }))
}

#[derive(Serialize)]
pub struct VisitPolicyResponse {
    pub property_name: String,
    pub visit_days: i32,
    pub visit_hours: i32,
    pub visit_duration: i32,
    pub owner_car: i32,
}

impl From<Settings> for VisitPolicyResponse {
    fn from(value: Settings) -> Self {
        Self {
            property_name: value.property_name,
            visit_days: value.visit_days,
            visit_hours: value.visit_hours,
            visit_duration: value.visit_duration,
            owner_car: value.owner_car,
        }
    }
}

pub async fn get_visit_policy(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
) -> AppResult<Json<VisitPolicyResponse>> {
    let mut conn = state.db()?;
    let row = load_settings(&mut conn)?;
    Ok(Json(row.into()))
}

#[derive(Deserialize)]
pub struct UpdateVisitPolicyRequest {
    pub visit_days: i32,
    pub visit_hours: i32,
    pub visit_duration: i32,
    pub owner_car: i32,
}

pub async fn update_visit_policy(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<UpdateVisitPolicyRequest>,
) -> AppResult<Json<VisitPolicyResponse>> {
    if payload.visit_days < 1
        || payload.visit_hours < 1
        || payload.visit_duration < 1
        || payload.owner_car < 1
    {
        return Err(AppError::bad_request("policy values must be at least 1"));
    }

    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let row = load_settings(&mut conn)?;
    diesel::update(settings::table.find(row.id))
        .set((
            settings::visit_days.eq(payload.visit_days),
            settings::visit_hours.eq(payload.visit_hours),
            settings::visit_duration.eq(payload.visit_duration),
            settings::owner_car.eq(payload.owner_car),
        ))
        .execute(&mut conn)?;

    info!(
        updated_by = %caller.user_id,
        visit_days = payload.visit_days,
        visit_hours = payload.visit_hours,
        visit_duration = payload.visit_duration,
        owner_car = payload.owner_car,
        "visit policy updated"
    );

    let row = load_settings(&mut conn)?;
    Ok(Json(row.into()))
}

fn load_usernames(
    conn: &mut PgConnection,
    user_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, String>> {
    let rows: Vec<(Uuid, String)> = users::table
        .filter(users::id.eq_any(user_ids))
        .select((users::id, users::username))
        .load(conn)?;
    Ok(rows.into_iter().collect())
}
