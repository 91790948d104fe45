use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use diesel::{prelude::*, PgConnection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    auth::{password, require_manager, AuthenticatedUser, AUTH_COOKIE_NAME},
    error::{AppError, AppResult},
    models::{Building, NewPermission, NewUser, Permission, User, UserBuilding},
    schema::{buildings, permissions, user_buildings, users},
    state::AppState,
};

#[derive(Deserialize, Default)]
pub struct PermissionFlagsRequest {
    #[serde(default)]
    pub visitor: bool,
    #[serde(default)]
    pub owner: bool,
    #[serde(default)]
    pub tenant: bool,
    #[serde(default)]
    pub sys_admin: bool,
    #[serde(default)]
    pub prop_manager: bool,
    #[serde(default)]
    pub site_manager: bool,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub account: bool,
    #[serde(default)]
    pub tech: bool,
    #[serde(default)]
    pub security: bool,
}

#[derive(Serialize)]
pub struct PermissionFlags {
    pub visitor: bool,
    pub owner: bool,
    pub tenant: bool,
    pub sys_admin: bool,
    pub prop_manager: bool,
    pub site_manager: bool,
    pub admin: bool,
    pub account: bool,
    pub tech: bool,
    pub security: bool,
}

impl From<Permission> for PermissionFlags {
    fn from(value: Permission) -> Self {
        Self {
            visitor: value.visitor,
            owner: value.owner,
            tenant: value.tenant,
            sys_admin: value.sys_admin,
            prop_manager: value.prop_manager,
            site_manager: value.site_manager,
            admin: value.admin,
            account: value.account,
            tech: value.tech,
            security: value.security,
        }
    }
}

#[derive(Serialize)]
pub struct BuildingSummary {
    pub id: Uuid,
    pub block: String,
    pub level: String,
    pub unit: String,
}

impl From<Building> for BuildingSummary {
    fn from(value: Building) -> Self {
        Self {
            id: value.id,
            block: value.block,
            level: value.level,
            unit: value.unit,
        }
    }
}

/// User as exposed over the API; the password hash never leaves the database
/// layer.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: NaiveDateTime,
    pub permissions: Option<PermissionFlags>,
    pub buildings: Vec<BuildingSummary>,
}

impl UserResponse {
    fn new(user: User, permissions: Option<Permission>, buildings: Vec<Building>) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            contact: user.contact,
            address: user.address,
            profile_picture: user.profile_picture,
            created_at: user.created_at,
            permissions: permissions.map(PermissionFlags::from),
            buildings: buildings.into_iter().map(BuildingSummary::from).collect(),
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub permissions: Option<PermissionFlagsRequest>,
}

pub async fn register(
    State(state): State<AppState>,
    caller: Option<AuthenticatedUser>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::bad_request("username must not be empty"));
    }
    if payload.password.is_empty() {
        return Err(AppError::bad_request("password must not be empty"));
    }

    let mut conn = state.db()?;

    let exists: Option<User> = users::table
        .filter(users::username.eq(&username))
        .first(&mut conn)
        .optional()?;
    if exists.is_some() {
        return Err(AppError::bad_request("username already taken"));
    }

    // Seeding permission flags at creation is a staff-only affordance.
    let flags = match payload.permissions {
        Some(flags) => {
            let caller = caller.ok_or_else(AppError::unauthorized)?;
            require_manager(&mut conn, caller.user_id)?;
            Some(flags)
        }
        None => None,
    };

    let password_hash = password::hash_password(&payload.password)?;
    let new_user = NewUser {
        id: Uuid::new_v4(),
        username: username.clone(),
        password_hash,
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        contact: payload.contact,
        address: payload.address,
    };

    // A user and its permissions row are created together or not at all.
    let permission = conn.transaction::<Permission, diesel::result::Error, _>(|conn| {
        diesel::insert_into(users::table)
            .values(&new_user)
            .execute(conn)?;

        let mut new_permission = NewPermission::defaults_for(new_user.id);
        if let Some(flags) = flags {
            new_permission.visitor = flags.visitor;
            new_permission.owner = flags.owner;
            new_permission.tenant = flags.tenant;
            new_permission.sys_admin = flags.sys_admin;
            new_permission.prop_manager = flags.prop_manager;
            new_permission.site_manager = flags.site_manager;
            new_permission.admin = flags.admin;
            new_permission.account = flags.account;
            new_permission.tech = flags.tech;
            new_permission.security = flags.security;
        }
        diesel::insert_into(permissions::table)
            .values(&new_permission)
            .execute(conn)?;

        permissions::table.find(new_permission.id).first(conn)
    })?;

    let user: User = users::table.find(new_user.id).first(&mut conn)?;
    info!(user_id = %user.id, username = %user.username, "user account created");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new(user, Some(permission), Vec::new())),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub id: Uuid,
    pub username: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<LoginResponse>)> {
    let mut conn = state.db()?;

    let user: User = users::table
        .filter(users::username.eq(&payload.username))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(StatusCode::NOT_FOUND, "user does not exist"))?;

    let valid = password::verify_password(&payload.password, &user.password_hash)
        .map_err(|_| AppError::bad_request("wrong username or password"))?;
    if !valid {
        return Err(AppError::bad_request("wrong username or password"));
    }

    let token = state
        .jwt
        .generate_token(user.id, &user.username)
        .map_err(AppError::from)?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_auth_cookie(&state, &token));

    info!(user_id = %user.id, username = %user.username, "login succeeded");

    Ok((
        headers,
        Json(LoginResponse {
            message: "login success".to_string(),
            id: user.id,
            username: user.username,
        }),
    ))
}

pub async fn logout(State(state): State<AppState>) -> (HeaderMap, Json<serde_json::Value>) {
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, build_clear_auth_cookie(&state));
    (headers, Json(json!({ "message": "logged out successfully" })))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub logged_in: bool,
    pub user: UserResponse,
}

pub async fn status(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> AppResult<Json<StatusResponse>> {
    let mut conn = state.db()?;
    let user: User = users::table.find(caller.user_id).first(&mut conn)?;
    let permission: Option<Permission> = permissions::table
        .filter(permissions::user_id.eq(user.id))
        .first(&mut conn)
        .optional()?;
    let buildings_list: Vec<Building> = user_buildings::table
        .inner_join(buildings::table)
        .filter(user_buildings::user_id.eq(user.id))
        .select(buildings::all_columns)
        .load(&mut conn)?;

    Ok(Json(StatusResponse {
        logged_in: true,
        user: UserResponse::new(user, permission, buildings_list),
    }))
}

pub async fn list_users(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
) -> AppResult<Json<Vec<UserResponse>>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let user_list: Vec<User> = users::table.order(users::username.asc()).load(&mut conn)?;

    let permission_rows: Vec<Permission> = permissions::table.load(&mut conn)?;
    let mut permission_map: HashMap<Uuid, Permission> = permission_rows
        .into_iter()
        .map(|row| (row.user_id, row))
        .collect();

    let association_rows: Vec<(UserBuilding, Building)> = user_buildings::table
        .inner_join(buildings::table)
        .load(&mut conn)?;
    let mut building_map: HashMap<Uuid, Vec<Building>> = HashMap::new();
    for (assoc, building) in association_rows {
        building_map.entry(assoc.user_id).or_default().push(building);
    }

    let response = user_list
        .into_iter()
        .map(|user| {
            let permission = permission_map.remove(&user.id);
            let buildings = building_map.remove(&user.id).unwrap_or_default();
            UserResponse::new(user, permission, buildings)
        })
        .collect();

    Ok(Json(response))
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = users)]
struct UserChangeset {
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    contact: Option<String>,
    address: Option<String>,
    profile_picture: Option<String>,
    password_hash: Option<String>,
}

impl UserChangeset {
    // An all-None changeset must not reach diesel; it refuses to build an
    // UPDATE with no assignments.
    fn has_changes(&self) -> bool {
        self.email.is_some()
            || self.first_name.is_some()
            || self.last_name.is_some()
            || self.contact.is_some()
            || self.address.is_some()
            || self.profile_picture.is_some()
            || self.password_hash.is_some()
    }
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub id: Uuid,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub password: Option<String>,
    pub permissions: Option<PermissionFlagsRequest>,
}

pub async fn update_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let existing: User = users::table
        .find(payload.id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let password_hash = match payload.password.as_deref() {
        Some(raw) if !raw.is_empty() => Some(password::hash_password(raw)?),
        _ => None,
    };

    let changeset = UserChangeset {
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        contact: payload.contact,
        address: payload.address,
        profile_picture: None,
        password_hash,
    };

    if changeset.has_changes() {
        diesel::update(users::table.find(existing.id))
            .set(&changeset)
            .execute(&mut conn)?;
    }

    if let Some(flags) = payload.permissions {
        diesel::update(permissions::table.filter(permissions::user_id.eq(existing.id)))
            .set((
                permissions::visitor.eq(flags.visitor),
                permissions::owner.eq(flags.owner),
                permissions::tenant.eq(flags.tenant),
                permissions::sys_admin.eq(flags.sys_admin),
                permissions::prop_manager.eq(flags.prop_manager),
                permissions::site_manager.eq(flags.site_manager),
                permissions::admin.eq(flags.admin),
                permissions::account.eq(flags.account),
                permissions::tech.eq(flags.tech),
                permissions::security.eq(flags.security),
            ))
            .execute(&mut conn)?;
    }

    info!(user_id = %existing.id, updated_by = %caller.user_id, "user account updated");

    load_user_response(&mut conn, existing.id).map(Json)
}

pub async fn update_profile(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<Json<UserResponse>> {
    let mut changeset = UserChangeset::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("profile_picture") => {
                let filename = field
                    .file_name()
                    .map(sanitize_filename)
                    .unwrap_or_else(|| "picture".to_string());
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read profile picture");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                if data.is_empty() {
                    return Err(AppError::bad_request("profile picture must not be empty"));
                }
                let key = format!("profile/{}-{}", Uuid::new_v4(), filename);
                state.storage.put_object(&key, data.to_vec()).await?;
                changeset.profile_picture = Some(key);
            }
            Some(other) => {
                let value = field.text().await.map_err(|err| {
                    AppError::bad_request(format!("invalid field value: {err}"))
                })?;
                match other {
                    "email" => changeset.email = Some(value),
                    "first_name" => changeset.first_name = Some(value),
                    "last_name" => changeset.last_name = Some(value),
                    "contact" => changeset.contact = Some(value),
                    "address" => changeset.address = Some(value),
                    _ => {}
                }
            }
            None => {}
        }
    }

    let mut conn = state.db()?;
    if changeset.has_changes() {
        diesel::update(users::table.find(caller.user_id))
            .set(&changeset)
            .execute(&mut conn)?;
    }

    info!(user_id = %caller.user_id, "profile updated");

    load_user_response(&mut conn, caller.user_id).map(Json)
}

pub async fn delete_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    // Permissions, associations, vehicles and visitor records cascade.
    let deleted = diesel::delete(users::table.find(user_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    info!(user_id = %user_id, deleted_by = %caller.user_id, "user account deleted");

    Ok(Json(json!({ "message": "user deleted successfully" })))
}

#[derive(Deserialize)]
pub struct UserImportRow {
    pub username: String,
    pub password: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
}

#[derive(Deserialize)]
pub struct UsersUploadRequest {
    pub users: Vec<UserImportRow>,
}

#[derive(Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub skipped: usize,
}

pub async fn upload_users(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<UsersUploadRequest>,
) -> AppResult<Json<ImportSummary>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let mut created = 0;
    let mut skipped = 0;

    for row in payload.users {
        let username = row.username.trim().to_string();
        if username.is_empty() {
            skipped += 1;
            continue;
        }

        let exists: Option<Uuid> = users::table
            .filter(users::username.eq(&username))
            .select(users::id)
            .first(&mut conn)
            .optional()?;
        if exists.is_some() {
            skipped += 1;
            continue;
        }

        let raw_password = row
            .password
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| state.config.default_user_password.clone());
        let new_user = NewUser {
            id: Uuid::new_v4(),
            username,
            password_hash: password::hash_password(&raw_password)?,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            contact: row.contact,
            address: row.address,
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
        created += 1;
    }

    info!(created, skipped, imported_by = %caller.user_id, "user import finished");

    Ok(Json(ImportSummary { created, skipped }))
}

fn load_user_response(conn: &mut PgConnection, user_id: Uuid) -> AppResult<UserResponse> {
    let user: User = users::table.find(user_id).first(conn)?;
    let permission: Option<Permission> = permissions::table
        .filter(permissions::user_id.eq(user_id))
        .first(conn)
        .optional()?;
    let buildings_list: Vec<Building> = user_buildings::table
        .inner_join(buildings::table)
        .filter(user_buildings::user_id.eq(user_id))
        .select(buildings::all_columns)
        .load(conn)?;
    Ok(UserResponse::new(user, permission, buildings_list))
}

fn sanitize_filename(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    name.chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => ch,
            _ => '_',
        })
        .collect()
}

fn build_auth_cookie(state: &AppState, token: &str) -> HeaderValue {
    let max_age = ChronoDuration::minutes(state.config.jwt_expiry_minutes).num_seconds();
    let expires_at = Utc::now() + ChronoDuration::minutes(state.config.jwt_expiry_minutes);

    let mut parts = vec![format!("{}={}", AUTH_COOKIE_NAME, token)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push(format!("Max-Age={}", max_age));
    parts.push(format!("Expires={}", expires_at.to_rfc2822()));
    if state.config.auth_cookie_secure {
        parts.push("Secure".into());
    }
    if let Some(domain) = &state.config.auth_cookie_domain {
        parts.push(format!("Domain={}", domain));
    }

    HeaderValue::from_str(&parts.join("; ")).expect("valid auth cookie")
}

fn build_clear_auth_cookie(state: &AppState) -> HeaderValue {
    let mut parts = vec![format!("{}=", AUTH_COOKIE_NAME)];
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Strict".into());
    parts.push("Max-Age=0".into());
    parts.push("Expires=Thu, 01 Jan 1970 00:00:00 GMT".into());
    if state.config.auth_cookie_secure {
        parts.push("Secure".into());
    }
    if let Some(domain) = &state.config.auth_cookie_domain {
        parts.push(format!("Domain={}", domain));
    }

    HeaderValue::from_str(&parts.join("; ")).expect("valid auth cookie")
}
