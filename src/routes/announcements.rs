use std::io::Cursor;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use image::ImageFormat;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    auth::{require_manager, AuthenticatedUser},
    error::{AppError, AppResult},
    models::{Announcement, NewAnnouncement},
    schema::announcements,
    state::AppState,
};

/// Inline images and attachments are bounded to this box before storage.
const MAX_IMAGE_WIDTH: u32 = 1280;
const MAX_IMAGE_HEIGHT: u32 = 720;

#[derive(Serialize)]
pub struct AnnouncementResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub attachment: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<Announcement> for AnnouncementResponse {
    fn from(value: Announcement) -> Self {
        Self {
            id: value.id,
            title: value.title,
            content: value.content,
            attachment: value.attachment.map(|key| format!("/files/{key}")),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

pub async fn list_announcements(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
) -> AppResult<Json<Vec<AnnouncementResponse>>> {
    let mut conn = state.db()?;
    let rows: Vec<Announcement> = announcements::table
        .order(announcements::created_at.desc())
        .load(&mut conn)?;
    Ok(Json(
        rows.into_iter().map(AnnouncementResponse::from).collect(),
    ))
}

pub async fn get_announcement(
    State(state): State<AppState>,
    _caller: AuthenticatedUser,
    Path(announcement_id): Path<Uuid>,
) -> AppResult<Json<AnnouncementResponse>> {
    let mut conn = state.db()?;
    let row: Announcement = announcements::table.find(announcement_id).first(&mut conn)?;
    Ok(Json(row.into()))
}

struct AnnouncementForm {
    title: Option<String>,
    content: Option<String>,
    attachment_key: Option<String>,
}

async fn read_announcement_form(
    state: &AppState,
    multipart: &mut Multipart,
) -> AppResult<AnnouncementForm> {
    let mut form = AnnouncementForm {
        title: None,
        content: None,
        attachment_key: None,
    };

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("title") => {
                form.title = Some(field.text().await.map_err(|err| {
                    AppError::bad_request(format!("invalid title: {err}"))
                })?);
            }
            Some("content") => {
                form.content = Some(field.text().await.map_err(|err| {
                    AppError::bad_request(format!("invalid content: {err}"))
                })?);
            }
            Some("attachment") => {
                let filename = field
                    .file_name()
                    .map(sanitize_filename)
                    .unwrap_or_else(|| "attachment".to_string());
                let data = field.bytes().await.map_err(|err| {
                    error!(error = %err, "failed to read attachment bytes");
                    AppError::bad_request(format!("failed to read file bytes: {err}"))
                })?;
                if data.is_empty() {
                    continue;
                }
                let key = format!("attach/{}-{}", Uuid::new_v4(), filename);
                state.storage.put_object(&key, data.to_vec()).await?;
                form.attachment_key = Some(key);
            }
            _ => {}
        }
    }

    Ok(form)
}

pub async fn create_announcement(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<AnnouncementResponse>)> {
    {
        let mut conn = state.db()?;
        require_manager(&mut conn, caller.user_id)?;
    }

    let form = read_announcement_form(&state, &mut multipart).await?;
    let title = form
        .title
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("title must not be empty"))?;
    let content = form
        .content
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("content must not be empty"))?;

    let new_announcement = NewAnnouncement {
        id: Uuid::new_v4(),
        title,
        content,
        attachment: form.attachment_key,
    };

    let mut conn = state.db()?;
    diesel::insert_into(announcements::table)
        .values(&new_announcement)
        .execute(&mut conn)?;

    let row: Announcement = announcements::table
        .find(new_announcement.id)
        .first(&mut conn)?;
    info!(announcement_id = %row.id, title = %row.title, "announcement created");

    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_announcement(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(announcement_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<AnnouncementResponse>> {
    let existing: Announcement = {
        let mut conn = state.db()?;
        require_manager(&mut conn, caller.user_id)?;
        announcements::table.find(announcement_id).first(&mut conn)?
    };

    let form = read_announcement_form(&state, &mut multipart).await?;

    // The stored attachment is replaced only when a new file arrives.
    let replaced_attachment = form.attachment_key.is_some();

    let mut conn = state.db()?;
    diesel::update(announcements::table.find(announcement_id))
        .set((
            announcements::title.eq(form.title.unwrap_or(existing.title)),
            announcements::content.eq(form.content.unwrap_or(existing.content)),
            announcements::attachment
                .eq(form.attachment_key.or_else(|| existing.attachment.clone())),
        ))
        .execute(&mut conn)?;

    if replaced_attachment {
        if let Some(old_key) = existing.attachment {
            if let Err(err) = state.storage.delete_object(&old_key).await {
                error!(error = %err, key = %old_key, "failed to delete replaced attachment");
            }
        }
    }

    let row: Announcement = announcements::table.find(announcement_id).first(&mut conn)?;
    Ok(Json(row.into()))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Path(announcement_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let mut conn = state.db()?;
    require_manager(&mut conn, caller.user_id)?;

    let existing: Announcement = announcements::table
        .find(announcement_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    diesel::delete(announcements::table.find(announcement_id)).execute(&mut conn)?;

    if let Some(key) = existing.attachment {
        if let Err(err) = state.storage.delete_object(&key).await {
            error!(error = %err, key = %key, "failed to delete announcement attachment");
        }
    }

    info!(announcement_id = %announcement_id, deleted_by = %caller.user_id, "announcement deleted");
    Ok(Json(json!({ "message": "announcement deleted successfully" })))
}

pub async fn upload_image(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<Json<serde_json::Value>> {
    {
        let mut conn = state.db()?;
        require_manager(&mut conn, caller.user_id)?;
    }

    let mut image_bytes: Option<Vec<u8>> = None;
    let mut filename = "image".to_string();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        AppError::bad_request(format!("invalid multipart data: {err}"))
    })? {
        if field.name() == Some("image") {
            if let Some(name) = field.file_name() {
                filename = sanitize_filename(name);
            }
            let data = field.bytes().await.map_err(|err| {
                error!(error = %err, "failed to read image bytes");
                AppError::bad_request(format!("failed to read file bytes: {err}"))
            })?;
            image_bytes = Some(data.to_vec());
        }
    }

    let image_bytes =
        image_bytes.ok_or_else(|| AppError::bad_request("image field is required"))?;
    if image_bytes.is_empty() {
        return Err(AppError::bad_request("image must not be empty"));
    }

    let encoded = bound_image(&image_bytes)
        .map_err(|err| AppError::bad_request(format!("unsupported image: {err}")))?;

    let key = format!("attach/{}-{}", Uuid::new_v4(), filename);
    state.storage.put_object(&key, encoded).await?;

    info!(key = %key, uploaded_by = %caller.user_id, "announcement image stored");

    Ok(Json(json!({ "image_url": format!("/files/{key}") })))
}

/// Decodes, bounds to the configured box (aspect kept) and re-encodes in the
/// original format.
fn bound_image(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let format = image::guess_format(bytes)?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;

    let resized = if decoded.width() > MAX_IMAGE_WIDTH || decoded.height() > MAX_IMAGE_HEIGHT {
        decoded.resize(
            MAX_IMAGE_WIDTH,
            MAX_IMAGE_HEIGHT,
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        decoded
    };

    let out_format = match format {
        ImageFormat::Jpeg => ImageFormat::Jpeg,
        _ => ImageFormat::Png,
    };
    let mut out = Vec::new();
    resized.write_to(&mut Cursor::new(&mut out), out_format)?;
    Ok(out)
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
