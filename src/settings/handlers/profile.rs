// src/settings/handlers/profile.rs

use axum::{
    extract::{Extension, Multipart},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::super::models::{AdminProfile, MAX_AVATAR_BYTES};
use super::super::services::{avatar_key, detect_image};
use crate::auth::AdminGate;
use crate::common::{ApiError, AppState};
use crate::services::identity::ProfileUpdate;
use crate::services::{DocumentData, FieldValue};

fn admin_doc_path(uid: &str) -> String {
    format!("admins/{}", uid)
}

/// Identity record overlaid with the `admins/{uid}` document. A failed
/// document read still returns the identity values.
async fn load_profile(state: &AppState, uid: &str) -> Result<AdminProfile, ApiError> {
    let record = state
        .identity
        .get_user(uid)
        .await
        .map_err(|e| ApiError::from_provider("Failed to load profile", e))?;

    let mut profile = AdminProfile {
        uid: record.uid,
        email: record.email,
        display_name: record.display_name,
        photo_url: record.photo_url,
        updated_at: None,
    };

    match state.store.get(&admin_doc_path(uid)).await {
        Ok(Some(doc)) => {
            let non_empty = |field: &str| {
                doc.get_str(field)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            if let Some(name) = non_empty("displayName") {
                profile.display_name = Some(name);
            }
            if let Some(photo) = non_empty("photoURL") {
                profile.photo_url = Some(photo);
            }
            profile.updated_at = doc.get("updatedAt").and_then(FieldValue::as_i64);
        }
        Ok(None) => {}
        Err(e) => warn!(uid = %uid, error = %e, "Failed to read admin profile document"),
    }

    Ok(profile)
}

/// GET /api/settings/profile
pub async fn get_profile(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
) -> Result<Json<AdminProfile>, ApiError> {
    Ok(Json(load_profile(&state, &admin.uid).await?))
}

struct ProfileForm {
    display_name: Option<String>,
    avatar: Option<(String, Bytes)>,
}

async fn read_form(mut multipart: Multipart) -> Result<ProfileForm, ApiError> {
    let mut form = ProfileForm {
        display_name: None,
        avatar: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("displayName") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest("Failed to read displayName".to_string()))?;
                form.display_name = Some(text);
            }
            Some("avatar") => {
                let file_name = field.file_name().unwrap_or("avatar").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::BadRequest("Failed to read file data".to_string()))?;
                if !data.is_empty() {
                    form.avatar = Some((file_name, data));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// PUT /api/settings/profile - multipart `displayName` and optional `avatar`
pub async fn update_profile(
    Extension(state): Extension<Arc<AppState>>,
    AdminGate(admin): AdminGate,
    multipart: Multipart,
) -> Result<Json<AdminProfile>, ApiError> {
    let form = read_form(multipart).await?;
    let current = load_profile(&state, &admin.uid).await?;
    let now_ms = Utc::now().timestamp_millis();

    let photo_url = match form.avatar {
        Some((file_name, data)) => {
            if data.len() > MAX_AVATAR_BYTES {
                return Err(ApiError::BadRequest(
                    "File size exceeds 5MB limit".to_string(),
                ));
            }
            let mime = detect_image(&data).ok_or_else(|| {
                ApiError::BadRequest(
                    "Invalid image type. Only JPEG, PNG, GIF, and WebP are supported".to_string(),
                )
            })?;

            let key = avatar_key(&admin.uid, now_ms, &file_name);
            let url = state
                .storage
                .upload(&key, data.to_vec(), mime)
                .await
                .map_err(|e| ApiError::from_storage("Failed to upload avatar", e))?;
            info!(uid = %admin.uid, key = %key, "Avatar uploaded");
            Some(url)
        }
        None => current.photo_url.clone(),
    };

    // An absent field keeps the current name. An empty one nulls the admins
    // doc entry but leaves the provider name alone.
    let display_name = match form.display_name {
        Some(name) => Some(name.trim().to_string()).filter(|n| !n.is_empty()),
        None => current.display_name.clone(),
    };

    let update = ProfileUpdate {
        display_name: display_name.clone(),
        photo_url: photo_url.clone(),
        ..ProfileUpdate::default()
    };
    if !update.is_empty() {
        state
            .identity
            .update_user(&admin.uid, update)
            .await
            .map_err(|e| ApiError::from_provider("Failed to update profile", e))?;
    }

    let mut data = DocumentData::new();
    data.insert(
        "displayName".to_string(),
        FieldValue::from(display_name.clone()),
    );
    data.insert("photoURL".to_string(), FieldValue::from(photo_url.clone()));
    data.insert("updatedAt".to_string(), FieldValue::Integer(now_ms));
    state
        .store
        .set(&admin_doc_path(&admin.uid), data, true)
        .await
        .map_err(|e| ApiError::from_store("Failed to save profile", e))?;

    info!(uid = %admin.uid, "Admin profile updated");

    Ok(Json(AdminProfile {
        uid: current.uid,
        email: current.email,
        display_name,
        photo_url,
        updated_at: Some(now_ms),
    }))
}
