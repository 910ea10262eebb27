use std::collections::HashMap;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::character::form::{CharacterForm, Upload, IMAGE_FIELDS};
use crate::character::queries::{
    delete_character, find_character, insert_character, list_characters, replace_character,
    CharacterImages,
};
use crate::errors::AppError;
use crate::media::{delete_quietly, MediaStore};
use crate::models::character::{Character, CharacterSummary};
use crate::state::AppState;
use crate::validation::AppPath;

const MEDIA_FOLDER: &str = "characters";

#[derive(Serialize)]
pub struct CharacterResponse {
    pub message: String,
    pub character: Character,
}

#[derive(Serialize)]
pub struct CharacterListResponse {
    pub characters: Vec<CharacterSummary>,
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub message: String,
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Character {id} not found"))
}

/// Uploads every provided slot in `IMAGE_FIELDS` order. If one fails, the
/// ones this call already stored are removed before returning the error.
async fn upload_images(
    media: &dyn MediaStore,
    files: &HashMap<String, Upload>,
) -> Result<Vec<(&'static str, String)>, AppError> {
    let mut stored = Vec::new();
    for slot in IMAGE_FIELDS {
        let Some(upload) = files.get(slot) else {
            continue;
        };
        let result = media
            .upload(
                MEDIA_FOLDER,
                &upload.file_name,
                &upload.content_type,
                upload.bytes.clone(),
            )
            .await;
        match result {
            Ok(url) => stored.push((slot, url)),
            Err(e) => {
                let urls: Vec<String> = stored.into_iter().map(|(_, url)| url).collect();
                delete_quietly(media, &urls).await;
                return Err(e.into());
            }
        }
    }
    Ok(stored)
}

fn urls_of(stored: &[(&'static str, String)]) -> Vec<String> {
    stored.iter().map(|(_, url)| url.clone()).collect()
}

/// GET /character
pub async fn handle_list_characters(
    State(state): State<AppState>,
) -> Result<Json<CharacterListResponse>, AppError> {
    let characters = list_characters(&state.db).await?;
    Ok(Json(CharacterListResponse { characters }))
}

/// GET /character/:id
pub async fn handle_get_character(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<CharacterResponse>, AppError> {
    let character = find_character(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(CharacterResponse {
        message: "Character fetched successfully".to_string(),
        character,
    }))
}

/// POST /character (multipart)
pub async fn handle_create_character(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CharacterResponse>), AppError> {
    let form = CharacterForm::read(multipart).await?;
    let input = form.input(true)?;

    let stored = upload_images(state.media.as_ref(), &form.files).await?;
    let mut images = CharacterImages {
        image: String::new(),
        full_image: String::new(),
        bg_image: String::new(),
        animated_image: String::new(),
    };
    for (slot, url) in &stored {
        if let Some(target) = images.slot_mut(slot) {
            *target = url.clone();
        }
    }

    let character = match insert_character(&state.db, &input, &images).await {
        Ok(character) => character,
        Err(e) => {
            delete_quietly(state.media.as_ref(), &urls_of(&stored)).await;
            return Err(e.into());
        }
    };
    info!(user_id = %ctx.user.id, character_id = %character.id, "Character created");
    Ok((
        StatusCode::CREATED,
        Json(CharacterResponse {
            message: "Character created successfully".to_string(),
            character,
        }),
    ))
}

/// PUT /character/:id (multipart)
///
/// Replaces the descriptive fields; artwork slots not present in the form
/// keep their current image.
pub async fn handle_replace_character(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    multipart: Multipart,
) -> Result<Json<CharacterResponse>, AppError> {
    let form = CharacterForm::read(multipart).await?;
    let input = form.input(false)?;
    let existing = find_character(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let stored = upload_images(state.media.as_ref(), &form.files).await?;
    let mut images = CharacterImages::of(&existing);
    let mut replaced = Vec::new();
    for (slot, url) in &stored {
        if let Some(target) = images.slot_mut(slot) {
            replaced.push(std::mem::replace(target, url.clone()));
        }
    }

    let updated = replace_character(&state.db, id, &input, &images).await;
    let character = match updated {
        Ok(Some(character)) => character,
        Ok(None) => {
            delete_quietly(state.media.as_ref(), &urls_of(&stored)).await;
            return Err(not_found(id));
        }
        Err(e) => {
            delete_quietly(state.media.as_ref(), &urls_of(&stored)).await;
            return Err(e.into());
        }
    };

    delete_quietly(state.media.as_ref(), &replaced).await;
    info!(user_id = %ctx.user.id, character_id = %id, replaced = replaced.len(), "Character updated");
    Ok(Json(CharacterResponse {
        message: "Character updated successfully".to_string(),
        character,
    }))
}

/// DELETE /character/:id
pub async fn handle_delete_character(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let character = find_character(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    if !delete_character(&state.db, id).await? {
        return Err(not_found(id));
    }

    let urls: Vec<String> = CharacterImages::of(&character)
        .urls()
        .iter()
        .filter(|url| !url.is_empty())
        .map(|url| url.to_string())
        .collect();
    delete_quietly(state.media.as_ref(), &urls).await;

    info!(user_id = %ctx.user.id, character_id = %id, "Character deleted");
    Ok(Json(DeletedResponse {
        message: "Character deleted successfully".to_string(),
    }))
}
