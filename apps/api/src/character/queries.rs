use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::character::form::CharacterInput;
use crate::models::character::{Character, CharacterSummary};

/// Public URLs for the four artwork slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterImages {
    pub image: String,
    pub full_image: String,
    pub bg_image: String,
    pub animated_image: String,
}

impl CharacterImages {
    pub fn of(character: &Character) -> Self {
        Self {
            image: character.image.clone(),
            full_image: character.full_image.clone(),
            bg_image: character.bg_image.clone(),
            animated_image: character.animated_image.clone(),
        }
    }

    pub fn urls(&self) -> [&str; 4] {
        [
            &self.image,
            &self.full_image,
            &self.bg_image,
            &self.animated_image,
        ]
    }

    /// Mutable slot by multipart field name.
    pub fn slot_mut(&mut self, field: &str) -> Option<&mut String> {
        match field {
            "image" => Some(&mut self.image),
            "fullImage" => Some(&mut self.full_image),
            "bgImage" => Some(&mut self.bg_image),
            "animatedImage" => Some(&mut self.animated_image),
            _ => None,
        }
    }
}

pub async fn list_characters(pool: &PgPool) -> Result<Vec<CharacterSummary>, sqlx::Error> {
    sqlx::query_as::<_, CharacterSummary>(
        r#"
        SELECT id, name, title, gender, element, personality, powers, image, full_image, bg_image
        FROM characters
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn find_character(pool: &PgPool, id: Uuid) -> Result<Option<Character>, sqlx::Error> {
    sqlx::query_as::<_, Character>("SELECT * FROM characters WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_character(
    pool: &PgPool,
    input: &CharacterInput,
    images: &CharacterImages,
) -> Result<Character, sqlx::Error> {
    sqlx::query_as::<_, Character>(
        r#"
        INSERT INTO characters
            (id, name, title, gender, element, description, personality, backstory,
             powers, stats_boost, image, full_image, bg_image, animated_image)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(&input.title)
    .bind(&input.gender)
    .bind(&input.element)
    .bind(&input.description)
    .bind(&input.personality)
    .bind(&input.backstory)
    .bind(&input.powers)
    .bind(Json(input.stats_boost))
    .bind(&images.image)
    .bind(&images.full_image)
    .bind(&images.bg_image)
    .bind(&images.animated_image)
    .fetch_one(pool)
    .await
}

/// Full replacement of the descriptive fields and artwork URLs.
pub async fn replace_character(
    pool: &PgPool,
    id: Uuid,
    input: &CharacterInput,
    images: &CharacterImages,
) -> Result<Option<Character>, sqlx::Error> {
    sqlx::query_as::<_, Character>(
        r#"
        UPDATE characters SET
            name           = $2,
            title          = $3,
            gender         = $4,
            element        = $5,
            description    = $6,
            personality    = $7,
            backstory      = $8,
            powers         = $9,
            stats_boost    = $10,
            image          = $11,
            full_image     = $12,
            bg_image       = $13,
            animated_image = $14,
            updated_at     = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.title)
    .bind(&input.gender)
    .bind(&input.element)
    .bind(&input.description)
    .bind(&input.personality)
    .bind(&input.backstory)
    .bind(&input.powers)
    .bind(Json(input.stats_boost))
    .bind(&images.image)
    .bind(&images.full_image)
    .bind(&images.bg_image)
    .bind(&images.animated_image)
    .fetch_optional(pool)
    .await
}

pub async fn delete_character(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM characters WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
