use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::models::profile::{Stats, GENDERS, RANKS};
use crate::validation::{camel_case, date_format, one_of, uuid_format, validated_date, ValidateBody};

fn gender_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, GENDERS)
}

fn rank_choice(value: &str) -> Result<(), ValidationError> {
    one_of(value, RANKS)
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateProfileRequest {
    #[validate(length(min = 3, message = "Must be at least 3 characters"))]
    pub fullname: String,
    #[validate(custom(function = "date_format"))]
    pub date_of_birth: String,
    #[validate(custom(function = "gender_choice"))]
    pub gender: String,
    #[validate(
        required(message = "Required"),
        range(exclusive_min = 0.0, message = "Must be a positive number")
    )]
    pub height: Option<f64>,
    #[validate(
        required(message = "Required"),
        range(exclusive_min = 0.0, message = "Must be a positive number")
    )]
    pub weight: Option<f64>,
    pub avatar: Option<String>,
}

impl ValidateBody for CreateProfileRequest {
    fn wire_name(field: &str) -> String {
        camel_case(field)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub fullname: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
    pub avatar: Option<String>,
}

impl CreateProfileRequest {
    pub fn parse(&self) -> Result<NewProfile, AppError> {
        self.check()?;
        Ok(NewProfile {
            fullname: self.fullname.trim().to_string(),
            date_of_birth: validated_date("dateOfBirth", &self.date_of_birth)?,
            gender: self.gender.clone(),
            height: self.height.unwrap_or_default(),
            weight: self.weight.unwrap_or_default(),
            avatar: self.avatar.clone().filter(|a| !a.trim().is_empty()),
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, message = "Must be at least 3 characters"))]
    pub fullname: Option<String>,
    #[serde(alias = "character")]
    #[validate(custom(function = "uuid_format"))]
    pub character_id: Option<String>,
    #[validate(custom(function = "date_format"))]
    pub date_of_birth: Option<String>,
    #[validate(custom(function = "gender_choice"))]
    pub gender: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Must be a positive number"))]
    pub height: Option<f64>,
    #[validate(range(exclusive_min = 0.0, message = "Must be a positive number"))]
    pub weight: Option<f64>,
    pub avatar: Option<String>,
    #[validate(range(min = 1, message = "Must be at least 1"))]
    pub level: Option<i32>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub xp: Option<i32>,
    pub stats: Option<Stats>,
    #[validate(custom(function = "rank_choice"))]
    pub rank: Option<String>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub streak: Option<i32>,
    #[validate(range(min = 0, message = "Must be at least 0"))]
    pub max_streak: Option<i32>,
}

impl ValidateBody for UpdateProfileRequest {
    fn wire_name(field: &str) -> String {
        camel_case(field)
    }
}

/// Parsed partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub fullname: Option<String>,
    pub character_id: Option<Uuid>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub avatar: Option<String>,
    pub level: Option<i32>,
    pub xp: Option<i32>,
    pub stats: Option<Stats>,
    pub rank: Option<String>,
    pub streak: Option<i32>,
    pub max_streak: Option<i32>,
}

impl UpdateProfileRequest {
    pub fn parse(&self) -> Result<ProfileChanges, AppError> {
        self.check()?;
        let character_id = match self.character_id.as_deref() {
            Some(raw) => Some(
                Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::BadRequest("Invalid character id".to_string()))?,
            ),
            None => None,
        };
        let date_of_birth = match self.date_of_birth.as_deref() {
            Some(raw) => Some(validated_date("dateOfBirth", raw)?),
            None => None,
        };

        Ok(ProfileChanges {
            fullname: self.fullname.as_deref().map(|n| n.trim().to_string()),
            character_id,
            date_of_birth,
            gender: self.gender.clone(),
            height: self.height,
            weight: self.weight,
            avatar: self.avatar.clone(),
            level: self.level,
            xp: self.xp,
            stats: self.stats,
            rank: self.rank.clone(),
            streak: self.streak,
            max_streak: self.max_streak,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_names(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(fields) => fields.into_iter().map(|f| f.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_create_profile_parses() {
        let req = CreateProfileRequest {
            fullname: " Ada Lovelace ".into(),
            date_of_birth: "1995-12-10".into(),
            gender: "FEMALE".into(),
            height: Some(165.0),
            weight: Some(55.5),
            avatar: Some(String::new()),
        };
        let profile = req.parse().unwrap();
        assert_eq!(profile.fullname, "Ada Lovelace");
        assert_eq!(
            profile.date_of_birth,
            NaiveDate::from_ymd_opt(1995, 12, 10).unwrap()
        );
        assert_eq!(profile.avatar, None);
    }

    #[test]
    fn test_create_profile_collects_all_errors() {
        let err = CreateProfileRequest::default().parse().unwrap_err();
        assert_eq!(
            field_names(err),
            ["dateOfBirth", "fullname", "gender", "height", "weight"]
        );
    }

    #[test]
    fn test_update_profile_is_partial() {
        let changes = UpdateProfileRequest {
            rank: Some("B".into()),
            streak: Some(4),
            ..Default::default()
        }
        .parse()
        .unwrap();
        assert_eq!(changes.rank.as_deref(), Some("B"));
        assert_eq!(changes.fullname, None);
    }

    #[test]
    fn test_update_profile_rejects_bad_values() {
        let err = UpdateProfileRequest {
            character_id: Some("not-a-uuid".into()),
            rank: Some("Z".into()),
            xp: Some(-5),
            ..Default::default()
        }
        .parse()
        .unwrap_err();
        assert_eq!(field_names(err), ["characterId", "rank", "xp"]);
    }

    #[test]
    fn test_update_rejects_non_positive_height() {
        let err = UpdateProfileRequest {
            height: Some(0.0),
            max_streak: Some(-1),
            ..Default::default()
        }
        .parse()
        .unwrap_err();
        assert_eq!(field_names(err), ["height", "maxStreak"]);
    }

    #[test]
    fn test_update_accepts_character_alias() {
        let id = Uuid::new_v4();
        let req: UpdateProfileRequest =
            serde_json::from_value(serde_json::json!({ "character": id.to_string() })).unwrap();
        assert_eq!(req.parse().unwrap().character_id, Some(id));
    }
}
