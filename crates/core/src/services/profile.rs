//! Profile service.
//!
//! Profiles are stored as one `user_profile` row plus one `user_tag` row per
//! tag; [`UserProfile`] is assembled from both with an exhaustive mapping.

use std::collections::{BTreeSet, HashMap};

use crate::services::matching::UserProfile;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tripmate_common::{AppError, AppResult, IdGenerator};
use tripmate_db::{
    entities::{
        user_profile,
        user_tag::{self, TagKind},
    },
    repositories::{UserProfileRepository, UserRepository},
};
use validator::Validate;

const MAX_TAGS_PER_KIND: usize = 32;
const MAX_TAG_LEN: usize = 64;

/// Input for replacing a profile.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(max = 128))]
    pub display_name: Option<String>,

    /// ISO 3166-1 alpha-2 code.
    pub nationality: Option<String>,

    #[validate(length(max = 2048))]
    pub bio: Option<String>,

    #[serde(default)]
    pub interests: Vec<String>,

    #[serde(default)]
    pub travel_styles: Vec<String>,

    /// ISO 639 codes (2 or 3 letters).
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Profile with its display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

impl UserProfile {
    /// Assemble a profile from its stored rows. Tags of other users are ignored.
    #[must_use]
    pub fn from_rows<'a>(
        user_id: &str,
        row: Option<&user_profile::Model>,
        tags: impl IntoIterator<Item = &'a user_tag::Model>,
    ) -> Self {
        let mut profile = Self {
            user_id: user_id.to_string(),
            nationality: row.and_then(|r| r.nationality.clone()),
            ..Self::default()
        };

        for tag in tags.into_iter().filter(|t| t.user_id == user_id) {
            let set = match tag.kind {
                TagKind::Interest => &mut profile.interests,
                TagKind::TravelStyle => &mut profile.travel_styles,
                TagKind::Language => &mut profile.languages,
            };
            set.insert(tag.tag.clone());
        }

        profile
    }
}

/// Load profiles for many users in two queries. Users without a profile row
/// get an empty profile.
pub async fn load_profiles(
    profile_repo: &UserProfileRepository,
    user_ids: &[String],
) -> AppResult<HashMap<String, UserProfile>> {
    let rows = profile_repo.find_by_user_ids(user_ids).await?;
    let tags = profile_repo.find_tags_for_users(user_ids).await?;

    let rows: HashMap<&str, &user_profile::Model> =
        rows.iter().map(|r| (r.user_id.as_str(), r)).collect();
    let mut tags_by_user: HashMap<&str, Vec<&user_tag::Model>> = HashMap::new();
    for tag in &tags {
        tags_by_user.entry(tag.user_id.as_str()).or_default().push(tag);
    }

    Ok(user_ids
        .iter()
        .map(|id| {
            let profile = UserProfile::from_rows(
                id,
                rows.get(id.as_str()).copied(),
                tags_by_user.get(id.as_str()).into_iter().flatten().copied(),
            );
            (id.clone(), profile)
        })
        .collect())
}

/// Trim, lower-case and de-duplicate tags, dropping empty ones.
fn normalize_tags(kind: &str, tags: &[String]) -> AppResult<BTreeSet<String>> {
    let set: BTreeSet<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    if set.len() > MAX_TAGS_PER_KIND {
        return Err(AppError::Validation(format!(
            "Too many {kind} (max {MAX_TAGS_PER_KIND})"
        )));
    }
    if let Some(long) = set.iter().find(|t| t.chars().count() > MAX_TAG_LEN) {
        return Err(AppError::Validation(format!("Tag too long: {long}")));
    }
    Ok(set)
}

fn normalize_languages(languages: &[String]) -> AppResult<BTreeSet<String>> {
    let set = normalize_tags("languages", languages)?;
    if let Some(bad) = set
        .iter()
        .find(|l| !(2..=3).contains(&l.len()) || !l.chars().all(|c| c.is_ascii_alphabetic()))
    {
        return Err(AppError::Validation(format!("Invalid language code: {bad}")));
    }
    Ok(set)
}

fn normalize_nationality(nationality: Option<&str>) -> AppResult<Option<String>> {
    match nationality.map(str::trim).filter(|n| !n.is_empty()) {
        None => Ok(None),
        Some(n) if n.len() == 2 && n.chars().all(|c| c.is_ascii_alphabetic()) => {
            Ok(Some(n.to_ascii_uppercase()))
        }
        Some(n) => Err(AppError::Validation(format!("Invalid nationality: {n}"))),
    }
}

/// Profile service for business logic.
#[derive(Clone)]
pub struct ProfileService {
    profile_repo: UserProfileRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(profile_repo: UserProfileRepository, user_repo: UserRepository) -> Self {
        Self {
            profile_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Replace a user's profile and all three tag sets.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<ProfileView> {
        input.validate()?;
        self.user_repo.get_by_id(user_id).await?;

        let nationality = normalize_nationality(input.nationality.as_deref())?;
        let interests = normalize_tags("interests", &input.interests)?;
        let travel_styles = normalize_tags("travel styles", &input.travel_styles)?;
        let languages = normalize_languages(&input.languages)?;

        let row = user_profile::ActiveModel {
            user_id: Set(user_id.to_string()),
            display_name: Set(input.display_name.clone()),
            nationality: Set(nationality.clone()),
            bio: Set(input.bio.clone()),
            updated_at: Set(chrono::Utc::now().into()),
        };

        let tags = [
            (TagKind::Interest, &interests),
            (TagKind::TravelStyle, &travel_styles),
            (TagKind::Language, &languages),
        ]
        .into_iter()
        .flat_map(|(kind, set)| set.iter().map(move |tag| (kind, tag)))
        .map(|(kind, tag)| user_tag::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            kind: Set(kind),
            tag: Set(tag.clone()),
        })
        .collect();

        let saved = self.profile_repo.replace(user_id, row, tags).await?;
        tracing::debug!(user_id, "Updated profile");

        Ok(ProfileView {
            profile: UserProfile {
                user_id: user_id.to_string(),
                nationality,
                interests,
                travel_styles,
                languages,
            },
            display_name: saved.display_name,
            bio: saved.bio,
        })
    }

    /// Get a user's profile (empty if never set).
    pub async fn get_profile(&self, user_id: &str) -> AppResult<ProfileView> {
        self.user_repo.get_by_id(user_id).await?;

        let row = self.profile_repo.find_by_user_id(user_id).await?;
        let tags = self.profile_repo.find_tags(user_id).await?;

        Ok(ProfileView {
            profile: UserProfile::from_rows(user_id, row.as_ref(), &tags),
            display_name: row.as_ref().and_then(|r| r.display_name.clone()),
            bio: row.and_then(|r| r.bio),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::user::{RegisterInput, UserService};
    use maplit::btreeset;
    use std::sync::Arc;
    use tripmate_db::test_utils::TestDatabase;

    async fn setup() -> (ProfileService, String) {
        let db = Arc::new(TestDatabase::in_memory().await.unwrap().conn);
        let users = UserService::new(UserRepository::new(Arc::clone(&db)));
        let user = users
            .register(RegisterInput {
                username: "alice".to_string(),
            })
            .await
            .unwrap();
        let service = ProfileService::new(
            UserProfileRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
        );
        (service, user.id)
    }

    #[test]
    fn test_from_rows_maps_every_kind() {
        let tag = |kind, tag: &str| user_tag::Model {
            id: tag.to_string(),
            user_id: "u1".to_string(),
            kind,
            tag: tag.to_string(),
        };
        let tags = vec![
            tag(TagKind::Interest, "food"),
            tag(TagKind::TravelStyle, "slow"),
            tag(TagKind::Language, "en"),
        ];

        let profile = UserProfile::from_rows("u1", None, &tags);

        assert_eq!(profile.interests, btreeset! {"food".to_string()});
        assert_eq!(profile.travel_styles, btreeset! {"slow".to_string()});
        assert_eq!(profile.languages, btreeset! {"en".to_string()});
        assert_eq!(profile.nationality, None);
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![" Hiking ".to_string(), "hiking".to_string(), String::new()];
        assert_eq!(
            normalize_tags("interests", &tags).unwrap(),
            btreeset! {"hiking".to_string()}
        );
    }

    #[test]
    fn test_normalize_languages_rejects_bad_codes() {
        assert!(normalize_languages(&["en".to_string(), "POR".to_string()]).is_ok());
        assert!(normalize_languages(&["english".to_string()]).is_err());
        assert!(normalize_languages(&["e1".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_update_then_get_profile() {
        let (service, user_id) = setup().await;

        let input = UpdateProfileInput {
            display_name: Some("Alice".to_string()),
            nationality: Some("pt".to_string()),
            interests: vec!["Food".to_string(), "hiking".to_string()],
            travel_styles: vec!["backpacking".to_string()],
            languages: vec!["EN".to_string()],
            ..Default::default()
        };
        service.update_profile(&user_id, input).await.unwrap();

        let view = service.get_profile(&user_id).await.unwrap();
        assert_eq!(view.profile.nationality.as_deref(), Some("PT"));
        assert_eq!(
            view.profile.interests,
            btreeset! {"food".to_string(), "hiking".to_string()}
        );
        assert_eq!(view.profile.languages, btreeset! {"en".to_string()});
        assert_eq!(view.display_name.as_deref(), Some("Alice"));

        // A second update replaces the tag sets entirely
        let input = UpdateProfileInput {
            interests: vec!["museums".to_string()],
            ..Default::default()
        };
        service.update_profile(&user_id, input).await.unwrap();

        let view = service.get_profile(&user_id).await.unwrap();
        assert_eq!(view.profile.interests, btreeset! {"museums".to_string()});
        assert!(view.profile.languages.is_empty());
        assert_eq!(view.profile.nationality, None);
    }

    #[tokio::test]
    async fn test_get_profile_unknown_user() {
        let (service, _) = setup().await;
        assert!(matches!(
            service.get_profile("ghost").await,
            Err(AppError::NotFound(_))
        ));
    }
}
