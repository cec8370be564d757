//! Buddy suggestions.
//!
//! Two pools feed the result: users with overlapping trips to the same
//! destination, and a capped sample of users with similar interests. Both
//! are scored with [`MatchScorer`] and merged per user.

use std::collections::{HashMap, HashSet};

use crate::services::{
    matching::{MatchScore, MatchScorer, UserProfile},
    profile::load_profiles,
    trip::overlap_days,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tripmate_common::{AppResult, config::CommunityConfig};
use tripmate_db::repositories::{
    BlockingRepository, BuddyRepository, TripRepository, UserProfileRepository,
};

/// Interest-pool candidates below this normalized score are dropped.
pub const MIN_INTEREST_SCORE: u8 = 30;

/// Two trips to the same destination that share days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripOverlap {
    pub destination_code: String,
    pub own_start_date: NaiveDate,
    pub own_end_date: NaiveDate,
    pub their_start_date: NaiveDate,
    pub their_end_date: NaiveDate,
    pub overlap_days: i64,
}

/// A suggested buddy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSuggestion {
    pub user_id: String,
    pub profile: UserProfile,
    pub score: MatchScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_overlap: Option<TripOverlap>,
}

impl MatchSuggestion {
    fn overlap_days(&self) -> i64 {
        self.trip_overlap.as_ref().map_or(0, |t| t.overlap_days)
    }
}

/// Merge suggestion pools, keeping one entry per user.
///
/// On collision the higher score wins; the trip overlap survives either way.
/// Output is ordered by normalized score, then overlap days, then user id.
#[must_use]
pub fn merge_suggestions(
    pools: impl IntoIterator<Item = MatchSuggestion>,
    limit: usize,
) -> Vec<MatchSuggestion> {
    let mut by_user: HashMap<String, MatchSuggestion> = HashMap::new();

    for suggestion in pools {
        match by_user.get_mut(&suggestion.user_id) {
            None => {
                by_user.insert(suggestion.user_id.clone(), suggestion);
            }
            Some(existing) => {
                let trip_overlap = existing
                    .trip_overlap
                    .take()
                    .into_iter()
                    .chain(suggestion.trip_overlap.clone())
                    .max_by_key(|t| t.overlap_days);
                if suggestion.score.raw > existing.score.raw {
                    *existing = suggestion;
                }
                existing.trip_overlap = trip_overlap;
            }
        }
    }

    let mut merged: Vec<_> = by_user.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .normalized
            .cmp(&a.score.normalized)
            .then_with(|| b.overlap_days().cmp(&a.overlap_days()))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    merged.truncate(limit);
    merged
}

/// Suggestion service.
#[derive(Clone)]
pub struct SuggestionService {
    profile_repo: UserProfileRepository,
    trip_repo: TripRepository,
    buddy_repo: BuddyRepository,
    blocking_repo: BlockingRepository,
    community: CommunityConfig,
}

impl SuggestionService {
    /// Create a new suggestion service.
    #[must_use]
    pub const fn new(
        profile_repo: UserProfileRepository,
        trip_repo: TripRepository,
        buddy_repo: BuddyRepository,
        blocking_repo: BlockingRepository,
        community: CommunityConfig,
    ) -> Self {
        Self {
            profile_repo,
            trip_repo,
            buddy_repo,
            blocking_repo,
            community,
        }
    }

    /// Ranked buddy suggestions for `user_id`.
    pub async fn suggest(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> AppResult<Vec<MatchSuggestion>> {
        let limit = self.community.suggestion_limit(limit);
        let today = Utc::now().date_naive();

        let (buddy_ids, blocked_ids) = futures::try_join!(
            self.buddy_repo.find_connected_ids(user_id),
            self.blocking_repo.find_blocked_either_direction(user_id),
        )?;
        let mut excluded: HashSet<String> = HashSet::new();
        excluded.insert(user_id.to_string());
        excluded.extend(buddy_ids);
        excluded.extend(blocked_ids);

        // Trip pool: best overlap per user
        let mut trip_matches: HashMap<String, TripOverlap> = HashMap::new();
        for own in self.trip_repo.find_upcoming_by_user(user_id, today).await? {
            let others = self
                .trip_repo
                .find_intersecting(&own.destination_code, own.start_date, own.end_date, user_id)
                .await?;

            for theirs in others {
                if excluded.contains(&theirs.user_id) {
                    continue;
                }
                let overlap = TripOverlap {
                    destination_code: own.destination_code.clone(),
                    own_start_date: own.start_date,
                    own_end_date: own.end_date,
                    their_start_date: theirs.start_date,
                    their_end_date: theirs.end_date,
                    overlap_days: overlap_days(
                        own.start_date,
                        own.end_date,
                        theirs.start_date,
                        theirs.end_date,
                    ),
                };
                trip_matches
                    .entry(theirs.user_id)
                    .and_modify(|best| {
                        if overlap.overlap_days > best.overlap_days {
                            *best = overlap.clone();
                        }
                    })
                    .or_insert(overlap);
            }
        }

        let own_profile = load_profiles(&self.profile_repo, &[user_id.to_string()])
            .await?
            .remove(user_id)
            .unwrap_or_else(|| UserProfile {
                user_id: user_id.to_string(),
                ..UserProfile::default()
            });

        // Interest pool: users not already picked up through trips
        let mut skip: Vec<String> = excluded.iter().cloned().collect();
        skip.extend(trip_matches.keys().cloned());
        let interests: Vec<String> = own_profile.interests.iter().cloned().collect();
        let interest_ids = self
            .profile_repo
            .find_users_by_shared_interests(&interests, &skip, self.community.suggestion_pool_size)
            .await?;

        let candidate_ids: Vec<String> = trip_matches
            .keys()
            .cloned()
            .chain(interest_ids.iter().cloned())
            .collect();
        let mut profiles = load_profiles(&self.profile_repo, &candidate_ids).await?;

        let trip_pool = trip_matches.into_iter().map(|(id, overlap)| {
            (id, Some(overlap))
        });
        let interest_pool = interest_ids.into_iter().map(|id| (id, None));

        let scored: Vec<MatchSuggestion> = trip_pool
            .chain(interest_pool)
            .filter_map(|(id, trip_overlap)| {
                let profile = profiles.remove(&id)?;
                let score = MatchScorer::score(&own_profile, &profile);
                if trip_overlap.is_none() && score.normalized < MIN_INTEREST_SCORE {
                    return None;
                }
                Some(MatchSuggestion {
                    user_id: id,
                    profile,
                    score,
                    trip_overlap,
                })
            })
            .collect();

        let suggestions = merge_suggestions(scored, limit);
        tracing::debug!(user_id, count = suggestions.len(), "Built buddy suggestions");
        Ok(suggestions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::{
        buddy::BuddyService,
        matching::MatchReason,
        profile::{ProfileService, UpdateProfileInput},
        trip::{CreateTripInput, TripService},
        user::{RegisterInput, UserService},
    };
    use chrono::Duration;
    use std::sync::Arc;
    use tripmate_db::{repositories::UserRepository, test_utils::TestDatabase};

    fn suggestion(user_id: &str, normalized: u8, overlap: Option<i64>) -> MatchSuggestion {
        MatchSuggestion {
            user_id: user_id.to_string(),
            profile: UserProfile {
                user_id: user_id.to_string(),
                ..UserProfile::default()
            },
            score: MatchScore {
                raw: f64::from(normalized) * 0.007,
                normalized,
                reasons: vec![],
            },
            trip_overlap: overlap.map(|days| TripOverlap {
                destination_code: "LIS".to_string(),
                own_start_date: NaiveDate::default(),
                own_end_date: NaiveDate::default(),
                their_start_date: NaiveDate::default(),
                their_end_date: NaiveDate::default(),
                overlap_days: days,
            }),
        }
    }

    #[test]
    fn test_merge_keeps_higher_score_and_trip() {
        let merged = merge_suggestions(
            vec![suggestion("a", 20, Some(4)), suggestion("a", 50, None)],
            10,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score.normalized, 50);
        assert_eq!(merged[0].trip_overlap.as_ref().unwrap().overlap_days, 4);
    }

    #[test]
    fn test_merge_order_and_limit() {
        let merged = merge_suggestions(
            vec![
                suggestion("c", 40, None),
                suggestion("b", 40, Some(3)),
                suggestion("a", 40, None),
                suggestion("d", 90, None),
            ],
            3,
        );
        let ids: Vec<_> = merged.iter().map(|s| s.user_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "b", "a"]);
    }

    struct Fixture {
        suggestions: SuggestionService,
        users: UserService,
        profiles: ProfileService,
        trips: TripService,
        buddies: BuddyService,
    }

    async fn setup() -> Fixture {
        let db = Arc::new(TestDatabase::in_memory().await.unwrap().conn);
        let user_repo = UserRepository::new(Arc::clone(&db));
        let profile_repo = UserProfileRepository::new(Arc::clone(&db));
        let trip_repo = TripRepository::new(Arc::clone(&db));
        let buddy_repo = BuddyRepository::new(Arc::clone(&db));
        let blocking_repo = BlockingRepository::new(Arc::clone(&db));

        Fixture {
            suggestions: SuggestionService::new(
                profile_repo.clone(),
                trip_repo.clone(),
                buddy_repo.clone(),
                blocking_repo.clone(),
                CommunityConfig::default(),
            ),
            users: UserService::new(user_repo.clone()),
            profiles: ProfileService::new(profile_repo, user_repo.clone()),
            trips: TripService::new(trip_repo, user_repo.clone()),
            buddies: BuddyService::new(buddy_repo, blocking_repo, user_repo),
        }
    }

    async fn register(f: &Fixture, name: &str, interests: &[&str]) -> String {
        let id = f
            .users
            .register(RegisterInput {
                username: name.to_string(),
            })
            .await
            .unwrap()
            .id;
        f.profiles
            .update_profile(
                &id,
                UpdateProfileInput {
                    interests: interests.iter().map(ToString::to_string).collect(),
                    ..UpdateProfileInput::default()
                },
            )
            .await
            .unwrap();
        id
    }

    async fn trip(f: &Fixture, user_id: &str, code: &str, from: i64, to: i64) {
        let today = Utc::now().date_naive();
        f.trips
            .create_trip(
                user_id,
                CreateTripInput {
                    destination_code: code.to_string(),
                    start_date: today + Duration::days(from),
                    end_date: today + Duration::days(to),
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_trip_overlap_is_suggested_regardless_of_score() {
        let f = setup().await;
        let me = register(&f, "me", &["hiking"]).await;
        let other = register(&f, "other", &["opera"]).await;
        let elsewhere = register(&f, "elsewhere", &["opera"]).await;

        trip(&f, &me, "lis", 10, 20).await;
        trip(&f, &other, "LIS", 15, 30).await;
        trip(&f, &elsewhere, "OPO", 10, 20).await;

        let result = f.suggestions.suggest(&me, None).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].user_id, other);
        let overlap = result[0].trip_overlap.as_ref().unwrap();
        assert_eq!(overlap.destination_code, "LIS");
        assert_eq!(overlap.overlap_days, 5);
        assert_eq!(result[0].score.normalized, 0);
    }

    #[tokio::test]
    async fn test_interest_pool_threshold() {
        let f = setup().await;
        let me = register(&f, "me", &["hiking", "food"]).await;
        // Full interest overlap: 0.25 raw, 36 normalized
        let close = register(&f, "close", &["hiking", "food"]).await;
        // Half overlap: 18 normalized, below the cut
        let _far = register(&f, "far", &["hiking", "opera"]).await;

        let result = f.suggestions.suggest(&me, None).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].user_id, close);
        assert_eq!(result[0].score.normalized, 36);
        assert_eq!(result[0].score.reasons, vec![MatchReason::SharedInterests]);
        assert!(result[0].trip_overlap.is_none());
    }

    #[tokio::test]
    async fn test_excludes_buddies_and_blocked_users() {
        let f = setup().await;
        let me = register(&f, "me", &["hiking"]).await;
        let buddy = register(&f, "buddy", &["hiking"]).await;
        let blocker = register(&f, "blocker", &["hiking"]).await;
        let stranger = register(&f, "stranger", &["hiking"]).await;

        let conn = f.buddies.send_request(&me, &buddy).await.unwrap();
        f.buddies.accept_request(&buddy, &conn.id).await.unwrap();
        f.buddies.block_user(&blocker, &me, None).await.unwrap();

        trip(&f, &me, "BKK", 1, 5).await;
        trip(&f, &blocker, "BKK", 1, 5).await;

        let result = f.suggestions.suggest(&me, None).await.unwrap();
        let ids: Vec<_> = result.iter().map(|s| s.user_id.clone()).collect();
        assert_eq!(ids, vec![stranger]);
    }

    #[tokio::test]
    async fn test_limit_is_applied() {
        let f = setup().await;
        let me = register(&f, "me", &["hiking"]).await;
        for name in ["u1", "u2", "u3"] {
            register(&f, name, &["hiking"]).await;
        }

        assert_eq!(f.suggestions.suggest(&me, Some(2)).await.unwrap().len(), 2);
        assert_eq!(f.suggestions.suggest(&me, None).await.unwrap().len(), 3);
    }
}
