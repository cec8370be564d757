//! Trip service.

use chrono::{NaiveDate, Utc};
use sea_orm::Set;
use serde::Deserialize;
use tripmate_common::{AppError, AppResult, IdGenerator};
use tripmate_db::{
    entities::trip,
    repositories::{TripRepository, UserRepository},
};
use validator::Validate;

/// Input for creating a trip.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripInput {
    /// IATA city or airport code.
    #[validate(length(min = 3, max = 8))]
    pub destination_code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Trip service for business logic.
#[derive(Clone)]
pub struct TripService {
    trip_repo: TripRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl TripService {
    /// Create a new trip service.
    #[must_use]
    pub const fn new(trip_repo: TripRepository, user_repo: UserRepository) -> Self {
        Self {
            trip_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record a planned trip.
    pub async fn create_trip(
        &self,
        user_id: &str,
        input: CreateTripInput,
    ) -> AppResult<trip::Model> {
        input.validate()?;

        let code = input.destination_code.trim().to_ascii_uppercase();
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::Validation(format!(
                "Invalid destination code: {code}"
            )));
        }
        if input.start_date > input.end_date {
            return Err(AppError::Validation(
                "Trip must not end before it starts".to_string(),
            ));
        }

        self.user_repo.get_by_id(user_id).await?;

        let model = trip::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            destination_code: Set(code),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            created_at: Set(Utc::now().into()),
        };

        let trip = self.trip_repo.create(model).await?;
        tracing::debug!(
            trip_id = %trip.id,
            user_id,
            destination = %trip.destination_code,
            "Created trip"
        );
        Ok(trip)
    }

    /// Trips that have not ended yet, soonest first.
    pub async fn list_upcoming(&self, user_id: &str) -> AppResult<Vec<trip::Model>> {
        self.trip_repo
            .find_upcoming_by_user(user_id, Utc::now().date_naive())
            .await
    }

    /// Delete a trip (owner only).
    pub async fn delete_trip(&self, actor_id: &str, trip_id: &str) -> AppResult<()> {
        let trip = self
            .trip_repo
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Trip: {trip_id}")))?;

        if trip.user_id != actor_id {
            return Err(AppError::Forbidden(
                "Only the owner can delete a trip".to_string(),
            ));
        }

        self.trip_repo.delete(trip_id).await
    }
}

/// Whole days shared by two date ranges: `max(0, min(end) - max(start))`.
#[must_use]
pub fn overlap_days(
    start_a: NaiveDate,
    end_a: NaiveDate,
    start_b: NaiveDate,
    end_b: NaiveDate,
) -> i64 {
    let start = start_a.max(start_b);
    let end = end_a.min(end_b);
    (end - start).num_days().max(0)
}
