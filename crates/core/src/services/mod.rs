//! Business logic services.

#![allow(missing_docs)]

pub mod activity;
pub mod audience;
pub mod buddy;
pub mod candidates;
pub mod conversation;
pub mod event;
pub mod matching;
pub mod membership;
pub mod profile;
pub mod proximity;
pub mod trip;
pub mod user;

pub use activity::{ActivityService, CreateActivityInput};
pub use audience::{Audience, ViewerScope};
pub use buddy::BuddyService;
pub use candidates::{MatchSuggestion, SuggestionService, TripOverlap, merge_suggestions};
pub use conversation::{
    ConversationProvisioner, ConversationService, NoOpConversations, StoredConversations,
};
pub use event::{CreateEventInput, EventPhase, EventService, RsvpOutcome};
pub use matching::{MatchReason, MatchScore, MatchScorer, UserProfile};
pub use membership::CapacityEntity;
pub use profile::{ProfileService, ProfileView, UpdateProfileInput};
pub use proximity::{GeoPoint, Located, Nearby, NearbyQuery, distance_km, filter_by_radius};
pub use trip::{CreateTripInput, TripService};
pub use user::{RegisterInput, UserService};
