//! Repositories (the only place that issues queries).

mod activity;
mod blocking;
mod buddy;
mod conversation;
mod event;
mod invitation;
mod trip;
mod user;
mod user_profile;

pub use activity::ActivityRepository;
pub use blocking::BlockingRepository;
pub use buddy::{BuddyRepository, canonical_pair};
pub use conversation::ConversationRepository;
pub use event::{EventRepository, SlotRelease};
pub use invitation::InvitationRepository;
pub use trip::TripRepository;
pub use user::UserRepository;
pub use user_profile::UserProfileRepository;

use sea_orm::sea_query::{Expr, IntoColumnRef, SimpleExpr};

/// Latitude/longitude rectangle used to prefilter proximity queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Latitude and longitude of the point the box was built around.
    pub center: (f64, f64),
    /// Southern edge in degrees.
    pub min_lat: f64,
    /// Northern edge in degrees.
    pub max_lat: f64,
    /// Western and eastern edges, or `None` when the box wraps the
    /// antimeridian or reaches a pole.
    pub lon_range: Option<(f64, f64)>,
}

impl GeoBounds {
    /// Squared equirectangular distance from `center`, in degrees.
    ///
    /// Orders rows roughly nearest first so a capped prefetch keeps the
    /// closest candidates. Exact distances are computed afterwards.
    pub(crate) fn nearest_first<C: IntoColumnRef + Copy>(&self, lat: C, lon: C) -> SimpleExpr {
        let (center_lat, center_lon) = self.center;
        let lon_scale = center_lat.to_radians().cos();
        let d_lat = Expr::col(lat).sub(center_lat);
        let d_lon = Expr::col(lon).sub(center_lon).mul(lon_scale);
        d_lat.clone().mul(d_lat).add(d_lon.clone().mul(d_lon))
    }
}
