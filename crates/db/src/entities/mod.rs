//! Database entities.

#![allow(missing_docs)]

pub mod activity;
pub mod activity_participant;
pub mod buddy_connection;
pub mod conversation;
pub mod event;
pub mod event_attendee;
pub mod invitation;
pub mod shared;
pub mod trip;
pub mod user;
pub mod user_block;
pub mod user_profile;
pub mod user_tag;

pub use activity::Entity as Activity;
pub use activity_participant::Entity as ActivityParticipant;
pub use buddy_connection::Entity as BuddyConnection;
pub use conversation::Entity as Conversation;
pub use event::Entity as Event;
pub use event_attendee::Entity as EventAttendee;
pub use invitation::Entity as Invitation;
pub use trip::Entity as Trip;
pub use user::Entity as User;
pub use user_block::Entity as UserBlock;
pub use user_profile::Entity as UserProfile;
pub use user_tag::Entity as UserTag;
