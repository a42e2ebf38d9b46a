pub use super::events::Entity as Events;
pub use super::rsvps::Entity as Rsvps;
pub use super::sessions::Entity as Sessions;
pub use super::users::Entity as Users;
