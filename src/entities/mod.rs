pub mod prelude;

pub mod events;
pub mod rsvps;
pub mod sessions;
pub mod users;
