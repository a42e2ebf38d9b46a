pub mod event;
pub mod rsvp;
pub mod session;
pub mod user;
