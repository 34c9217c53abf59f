pub mod application;
pub mod location;
pub mod notification;
pub mod rating;
pub mod ride;
pub mod user;
