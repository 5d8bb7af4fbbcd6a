pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod professionals;
pub mod purchases;
pub mod ratings;
pub mod videos;
