pub mod auth;
pub mod comment;
pub mod group;
pub mod post;
