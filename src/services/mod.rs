pub mod auth;
pub mod bootstrap_admin;
pub mod comment;
pub mod group;
pub mod post;
pub mod upload;
pub mod user;
