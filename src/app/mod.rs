pub mod auth;
pub mod comments;
pub mod content;
pub mod error;
pub mod media;
pub mod reactions;
pub mod social;
pub mod translation;
pub mod users;
