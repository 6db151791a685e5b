pub mod auth;
pub mod comments;
pub mod recipes;
pub mod reports;
pub mod social;
pub mod taxonomy;
pub mod users;
