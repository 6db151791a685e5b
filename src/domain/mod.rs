pub mod recipe;
pub mod report;
pub mod taxonomy;
pub mod user;
