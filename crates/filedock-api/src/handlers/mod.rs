pub mod admin;
pub mod files;
pub mod health;
pub mod users;
