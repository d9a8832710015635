pub mod file;
pub mod user;

pub use file::{FileCategory, FileRecord, NewFileRecord};
pub use user::{NewUser, Uploader, User};
