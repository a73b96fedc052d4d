/// Data models for identity and authentication
pub mod user;

pub use user::{NewUser, ProfileUpdate, User};
