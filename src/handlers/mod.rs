pub mod admin;
pub mod comments;
pub mod interviews;
pub mod role_changes;
pub mod tracks;
pub mod users;
