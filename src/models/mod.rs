pub mod comment;
pub mod interview;
pub mod role_change;
pub mod track;
pub mod user;
