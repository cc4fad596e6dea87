pub mod analytics;
pub mod category;
pub mod interview_query;
pub mod pagination;
pub mod status_sweep;
pub mod user_query;
