pub mod chat;
pub mod credits;
pub mod resume;
