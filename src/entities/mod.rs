//! SeaORM entities for the durable side of the platform.

pub mod auth_token;
pub mod game_session;
pub mod quiz_template;
pub mod session_answer;
pub mod user;
