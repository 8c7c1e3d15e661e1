pub mod aliases;
pub mod board;
pub mod odds_api;
pub mod sheets;
pub mod types;
