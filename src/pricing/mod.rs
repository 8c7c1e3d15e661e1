pub mod consensus;
pub mod devig;
pub mod labels;
pub mod odds;
pub mod quotes;
pub mod types;
