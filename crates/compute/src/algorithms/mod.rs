pub mod difficulty;
pub mod keywords;
