pub mod difficulty;
pub mod digest;
pub mod errors;
pub mod group;
pub mod interaction;
pub mod log;
pub mod partition;
pub mod puzzle;
pub mod types;
