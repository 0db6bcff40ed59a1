pub mod advisory;
pub mod cli;
pub mod config;
pub mod parser;
pub mod planner;
pub mod version;
