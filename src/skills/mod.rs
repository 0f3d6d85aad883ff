pub mod catalog;
pub mod cli;
pub mod config;
pub mod refresh;
pub mod shared;
pub mod targets;
