pub mod command;
pub mod interactive;
