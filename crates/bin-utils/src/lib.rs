pub mod completions_command;
pub mod logger;
