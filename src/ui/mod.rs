pub mod banner;
pub mod command;
pub mod render;
pub mod shell;
