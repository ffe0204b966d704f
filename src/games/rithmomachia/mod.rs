pub mod board;
pub mod harmony;
pub mod layout;
pub mod plugin;
pub mod relations;
pub mod types;
