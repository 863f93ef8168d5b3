pub mod core;
pub mod directory;
pub mod main_module;
pub mod security;
pub mod tickets;

pub use crate::core::error::{HelpdeskError, HelpdeskResult};
pub use crate::core::shared::state::AppState;
