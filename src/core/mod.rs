pub mod config;
pub mod error;
pub mod shared;
pub mod store;

pub use error::{HelpdeskError, HelpdeskResult};
