pub mod config;
pub mod error;
pub mod metrics;
pub mod table;
pub mod traffic;

pub use config::*;
pub use error::{Result, SimError};
pub use metrics::*;
pub use table::*;
pub use traffic::*;
