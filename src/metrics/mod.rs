pub mod collector;
pub mod summary;

pub use collector::*;
pub use summary::*;
