pub mod bot;
pub mod client;
pub mod exfil;
pub mod flood;
pub mod human;
pub mod injection;
pub mod orchestrator;
pub mod payload;
pub mod user_agents;

pub use bot::*;
pub use client::*;
pub use exfil::*;
pub use flood::*;
pub use human::*;
pub use injection::*;
pub use orchestrator::*;
pub use payload::*;
pub use user_agents::*;
