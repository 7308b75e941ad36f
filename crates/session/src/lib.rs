pub mod config;
pub mod session;
pub mod stats;
pub mod tracker;

pub use config::*;
pub use session::*;
pub use stats::*;
pub use tracker::*;
