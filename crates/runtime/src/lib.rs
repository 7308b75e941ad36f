pub mod debounce;
pub mod event_bus;
pub mod loader;

pub use debounce::*;
pub use event_bus::*;
pub use loader::*;
