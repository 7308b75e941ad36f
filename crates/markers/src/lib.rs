pub mod events;
pub mod headless;
pub mod library;
pub mod merge;
pub mod reconciler;
pub mod selection;
pub mod surface;
pub mod visibility;

pub use events::*;
pub use headless::*;
pub use library::*;
pub use merge::*;
pub use reconciler::*;
pub use selection::*;
pub use surface::*;
pub use visibility::*;
