pub mod error;
pub mod fetcher;
pub mod protocol;
pub mod request;
pub mod source;

pub use error::*;
pub use fetcher::*;
pub use protocol::*;
pub use request::*;
pub use source::*;
