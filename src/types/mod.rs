//! Type definitions

pub mod location;
pub mod messages;
pub mod optimize;

pub use location::*;
pub use messages::*;
pub use optimize::*;
