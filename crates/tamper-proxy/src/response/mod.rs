//! Synthetic response construction.
//!
//! - `body` - resolves a patch into status and payload
//! - `builder` - buffered response builder shared by patches and proxy errors

pub mod body;
pub mod builder;

pub use body::{resolve, BodyError, ResolvedBody};
pub use builder::{error_response, ResponseBuilder};
