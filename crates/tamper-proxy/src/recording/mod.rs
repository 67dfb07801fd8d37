//! Recording of live upstream responses to disk.
//!
//! In record mode matched responses are passed through to the client unchanged
//! while their body is archived as a flat file, either at the path named by a
//! `file` patch or under a name derived from the request.

mod writer;

pub use writer::{derive_filename, RecordError, RecordWriter};
