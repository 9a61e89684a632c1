//! Rolling segment buffer
//!
//! The capture backend writes fixed-length segments into a wrapping set of
//! slots (`buffer_0000.mp4` ..). `store` lists and drains them; `concat`
//! joins them, oldest first, into one replay file.

pub mod concat;
pub mod store;

pub use concat::{render_manifest, unique_output_path, BufferConcatenator, CONCAT_TIMEOUT, MANIFEST_FILE};
pub use store::{CleanupReport, Segment, SegmentStore};
