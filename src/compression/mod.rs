//! The container layer: framing, checksums, and the streaming public
//! types. `writer` assembles and emits blocks, `reader` parses and lazily
//! expands them.

pub mod reader;
pub mod writer;

pub use reader::BzReader;
pub use writer::BzWriter;
