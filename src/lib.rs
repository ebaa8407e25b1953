//! Reads the bookmark outline of a pdf as a flat list of titled, levelled entries and writes
//! such a list back as a well formed outline tree.

pub mod commands;
pub mod config;
pub mod outline;
pub mod pdf;

pub use config::Config;
pub use outline::{
    IdGenerator, OutlineItem, OutlineNode, RawOutlineItem, SequentialIds, UuidGenerator,
    build_tree, flatten,
};
pub use pdf::{OutlineDocument, apply_outline, destination::PagePolicy, extract_outline};
