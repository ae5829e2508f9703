//! XML Chunker
//!
//! - ContainerPath: the element path that marks one record
//! - ElementStack: open element names, with the rooted prefix matcher
//! - Subtree: copies one matched element into its own document
//! - XmlChunker: the pull interface tying these together

pub mod path;
pub mod pull;
pub mod stack;
pub mod subtree;

pub use path::ContainerPath;
pub use pull::XmlChunker;
pub use stack::{matches, ElementStack};
