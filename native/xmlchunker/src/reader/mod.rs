//! XML Reader Module
//!
//! - BufferedReader: bounded window over any `Read` source
//! - Events: owned XML event types for pull parsing
//! - XmlStreamReader: well-formedness checking pull reader

pub mod buffered;
pub mod events;
pub mod stream;

pub use events::{Attribute, EndElement, StartElement, XmlEvent};
pub use stream::XmlStreamReader;
