//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: delimiter detection using memchr
//! - Tokenizer: one token at a time from a refillable window
//! - Entities: reference checking and decoding with Cow
//! - Attributes: attribute parsing and validation
//! - Encoding: BOM sniffing and declared-encoding resolution
//! - Dtd: general entities of the DOCTYPE internal subset

pub mod attributes;
pub mod dtd;
pub mod encoding;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
