// src/lib.rs

pub mod core;
pub mod error;
pub mod models;
pub mod persistence;

pub use crate::core::config::{DecoderConfig, UnknownWordPolicy};
pub use crate::core::engine::{Candidate, Decoder, Segment, Translation};
pub use crate::core::features::Models;
pub use crate::core::vocab::Vocabulary;
pub use crate::error::{ConfigError, DecodeError, PersistError};
