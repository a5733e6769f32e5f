//! Core infrastructure shared by every module

pub mod error;

pub use error::{AudioOperation, Result, TtsError};
