//! Codec layer for text carried inside MLD chunks.
//!
//! # Submodules
//!
//! - [`text`][]: Legacy Japanese (Shift_JIS / code page 932) decoding

pub mod text;
