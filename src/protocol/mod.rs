//! Protocol module for framing link messages.
//!
//! This module contains the wire encoding used on the link characteristic.

pub mod framing;

pub use framing::{decode_frame, encode_frame};
