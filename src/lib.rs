//! Parking sign interpretation engine
//!
//! Turns OCR text blocks from a photo of Swedish parking signs into a legal
//! determination: may you park here now, until when, and for how long.
//! Exposes modules for integration testing and binary reuse.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
