//! GPU texture resource records.
//!
//! Image decoding and pixel upload happen in an external loading path; that
//! path registers each uploaded texture here and receives an opaque
//! [`TextureKey`] back. Draw calls accept keys, never names, so nothing is
//! re-resolved per call.

mod cache;

pub use cache::{TextureCache, TextureKey, TextureRecord};
