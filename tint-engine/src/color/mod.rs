//! Color science: perceptual color space math and harmony derivation
//!
//! Everything in this module is pure and safe to run on worker threads.

pub mod harmony;
pub mod space;

pub use harmony::{DerivedPalette, HarmonyDeriver};
pub use space::{Oklab, Oklch};
