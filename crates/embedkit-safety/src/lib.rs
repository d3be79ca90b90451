//! Render-safety checks for embeddable markup.
//!
//! An asset is safe when its URL and every frame target or script source in
//! its markup pass the configured domain whitelist, and the markup carries
//! no inline script.

pub mod validator;

pub use validator::{SafetyReport, SafetyValidator, Violation};
