//! Segmentation model implementations
//!
//! - Command backend (runs an external tool such as `rembg`)
//! - Matte backend (wraps a grey-scale matte predictor)
//! - Test doubles with deterministic output

pub mod command;
pub mod matte;
pub mod test_utils;

pub use self::command::CommandModel;
pub use self::matte::{apply_matte, MatteModel};
