//! Release manifest decoding
//!
//! This module provides functionality to:
//! - Decode a pyproject.toml document into a [`ReleaseManifest`]
//! - Turn a manifest into typed dependency requirements

mod pyproject;

pub use pyproject::{decode_pyproject, ReleaseManifest};

/// File name of the manifest inside a source distribution
pub const MANIFEST_FILE_NAME: &str = "pyproject.toml";
