//! Parsers for the textual forms used in Python package manifests
//!
//! This module provides parsers for:
//! - PEP 440 specifiers (`>=1.0,<2`)
//! - PEP 508 environment markers (`python_version < "3.8"`)
//! - PEP 508 requirement strings (`requests[socks]>=2; sys_platform == "linux"`)

mod marker;
mod requirement;
mod specifier;

pub use marker::parse_marker;
pub use requirement::parse_requirement;
pub use specifier::parse_constraint;
