//! spackify - Python package to Spack recipe converter library
//!
//! This library provides the core functionality for turning the release
//! history of a Python package into one consolidated Spack recipe:
//! - PEP 440 versions, specifiers and PEP 508 markers
//! - pyproject.toml decoding
//! - Version-set translation, aggregation and conflict detection
//! - PyPI and GitHub providers
//! - Recipe rendering and repository writing

pub mod cli;
pub mod convert;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod progress;
pub mod registry;
pub mod repository;
