//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ParseError: version, specifier, marker and requirement strings
//! - ManifestError: Issues with pyproject.toml decoding
//! - RegistryError: Issues with package provider communication
//! - ConfigError: Issues with CLI configuration
//! - IoError: File system operation failures
//! - ConversionError: A whole package could not be converted
//!
//! Per-requirement problems inside the conversion engine are not errors:
//! they are recorded as [`crate::domain::Diagnostic`]s.

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Package provider related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// IO related errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Whole-package conversion failures
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// Errors raised while parsing the textual forms of versions, specifiers,
/// markers and requirements
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Version string does not follow PEP 440
    #[error("invalid version '{input}'")]
    InvalidVersion { input: String },

    /// Specifier clause could not be parsed
    #[error("invalid specifier '{input}': {message}")]
    InvalidSpecifier { input: String, message: String },

    /// Marker expression could not be parsed
    #[error("invalid marker '{input}': {message}")]
    InvalidMarker { input: String, message: String },

    /// Marker references a variable that PEP 508 does not define
    #[error("undefined marker variable '{name}'")]
    UndefinedMarkerVariable { name: String },

    /// Requirement string could not be parsed
    #[error("invalid requirement '{input}': {message}")]
    InvalidRequirement { input: String, message: String },
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// TOML parsing error
    #[error("failed to parse TOML for {package} {version}: {message}")]
    TomlParseError {
        package: String,
        version: String,
        message: String,
    },

    /// The document has no `[project]` table
    #[error("section \"project\" missing in pyproject.toml of {package} {version}")]
    MissingProjectSection { package: String, version: String },

    /// pyproject.toml not present in the source archive
    #[error("pyproject.toml not found in source archive of {package} {version}")]
    NotInArchive { package: String, version: String },

    /// Unsupported archive format
    #[error("unsupported archive format: {filename}")]
    UnsupportedArchive { filename: String },

    /// Archive could not be read
    #[error("failed to read archive {filename}: {message}")]
    ArchiveError { filename: String, message: String },
}

/// Errors related to package provider communication
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Invalid response from registry
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },

    /// Registry answered but offers no usable version
    #[error("no valid versions of '{package}' found in {registry}")]
    NoVersions { package: String, registry: String },

    /// No source distribution for the requested version
    #[error("no source distribution of '{package}' {version} in {registry}")]
    NoSourceDistribution {
        package: String,
        version: String,
        registry: String,
    },

    /// Manifest inside the downloaded archive was unusable
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid path
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: PathBuf, message: String },

    /// No repository given and none could be discovered
    #[error("no Spack repository found: pass --repo, set SPACK_ROOT or put spack on PATH")]
    RepositoryNotFound,

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },

    /// Out-of-range numeric option
    #[error("invalid value {value} for {option}: {message}")]
    InvalidValue {
        option: String,
        value: i64,
        message: String,
    },
}

/// Errors related to IO operations
#[derive(Error, Debug)]
pub enum IoError {
    /// Recipe already present on disk
    #[error("recipe already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Generic IO error
    #[error("IO error at {path}: {source}")]
    Generic {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Terminal failures for a single package conversion
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// Not found by any provider
    #[error("package '{package}' not found through any provider")]
    PackageNotFound { package: String },

    /// None of the analyzed releases produced a usable manifest
    #[error("no usable release of '{package}' could be analyzed")]
    NoReleases { package: String },
}

impl ParseError {
    /// Creates a new InvalidVersion error
    pub fn invalid_version(input: impl Into<String>) -> Self {
        ParseError::InvalidVersion {
            input: input.into(),
        }
    }

    /// Creates a new InvalidSpecifier error
    pub fn invalid_specifier(input: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::InvalidSpecifier {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidMarker error
    pub fn invalid_marker(input: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::InvalidMarker {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidRequirement error
    pub fn invalid_requirement(input: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::InvalidRequirement {
            input: input.into(),
            message: message.into(),
        }
    }
}

impl ManifestError {
    /// Creates a new TomlParseError
    pub fn toml_parse_error(
        package: impl Into<String>,
        version: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ManifestError::TomlParseError {
            package: package.into(),
            version: version.into(),
            message: message.into(),
        }
    }

    /// Creates a new MissingProjectSection error
    pub fn missing_project(package: impl Into<String>, version: impl Into<String>) -> Self {
        ManifestError::MissingProjectSection {
            package: package.into(),
            version: version.into(),
        }
    }

    /// Creates a new ArchiveError
    pub fn archive_error(filename: impl Into<String>, message: impl Into<String>) -> Self {
        ManifestError::ArchiveError {
            filename: filename.into(),
            message: message.into(),
        }
    }
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NoVersions error
    pub fn no_versions(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::NoVersions {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Returns true when the registry reported the package as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::PackageNotFound { .. })
    }
}

impl IoError {
    /// Creates a new Generic IO error
    pub fn generic(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::Generic {
            path: path.into(),
            source,
        }
    }
}
