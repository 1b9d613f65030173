//! Core domain models for spackify
//!
//! This module contains the fundamental types used throughout the application:
//! - Versions and their total order
//! - Source constraints and target ranges
//! - Markers, requirements and when-conditions
//! - Diagnostics and the aggregated recipe

mod constraint;
mod diagnostic;
mod marker;
mod range;
mod recipe;
mod requirement;
mod version;
mod when;

pub use constraint::{Clause, Comparator, SourceConstraint};
pub use diagnostic::{Diagnostic, DiagnosticKind, Outcome, Severity};
pub use marker::{MarkerExpr, MarkerOp, MarkerValue, MarkerVariable};
pub use range::{TargetRange, VersionInterval};
pub use recipe::{
    Checksum, ConflictRecord, DependencyEntry, PackageRecipe, Person, RecipeSource,
    VersionChecksum,
};
pub use requirement::{
    class_name, normalize_name, recipe_name, DependencyClass, DependencyRequirement,
};
pub use version::{PreRelease, Version};
pub use when::{Platform, WhenCondition};
