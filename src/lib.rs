//! # XBRL Consistency
//!
//! Structural and arithmetic validation of a loaded XBRL instance and its
//! taxonomy relationships.
//!
//! ## Core Concepts
//!
//! - **DRS checks**: has-hypercube arcs, `targetRole` chains and undirected
//!   cycles in dimensional relationship sets, reported with EFM or GFM codes
//! - **Calculation checks**: summation-item, balance-changes and
//!   aggregation-domain trees evaluated per section with interval arithmetic
//!   over each fact's inferred decimals
//! - **Duplicate facts**: optional document-wide classification of duplicate
//!   fact sets as complete, consistent, incomplete or inconsistent
//! - **Findings**: every problem is reported as a coded [`Finding`] to a
//!   [`FindingSink`]; the run itself only fails on unusable input or options
//!
//! ## Example
//!
//! ```rust,ignore
//! use xbrl_consistency::*;
//!
//! let json = std::fs::read_to_string("instance.json")?;
//! let report = validate_document(&json, &ValidationOptions::default())?;
//! for finding in report.findings() {
//!     println!("{}", finding);
//! }
//! ```

pub mod calc;
pub mod config;
pub mod dimensions;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod intervals;
pub mod model;
pub mod relationships;
pub mod report;
pub mod schema;
pub mod utils;

pub use calc::CalcChecker;
pub use config::{DisclosureSystem, ValidationOptions};
pub use dimensions::{DimensionChecker, DimensionRule};
pub use duplicates::{DuplicateChecker, DuplicateFactSet, DuplicateType, DuplicateTypeArg};
pub use engine::{ValidationEngine, ValidationRun};
pub use error::{Result, XbrlValidationError};
pub use intervals::{BoundValue, InferredDecimals, Interval};
pub use model::XbrlModel;
pub use relationships::{LinkroleFilter, RelationshipSet, RelationshipSetCache};
pub use report::{Finding, FindingSink, Severity, ValidationLog, ValidationReport};
pub use schema::*;

use log::info;

/// Parses a JSON document source and validates it.
pub fn validate_document(json: &str, options: &ValidationOptions) -> Result<ValidationReport> {
    let model = XbrlModel::from_json(json)?;
    info!(
        "Loaded model with {} facts and {} relationships",
        model.fact_count(),
        model.relationships().count()
    );
    ValidationEngine::validate(&model, options)
}

pub fn validate_model(model: &XbrlModel, options: &ValidationOptions) -> Result<ValidationReport> {
    ValidationEngine::validate(model, options)
}
