use crate::calc::{CalcChecker, INFERRING_PRECISION};
use crate::config::ValidationOptions;
use crate::dimensions::DimensionChecker;
use crate::duplicates::DuplicateChecker;
use crate::error::{Result, XbrlValidationError};
use crate::model::XbrlModel;
use crate::relationships::RelationshipSetCache;
use crate::report::{Finding, FindingSink, ValidationLog, ValidationReport};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// State shared by the checkers during one validation run: the model, the
/// options, the relationship sets built so far and the cancellation flag.
pub struct ValidationRun<'a> {
    pub model: &'a XbrlModel,
    pub options: &'a ValidationOptions,
    relationship_sets: RelationshipSetCache<'a>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> ValidationRun<'a> {
    pub fn new(model: &'a XbrlModel, options: &'a ValidationOptions) -> Self {
        Self {
            model,
            options,
            relationship_sets: RelationshipSetCache::new(model),
            cancel: None,
        }
    }

    /// Checked between ELRs and between sections; a run stops at the next
    /// boundary once the flag is set.
    pub fn with_cancellation(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn relationship_sets(&self) -> &RelationshipSetCache<'a> {
        &self.relationship_sets
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

pub struct ValidationEngine;

impl ValidationEngine {
    pub fn validate(model: &XbrlModel, options: &ValidationOptions) -> Result<ValidationReport> {
        Self::run(ValidationRun::new(model, options))
    }

    pub fn validate_with_cancellation(
        model: &XbrlModel,
        options: &ValidationOptions,
        cancel: Arc<AtomicBool>,
    ) -> Result<ValidationReport> {
        Self::run(ValidationRun::new(model, options).with_cancellation(cancel))
    }

    fn run(run: ValidationRun<'_>) -> Result<ValidationReport> {
        let mut log = ValidationLog::new();
        Self::validate_into(&run, &mut log)?;
        let mut report = ValidationReport::new(log.into_findings());
        report.cancelled = run.is_cancelled();
        info!(
            "Validation finished with {} findings{}",
            report.findings().len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    /// Runs the enabled checkers, sending findings to `sink`.
    ///
    /// Calculation checks need inferred decimals; when that option is off the
    /// `calc2e:inferringPrecision` finding is reported and the run fails with
    /// [`XbrlValidationError::InferDecimalsRequired`] before any check runs.
    /// A model without contexts or facts has nothing to calculate and skips
    /// that precondition.
    pub fn validate_into(run: &ValidationRun<'_>, sink: &mut dyn FindingSink) -> Result<()> {
        let options = run.options;
        options.validate()?;

        let has_instance = run.model.has_contexts() && run.model.has_facts();
        if options.validate_calculations && has_instance && !options.infer_decimals {
            warn!("Calculation validation requested without decimals inference");
            sink.report(Finding::error(
                INFERRING_PRECISION,
                "Calculation validation requires inferring decimals.",
            ));
            return Err(XbrlValidationError::InferDecimalsRequired);
        }

        debug!(
            "Validating model: {} facts, options {:?}",
            run.model.fact_count(),
            options
        );

        if options.validate_dimensions {
            DimensionChecker::new(run, sink).check();
        }
        if run.is_cancelled() {
            return Ok(());
        }
        DuplicateChecker::new(run, sink).check();
        if run.is_cancelled() {
            return Ok(());
        }
        if options.validate_calculations {
            CalcChecker::new(run, sink).check();
        }
        Ok(())
    }
}
