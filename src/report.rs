use crate::error::Result;
use log::{info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Inconsistency,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "ERROR",
            Severity::Inconsistency => "INCONSISTENCY",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        };
        f.write_str(s)
    }
}

/// One validation finding: a code, a message template with `{name}`
/// placeholders, the objects involved and the named parameters.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip)]
    template: String,
    pub objects: Vec<String>,
    pub params: BTreeMap<String, String>,
}

impl Finding {
    pub fn new(code: &str, severity: Severity, template: &str) -> Self {
        Self {
            code: code.to_string(),
            severity,
            message: template.to_string(),
            template: template.to_string(),
            objects: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn error(code: &str, template: &str) -> Self {
        Self::new(code, Severity::Error, template)
    }

    pub fn inconsistency(code: &str, template: &str) -> Self {
        Self::new(code, Severity::Inconsistency, template)
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self.message = render(&self.template, &self.params);
        self
    }

    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.objects.push(object.into());
        self
    }

    pub fn objects<I, S>(mut self, objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.objects.extend(objects.into_iter().map(Into::into));
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error | Severity::Inconsistency)
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.message)
    }
}

fn render(template: &str, params: &BTreeMap<String, String>) -> String {
    let mut message = template.to_string();
    for (name, value) in params {
        message = message.replace(&format!("{{{}}}", name), value);
    }
    message
}

/// Receives findings from the checkers. Findings are never raised as errors.
pub trait FindingSink {
    fn report(&mut self, finding: Finding);
}

/// Collecting sink that also forwards each finding to the `log` facade.
#[derive(Debug, Default)]
pub struct ValidationLog {
    findings: Vec<Finding>,
}

impl ValidationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

impl FindingSink for ValidationLog {
    fn report(&mut self, finding: Finding) {
        if finding.is_error() {
            warn!("{}", finding);
        } else {
            info!("{}", finding);
        }
        self.findings.push(finding);
    }
}

impl FindingSink for Vec<Finding> {
    fn report(&mut self, finding: Finding) {
        self.push(finding);
    }
}

/// Findings of one validation run, in the order they were reported.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    findings: Vec<Finding>,
    counts: BTreeMap<String, usize>,
    pub cancelled: bool,
}

impl ValidationReport {
    pub fn new(findings: Vec<Finding>) -> Self {
        let mut counts = BTreeMap::new();
        for finding in &findings {
            *counts.entry(finding.code.clone()).or_insert(0) += 1;
        }
        Self {
            findings,
            counts,
            cancelled: false,
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Codes in report order, repeated once per finding.
    pub fn codes(&self) -> Vec<&str> {
        self.findings.iter().map(|f| f.code.as_str()).collect()
    }

    pub fn count(&self, code: &str) -> usize {
        self.counts.get(code).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(Finding::is_error)
    }

    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings.iter().filter(move |f| f.code == code)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_template_substitution() {
        let finding = Finding::inconsistency(
            "calc2e:summationInconsistency",
            "Summation inconsistent from {concept}: reported {reportedSum}, computed {computedSum}",
        )
        .param("concept", "ex:Total")
        .param("reportedSum", 140)
        .param("computedSum", "[149, 151]");
        assert_eq!(
            finding.message,
            "Summation inconsistent from ex:Total: reported 140, computed [149, 151]"
        );
        assert!(finding.is_error());
    }

    #[test]
    fn test_report_counts_and_json() {
        let mut log = ValidationLog::new();
        log.report(Finding::error("EFM.6.16.04", "cycle").object("ex:A"));
        log.report(Finding::error("EFM.6.16.04", "cycle").object("ex:B"));
        log.report(Finding::new("calc2e:noSections", Severity::Warning, "none"));

        let report = ValidationReport::new(log.into_findings());
        assert_eq!(report.count("EFM.6.16.04"), 2);
        assert_eq!(report.count("calc2e:noSections"), 1);
        assert_eq!(report.count("other"), 0);
        assert!(report.has_errors());

        let json = report.to_json().unwrap();
        assert!(json.contains("\"code\": \"EFM.6.16.04\""));
        assert!(!json.contains("template"));
    }
}
