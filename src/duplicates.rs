//! Document-wide duplicate fact sets and their classification.
//!
//! Facts are duplicates when they share a concept, an equal context and an
//! equal unit. A set is classified as complete (same value and decimals),
//! consistent (numeric ranges agree), incomplete or inconsistent, and only
//! sets showing one of the requested types are reported.

use crate::engine::ValidationRun;
use crate::intervals::{inferred_decimals, parse_value, range_value, InferredDecimals, Interval};
use crate::model::{
    ConceptId, ContextId, EquivalenceClasses, FactId, ModelObject, UnitId, XbrlModel,
};
use crate::report::{Finding, FindingSink, Severity};
use log::{debug, info};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::BitOr;

pub const INCONSISTENT_DUPLICATES: &str = "duplicates:inconsistentDuplicateFacts";
pub const CONSISTENT_DUPLICATES: &str = "duplicates:consistentDuplicateFacts";
pub const INCOMPLETE_DUPLICATES: &str = "duplicates:incompleteDuplicateFacts";
pub const COMPLETE_DUPLICATES: &str = "duplicates:completeDuplicateFacts";

/// Set of duplicate classifications, combined with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct DuplicateType(u8);

impl DuplicateType {
    pub const NONE: DuplicateType = DuplicateType(0);
    pub const INCONSISTENT: DuplicateType = DuplicateType(1);
    pub const CONSISTENT: DuplicateType = DuplicateType(1 << 1);
    pub const INCOMPLETE: DuplicateType = DuplicateType(1 << 2);
    pub const COMPLETE: DuplicateType = DuplicateType(1 << 3);

    const EACH: [DuplicateType; 4] = [
        DuplicateType::INCONSISTENT,
        DuplicateType::CONSISTENT,
        DuplicateType::INCOMPLETE,
        DuplicateType::COMPLETE,
    ];

    pub fn contains(&self, other: DuplicateType) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// The single flags set in `self`, most severe first.
    pub fn iter(self) -> impl Iterator<Item = DuplicateType> {
        Self::EACH.into_iter().filter(move |flag| self.contains(*flag))
    }

    fn code(&self) -> &'static str {
        match *self {
            DuplicateType::INCONSISTENT => INCONSISTENT_DUPLICATES,
            DuplicateType::CONSISTENT => CONSISTENT_DUPLICATES,
            DuplicateType::INCOMPLETE => INCOMPLETE_DUPLICATES,
            _ => COMPLETE_DUPLICATES,
        }
    }

    fn severity(&self) -> Severity {
        match *self {
            DuplicateType::INCONSISTENT => Severity::Inconsistency,
            DuplicateType::INCOMPLETE => Severity::Warning,
            _ => Severity::Info,
        }
    }

    fn name(&self) -> &'static str {
        match *self {
            DuplicateType::INCONSISTENT => "inconsistent",
            DuplicateType::CONSISTENT => "consistent",
            DuplicateType::INCOMPLETE => "incomplete",
            _ => "complete",
        }
    }
}

impl BitOr for DuplicateType {
    type Output = DuplicateType;

    fn bitor(self, rhs: DuplicateType) -> DuplicateType {
        DuplicateType(self.0 | rhs.0)
    }
}

/// Duplicate types selectable from options. `All` reports every set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTypeArg {
    #[default]
    None,
    Inconsistent,
    Consistent,
    Incomplete,
    Complete,
    All,
}

impl DuplicateTypeArg {
    pub fn duplicate_type(&self) -> DuplicateType {
        match self {
            DuplicateTypeArg::None => DuplicateType::NONE,
            DuplicateTypeArg::Inconsistent => DuplicateType::INCONSISTENT,
            DuplicateTypeArg::Consistent => DuplicateType::CONSISTENT,
            DuplicateTypeArg::Incomplete => DuplicateType::INCOMPLETE,
            DuplicateTypeArg::Complete => DuplicateType::COMPLETE,
            DuplicateTypeArg::All => DuplicateType::INCONSISTENT | DuplicateType::CONSISTENT,
        }
    }
}

/// Value-equality key: numbers compare numerically, other values by their
/// trimmed lexical form. Nil is its own key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Nil,
    Number(Decimal),
    Text(String),
}

fn value_key(model: &XbrlModel, fact: FactId) -> ValueKey {
    let fact = model.fact(fact);
    let Some(value) = fact.value.as_deref() else {
        return ValueKey::Nil;
    };
    if model.concept(fact.concept).is_numeric() {
        if let Some(number) = parse_value(fact) {
            return ValueKey::Number(number.normalize());
        }
    }
    ValueKey::Text(value.trim().to_string())
}

/// Two or more facts of one concept in equal contexts and equal units.
#[derive(Debug, Clone)]
pub struct DuplicateFactSet<'m> {
    model: &'m XbrlModel,
    facts: Vec<FactId>,
}

impl<'m> DuplicateFactSet<'m> {
    pub fn facts(&self) -> &[FactId] {
        &self.facts
    }

    pub fn are_numeric(&self) -> bool {
        self.model
            .concept(self.model.fact(self.facts[0]).concept)
            .is_numeric()
    }

    fn decimals(&self, fact: FactId) -> InferredDecimals {
        inferred_decimals(self.model.fact(fact))
    }

    pub fn are_all_decimals_equal(&self) -> bool {
        let first = self.decimals(self.facts[0]);
        self.facts[1..].iter().all(|f| self.decimals(*f) == first)
    }

    pub fn are_all_value_equal(&self) -> bool {
        let first = value_key(self.model, self.facts[0]);
        self.facts[1..]
            .iter()
            .all(|f| value_key(self.model, *f) == first)
    }

    pub fn are_all_complete(&self) -> bool {
        self.are_all_decimals_equal() && self.are_all_value_equal()
    }

    pub fn are_all_consistent(&self) -> bool {
        if self.are_all_complete() {
            return true;
        }
        self.are_numeric() && self.are_within_rounding_error()
    }

    /// Some pair shares both value and decimals.
    pub fn are_any_complete(&self) -> bool {
        let mut seen = HashSet::new();
        self.facts
            .iter()
            .any(|f| !seen.insert((self.decimals(*f), value_key(self.model, *f))))
    }

    /// Some pair is complete, or two facts with different decimals have
    /// overlapping ranges.
    pub fn are_any_consistent(&self) -> bool {
        if self.are_any_complete() {
            return true;
        }
        if !self.are_numeric() {
            return false;
        }
        let mut ranges: Vec<(Interval, InferredDecimals)> = Vec::with_capacity(self.facts.len());
        for &id in &self.facts {
            let fact = self.model.fact(id);
            let Some(value) = parse_value(fact) else {
                continue;
            };
            let decimals = self.decimals(id);
            let range = range_value(value, decimals);
            let overlapping = ranges
                .iter()
                .any(|(other, other_decimals)| *other_decimals != decimals && range.overlaps(other));
            if overlapping {
                return true;
            }
            ranges.push((range, decimals));
        }
        false
    }

    pub fn are_any_incomplete(&self) -> bool {
        !self.are_all_complete()
    }

    pub fn are_any_inconsistent(&self) -> bool {
        if self.are_numeric() {
            !self.are_all_consistent()
        } else {
            !self.are_all_value_equal()
        }
    }

    /// Facts with equal decimals report the same number and every range
    /// shares a common point.
    pub fn are_within_rounding_error(&self) -> bool {
        let mut by_decimals: HashMap<InferredDecimals, Decimal> = HashMap::new();
        let mut max_low: Option<Decimal> = None;
        let mut min_high: Option<Decimal> = None;
        for &id in &self.facts {
            let fact = self.model.fact(id);
            let Some(value) = parse_value(fact) else {
                return false;
            };
            let decimals = self.decimals(id);
            if *by_decimals.entry(decimals).or_insert(value) != value {
                return false;
            }
            let range = range_value(value, decimals);
            let low = max_low.map_or(range.low, |l| l.max(range.low));
            let high = min_high.map_or(range.high, |h| h.min(range.high));
            if high < low {
                return false;
            }
            max_low = Some(low);
            min_high = Some(high);
        }
        true
    }

    pub fn has_type(&self, duplicate_type: DuplicateType) -> bool {
        let inconsistent = duplicate_type.contains(DuplicateType::INCONSISTENT);
        let consistent = duplicate_type.contains(DuplicateType::CONSISTENT);
        let incomplete = duplicate_type.contains(DuplicateType::INCOMPLETE);
        let complete = duplicate_type.contains(DuplicateType::COMPLETE);
        (inconsistent && consistent)
            || (incomplete && complete)
            || (inconsistent && self.are_any_inconsistent())
            || (consistent && self.are_any_consistent())
            || (incomplete && self.are_any_incomplete())
            || (complete && self.are_any_complete())
    }
}

/// Duplicate sets over every fact with a context, in document order of
/// their first fact. Numeric facts with a non-numeric value are left out.
pub fn duplicate_fact_sets<'m>(
    model: &'m XbrlModel,
    equivalence: &EquivalenceClasses,
) -> Vec<DuplicateFactSet<'m>> {
    let mut order = Vec::new();
    let mut groups: HashMap<(ConceptId, ContextId, Option<UnitId>), Vec<FactId>> = HashMap::new();
    for index in 0..model.fact_count() {
        let id = FactId::new(index);
        let fact = model.fact(id);
        let Some(context) = fact.context else {
            continue;
        };
        if !fact.is_nil() && model.concept(fact.concept).is_numeric() && parse_value(fact).is_none() {
            continue;
        }
        let key = (
            fact.concept,
            equivalence.context(context),
            fact.unit.map(|u| equivalence.unit(u)),
        );
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(id);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .filter(|facts| facts.len() > 1)
        .map(|facts| DuplicateFactSet { model, facts })
        .collect()
}

/// Duplicate sets showing any of `duplicate_type`.
pub fn duplicate_fact_sets_with_type<'m>(
    model: &'m XbrlModel,
    equivalence: &EquivalenceClasses,
    duplicate_type: DuplicateType,
) -> Vec<DuplicateFactSet<'m>> {
    if duplicate_type.is_none() {
        return Vec::new();
    }
    duplicate_fact_sets(model, equivalence)
        .into_iter()
        .filter(|set| set.has_type(duplicate_type))
        .collect()
}

/// Reports each duplicate set once for every requested type it shows.
pub struct DuplicateChecker<'r, 'a> {
    run: &'r ValidationRun<'a>,
    sink: &'r mut dyn FindingSink,
}

impl<'r, 'a> DuplicateChecker<'r, 'a> {
    pub fn new(run: &'r ValidationRun<'a>, sink: &'r mut dyn FindingSink) -> Self {
        Self { run, sink }
    }

    pub fn check(&mut self) {
        let requested = self.run.options.duplicate_facts.duplicate_type();
        if requested.is_none() {
            return;
        }
        let model = self.run.model;
        let equivalence = EquivalenceClasses::build(model);
        let sets = duplicate_fact_sets_with_type(model, &equivalence, requested);
        info!("Checking {} duplicate fact sets", sets.len());

        for set in &sets {
            if self.run.is_cancelled() {
                info!("Duplicate fact checks cancelled");
                return;
            }
            for flag in requested.iter() {
                if set.has_type(flag) {
                    self.report(set, flag);
                }
            }
        }
    }

    fn report(&mut self, set: &DuplicateFactSet<'_>, flag: DuplicateType) {
        let model = self.run.model;
        let first = model.fact(set.facts[0]);
        let context = first
            .context
            .map_or_else(String::new, |c| model.context(c).id.clone());
        let values: Vec<String> = set
            .facts
            .iter()
            .map(|id| {
                model
                    .fact(*id)
                    .value
                    .clone()
                    .unwrap_or_else(|| "nil".to_string())
            })
            .collect();
        debug!(
            "{} duplicates of {} in {}",
            flag.name(),
            model.qname(first.concept),
            context
        );
        self.sink.report(
            Finding::new(
                flag.code(),
                flag.severity(),
                "Duplicate facts of {concept} in context {contextID} are {duplicateType}: {values}",
            )
            .param("concept", model.qname(first.concept))
            .param("contextID", context)
            .param("duplicateType", flag.name())
            .param("values", values.join(", "))
            .objects(set.facts.iter().map(|id| model.object_name(ModelObject::Fact(*id)))),
        );
    }
}
