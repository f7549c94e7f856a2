//! Calculation consistency over summation-item, balance-changes and
//! aggregation-domain trees, checked section by section.
//!
//! A section is the source fact of `section-fact` arcs. Its target facts are
//! deduplicated per (concept, equivalent context, equivalent unit) and bound
//! to the calculation tree of the section's link roles. The tree is walked
//! depth first. Children are processed before their parent so that a value
//! computed for an unreported child can be used one level up.

use crate::engine::ValidationRun;
use crate::intervals::{
    duplicates_consistent, fact_value, format_bound_value, inferred_decimals, BoundValue,
    InferredDecimals,
};
use crate::model::{
    ConceptId, ContextId, EquivalenceClasses, FactId, MemberValue, ModelObject, RelId,
    Relationship, UnitId, XbrlModel,
};
use crate::relationships::{LinkroleFilter, RelationshipSet};
use crate::report::{Finding, FindingSink};
use crate::schema::{Arcrole, Balance};
use crate::utils::{nominal_period_between, stable_hash_with};
use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

pub const INVALID_WEIGHT: &str = "calc2e:invalidWeight";
pub const BALANCE_WEIGHT_ILLEGAL_NEGATIVE: &str = "calc2e:balanceCalcWeightIllegalNegative";
pub const BALANCE_WEIGHT_ILLEGAL_POSITIVE: &str = "calc2e:balanceCalcWeightIllegalPositive";
pub const NON_NUMERIC_CALC: &str = "calc2e:nonNumericCalc";
pub const INVALID_BALANCE_CHANGES_PERIOD_TYPE: &str = "calc2e:invalidBalanceChangesPeriodType";
pub const INVALID_AGGREGATION_DIMENSION: &str = "calc2e:invalidAggregationDimension";
pub const INVALID_AGGREGATION_DOMAIN: &str = "calc2e:invalidAggregationDomain";
pub const NO_SECTIONS: &str = "calc2e:noSections";
pub const INFERRING_PRECISION: &str = "calc2e:inferringPrecision";
pub const INCONSISTENT_DUPLICATE: &str = "calc2e:inconsistentDuplicateInSection";
pub const SUMMATION_INCONSISTENCY: &str = "calc2e:summationInconsistency";
pub const BALANCE_INCONSISTENCY: &str = "calc2e:balanceInconsistency";
pub const AGGREGATION_INCONSISTENCY: &str = "calc2e:aggregationInconsistency";

const MAX_VALUE_CHARS: usize = 128;

/// Equivalent context and unit.
type SumKey = (ContextId, UnitId);

/// Entity and dimensions of a context with its period bounds, so that
/// instants and durations of the same entity/dimensions line up by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct PerKey {
    signature: u64,
    unit: UnitId,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl PerKey {
    fn instant(&self, end: NaiveDate) -> PerKey {
        PerKey {
            start: None,
            end: Some(end),
            ..*self
        }
    }

    fn duration(&self, start: NaiveDate, end: NaiveDate) -> PerKey {
        PerKey {
            start: Some(start),
            end: Some(end),
            ..*self
        }
    }
}

/// Context aspects other than one aggregation dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct AggKey {
    signature: u64,
    unit: UnitId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AggMember {
    Default,
    Explicit(ConceptId),
}

fn per_key(model: &XbrlModel, context: ContextId, unit: UnitId) -> Option<PerKey> {
    let ctx = model.context(context);
    if ctx.is_forever() {
        return None;
    }
    let (start, end) = ctx.bounds();
    let signature = stable_hash_with(|h| {
        ctx.entity.hash(h);
        ctx.dimensions.hash(h);
    });
    Some(PerKey {
        signature,
        unit,
        start,
        end,
    })
}

fn agg_key(model: &XbrlModel, context: ContextId, unit: UnitId, dimension: ConceptId) -> AggKey {
    let ctx = model.context(context);
    let signature = stable_hash_with(|h| {
        ctx.period.hash(h);
        ctx.entity.hash(h);
        for (dim, member) in &ctx.dimensions {
            if *dim != dimension {
                dim.hash(h);
                member.hash(h);
            }
        }
    });
    AggKey { signature, unit }
}

/// Section facts bound by summation, balance and aggregation keys.
/// Built fresh for every section.
#[derive(Debug, Default)]
struct SectionBindings {
    values: HashMap<FactId, (BoundValue, InferredDecimals)>,
    sum_keys: HashMap<ConceptId, BTreeSet<SumKey>>,
    sum_facts: HashMap<(ConceptId, SumKey), FactId>,
    per_keys: HashMap<ConceptId, BTreeSet<PerKey>>,
    per_facts: HashMap<(ConceptId, PerKey), FactId>,
    duration_starts: HashMap<i64, BTreeSet<NaiveDate>>,
    agg_keys: HashMap<(ConceptId, ConceptId), BTreeSet<AggKey>>,
    agg_facts: HashMap<(ConceptId, ConceptId, AggKey, AggMember), FactId>,
}

impl SectionBindings {
    fn bind(
        model: &XbrlModel,
        equivalence: &EquivalenceClasses,
        facts: &[FactId],
        aggregation_dims: &BTreeSet<ConceptId>,
    ) -> Self {
        let mut b = SectionBindings::default();
        for &id in facts {
            let fact = model.fact(id);
            let (Some(context), Some(unit)) = (fact.context, fact.unit) else {
                continue;
            };
            let Some(value) = fact_value(fact) else {
                warn!(
                    "Skipping {} with non-numeric value {:?}",
                    model.object_name(ModelObject::Fact(id)),
                    fact.value
                );
                continue;
            };
            b.values.insert(id, (value, inferred_decimals(fact)));

            let concept = fact.concept;
            let context = equivalence.context(context);
            let unit = equivalence.unit(unit);

            let sum_key = (context, unit);
            b.sum_keys.entry(concept).or_default().insert(sum_key);
            b.sum_facts.entry((concept, sum_key)).or_insert(id);

            if let Some(key) = per_key(model, context, unit) {
                b.per_keys.entry(concept).or_default().insert(key);
                b.per_facts.entry((concept, key)).or_insert(id);
                if let (Some(start), Some(end)) = (key.start, key.end) {
                    b.duration_starts
                        .entry(nominal_period_between(start, end))
                        .or_default()
                        .insert(start);
                }
            }

            let ctx = model.context(context);
            for &dim in aggregation_dims {
                let member = match ctx.dimensions.get(&dim) {
                    Some(MemberValue::Explicit(member)) => AggMember::Explicit(*member),
                    Some(MemberValue::Typed(_)) => continue,
                    None => AggMember::Default,
                };
                let key = agg_key(model, context, unit, dim);
                b.agg_keys.entry((concept, dim)).or_default().insert(key);
                b.agg_facts.entry((concept, dim, key, member)).or_insert(id);
            }
        }
        b
    }

    fn value(&self, fact: FactId) -> Option<&(BoundValue, InferredDecimals)> {
        self.values.get(&fact)
    }

    fn sum_fact(&self, concept: ConceptId, key: SumKey) -> Option<FactId> {
        self.sum_facts.get(&(concept, key)).copied()
    }

    fn per_fact(&self, concept: ConceptId, key: PerKey) -> Option<FactId> {
        self.per_facts.get(&(concept, key)).copied()
    }

    fn agg_fact(
        &self,
        concept: ConceptId,
        dim: ConceptId,
        key: AggKey,
        member: ConceptId,
        default_member: ConceptId,
    ) -> Option<FactId> {
        let explicit = self
            .agg_facts
            .get(&(concept, dim, key, AggMember::Explicit(member)))
            .copied();
        if member == default_member {
            return self
                .agg_facts
                .get(&(concept, dim, key, AggMember::Default))
                .copied()
                .or(explicit);
        }
        explicit
    }
}

/// Values computed for unreported concepts, handed to the parent level.
#[derive(Debug, Default)]
struct InferredValues {
    sums: HashMap<(ConceptId, SumKey), BoundValue>,
}

fn truncate(value: &str) -> String {
    if value.chars().count() <= MAX_VALUE_CHARS {
        return value.to_string();
    }
    let head: String = value.chars().take(MAX_VALUE_CHARS).collect();
    format!("{}...", head)
}

pub struct CalcChecker<'r, 'a> {
    run: &'r ValidationRun<'a>,
    sink: &'r mut dyn FindingSink,
    equivalence: EquivalenceClasses,
    section: String,
}

impl<'r, 'a> CalcChecker<'r, 'a> {
    pub fn new(run: &'r ValidationRun<'a>, sink: &'r mut dyn FindingSink) -> Self {
        Self {
            run,
            sink,
            equivalence: EquivalenceClasses::build(run.model),
            section: String::new(),
        }
    }

    pub fn check(&mut self) {
        let model = self.run.model;
        if !model.has_contexts() || !model.has_facts() {
            debug!("No contexts or facts, skipping calculation checks");
            return;
        }
        info!("Checking calculation relationships");
        self.check_relationships();

        let sections = self.sections();
        if sections.is_empty() {
            self.sink.report(Finding::error(
                NO_SECTIONS,
                "Instance contains no sections, nothing to validate.",
            ));
            return;
        }
        for section in sections {
            if self.run.is_cancelled() {
                info!("Calculation checks cancelled");
                return;
            }
            self.check_section(section);
        }
    }

    /// Static constraints on every calculation arc.
    fn check_relationships(&mut self) {
        let model = self.run.model;
        let calc_set = self
            .run
            .relationship_sets()
            .get(&Arcrole::calculation_arcroles(), LinkroleFilter::Any);

        for &id in calc_set.model_relationships() {
            let rel = model.relationship(id);
            let (Some(from), Some(to)) = (rel.from_concept(), rel.to_concept()) else {
                continue;
            };
            let from_concept = model.concept(from);
            let to_concept = model.concept(to);

            if rel.arcrole == Arcrole::AggregationDomain {
                let valid_dimension = rel
                    .dimension
                    .is_some_and(|dim| model.concept(dim).is_dimension_item());
                if !valid_dimension {
                    self.sink.report(
                        Finding::error(
                            INVALID_AGGREGATION_DIMENSION,
                            "Aggregation-domain relationship has invalid dimension {dimension} in link role {linkrole}",
                        )
                        .param("dimension", rel.dimension_qname.as_deref().unwrap_or("(none)"))
                        .param("linkrole", &rel.linkrole)
                        .object(rel.locator()),
                    );
                } else if from != to || !from_concept.is_domain_member() {
                    self.sink.report(
                        Finding::error(
                            INVALID_AGGREGATION_DOMAIN,
                            "Calculation relationship has invalid domain {domain} in link role {linkrole}",
                        )
                        .param("domain", &from_concept.qname)
                        .param("linkrole", &rel.linkrole)
                        .object(rel.locator()),
                    );
                }
                continue;
            }

            if rel.arcrole == Arcrole::BalanceChanges
                && (!from_concept.is_instant() || !to_concept.is_duration())
            {
                self.sink.report(
                    Finding::error(
                        INVALID_BALANCE_CHANGES_PERIOD_TYPE,
                        "Balance-changes relationship must have instant source concept and duration target concept in link role {linkrole}",
                    )
                    .param("linkrole", &rel.linkrole)
                    .object(rel.locator()),
                );
            }

            let weight = rel.weight;
            if weight != Some(Decimal::ONE) && weight != Some(Decimal::NEGATIVE_ONE) {
                self.sink.report(
                    Finding::error(
                        INVALID_WEIGHT,
                        "Calculation relationship has invalid weight from {source} to {target} in link role {linkrole}",
                    )
                    .param("source", &from_concept.qname)
                    .param("target", &to_concept.qname)
                    .param("linkrole", &rel.linkrole)
                    .param("weight", weight.map_or_else(|| "(none)".to_string(), |w| w.to_string()))
                    .object(rel.locator()),
                );
            }

            if let (Some(from_balance), Some(to_balance), Some(weight)) =
                (from_concept.balance, to_concept.balance, weight)
            {
                if illegal_balance_weight(from_balance, to_balance, weight) {
                    let code = if weight.is_sign_negative() {
                        BALANCE_WEIGHT_ILLEGAL_NEGATIVE
                    } else {
                        BALANCE_WEIGHT_ILLEGAL_POSITIVE
                    };
                    self.sink.report(
                        Finding::error(
                            code,
                            "Calculation relationship has illegal weight {weight} from {source}, {sourceBalance}, to {target}, {targetBalance}, in link role {linkrole}",
                        )
                        .param("weight", weight)
                        .param("source", &from_concept.qname)
                        .param("sourceBalance", from_balance)
                        .param("target", &to_concept.qname)
                        .param("targetBalance", to_balance)
                        .param("linkrole", &rel.linkrole)
                        .object(rel.locator()),
                    );
                }
            }

            if !from_concept.is_numeric() || !to_concept.is_numeric() {
                let decorate = |numeric: bool| if numeric { "" } else { " (non-numeric)" };
                self.sink.report(
                    Finding::error(
                        NON_NUMERIC_CALC,
                        "Calculation relationship has illegal concept from {source}{sourceNumericDecorator} to {target}{targetNumericDecorator} in link role {linkrole}",
                    )
                    .param("source", &from_concept.qname)
                    .param("sourceNumericDecorator", decorate(from_concept.is_numeric()))
                    .param("target", &to_concept.qname)
                    .param("targetNumericDecorator", decorate(to_concept.is_numeric()))
                    .param("linkrole", &rel.linkrole)
                    .object(rel.locator()),
                );
            }
        }
    }

    /// Section facts ordered by their concept label, then document order.
    fn sections(&self) -> Vec<FactId> {
        let model = self.run.model;
        let section_set = self.run.relationship_sets().for_arcrole(Arcrole::SectionFact);
        let mut sections: Vec<FactId> = section_set
            .from_model_objects()
            .iter()
            .filter_map(ModelObject::as_fact)
            .collect();
        sections.sort_by(|a, b| {
            let la = model.concept(model.fact(*a).concept).display_label();
            let lb = model.concept(model.fact(*b).concept).display_label();
            la.cmp(lb).then(a.cmp(b))
        });
        sections
    }

    fn check_section(&mut self, section: FactId) {
        let run = self.run;
        let model = run.model;
        let sets = run.relationship_sets();
        let section_concept = model.concept(model.fact(section).concept);
        self.section = section_concept.display_label().to_string();
        let linkroles = LinkroleFilter::from_list(&section_concept.calc_linkroles);

        let section_rels = sets.get(&[Arcrole::SectionFact], linkroles.clone());
        let mut facts: Vec<FactId> = section_rels
            .from_model_object(ModelObject::Fact(section))
            .iter()
            .filter_map(|id| model.relationship(*id).to.and_then(|o| o.as_fact()))
            .filter(|id| {
                let fact = model.fact(*id);
                fact.context.is_some()
                    && fact.unit.is_some()
                    && model.concept(fact.concept).is_numeric()
            })
            .collect();
        facts.sort_unstable();
        facts.dedup();

        let section_facts = self.deduplicate(&facts);
        info!(
            "Section {}: {} facts ({} after deduplication)",
            self.section,
            facts.len(),
            section_facts.len()
        );

        let calc_set = sets.get(&Arcrole::calculation_arcroles(), linkroles);
        let aggregation_dims: BTreeSet<ConceptId> = calc_set
            .model_relationships()
            .iter()
            .map(|id| model.relationship(*id))
            .filter(|rel| rel.arcrole == Arcrole::AggregationDomain)
            .filter_map(|rel| rel.dimension)
            .collect();
        let bindings = SectionBindings::bind(model, &self.equivalence, &section_facts, &aggregation_dims);
        debug!(
            "Section {} bindings: {} summation, {} balance, {} aggregation",
            self.section,
            bindings.sum_facts.len(),
            bindings.per_facts.len(),
            bindings.agg_facts.len()
        );

        for root in calc_roots(&calc_set) {
            let mut visited = HashSet::from([root]);
            self.walk(&bindings, &calc_set, root, None, &mut visited);
        }
    }

    /// Collapses duplicate facts to one representative per
    /// (concept, context class, unit class), keeping the most precise.
    fn deduplicate(&mut self, facts: &[FactId]) -> Vec<FactId> {
        let model = self.run.model;
        let mut order = Vec::new();
        let mut groups: HashMap<(ConceptId, ContextId, UnitId), Vec<FactId>> = HashMap::new();
        for &id in facts {
            let fact = model.fact(id);
            let (Some(context), Some(unit)) = (fact.context, fact.unit) else {
                continue;
            };
            let key = (
                fact.concept,
                self.equivalence.context(context),
                self.equivalence.unit(unit),
            );
            groups
                .entry(key)
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(id);
        }

        let mut section_facts = Vec::with_capacity(order.len());
        for key in order {
            let group = &groups[&key];
            if group.len() == 1 {
                section_facts.push(group[0]);
                continue;
            }

            let mut representative = group[0];
            let mut best = inferred_decimals(model.fact(representative));
            for &id in &group[1..] {
                let decimals = inferred_decimals(model.fact(id));
                if decimals > best {
                    representative = id;
                    best = decimals;
                }
            }

            let values: Vec<BoundValue> = group
                .iter()
                .filter_map(|id| fact_value(model.fact(*id)))
                .collect();
            if !duplicates_consistent(&values) {
                let fact = model.fact(representative);
                let reported: Vec<String> = group
                    .iter()
                    .map(|id| {
                        model
                            .fact(*id)
                            .value
                            .as_deref()
                            .map_or_else(|| "nil".to_string(), truncate)
                    })
                    .collect();
                self.sink.report(
                    Finding::inconsistency(
                        INCONSISTENT_DUPLICATE,
                        "Section {section} contained {fact} inconsistent in contexts equivalent to {contextID}: values {values}",
                    )
                    .param("section", &self.section)
                    .param("fact", model.qname(fact.concept))
                    .param("contextID", fact.context.map_or("", |c| model.context(c).id.as_str()))
                    .param("values", reported.join(", "))
                    .objects(group.iter().map(|id| model.object_name(ModelObject::Fact(*id)))),
                );
            }
            section_facts.push(representative);
        }
        section_facts
    }

    fn walk(
        &mut self,
        bindings: &SectionBindings,
        rel_set: &RelationshipSet,
        parent: ConceptId,
        inferred_parent: Option<&mut InferredValues>,
        visited: &mut HashSet<ConceptId>,
    ) {
        let model = self.run.model;
        let child_rels = rel_set.from_model_object(ModelObject::Concept(parent));
        if child_rels.is_empty() {
            return;
        }
        visited.insert(parent);

        let mut inferred_children = InferredValues::default();
        for &id in child_rels {
            let rel = model.relationship(id);
            if rel.arcrole == Arcrole::AggregationDomain {
                self.check_aggregation(bindings, parent, rel);
                continue;
            }
            let Some(child) = rel.to_concept() else {
                continue;
            };
            if visited.contains(&child) {
                continue;
            }
            self.walk(bindings, rel_set, child, Some(&mut inferred_children), visited);
        }

        let summation_children =
            unvisited_children(model, child_rels, Arcrole::SummationItem, visited);
        let balance_children =
            unvisited_children(model, child_rels, Arcrole::BalanceChanges, visited);

        self.check_summations(
            bindings,
            parent,
            &summation_children,
            &inferred_children,
            inferred_parent,
        );
        self.check_balances(bindings, parent, &balance_children, &inferred_children);

        visited.remove(&parent);
    }

    fn check_summations(
        &mut self,
        bindings: &SectionBindings,
        parent: ConceptId,
        children: &[(&Relationship, ConceptId)],
        inferred_children: &InferredValues,
        mut inferred_parent: Option<&mut InferredValues>,
    ) {
        if children.is_empty() {
            return;
        }
        let model = self.run.model;

        let mut keys: BTreeSet<SumKey> = BTreeSet::new();
        for (_, child) in children {
            if let Some(child_keys) = bindings.sum_keys.get(child) {
                keys.extend(child_keys.iter().copied());
            }
            keys.extend(
                inferred_children
                    .sums
                    .keys()
                    .filter(|(c, _)| c == child)
                    .map(|(_, key)| *key),
            );
        }

        for key in keys {
            let mut computed = BoundValue::zero();
            let mut contributing = Vec::new();
            for (rel, child) in children {
                let weight = rel.weight.unwrap_or(Decimal::ONE);
                if let Some(fact) = bindings.sum_fact(*child, key) {
                    if let Some((value, _)) = bindings.value(fact) {
                        computed = computed.add_weighted(weight, value);
                        contributing.push(fact);
                    }
                } else if let Some(value) = inferred_children.sums.get(&(*child, key)) {
                    computed = computed.add_weighted(weight, value);
                }
            }

            let Some(parent_fact) = bindings.sum_fact(parent, key) else {
                if let Some(inferred) = inferred_parent.as_mut() {
                    inferred.sums.insert((parent, key), computed);
                }
                continue;
            };
            let Some((reported, decimals)) = bindings.value(parent_fact) else {
                continue;
            };
            let (BoundValue::Range(reported_range), BoundValue::Range(computed_range)) =
                (reported, &computed)
            else {
                continue;
            };
            if reported_range.overlaps(computed_range) {
                continue;
            }

            let unreported: Vec<&str> = children
                .iter()
                .filter(|(_, c)| bindings.sum_fact(*c, key).is_none())
                .map(|(_, c)| model.qname(*c))
                .collect();
            let (context, unit) = key;
            self.sink.report(
                Finding::inconsistency(
                    SUMMATION_INCONSISTENCY,
                    "Summation inconsistent from {concept} in section {section} reported sum {reportedSum}, computed sum {computedSum} context {contextID} unit {unitID} unreportedContributingItems {unreportedContributors}",
                )
                .param("concept", model.qname(parent))
                .param("section", &self.section)
                .param("reportedSum", format_bound_value(reported, *decimals))
                .param("computedSum", format_bound_value(&computed, *decimals))
                .param("contextID", &model.context(context).id)
                .param("unitID", &model.unit(unit).id)
                .param("unreportedContributors", join_or_none(&unreported))
                .object(model.object_name(ModelObject::Fact(parent_fact)))
                .objects(
                    contributing
                        .iter()
                        .map(|f| model.object_name(ModelObject::Fact(*f))),
                ),
            );
        }
    }

    /// Values of one balance-changes child by period key: reported facts,
    /// then values inferred for it from its own summation children.
    fn change_values(
        &self,
        bindings: &SectionBindings,
        child: ConceptId,
        inferred_children: &InferredValues,
    ) -> BTreeMap<PerKey, (BoundValue, Option<FactId>)> {
        let model = self.run.model;
        let mut values = BTreeMap::new();
        for key in bindings.per_keys.get(&child).into_iter().flatten() {
            if let Some(fact) = bindings.per_fact(child, *key) {
                if let Some((value, _)) = bindings.value(fact) {
                    values.insert(*key, (*value, Some(fact)));
                }
            }
        }
        for ((concept, (context, unit)), value) in &inferred_children.sums {
            if *concept != child {
                continue;
            }
            if let Some(key) = per_key(model, *context, *unit) {
                values.entry(key).or_insert((*value, None));
            }
        }
        values
    }

    fn check_balances(
        &mut self,
        bindings: &SectionBindings,
        parent: ConceptId,
        children: &[(&Relationship, ConceptId)],
        inferred_children: &InferredValues,
    ) {
        if children.is_empty() {
            return;
        }
        let model = self.run.model;

        let mut changes: BTreeMap<PerKey, BoundValue> = BTreeMap::new();
        let mut contributing: BTreeMap<PerKey, Vec<FactId>> = BTreeMap::new();
        for (rel, child) in children {
            let weight = rel.weight.unwrap_or(Decimal::ONE);
            for (key, (value, fact)) in self.change_values(bindings, *child, inferred_children) {
                let total = changes.entry(key).or_insert_with(BoundValue::zero);
                *total = total.add_weighted(weight, &value);
                if let Some(fact) = fact {
                    contributing.entry(key).or_default().push(fact);
                }
            }
        }

        for (&key, change) in &changes {
            let (Some(mut start), Some(mut end)) = (key.start, key.end) else {
                continue;
            };
            let Some(end_fact) = bindings.per_fact(parent, key.instant(end)) else {
                continue;
            };
            let Some((end_balance, decimals)) = bindings.value(end_fact) else {
                continue;
            };

            let mut computed = *change;
            let start_balance = loop {
                if let Some(start_fact) = bindings.per_fact(parent, key.instant(start)) {
                    break bindings.value(start_fact).map(|(value, _)| *value);
                }
                // back up one adjacent period of the same nominal length
                let nominal = nominal_period_between(start, end);
                let earlier = bindings
                    .duration_starts
                    .get(&nominal)
                    .into_iter()
                    .flat_map(|starts| starts.iter().rev())
                    .copied()
                    .find(|s| {
                        *s < start
                            && nominal_period_between(*s, start) == nominal
                            && changes.contains_key(&key.duration(*s, start))
                    });
                let Some(earlier) = earlier else {
                    break None;
                };
                computed = computed.add_weighted(Decimal::ONE, &changes[&key.duration(earlier, start)]);
                end = start;
                start = earlier;
            };

            let Some(start_balance) = start_balance else {
                debug!(
                    "No starting balance for {} before {}",
                    model.qname(parent),
                    start
                );
                continue;
            };
            let expected = end_balance.sub(&start_balance);
            let (BoundValue::Range(expected_range), BoundValue::Range(computed_range)) =
                (&expected, &computed)
            else {
                continue;
            };
            if expected_range.overlaps(computed_range) {
                continue;
            }

            let unreported: Vec<&str> = children
                .iter()
                .filter(|(_, c)| bindings.per_fact(*c, key).is_none())
                .map(|(_, c)| model.qname(*c))
                .collect();
            let end_fact_ref = model.fact(end_fact);
            self.sink.report(
                Finding::inconsistency(
                    BALANCE_INCONSISTENCY,
                    "Balance inconsistent from {concept} in section {section} reported sum {reportedSum}, computed sum {computedSum} context {contextID} unit {unitID} unreportedContributingItems {unreportedContributors}",
                )
                .param("concept", model.qname(parent))
                .param("section", &self.section)
                .param("reportedSum", format_bound_value(&expected, *decimals))
                .param("computedSum", format_bound_value(&computed, *decimals))
                .param("contextID", end_fact_ref.context.map_or("", |c| model.context(c).id.as_str()))
                .param("unitID", end_fact_ref.unit.map_or("", |u| model.unit(u).id.as_str()))
                .param("unreportedContributors", join_or_none(&unreported))
                .object(model.object_name(ModelObject::Fact(end_fact)))
                .objects(
                    contributing
                        .get(&key)
                        .into_iter()
                        .flatten()
                        .map(|f| model.object_name(ModelObject::Fact(*f))),
                ),
            );
        }
    }

    /// Checks the members of the arc's dimension against their domain
    /// totals for every bound context of `concept`.
    fn check_aggregation(&mut self, bindings: &SectionBindings, concept: ConceptId, rel: &Relationship) {
        let run = self.run;
        let model = run.model;
        let sets = run.relationship_sets();
        let Some(dim) = rel.dimension else {
            return;
        };
        if rel.to_concept() != Some(concept) {
            return;
        }
        let Some(keys) = bindings.agg_keys.get(&(concept, dim)) else {
            return;
        };

        let dimension_domains = match &rel.target_role {
            Some(role) => sets.for_arcrole_in(Arcrole::DimensionDomain, role),
            None => sets.for_arcrole(Arcrole::DimensionDomain),
        };
        let declared_default = sets
            .for_arcrole(Arcrole::DimensionDefault)
            .from_model_object(ModelObject::Concept(dim))
            .iter()
            .find_map(|id| model.relationship(*id).to_concept());

        for &dd_id in dimension_domains.from_model_object(ModelObject::Concept(dim)) {
            let dd_rel = model.relationship(dd_id);
            let Some(domain) = dd_rel.to_concept() else {
                continue;
            };
            let scope = AggregationScope {
                concept,
                dim,
                default_member: declared_default.unwrap_or(domain),
            };
            for key in keys {
                let mut on_path = HashSet::new();
                self.aggregate(
                    bindings,
                    &scope,
                    *key,
                    domain,
                    dd_rel.consecutive_linkrole(),
                    &mut on_path,
                );
            }
        }
    }

    /// Reported value of `member`, checked against the sum of its
    /// domain-member children; returns the reported value or, if none,
    /// the computed one.
    fn aggregate(
        &mut self,
        bindings: &SectionBindings,
        scope: &AggregationScope,
        key: AggKey,
        member: ConceptId,
        elr: &str,
        on_path: &mut HashSet<ConceptId>,
    ) -> Option<BoundValue> {
        if !on_path.insert(member) {
            return None;
        }
        let run = self.run;
        let model = run.model;
        let members = run
            .relationship_sets()
            .for_arcrole_in(Arcrole::DomainMember, elr);

        let mut computed: Option<BoundValue> = None;
        for &id in members.from_model_object(ModelObject::Concept(member)) {
            let rel = model.relationship(id);
            let Some(child) = rel.to_concept() else {
                continue;
            };
            if let Some(value) = self.aggregate(
                bindings,
                scope,
                key,
                child,
                rel.consecutive_linkrole(),
                on_path,
            ) {
                computed = Some(
                    computed
                        .unwrap_or_else(BoundValue::zero)
                        .add_weighted(Decimal::ONE, &value),
                );
            }
        }
        on_path.remove(&member);

        let reported_fact =
            bindings.agg_fact(scope.concept, scope.dim, key, member, scope.default_member);
        let reported = reported_fact.and_then(|f| bindings.value(f).map(|v| (f, *v)));

        if let (Some((fact, (reported_value, decimals))), Some(computed_value)) =
            (reported, computed)
        {
            if let (BoundValue::Range(r), BoundValue::Range(c)) = (&reported_value, &computed_value)
            {
                if !r.overlaps(c) {
                    let fact_ref = model.fact(fact);
                    self.sink.report(
                        Finding::inconsistency(
                            AGGREGATION_INCONSISTENCY,
                            "Aggregation inconsistent for {concept} in section {section} dimension {dimension} member {member} reported sum {reportedSum}, computed sum {computedSum} context {contextID} unit {unitID}",
                        )
                        .param("concept", model.qname(scope.concept))
                        .param("section", &self.section)
                        .param("dimension", model.qname(scope.dim))
                        .param("member", model.qname(member))
                        .param("reportedSum", format_bound_value(&reported_value, decimals))
                        .param("computedSum", format_bound_value(&computed_value, decimals))
                        .param("contextID", fact_ref.context.map_or("", |c| model.context(c).id.as_str()))
                        .param("unitID", fact_ref.unit.map_or("", |u| model.unit(u).id.as_str()))
                        .object(model.object_name(ModelObject::Fact(fact))),
                    );
                }
            }
        }

        reported.map(|(_, (value, _))| value).or(computed)
    }
}

struct AggregationScope {
    concept: ConceptId,
    dim: ConceptId,
    default_member: ConceptId,
}

/// Same balance with a negative weight, or opposite balances with a
/// positive weight.
pub fn illegal_balance_weight(from: Balance, to: Balance, weight: Decimal) -> bool {
    (from == to && weight.is_sign_negative() && !weight.is_zero())
        || (from != to && weight.is_sign_positive() && !weight.is_zero())
}

/// Tree roots of the section's calculation set. Aggregation-domain arcs
/// loop from a concept to itself and do not make it a child.
fn calc_roots(calc_set: &RelationshipSet) -> Vec<ConceptId> {
    calc_set
        .root_concepts()
        .iter()
        .filter_map(ModelObject::as_concept)
        .collect()
}

fn unvisited_children<'m>(
    model: &'m XbrlModel,
    rels: &[RelId],
    arcrole: Arcrole,
    visited: &HashSet<ConceptId>,
) -> Vec<(&'m Relationship, ConceptId)> {
    rels.iter()
        .map(|id| model.relationship(*id))
        .filter(|rel| rel.arcrole == arcrole)
        .filter_map(|rel| rel.to_concept().map(|c| (rel, c)))
        .filter(|(_, c)| !visited.contains(c))
        .collect()
}

fn join_or_none(names: &[&str]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_illegal_balance_weight() {
        use Balance::{Credit, Debit};
        assert!(!illegal_balance_weight(Debit, Debit, Decimal::ONE));
        assert!(illegal_balance_weight(Debit, Debit, Decimal::NEGATIVE_ONE));
        assert!(illegal_balance_weight(Debit, Credit, Decimal::ONE));
        assert!(!illegal_balance_weight(Credit, Debit, Decimal::NEGATIVE_ONE));
    }

    #[test]
    fn test_truncate_long_values() {
        let long = "9".repeat(200);
        let short = truncate(&long);
        assert_eq!(short.chars().count(), MAX_VALUE_CHARS + 3);
        assert_eq!(truncate("100"), "100");
    }

    #[test]
    fn test_join_or_none() {
        assert_eq!(join_or_none(&[]), "none");
        assert_eq!(join_or_none(&["ex:A", "ex:B"]), "ex:A, ex:B");
    }
}
