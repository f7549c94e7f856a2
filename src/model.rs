//! Resolved, indexed, read-only view of an instance and its DTS.
//!
//! `XbrlModel` is built once from a [`DocumentSource`] and never mutated by the
//! validators. Cross references are resolved into typed indices so that the
//! checkers work on small `Copy` ids instead of qname strings.

use crate::error::{Result, XbrlValidationError};
use crate::schema::{
    Arcrole, ConceptDef, DimensionValueDef, DocumentSource, EntityIdentifier, LocatorDef, Period,
    PeriodType, SubstitutionGroup, UnitCategory,
};
use crate::utils::{period_bounds, stable_hash_with};
use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

macro_rules! model_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub struct $name(pub u32);

        impl $name {
            #[inline(always)]
            pub fn index(&self) -> usize {
                self.0 as usize
            }

            pub fn new(idx: usize) -> Self {
                Self(idx as u32)
            }
        }
    };
}

model_id!(ConceptId);
model_id!(ContextId);
model_id!(UnitId);
model_id!(FactId);
model_id!(RelId);

/// A resolved arc endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ModelObject {
    Concept(ConceptId),
    Fact(FactId),
}

impl ModelObject {
    pub fn as_concept(&self) -> Option<ConceptId> {
        match self {
            ModelObject::Concept(id) => Some(*id),
            ModelObject::Fact(_) => None,
        }
    }

    pub fn as_fact(&self) -> Option<FactId> {
        match self {
            ModelObject::Fact(id) => Some(*id),
            ModelObject::Concept(_) => None,
        }
    }
}

impl ConceptDef {
    pub fn is_numeric(&self) -> bool {
        self.numeric
    }

    pub fn is_monetary(&self) -> bool {
        self.numeric && self.unit_category == Some(UnitCategory::Monetary)
    }

    pub fn is_hypercube_item(&self) -> bool {
        self.substitution_group == SubstitutionGroup::HypercubeItem
    }

    pub fn is_dimension_item(&self) -> bool {
        self.substitution_group == SubstitutionGroup::DimensionItem
    }

    pub fn is_explicit_dimension(&self) -> bool {
        self.is_dimension_item() && !self.typed_domain
    }

    pub fn is_typed_dimension(&self) -> bool {
        self.is_dimension_item() && self.typed_domain
    }

    /// Items that may appear as domain members: neither hypercubes nor dimensions.
    pub fn is_domain_member(&self) -> bool {
        self.substitution_group == SubstitutionGroup::Item
    }

    pub fn is_primary_item(&self) -> bool {
        self.is_domain_member()
    }

    pub fn is_instant(&self) -> bool {
        self.period_type == PeriodType::Instant
    }

    pub fn is_duration(&self) -> bool {
        self.period_type == PeriodType::Duration
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.qname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemberValue {
    Explicit(ConceptId),
    Typed(String),
}

#[derive(Debug, Clone)]
pub struct Context {
    pub id: String,
    pub entity: EntityIdentifier,
    pub period: Period,
    pub dimensions: BTreeMap<ConceptId, MemberValue>,
}

impl Context {
    pub fn is_forever(&self) -> bool {
        matches!(self.period, Period::Forever)
    }

    /// Start and end under the end-of-day convention of [`period_bounds`].
    pub fn bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        period_bounds(&self.period)
    }

    /// Hash of (period, entity, dimension set); equal contexts always hash equal.
    pub fn signature_hash(&self) -> u64 {
        stable_hash_with(|hasher| {
            self.period.hash(hasher);
            self.entity.hash(hasher);
            self.dimensions.hash(hasher);
        })
    }

    pub fn is_equal_to(&self, other: &Context) -> bool {
        self.period == other.period
            && self.entity == other.entity
            && self.dimensions == other.dimensions
    }
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: String,
    pub numerator: Vec<String>,
    pub denominator: Vec<String>,
}

impl Unit {
    /// Numerator and denominator measures in canonical (sorted) order.
    pub fn measures(&self) -> (Vec<&str>, Vec<&str>) {
        let mut num: Vec<&str> = self.numerator.iter().map(String::as_str).collect();
        let mut den: Vec<&str> = self.denominator.iter().map(String::as_str).collect();
        num.sort_unstable();
        den.sort_unstable();
        (num, den)
    }

    pub fn signature_hash(&self) -> u64 {
        let measures = self.measures();
        stable_hash_with(|hasher| measures.hash(hasher))
    }

    pub fn is_equal_to(&self, other: &Unit) -> bool {
        self.measures() == other.measures()
    }
}

#[derive(Debug, Clone)]
pub struct Fact {
    pub id: Option<String>,
    pub concept: ConceptId,
    pub context: Option<ContextId>,
    pub unit: Option<UnitId>,
    pub value: Option<String>,
    pub decimals: Option<String>,
    pub precision: Option<String>,
}

impl Fact {
    pub fn is_nil(&self) -> bool {
        self.value.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Relationship {
    pub arcrole: Arcrole,
    pub linkrole: String,
    pub from: Option<ModelObject>,
    pub to: Option<ModelObject>,
    pub weight: Option<Decimal>,
    pub order: f64,
    pub target_role: Option<String>,
    pub closed: bool,
    pub usable: bool,
    pub dimension: Option<ConceptId>,
    pub dimension_qname: Option<String>,
    pub link_qname: Option<String>,
    pub arc_qname: Option<String>,
    pub document: Option<String>,
    pub line: Option<u32>,
}

impl Relationship {
    pub fn from_concept(&self) -> Option<ConceptId> {
        self.from.and_then(|o| o.as_concept())
    }

    pub fn to_concept(&self) -> Option<ConceptId> {
        self.to.and_then(|o| o.as_concept())
    }

    /// Link role where the next consecutive arc is resolved.
    pub fn consecutive_linkrole(&self) -> &str {
        self.target_role.as_deref().unwrap_or(&self.linkrole)
    }

    /// `document:line` locator for diagnostics.
    pub fn locator(&self) -> String {
        format!(
            "{}:{}",
            self.document.as_deref().unwrap_or("unknown"),
            self.line.map_or_else(|| "?".to_string(), |l| l.to_string())
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct XbrlModel {
    concepts: Vec<ConceptDef>,
    contexts: Vec<Context>,
    units: Vec<Unit>,
    facts: Vec<Fact>,
    relationships: Vec<Relationship>,
    concept_index: HashMap<String, ConceptId>,
    context_index: HashMap<String, ContextId>,
    unit_index: HashMap<String, UnitId>,
    fact_index: HashMap<String, FactId>,
    facts_by_concept: HashMap<ConceptId, Vec<FactId>>,
}

impl XbrlModel {
    pub fn from_json(json: &str) -> Result<Self> {
        let source = DocumentSource::from_json(json)?;
        Self::from_source(source)
    }

    pub fn from_source(source: DocumentSource) -> Result<Self> {
        let mut model = XbrlModel::default();

        for concept in source.concepts {
            if model.concept_index.contains_key(&concept.qname) {
                return Err(XbrlValidationError::InvalidModel {
                    object: concept.qname.clone(),
                    details: "duplicate concept declaration".to_string(),
                });
            }
            let id = ConceptId::new(model.concepts.len());
            model.concept_index.insert(concept.qname.clone(), id);
            model.concepts.push(concept);
        }

        for context in source.contexts {
            if model.context_index.contains_key(&context.id) {
                return Err(XbrlValidationError::InvalidModel {
                    object: context.id.clone(),
                    details: "duplicate context id".to_string(),
                });
            }
            let mut dimensions = BTreeMap::new();
            for (dim_qname, value) in &context.dimensions {
                let dim = model.require_concept(dim_qname, &context.id)?;
                let member = match value {
                    DimensionValueDef::Explicit(member_qname) => {
                        MemberValue::Explicit(model.require_concept(member_qname, &context.id)?)
                    }
                    DimensionValueDef::Typed(value) => MemberValue::Typed(value.clone()),
                };
                dimensions.insert(dim, member);
            }
            let id = ContextId::new(model.contexts.len());
            model.context_index.insert(context.id.clone(), id);
            model.contexts.push(Context {
                id: context.id,
                entity: context.entity,
                period: context.period,
                dimensions,
            });
        }

        for unit in source.units {
            if model.unit_index.contains_key(&unit.id) {
                return Err(XbrlValidationError::InvalidModel {
                    object: unit.id.clone(),
                    details: "duplicate unit id".to_string(),
                });
            }
            let id = UnitId::new(model.units.len());
            model.unit_index.insert(unit.id.clone(), id);
            model.units.push(Unit {
                id: unit.id,
                numerator: unit.numerator,
                denominator: unit.denominator,
            });
        }

        for fact in source.facts {
            let fact_label = fact.id.clone().unwrap_or_else(|| fact.concept.clone());
            let concept = model.require_concept(&fact.concept, &fact_label)?;
            let context = fact.context.as_ref().and_then(|c| {
                let resolved = model.context_index.get(c).copied();
                if resolved.is_none() {
                    warn!("Fact {} references unknown context {}", fact_label, c);
                }
                resolved
            });
            let unit = fact.unit.as_ref().and_then(|u| {
                let resolved = model.unit_index.get(u).copied();
                if resolved.is_none() {
                    warn!("Fact {} references unknown unit {}", fact_label, u);
                }
                resolved
            });

            let id = FactId::new(model.facts.len());
            if let Some(fact_id) = &fact.id {
                model.fact_index.insert(fact_id.clone(), id);
            }
            model.facts_by_concept.entry(concept).or_default().push(id);
            model.facts.push(Fact {
                id: fact.id,
                concept,
                context,
                unit,
                value: fact.value,
                decimals: fact.decimals,
                precision: fact.precision,
            });
        }

        for rel in source.relationships {
            let from = model.resolve_locator(&rel.from);
            let to = model.resolve_locator(&rel.to);
            if from.is_none() || to.is_none() {
                warn!(
                    "Relationship {} in {} has an unresolvable endpoint ({:?} -> {:?})",
                    rel.arcrole, rel.linkrole, rel.from, rel.to
                );
            }
            let dimension = rel
                .dimension
                .as_ref()
                .and_then(|q| model.concept_index.get(q).copied());

            model.relationships.push(Relationship {
                arcrole: rel.arcrole,
                linkrole: rel.linkrole,
                from,
                to,
                weight: rel.weight,
                order: rel.order,
                target_role: rel.target_role.filter(|r| !r.is_empty()),
                closed: rel.closed.unwrap_or(false),
                usable: rel.usable,
                dimension,
                dimension_qname: rel.dimension,
                link_qname: rel.link_qname,
                arc_qname: rel.arc_qname,
                document: rel.document,
                line: rel.line,
            });
        }

        debug!(
            "Model built: {} concepts, {} contexts, {} units, {} facts, {} relationships",
            model.concepts.len(),
            model.contexts.len(),
            model.units.len(),
            model.facts.len(),
            model.relationships.len()
        );

        Ok(model)
    }

    fn require_concept(&self, qname: &str, referenced_by: &str) -> Result<ConceptId> {
        self.concept_index
            .get(qname)
            .copied()
            .ok_or_else(|| XbrlValidationError::InvalidModel {
                object: referenced_by.to_string(),
                details: format!("unknown concept {}", qname),
            })
    }

    fn resolve_locator(&self, locator: &LocatorDef) -> Option<ModelObject> {
        match locator {
            LocatorDef::Concept(qname) => self
                .concept_index
                .get(qname)
                .map(|id| ModelObject::Concept(*id)),
            LocatorDef::Fact(id) => self.fact_index.get(id).map(|id| ModelObject::Fact(*id)),
        }
    }

    // --- Accessors ---
    pub fn concept(&self, id: ConceptId) -> &ConceptDef {
        &self.concepts[id.index()]
    }

    pub fn concept_by_qname(&self, qname: &str) -> Option<ConceptId> {
        self.concept_index.get(qname).copied()
    }

    pub fn context(&self, id: ContextId) -> &Context {
        &self.contexts[id.index()]
    }

    pub fn context_by_id(&self, id: &str) -> Option<ContextId> {
        self.context_index.get(id).copied()
    }

    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id.index()]
    }

    pub fn fact(&self, id: FactId) -> &Fact {
        &self.facts[id.index()]
    }

    pub fn fact_by_id(&self, id: &str) -> Option<FactId> {
        self.fact_index.get(id).copied()
    }

    pub fn relationship(&self, id: RelId) -> &Relationship {
        &self.relationships[id.index()]
    }

    pub fn relationships(&self) -> impl Iterator<Item = (RelId, &Relationship)> {
        self.relationships
            .iter()
            .enumerate()
            .map(|(i, r)| (RelId::new(i), r))
    }

    pub fn context_ids(&self) -> impl Iterator<Item = ContextId> {
        (0..self.contexts.len()).map(ContextId::new)
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = UnitId> {
        (0..self.units.len()).map(UnitId::new)
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn has_contexts(&self) -> bool {
        !self.contexts.is_empty()
    }

    pub fn has_facts(&self) -> bool {
        !self.facts.is_empty()
    }

    pub fn facts_by_concept(&self, concept: ConceptId) -> &[FactId] {
        self.facts_by_concept
            .get(&concept)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn qname(&self, concept: ConceptId) -> &str {
        &self.concept(concept).qname
    }

    /// Qname of a concept, or the fact's id (falling back to its concept qname).
    pub fn object_name(&self, object: ModelObject) -> String {
        match object {
            ModelObject::Concept(id) => self.qname(id).to_string(),
            ModelObject::Fact(id) => {
                let fact = self.fact(id);
                fact.id
                    .clone()
                    .unwrap_or_else(|| self.qname(fact.concept).to_string())
            }
        }
    }
}

/// Representative context and unit for each aspect-equal group.
///
/// Contexts are bucketed by [`Context::signature_hash`] and confirmed with a
/// deep comparison inside the bucket, so equal-looking contexts with
/// different ids collapse onto the first one in document order.
#[derive(Debug, Clone)]
pub struct EquivalenceClasses {
    contexts: Vec<ContextId>,
    units: Vec<UnitId>,
}

impl EquivalenceClasses {
    pub fn build(model: &XbrlModel) -> Self {
        let contexts = Self::group(
            model.context_ids(),
            |id| model.context(id).signature_hash(),
            |a, b| model.context(a).is_equal_to(model.context(b)),
        );
        let units = Self::group(
            model.unit_ids(),
            |id| model.unit(id).signature_hash(),
            |a, b| model.unit(a).is_equal_to(model.unit(b)),
        );
        debug!(
            "Equivalence classes: {} contexts, {} units",
            contexts.len(),
            units.len()
        );
        Self { contexts, units }
    }

    fn group<T: Copy + Eq>(
        ids: impl Iterator<Item = T>,
        hash: impl Fn(T) -> u64,
        equal: impl Fn(T, T) -> bool,
    ) -> Vec<T> {
        let mut buckets: HashMap<u64, Vec<T>> = HashMap::new();
        let mut representatives = Vec::new();
        for id in ids {
            let bucket = buckets.entry(hash(id)).or_default();
            let representative = match bucket.iter().copied().find(|rep| equal(*rep, id)) {
                Some(rep) => rep,
                None => {
                    bucket.push(id);
                    id
                }
            };
            representatives.push(representative);
        }
        representatives
    }

    pub fn context(&self, id: ContextId) -> ContextId {
        self.contexts[id.index()]
    }

    pub fn unit(&self, id: UnitId) -> UnitId {
        self.units[id.index()]
    }
}
