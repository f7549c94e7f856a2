//! Dimensional relationship set (DRS) structure and cycle checks.
//!
//! Every link role holding `all` or `notAll` arcs is treated as a DRS root.
//! For each one the checker validates the has-hypercube arcs, resolves the
//! hypercube's dimensions and domains through `targetRole` redirection, and
//! searches the flattened domain-member network for undirected cycles.
//!
//! Cycle detection keeps an on-stack map of concept to the link roles in
//! which that concept is currently being expanded. A forward arc that lands
//! on an on-stack (concept, role) pair is a directed cycle. After each
//! forward descent the checker also looks for a reverse path from the
//! target back to any on-stack concept, which catches diamonds and other
//! undirected cycles.

use crate::config::DisclosureSystem;
use crate::engine::ValidationRun;
use crate::model::{ConceptId, ModelObject, RelId, XbrlModel};
use crate::relationships::RelationshipSet;
use crate::report::{Finding, FindingSink};
use crate::schema::Arcrole;
use log::{debug, info};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Dimension rules with a disclosure-system specific code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionRule {
    AllNotClosed,
    NotAllClosed,
    NotAllAlsoPositive,
    MissingTargetRoleRelationship,
    NegativeAxisNotInPositiveTable,
    UndirectedCycle,
    MultipleTables,
    ExplicitDimensionWithoutTargetRole,
    TypedDimensionWithTargetRole,
}

impl DimensionRule {
    pub fn code(self, disclosure_system: DisclosureSystem) -> &'static str {
        let efm = disclosure_system == DisclosureSystem::Efm;
        match self {
            DimensionRule::AllNotClosed => "SBR.NL.2.3.6.04",
            DimensionRule::NotAllClosed => if efm { "EFM.6.16.06" } else { "GFM.1.08.06" },
            DimensionRule::NotAllAlsoPositive => if efm { "EFM.6.16.08" } else { "GFM.1.08.08" },
            DimensionRule::MissingTargetRoleRelationship => {
                if efm { "EFM.6.16.09" } else { "GFM.1.08.09" }
            }
            DimensionRule::NegativeAxisNotInPositiveTable => {
                if efm { "EFM.6.16.07" } else { "GFM.1.08.08" }
            }
            DimensionRule::UndirectedCycle => if efm { "EFM.6.16.04" } else { "GFM.1.08.04" },
            DimensionRule::MultipleTables => if efm { "EFM.6.16.05" } else { "GFM.1.08.05" },
            DimensionRule::ExplicitDimensionWithoutTargetRole => "SBR.NL.2.3.5.04",
            DimensionRule::TypedDimensionWithTargetRole => "SBR.NL.2.3.5.07",
        }
    }
}

/// One arc on a cycle path. Forward steps were walked source to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleStep {
    pub rel: RelId,
    pub forward: bool,
}

impl CycleStep {
    fn forward(rel: RelId) -> Self {
        Self { rel, forward: true }
    }

    fn reverse(rel: RelId) -> Self {
        Self {
            rel,
            forward: false,
        }
    }
}

/// Renders `source doc:line concept - doc:line concept ...`. Steps are
/// collected innermost first, so they are read back in reverse.
pub fn cycle_path(model: &XbrlModel, source: ConceptId, steps: &[CycleStep]) -> String {
    let path: Vec<String> = steps
        .iter()
        .rev()
        .map(|step| {
            let rel = model.relationship(step.rel);
            let endpoint = if step.forward { rel.to } else { rel.from };
            let name = endpoint.map_or_else(|| "?".to_string(), |o| model.object_name(o));
            format!("{} {}", rel.locator(), name)
        })
        .collect();
    format!("{} {}", model.qname(source), path.join(" - "))
}

/// Domain-member arcs reachable from one DRS starting point, indexed both ways.
#[derive(Debug, Default)]
struct DrsRels {
    from: HashMap<ConceptId, Vec<RelId>>,
    to: HashMap<ConceptId, Vec<RelId>>,
    seen: HashSet<RelId>,
}

impl DrsRels {
    fn add(&mut self, id: RelId, from: ConceptId, to: ConceptId) {
        if self.seen.insert(id) {
            self.from.entry(from).or_default().push(id);
            self.to.entry(to).or_default().push(id);
        }
    }

    fn from_rels(&self, concept: ConceptId) -> &[RelId] {
        self.from.get(&concept).map(Vec::as_slice).unwrap_or(&[])
    }

    fn to_rels(&self, concept: ConceptId) -> &[RelId] {
        self.to.get(&concept).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub struct DimensionChecker<'r, 'a> {
    run: &'r ValidationRun<'a>,
    sink: &'r mut dyn FindingSink,
    from_concept_elrs: HashMap<ConceptId, HashSet<String>>,
}

impl<'r, 'a> DimensionChecker<'r, 'a> {
    pub fn new(run: &'r ValidationRun<'a>, sink: &'r mut dyn FindingSink) -> Self {
        Self {
            run,
            sink,
            from_concept_elrs: HashMap::new(),
        }
    }

    /// Link roles containing has-hypercube arcs.
    pub fn drs_elrs(&self) -> BTreeSet<String> {
        let sets = self.run.relationship_sets();
        let mut elrs = sets.for_arcrole(Arcrole::All).link_role_uris().clone();
        elrs.extend(sets.for_arcrole(Arcrole::NotAll).link_role_uris().iter().cloned());
        elrs
    }

    pub fn check(&mut self) {
        let elrs = self.drs_elrs();
        info!("Checking dimensional relationship sets in {} link roles", elrs.len());
        for elr in &elrs {
            if self.run.is_cancelled() {
                info!("Dimension checks cancelled before {}", elr);
                return;
            }
            self.check_elr(elr);
        }
    }

    fn finding(&self, rule: DimensionRule, template: &str) -> Finding {
        Finding::error(rule.code(self.run.options.disclosure_system), template)
    }

    fn check_elr(&mut self, elr: &str) {
        let run = self.run;
        let model = run.model;
        let sets = run.relationship_sets();
        let domain_members = sets.for_arcrole_in(Arcrole::DomainMember, elr);

        let mut positive_axis_sources: HashMap<ConceptId, HashSet<ConceptId>> = HashMap::new();
        let mut positive_hypercubes: HashSet<ConceptId> = HashSet::new();
        let mut primary_items: HashSet<ConceptId> = HashSet::new();

        for arcrole in [Arcrole::All, Arcrole::NotAll] {
            let is_all = arcrole == Arcrole::All;
            let has_hypercube = sets.for_arcrole_in(arcrole, elr);
            for source in has_hypercube.from_model_objects() {
                let Some(source_concept) = source.as_concept() else {
                    continue;
                };
                let rels = has_hypercube.from_model_object(*source);
                for &rel_id in rels {
                    let rel = model.relationship(rel_id);
                    let Some(hc) = rel.to_concept() else {
                        continue;
                    };
                    primary_items.insert(source_concept);
                    if is_all {
                        positive_hypercubes.insert(hc);
                        if !rel.closed {
                            let finding = self
                                .finding(
                                    DimensionRule::AllNotClosed,
                                    "All hypercube {hypercube} in DRS role {linkrole} does not have closed='true'",
                                )
                                .param("hypercube", model.qname(hc))
                                .param("linkrole", elr)
                                .object(rel.locator());
                            self.sink.report(finding);
                        }
                    } else {
                        if rel.closed {
                            let finding = self
                                .finding(
                                    DimensionRule::NotAllClosed,
                                    "Not all hypercube {hypercube} in DRS role {linkrole} does not have closed='false'",
                                )
                                .param("hypercube", model.qname(hc))
                                .param("linkrole", elr)
                                .param("primaryItem", model.qname(source_concept))
                                .object(rel.locator());
                            self.sink.report(finding);
                        }
                        if positive_hypercubes.contains(&hc) {
                            let finding = self
                                .finding(
                                    DimensionRule::NotAllAlsoPositive,
                                    "Not all hypercube {hypercube} in DRS role {linkrole} is also the target of a positive hypercube",
                                )
                                .param("hypercube", model.qname(hc))
                                .param("linkrole", elr)
                                .param("primaryItem", model.qname(source_concept))
                                .object(rel.locator());
                            self.sink.report(finding);
                        }
                    }

                    self.check_hypercube_dimensions(
                        elr,
                        is_all,
                        rel_id,
                        source_concept,
                        hc,
                        &domain_members,
                        &mut positive_axis_sources,
                    );
                }

                if is_all && rels.len() > 1 {
                    let hypercubes: Vec<&str> = rels
                        .iter()
                        .filter_map(|id| model.relationship(*id).to_concept())
                        .map(|hc| model.qname(hc))
                        .collect();
                    let finding = self
                        .finding(
                            DimensionRule::MultipleTables,
                            "Multiple tables ({hypercubeCount}) in DRS role {linkrole}, source {concept}, only 1 allowed: {hypercubes}",
                        )
                        .param("hypercubeCount", rels.len())
                        .param("linkrole", elr)
                        .param("concept", model.qname(source_concept))
                        .param("hypercubes", hypercubes.join(", "))
                        .object(model.qname(source_concept))
                        .objects(rels.iter().map(|id| model.relationship(*id).locator()));
                    self.sink.report(finding);
                }
            }
        }

        self.check_primary_items(elr, &domain_members, &primary_items);
    }

    #[allow(clippy::too_many_arguments)]
    fn check_hypercube_dimensions(
        &mut self,
        elr: &str,
        is_all: bool,
        has_hc_rel: RelId,
        source: ConceptId,
        hc: ConceptId,
        domain_members: &RelationshipSet,
        positive_axis_sources: &mut HashMap<ConceptId, HashSet<ConceptId>>,
    ) {
        let run = self.run;
        let model = run.model;
        let sets = run.relationship_sets();
        let sbr_nl = run.options.sbr_nl_rules;

        let rel = model.relationship(has_hc_rel);
        let dim_elr = rel.consecutive_linkrole().to_string();
        let hc_dim_set = sets.for_arcrole_in(Arcrole::HypercubeDimension, &dim_elr);
        let hc_dim_rels = hc_dim_set.from_model_object(ModelObject::Concept(hc));

        if rel.target_role.is_some() && hc_dim_rels.is_empty() {
            let finding = self
                .finding(
                    DimensionRule::MissingTargetRoleRelationship,
                    "Table {hypercube} in DRS role {linkrole} is missing its targetRole consecutive relationship",
                )
                .param("hypercube", model.qname(hc))
                .param("linkrole", elr)
                .param("arcrole", rel.arcrole.short_name())
                .object(rel.locator());
            self.sink.report(finding);
        }

        for &hc_dim_id in hc_dim_rels {
            let hc_dim_rel = model.relationship(hc_dim_id);
            let Some(dim) = hc_dim_rel.to_concept() else {
                continue;
            };
            let dim_concept = model.concept(dim);

            let dom_elr = match &hc_dim_rel.target_role {
                Some(role) => {
                    if dim_concept.is_typed_dimension() && sbr_nl {
                        let finding = self
                            .finding(
                                DimensionRule::TypedDimensionWithTargetRole,
                                "Typed dimension {dimension} in DRS role {linkrole} has a targetRole consecutive relationship",
                            )
                            .param("dimension", model.qname(dim))
                            .param("linkrole", elr)
                            .object(hc_dim_rel.locator());
                        self.sink.report(finding);
                    }
                    Some(role.clone())
                }
                None if dim_concept.is_explicit_dimension() => {
                    if sbr_nl {
                        let finding = self
                            .finding(
                                DimensionRule::ExplicitDimensionWithoutTargetRole,
                                "Hypercube {hypercube} in DRS role {linkrole} is missing a targetRole to dimension {dimension}",
                            )
                            .param("hypercube", model.qname(hc))
                            .param("linkrole", elr)
                            .param("dimension", model.qname(dim))
                            .object(hc_dim_rel.locator());
                        self.sink.report(finding);
                    }
                    Some(dim_elr.clone())
                }
                None => None,
            };

            if is_all {
                positive_axis_sources.entry(dim).or_default().insert(source);
            } else {
                let covered = positive_axis_sources
                    .get(&dim)
                    .is_some_and(|sources| common_ancestor(model, domain_members, source, sources));
                if !covered {
                    let finding = self
                        .finding(
                            DimensionRule::NegativeAxisNotInPositiveTable,
                            "Negative table axis {dimension} in DRS role {linkrole} is not in any positive table in the same role",
                        )
                        .param("dimension", model.qname(dim))
                        .param("linkrole", elr)
                        .param("primaryItem", model.qname(source))
                        .object(hc_dim_rel.locator());
                    self.sink.report(finding);
                }
            }

            let dim_dom_set = match &dom_elr {
                Some(role) => sets.for_arcrole_in(Arcrole::DimensionDomain, role),
                None => sets.for_arcrole(Arcrole::DimensionDomain),
            };
            let dim_dom_rels = dim_dom_set.from_model_object(ModelObject::Concept(dim));
            if hc_dim_rel.target_role.is_some() && dim_dom_rels.is_empty() {
                let finding = self
                    .finding(
                        DimensionRule::MissingTargetRoleRelationship,
                        "Axis {dimension} in DRS role {linkrole} is missing its targetRole consecutive relationship",
                    )
                    .param("dimension", model.qname(dim))
                    .param("linkrole", elr)
                    .param("arcrole", hc_dim_rel.arcrole.short_name())
                    .object(hc_dim_rel.locator());
                self.sink.report(finding);
            }

            // without a domain role no arc can continue the forward walk
            let Some(dom_elr) = dom_elr else {
                continue;
            };
            let mut drs = DrsRels::default();
            self.collect_drs_rels(&dom_elr, dim_dom_rels, &mut drs, &mut HashSet::new());
            self.push(hc, &dim_elr);
            self.push(dim, &dom_elr);
            if let Some(mut steps) = self.forward_cycle(&dom_elr, dim_dom_rels, &drs) {
                steps.push(CycleStep::forward(hc_dim_id));
                let finding = self
                    .finding(
                        DimensionRule::UndirectedCycle,
                        "Dimension relationships have an undirected cycle in DRS role {linkrole} starting from table {hypercube}, axis {dimension}, path {path}",
                    )
                    .param("linkrole", elr)
                    .param("hypercube", model.qname(hc))
                    .param("dimension", model.qname(dim))
                    .param("path", cycle_path(model, hc, &steps))
                    .object(model.qname(hc))
                    .object(model.qname(dim))
                    .objects(steps.iter().map(|s| model.relationship(s.rel).locator()));
                self.sink.report(finding);
            }
            self.from_concept_elrs.clear();
        }
    }

    fn check_primary_items(
        &mut self,
        elr: &str,
        domain_members: &RelationshipSet,
        primary_items: &HashSet<ConceptId>,
    ) {
        let run = self.run;
        let model = run.model;
        let sets = run.relationship_sets();

        for source in domain_members.from_model_objects() {
            let Some(from) = source.as_concept() else {
                continue;
            };
            let rels = domain_members.from_model_object(*source);
            if primary_items.contains(&from) {
                let mut drs = DrsRels::default();
                self.collect_drs_rels(elr, rels, &mut drs, &mut HashSet::new());
                self.push(from, elr);
                if let Some(steps) = self.forward_cycle(elr, rels, &drs) {
                    let finding = self
                        .finding(
                            DimensionRule::UndirectedCycle,
                            "Domain-member primary-item relationships have an undirected cycle in DRS role {linkrole} starting from {conceptFrom}, path {path}",
                        )
                        .param("linkrole", elr)
                        .param("conceptFrom", model.qname(from))
                        .param("path", cycle_path(model, from, &steps))
                        .object(model.qname(from))
                        .objects(steps.iter().map(|s| model.relationship(s.rel).locator()));
                    self.sink.report(finding);
                }
                self.from_concept_elrs.clear();
            }

            for &rel_id in rels {
                let rel = model.relationship(rel_id);
                let (Some(to), Some(to_elr)) = (rel.to_concept(), rel.target_role.as_deref())
                else {
                    continue;
                };
                let continuing = sets.for_arcrole_in(Arcrole::DomainMember, to_elr);
                if continuing.from_model_object(ModelObject::Concept(to)).is_empty() {
                    let finding = self
                        .finding(
                            DimensionRule::MissingTargetRoleRelationship,
                            "Domain member {concept} in DRS role {linkrole} is missing its targetRole consecutive relationship",
                        )
                        .param("concept", model.qname(from))
                        .param("linkrole", elr)
                        .param("toConcept", model.qname(to))
                        .param("arcrole", rel.arcrole.short_name())
                        .object(rel.locator());
                    self.sink.report(finding);
                }
            }
        }
    }

    fn push(&mut self, concept: ConceptId, elr: &str) {
        self.from_concept_elrs
            .entry(concept)
            .or_default()
            .insert(elr.to_string());
    }

    fn pop(&mut self, concept: ConceptId, elr: &str) {
        if let Some(elrs) = self.from_concept_elrs.get_mut(&concept) {
            elrs.remove(elr);
        }
    }

    fn on_stack(&self, concept: ConceptId, elr: &str) -> bool {
        self.from_concept_elrs
            .get(&concept)
            .is_some_and(|elrs| elrs.contains(elr))
    }

    /// Flattens the domain-member arcs reachable from `rels`, following
    /// `targetRole` into consecutive link roles.
    fn collect_drs_rels(
        &self,
        from_elr: &str,
        rels: &[RelId],
        drs: &mut DrsRels,
        on_path: &mut HashSet<ConceptId>,
    ) {
        let run = self.run;
        let model = run.model;
        for &id in rels {
            let rel = model.relationship(id);
            let (Some(from), Some(to)) = (rel.from_concept(), rel.to_concept()) else {
                continue;
            };
            drs.add(id, from, to);
            let to_elr = rel.target_role.as_deref().unwrap_or(from_elr);
            if on_path.insert(to) {
                let next = run
                    .relationship_sets()
                    .for_arcrole_in(Arcrole::DomainMember, to_elr);
                self.collect_drs_rels(
                    to_elr,
                    next.from_model_object(ModelObject::Concept(to)),
                    drs,
                    on_path,
                );
                on_path.remove(&to);
            }
        }
    }

    fn forward_cycle(&mut self, from_elr: &str, rels: &[RelId], drs: &DrsRels) -> Option<Vec<CycleStep>> {
        let model = self.run.model;
        for &id in rels {
            let rel = model.relationship(id);
            if rel.linkrole != from_elr {
                continue;
            }
            let Some(to) = rel.to_concept() else {
                continue;
            };
            let to_elr = rel.consecutive_linkrole();
            if self.on_stack(to, to_elr) {
                debug!("Directed cycle at {} in {}", model.qname(to), to_elr);
                return Some(vec![CycleStep::forward(id)]);
            }
            self.push(to, to_elr);
            if let Some(mut steps) = self.forward_cycle(to_elr, drs.from_rels(to), drs) {
                steps.push(CycleStep::forward(id));
                return Some(steps);
            }
            self.pop(to, to_elr);
            if let Some(mut steps) = self.reverse_cycle(to, id, drs, &mut HashSet::new()) {
                steps.push(CycleStep::forward(id));
                return Some(steps);
            }
        }
        None
    }

    /// Looks for a path against arc direction from `member` to any on-stack
    /// concept, ignoring the arc that was just walked forward.
    fn reverse_cycle(
        &self,
        member: ConceptId,
        turnback: RelId,
        drs: &DrsRels,
        explored: &mut HashSet<ConceptId>,
    ) -> Option<Vec<CycleStep>> {
        let model = self.run.model;
        for &id in drs.to_rels(member) {
            if id == turnback {
                continue;
            }
            let rel = model.relationship(id);
            let Some(from) = rel.from_concept() else {
                continue;
            };
            if self.on_stack(from, &rel.linkrole) {
                return Some(vec![CycleStep::reverse(id)]);
            }
            if !explored.insert(from) {
                continue;
            }
            if let Some(mut steps) = self.reverse_cycle(from, turnback, drs, explored) {
                steps.push(CycleStep::reverse(id));
                return Some(steps);
            }
        }
        None
    }
}

/// Concept plus every concept above it in the domain-member network.
pub fn ancestor_or_self(
    model: &XbrlModel,
    domain_members: &RelationshipSet,
    concept: ConceptId,
) -> HashSet<ConceptId> {
    let mut result = HashSet::new();
    let mut pending = vec![concept];
    while let Some(current) = pending.pop() {
        if !result.insert(current) {
            continue;
        }
        for id in domain_members.to_model_object(ModelObject::Concept(current)) {
            if let Some(parent) = model.relationship(*id).from_concept() {
                pending.push(parent);
            }
        }
    }
    result
}

/// True when the negative table source shares an ancestor-or-self with any
/// positive table source of the same axis.
pub fn common_ancestor(
    model: &XbrlModel,
    domain_members: &RelationshipSet,
    negative_source: ConceptId,
    positive_sources: &HashSet<ConceptId>,
) -> bool {
    let negative = ancestor_or_self(model, domain_members, negative_source);
    positive_sources.iter().any(|positive| {
        !negative.is_disjoint(&ancestor_or_self(model, domain_members, *positive))
    })
}
