//! Relationship sets: arcs of one or more arc roles, optionally restricted to a
//! set of link roles, indexed for from/to traversal.

use crate::model::{ModelObject, RelId, XbrlModel};
use crate::schema::Arcrole;
use log::debug;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LinkroleFilter {
    Any,
    Only(BTreeSet<String>),
}

impl LinkroleFilter {
    pub fn single(linkrole: &str) -> Self {
        LinkroleFilter::Only(BTreeSet::from([linkrole.to_string()]))
    }

    /// An empty list places no restriction.
    pub fn from_list(linkroles: &[String]) -> Self {
        if linkroles.is_empty() {
            LinkroleFilter::Any
        } else {
            LinkroleFilter::Only(linkroles.iter().cloned().collect())
        }
    }

    pub fn admits(&self, linkrole: &str) -> bool {
        match self {
            LinkroleFilter::Any => true,
            LinkroleFilter::Only(roles) => roles.contains(linkrole),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipSetKey {
    pub arcroles: BTreeSet<Arcrole>,
    pub linkroles: LinkroleFilter,
    pub link_qname: Option<String>,
    pub arc_qname: Option<String>,
}

impl RelationshipSetKey {
    pub fn new(arcroles: &[Arcrole], linkroles: LinkroleFilter) -> Self {
        Self {
            arcroles: arcroles.iter().cloned().collect(),
            linkroles,
            link_qname: None,
            arc_qname: None,
        }
    }

    pub fn with_link_qname(mut self, link_qname: &str) -> Self {
        self.link_qname = Some(link_qname.to_string());
        self
    }

    pub fn with_arc_qname(mut self, arc_qname: &str) -> Self {
        self.arc_qname = Some(arc_qname.to_string());
        self
    }
}

/// Matching relationships with both endpoints resolved, in arc `order` then
/// document order.
#[derive(Debug, Default)]
pub struct RelationshipSet {
    relationships: Vec<RelId>,
    from_index: HashMap<ModelObject, Vec<RelId>>,
    to_index: HashMap<ModelObject, Vec<RelId>>,
    from_objects: Vec<ModelObject>,
    to_objects: HashSet<ModelObject>,
    link_role_uris: BTreeSet<String>,
}

impl RelationshipSet {
    pub fn build(model: &XbrlModel, key: &RelationshipSetKey) -> Self {
        let mut matching: Vec<RelId> = model
            .relationships()
            .filter(|(_, rel)| {
                key.arcroles.contains(&rel.arcrole)
                    && key.linkroles.admits(&rel.linkrole)
                    && key
                        .link_qname
                        .as_ref()
                        .map_or(true, |q| rel.link_qname.as_ref() == Some(q))
                    && key
                        .arc_qname
                        .as_ref()
                        .map_or(true, |q| rel.arc_qname.as_ref() == Some(q))
                    && rel.from.is_some()
                    && rel.to.is_some()
            })
            .map(|(id, _)| id)
            .collect();
        // stable: equal orders stay in document order
        matching.sort_by(|a, b| {
            model
                .relationship(*a)
                .order
                .total_cmp(&model.relationship(*b).order)
        });

        let mut set = RelationshipSet::default();
        let mut seen_from = HashSet::new();
        for id in &matching {
            let rel = model.relationship(*id);
            let (Some(from), Some(to)) = (rel.from, rel.to) else {
                continue;
            };
            set.from_index.entry(from).or_default().push(*id);
            set.to_index.entry(to).or_default().push(*id);
            if from != to {
                set.to_objects.insert(to);
            }
            set.link_role_uris.insert(rel.linkrole.clone());
            if seen_from.insert(from) {
                set.from_objects.push(from);
            }
        }
        set.relationships = matching;
        set
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn model_relationships(&self) -> &[RelId] {
        &self.relationships
    }

    pub fn from_model_object(&self, object: ModelObject) -> &[RelId] {
        self.from_index
            .get(&object)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn to_model_object(&self, object: ModelObject) -> &[RelId] {
        self.to_index
            .get(&object)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sources in order of their first relationship.
    pub fn from_model_objects(&self) -> &[ModelObject] {
        &self.from_objects
    }

    /// Sources that are not the target of any relationship in the set. A
    /// relationship from an object to itself does not make it a target.
    pub fn root_concepts(&self) -> Vec<ModelObject> {
        self.from_objects
            .iter()
            .copied()
            .filter(|o| !self.to_objects.contains(o))
            .collect()
    }

    pub fn link_role_uris(&self) -> &BTreeSet<String> {
        &self.link_role_uris
    }
}

/// Relationship sets built on demand and kept for the lifetime of one run.
pub struct RelationshipSetCache<'a> {
    model: &'a XbrlModel,
    sets: RefCell<HashMap<RelationshipSetKey, Rc<RelationshipSet>>>,
}

impl<'a> RelationshipSetCache<'a> {
    pub fn new(model: &'a XbrlModel) -> Self {
        Self {
            model,
            sets: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, arcroles: &[Arcrole], linkroles: LinkroleFilter) -> Rc<RelationshipSet> {
        self.get_by_key(RelationshipSetKey::new(arcroles, linkroles))
    }

    pub fn for_arcrole(&self, arcrole: Arcrole) -> Rc<RelationshipSet> {
        self.get(&[arcrole], LinkroleFilter::Any)
    }

    pub fn for_arcrole_in(&self, arcrole: Arcrole, linkrole: &str) -> Rc<RelationshipSet> {
        self.get(&[arcrole], LinkroleFilter::single(linkrole))
    }

    pub fn get_by_key(&self, key: RelationshipSetKey) -> Rc<RelationshipSet> {
        if let Some(set) = self.sets.borrow().get(&key) {
            return Rc::clone(set);
        }
        let set = Rc::new(RelationshipSet::build(self.model, &key));
        debug!(
            "Built relationship set {:?} ({} relationships)",
            key.arcroles,
            set.len()
        );
        self.sets.borrow_mut().insert(key, Rc::clone(&set));
        set
    }

    pub fn cached_sets(&self) -> usize {
        self.sets.borrow().len()
    }
}
