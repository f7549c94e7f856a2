use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const ARCROLE_ALL: &str = "http://xbrl.org/int/dim/arcrole/all";
pub const ARCROLE_NOT_ALL: &str = "http://xbrl.org/int/dim/arcrole/notAll";
pub const ARCROLE_HYPERCUBE_DIMENSION: &str = "http://xbrl.org/int/dim/arcrole/hypercube-dimension";
pub const ARCROLE_DIMENSION_DOMAIN: &str = "http://xbrl.org/int/dim/arcrole/dimension-domain";
pub const ARCROLE_DOMAIN_MEMBER: &str = "http://xbrl.org/int/dim/arcrole/domain-member";
pub const ARCROLE_DIMENSION_DEFAULT: &str = "http://xbrl.org/int/dim/arcrole/dimension-default";
pub const ARCROLE_PARENT_CHILD: &str = "http://www.xbrl.org/2003/arcrole/parent-child";
pub const ARCROLE_SUMMATION_ITEM: &str = "http://xbrl.org/arcrole/WGWD/YYYY-MM-DD/summation-item";
pub const ARCROLE_BALANCE_CHANGES: &str = "http://xbrl.org/arcrole/WGWD/YYYY-MM-DD/balance-changes";
pub const ARCROLE_AGGREGATION_DOMAIN: &str =
    "http://xbrl.org/arcrole/WGWD/YYYY-MM-DD/aggregation-domain";
pub const ARCROLE_SECTION_FACT: &str = "http://xbrl.org/arcrole/WGWD/YYYY-MM-DD/section-fact";

/// Arc roles the validators understand. Anything else is carried through as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Arcrole {
    All,
    NotAll,
    HypercubeDimension,
    DimensionDomain,
    DomainMember,
    DimensionDefault,
    ParentChild,
    SummationItem,
    BalanceChanges,
    AggregationDomain,
    SectionFact,
    Other(String),
}

impl Arcrole {
    pub fn uri(&self) -> &str {
        match self {
            Arcrole::All => ARCROLE_ALL,
            Arcrole::NotAll => ARCROLE_NOT_ALL,
            Arcrole::HypercubeDimension => ARCROLE_HYPERCUBE_DIMENSION,
            Arcrole::DimensionDomain => ARCROLE_DIMENSION_DOMAIN,
            Arcrole::DomainMember => ARCROLE_DOMAIN_MEMBER,
            Arcrole::DimensionDefault => ARCROLE_DIMENSION_DEFAULT,
            Arcrole::ParentChild => ARCROLE_PARENT_CHILD,
            Arcrole::SummationItem => ARCROLE_SUMMATION_ITEM,
            Arcrole::BalanceChanges => ARCROLE_BALANCE_CHANGES,
            Arcrole::AggregationDomain => ARCROLE_AGGREGATION_DOMAIN,
            Arcrole::SectionFact => ARCROLE_SECTION_FACT,
            Arcrole::Other(uri) => uri,
        }
    }

    /// The summation-item, balance-changes and aggregation-domain arc roles.
    pub fn calculation_arcroles() -> Vec<Arcrole> {
        vec![
            Arcrole::SummationItem,
            Arcrole::BalanceChanges,
            Arcrole::AggregationDomain,
        ]
    }

    /// Short name used in messages (last path segment of the URI).
    pub fn short_name(&self) -> &str {
        let uri = self.uri();
        uri.rsplit('/').next().unwrap_or(uri)
    }
}

impl From<String> for Arcrole {
    fn from(uri: String) -> Self {
        match uri.as_str() {
            ARCROLE_ALL => Arcrole::All,
            ARCROLE_NOT_ALL => Arcrole::NotAll,
            ARCROLE_HYPERCUBE_DIMENSION => Arcrole::HypercubeDimension,
            ARCROLE_DIMENSION_DOMAIN => Arcrole::DimensionDomain,
            ARCROLE_DOMAIN_MEMBER => Arcrole::DomainMember,
            ARCROLE_DIMENSION_DEFAULT => Arcrole::DimensionDefault,
            ARCROLE_PARENT_CHILD => Arcrole::ParentChild,
            ARCROLE_SUMMATION_ITEM => Arcrole::SummationItem,
            ARCROLE_BALANCE_CHANGES => Arcrole::BalanceChanges,
            ARCROLE_AGGREGATION_DOMAIN => Arcrole::AggregationDomain,
            ARCROLE_SECTION_FACT => Arcrole::SectionFact,
            _ => Arcrole::Other(uri),
        }
    }
}

impl From<Arcrole> for String {
    fn from(arcrole: Arcrole) -> Self {
        arcrole.uri().to_string()
    }
}

impl fmt::Display for Arcrole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Instant,
    Duration,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Balance {
    Debit,
    Credit,
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Balance::Debit => f.write_str("debit"),
            Balance::Credit => f.write_str("credit"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnitCategory {
    Monetary,
    Shares,
    Pure,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub enum SubstitutionGroup {
    #[default]
    Item,
    HypercubeItem,
    DimensionItem,
    Tuple,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConceptDef {
    #[schemars(description = "Prefixed qualified name, e.g. 'us-gaap:Assets'")]
    pub qname: String,

    #[serde(default)]
    #[schemars(description = "Standard label, used to order sections in messages")]
    pub label: Option<String>,

    #[serde(default)]
    pub numeric: bool,

    #[serde(default)]
    pub unit_category: Option<UnitCategory>,

    pub period_type: PeriodType,

    #[serde(default)]
    pub balance: Option<Balance>,

    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default)]
    pub substitution_group: SubstitutionGroup,

    #[serde(default)]
    #[schemars(description = "True for a dimension item declared with a typedDomainRef")]
    pub typed_domain: bool,

    #[serde(default)]
    #[schemars(
        description = "Link roles scoping calculation relationships when this concept is a section concept. Empty means all link roles."
    )]
    pub calc_linkroles: Vec<String>,
}

impl ConceptDef {
    pub fn item(qname: &str, period_type: PeriodType) -> Self {
        Self {
            qname: qname.to_string(),
            label: None,
            numeric: false,
            unit_category: None,
            period_type,
            balance: None,
            is_abstract: false,
            substitution_group: SubstitutionGroup::Item,
            typed_domain: false,
            calc_linkroles: Vec::new(),
        }
    }

    pub fn monetary(qname: &str, period_type: PeriodType, balance: Option<Balance>) -> Self {
        Self {
            numeric: true,
            unit_category: Some(UnitCategory::Monetary),
            balance,
            ..Self::item(qname, period_type)
        }
    }

    pub fn domain(qname: &str) -> Self {
        Self {
            is_abstract: true,
            ..Self::item(qname, PeriodType::Duration)
        }
    }

    pub fn hypercube(qname: &str) -> Self {
        Self {
            is_abstract: true,
            substitution_group: SubstitutionGroup::HypercubeItem,
            ..Self::item(qname, PeriodType::Duration)
        }
    }

    pub fn explicit_dimension(qname: &str) -> Self {
        Self {
            is_abstract: true,
            substitution_group: SubstitutionGroup::DimensionItem,
            ..Self::item(qname, PeriodType::Duration)
        }
    }

    pub fn typed_dimension(qname: &str) -> Self {
        Self {
            typed_domain: true,
            ..Self::explicit_dimension(qname)
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_calc_linkroles(mut self, linkroles: &[&str]) -> Self {
        self.calc_linkroles = linkroles.iter().map(|l| l.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
pub struct EntityIdentifier {
    pub scheme: String,
    pub identifier: String,
}

impl EntityIdentifier {
    pub fn new(scheme: &str, identifier: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            identifier: identifier.to_string(),
        }
    }
}

/// Reporting period of a context. Dates are as reported (end dates inclusive).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Period {
    Instant { date: NaiveDate },
    Duration { start: NaiveDate, end: NaiveDate },
    Forever,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DimensionValueDef {
    Explicit(String),
    Typed(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContextDef {
    pub id: String,
    pub entity: EntityIdentifier,
    pub period: Period,
    #[serde(default)]
    #[schemars(description = "Dimension qname mapped to an explicit member qname or a typed value")]
    pub dimensions: BTreeMap<String, DimensionValueDef>,
}

impl ContextDef {
    pub fn instant(id: &str, entity: &EntityIdentifier, date: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            entity: entity.clone(),
            period: Period::Instant { date },
            dimensions: BTreeMap::new(),
        }
    }

    pub fn duration(id: &str, entity: &EntityIdentifier, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            entity: entity.clone(),
            period: Period::Duration { start, end },
            dimensions: BTreeMap::new(),
        }
    }

    pub fn with_member(mut self, dimension: &str, member: &str) -> Self {
        self.dimensions.insert(
            dimension.to_string(),
            DimensionValueDef::Explicit(member.to_string()),
        );
        self
    }

    pub fn with_typed_member(mut self, dimension: &str, value: &str) -> Self {
        self.dimensions
            .insert(dimension.to_string(), DimensionValueDef::Typed(value.to_string()));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UnitDef {
    pub id: String,
    pub numerator: Vec<String>,
    #[serde(default)]
    pub denominator: Vec<String>,
}

impl UnitDef {
    pub fn measure(id: &str, measure: &str) -> Self {
        Self {
            id: id.to_string(),
            numerator: vec![measure.to_string()],
            denominator: Vec::new(),
        }
    }

    pub fn ratio(id: &str, numerator: &str, denominator: &str) -> Self {
        Self {
            id: id.to_string(),
            numerator: vec![numerator.to_string()],
            denominator: vec![denominator.to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FactDef {
    #[serde(default)]
    pub id: Option<String>,

    pub concept: String,

    #[serde(default)]
    pub context: Option<String>,

    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    #[schemars(description = "Lexical value as reported. Absent means xsi:nil='true'.")]
    pub value: Option<String>,

    #[serde(default)]
    #[schemars(description = "Integer or 'INF'")]
    pub decimals: Option<String>,

    #[serde(default)]
    #[schemars(description = "Integer or 'INF'")]
    pub precision: Option<String>,
}

impl FactDef {
    pub fn numeric(concept: &str, context: &str, unit: &str, value: &str, decimals: i32) -> Self {
        Self {
            id: None,
            concept: concept.to_string(),
            context: Some(context.to_string()),
            unit: Some(unit.to_string()),
            value: Some(value.to_string()),
            decimals: Some(decimals.to_string()),
            precision: None,
        }
    }

    pub fn nil(concept: &str, context: &str, unit: &str) -> Self {
        Self {
            id: None,
            concept: concept.to_string(),
            context: Some(context.to_string()),
            unit: Some(unit.to_string()),
            value: None,
            decimals: None,
            precision: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_precision(mut self, precision: &str) -> Self {
        self.decimals = None;
        self.precision = Some(precision.to_string());
        self
    }
}

/// Either end of an arc: a concept by qname or a fact by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LocatorDef {
    Concept(String),
    Fact(String),
}

fn default_order() -> f64 {
    1.0
}

fn default_usable() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipDef {
    #[schemars(with = "String")]
    pub arcrole: Arcrole,

    #[schemars(description = "Extended link role (ELR) containing the arc")]
    pub linkrole: String,

    pub from: LocatorDef,
    pub to: LocatorDef,

    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub weight: Option<Decimal>,

    #[serde(default = "default_order")]
    pub order: f64,

    #[serde(default)]
    pub target_role: Option<String>,

    #[serde(default)]
    pub closed: Option<bool>,

    #[serde(default = "default_usable")]
    pub usable: bool,

    #[serde(default)]
    #[schemars(description = "Dimension qname of an aggregation-domain arc")]
    pub dimension: Option<String>,

    #[serde(default)]
    pub link_qname: Option<String>,

    #[serde(default)]
    pub arc_qname: Option<String>,

    #[serde(default)]
    #[schemars(description = "Linkbase document basename, used in cycle path diagnostics")]
    pub document: Option<String>,

    #[serde(default)]
    pub line: Option<u32>,
}

impl RelationshipDef {
    pub fn concepts(arcrole: Arcrole, linkrole: &str, from: &str, to: &str) -> Self {
        Self {
            arcrole,
            linkrole: linkrole.to_string(),
            from: LocatorDef::Concept(from.to_string()),
            to: LocatorDef::Concept(to.to_string()),
            weight: None,
            order: default_order(),
            target_role: None,
            closed: None,
            usable: true,
            dimension: None,
            link_qname: None,
            arc_qname: None,
            document: None,
            line: None,
        }
    }

    pub fn section(linkrole: &str, section_fact: &str, fact: &str) -> Self {
        Self {
            from: LocatorDef::Fact(section_fact.to_string()),
            to: LocatorDef::Fact(fact.to_string()),
            ..Self::concepts(Arcrole::SectionFact, linkrole, "", "")
        }
    }

    pub fn with_weight(mut self, weight: Decimal) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_order(mut self, order: f64) -> Self {
        self.order = order;
        self
    }

    pub fn with_target_role(mut self, target_role: &str) -> Self {
        self.target_role = Some(target_role.to_string());
        self
    }

    pub fn with_closed(mut self, closed: bool) -> Self {
        self.closed = Some(closed);
        self
    }

    pub fn with_dimension(mut self, dimension: &str) -> Self {
        self.dimension = Some(dimension.to_string());
        self
    }

    pub fn with_link_qname(mut self, link_qname: &str) -> Self {
        self.link_qname = Some(link_qname.to_string());
        self
    }

    pub fn with_arc_qname(mut self, arc_qname: &str) -> Self {
        self.arc_qname = Some(arc_qname.to_string());
        self
    }

    pub fn located(mut self, document: &str, line: u32) -> Self {
        self.document = Some(document.to_string());
        self.line = Some(line);
        self
    }
}

/// Everything the validators need from a loaded instance and its DTS.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DocumentSource {
    #[serde(default)]
    pub concepts: Vec<ConceptDef>,
    #[serde(default)]
    pub contexts: Vec<ContextDef>,
    #[serde(default)]
    pub units: Vec<UnitDef>,
    #[serde(default)]
    pub facts: Vec<FactDef>,
    #[serde(default)]
    pub relationships: Vec<RelationshipDef>,
}

impl DocumentSource {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(DocumentSource)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
