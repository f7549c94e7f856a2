use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use xbrl_consistency::*;

const ROLE: &str = "http://example.com/role/IncomeStatement";
const OTHER_ROLE: &str = "http://example.com/role/Segments";

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn entity() -> EntityIdentifier {
    EntityIdentifier::new("http://www.sec.gov/CIK", "0000320193")
}

/// One section fact plus the numeric facts attached to it.
struct Instance {
    doc: DocumentSource,
    next_fact: usize,
}

impl Instance {
    fn new(concepts: Vec<ConceptDef>) -> Self {
        let e = entity();
        let mut all = vec![ConceptDef::item("ex:Section", PeriodType::Duration).with_label("Income statement")];
        all.extend(concepts);
        let doc = DocumentSource {
            concepts: all,
            contexts: vec![
                ContextDef::duration("FY2019", &e, date(2019, 1, 1), date(2019, 12, 31)),
                ContextDef::duration("FY2020", &e, date(2020, 1, 1), date(2020, 12, 31)),
                ContextDef::duration("FY2020_copy", &e, date(2020, 1, 1), date(2020, 12, 31)),
                ContextDef::instant("I2018", &e, date(2018, 12, 31)),
                ContextDef::instant("I2019", &e, date(2019, 12, 31)),
                ContextDef::instant("I2020", &e, date(2020, 12, 31)),
            ],
            units: vec![
                UnitDef::measure("USD", "iso4217:USD"),
                UnitDef::measure("usd_copy", "iso4217:USD"),
            ],
            facts: vec![FactDef {
                id: Some("section".to_string()),
                concept: "ex:Section".to_string(),
                context: Some("FY2020".to_string()),
                unit: None,
                value: Some("Income statement".to_string()),
                decimals: None,
                precision: None,
            }],
            relationships: Vec::new(),
        };
        Self { doc, next_fact: 0 }
    }

    fn context(mut self, context: ContextDef) -> Self {
        self.doc.contexts.push(context);
        self
    }

    /// Adds another section fact whose concept carries `label`.
    fn section(mut self, id: &str, concept: &str, label: &str) -> Self {
        self.doc
            .concepts
            .push(ConceptDef::item(concept, PeriodType::Duration).with_label(label));
        self.doc.facts.push(FactDef {
            id: Some(id.to_string()),
            concept: concept.to_string(),
            context: Some("FY2020".to_string()),
            unit: None,
            value: Some(label.to_string()),
            decimals: None,
            precision: None,
        });
        self
    }

    fn fact(self, fact: FactDef) -> Self {
        self.fact_in("section", fact)
    }

    fn fact_in(mut self, section: &str, fact: FactDef) -> Self {
        let fact = match fact.id {
            Some(_) => fact,
            None => {
                self.next_fact += 1;
                fact.with_id(&format!("f{}", self.next_fact))
            }
        };
        let id = fact.id.clone().unwrap();
        self.doc
            .relationships
            .push(RelationshipDef::section(ROLE, section, &id));
        self.doc.facts.push(fact);
        self
    }

    fn usd(self, concept: &str, context: &str, value: &str, decimals: i32) -> Self {
        self.fact(FactDef::numeric(concept, context, "USD", value, decimals))
    }

    fn arc(mut self, arcrole: Arcrole, from: &str, to: &str, weight: i64) -> Self {
        self.doc.relationships.push(
            RelationshipDef::concepts(arcrole, ROLE, from, to).with_weight(Decimal::from(weight)),
        );
        self
    }

    fn relationship(mut self, rel: RelationshipDef) -> Self {
        self.doc.relationships.push(rel);
        self
    }

    fn model(self) -> XbrlModel {
        XbrlModel::from_source(self.doc).unwrap()
    }

    fn report(self) -> ValidationReport {
        validate_model(&self.model(), &ValidationOptions::default()).unwrap()
    }
}

fn duration(qname: &str) -> ConceptDef {
    ConceptDef::monetary(qname, PeriodType::Duration, Some(Balance::Credit))
}

fn instant(qname: &str) -> ConceptDef {
    ConceptDef::monetary(qname, PeriodType::Instant, Some(Balance::Debit))
}

#[test]
fn test_consistent_duplicates() {
    let report = Instance::new(vec![duration("ex:Revenue")])
        .usd("ex:Revenue", "FY2020", "100", 0)
        .usd("ex:Revenue", "FY2020_copy", "100.0", 1)
        .report();
    assert!(report.findings().is_empty(), "{:?}", report.codes());
}

#[test]
fn test_inconsistent_duplicates() {
    let report = Instance::new(vec![duration("ex:Revenue")])
        .usd("ex:Revenue", "FY2020", "100", 0)
        .fact(FactDef::numeric("ex:Revenue", "FY2020_copy", "usd_copy", "105", 0))
        .report();
    assert_eq!(report.codes(), vec!["calc2e:inconsistentDuplicateInSection"]);
    let finding = &report.findings()[0];
    assert_eq!(finding.objects, vec!["f1", "f2"]);
    assert_eq!(finding.params["section"], "Income statement");
    assert_eq!(finding.params["values"], "100, 105");
    assert!(report.has_errors());
}

#[test]
fn test_summation_consistent() {
    let report = Instance::new(vec![duration("ex:Total"), duration("ex:A"), duration("ex:B")])
        .usd("ex:Total", "FY2020", "300", 0)
        .usd("ex:A", "FY2020", "120", 0)
        .usd("ex:B", "FY2020", "180", 0)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:B", 1)
        .report();
    assert!(report.findings().is_empty(), "{:?}", report.codes());
}

#[test]
fn test_summation_inconsistent() {
    let report = Instance::new(vec![duration("ex:Total"), duration("ex:A"), duration("ex:B")])
        .usd("ex:Total", "FY2020", "310", 0)
        .usd("ex:A", "FY2020", "120", 0)
        .usd("ex:B", "FY2020", "180", 0)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:B", 1)
        .report();
    assert_eq!(report.codes(), vec!["calc2e:summationInconsistency"]);
    let finding = &report.findings()[0];
    assert_eq!(finding.params["reportedSum"], "310");
    assert_eq!(finding.params["computedSum"], "[299, 301]");
    assert_eq!(finding.params["contextID"], "FY2020");
    assert_eq!(finding.params["unreportedContributors"], "none");
    assert_eq!(finding.objects, vec!["f1", "f2", "f3"]);
}

#[test]
fn test_negative_weight() {
    let model = Instance::new(vec![duration("ex:Profit"), duration("ex:Revenue"), duration("ex:Costs")])
        .usd("ex:Profit", "FY2020", "40", 0)
        .usd("ex:Revenue", "FY2020", "100", 0)
        .usd("ex:Costs", "FY2020", "60", 0)
        .arc(Arcrole::SummationItem, "ex:Profit", "ex:Revenue", 1)
        .relationship(
            RelationshipDef::concepts(Arcrole::SummationItem, ROLE, "ex:Profit", "ex:Costs")
                .with_weight(Decimal::NEGATIVE_ONE),
        )
        .model();
    // same balance with a negative weight is a static error, the arithmetic still holds
    let report = validate_model(&model, &ValidationOptions::default()).unwrap();
    assert_eq!(report.codes(), vec!["calc2e:balanceCalcWeightIllegalNegative"]);
}

#[test]
fn test_inferred_parent_checked_at_grandparent() {
    let report = Instance::new(vec![
        duration("ex:GrandTotal"),
        duration("ex:Total"),
        duration("ex:A"),
        duration("ex:B"),
    ])
    .usd("ex:GrandTotal", "FY2020", "140", 0)
    .usd("ex:A", "FY2020", "100", 0)
    .usd("ex:B", "FY2020", "50", 0)
    .arc(Arcrole::SummationItem, "ex:GrandTotal", "ex:Total", 1)
    .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1)
    .arc(Arcrole::SummationItem, "ex:Total", "ex:B", 1)
    .report();
    assert_eq!(report.codes(), vec!["calc2e:summationInconsistency"]);
    let finding = &report.findings()[0];
    assert_eq!(finding.params["concept"], "ex:GrandTotal");
    assert_eq!(finding.params["computedSum"], "[149, 151]");
    assert_eq!(finding.params["unreportedContributors"], "ex:Total");
}

#[test]
fn test_inferred_parent_consistent_with_grandparent() {
    let report = Instance::new(vec![
        duration("ex:GrandTotal"),
        duration("ex:Total"),
        duration("ex:A"),
        duration("ex:B"),
    ])
    .usd("ex:GrandTotal", "FY2020", "150", 0)
    .usd("ex:A", "FY2020", "100", 0)
    .usd("ex:B", "FY2020", "50", 0)
    .arc(Arcrole::SummationItem, "ex:GrandTotal", "ex:Total", 1)
    .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1)
    .arc(Arcrole::SummationItem, "ex:Total", "ex:B", 1)
    .report();
    assert!(report.findings().is_empty(), "{:?}", report.codes());
}

#[test]
fn test_precision_is_inferred() {
    let report = Instance::new(vec![duration("ex:Total"), duration("ex:A"), duration("ex:B")])
        .fact(FactDef::numeric("ex:Total", "FY2020", "USD", "123456", 0).with_precision("3"))
        .usd("ex:A", "FY2020", "123000", 0)
        .usd("ex:B", "FY2020", "600", 0)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:B", 1)
        .report();
    assert!(report.findings().is_empty(), "{:?}", report.codes());
}

#[test]
fn test_nil_parent_is_not_compared() {
    let report = Instance::new(vec![duration("ex:Total"), duration("ex:A")])
        .fact(FactDef::nil("ex:Total", "FY2020", "USD"))
        .usd("ex:A", "FY2020", "120", 0)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1)
        .report();
    assert!(report.findings().is_empty(), "{:?}", report.codes());
}

#[test]
fn test_missing_starting_balance_is_not_an_inconsistency() {
    let model = Instance::new(vec![instant("ex:Cash"), duration("ex:CashChange")])
        .usd("ex:Cash", "I2020", "500", 0)
        .usd("ex:CashChange", "FY2020", "50", 0)
        .arc(Arcrole::BalanceChanges, "ex:Cash", "ex:CashChange", 1)
        .model();
    let report = validate_model(&model, &ValidationOptions::default()).unwrap();
    assert!(
        report.with_code("calc2e:balanceInconsistency").next().is_none(),
        "{:?}",
        report.codes()
    );
}

fn cash_roll_forward(start: &str, end: &str) -> ValidationReport {
    Instance::new(vec![
        ConceptDef::monetary("ex:Cash", PeriodType::Instant, None),
        ConceptDef::monetary("ex:CashChange", PeriodType::Duration, None),
    ])
    .usd("ex:Cash", "I2019", start, 0)
    .usd("ex:Cash", "I2020", end, 0)
    .usd("ex:CashChange", "FY2020", "50", 0)
    .arc(Arcrole::BalanceChanges, "ex:Cash", "ex:CashChange", 1)
    .report()
}

#[test]
fn test_balance_roll_forward() {
    let report = cash_roll_forward("450", "500");
    assert!(report.findings().is_empty(), "{:?}", report.codes());

    let report = cash_roll_forward("400", "500");
    assert_eq!(report.codes(), vec!["calc2e:balanceInconsistency"]);
    let finding = &report.findings()[0];
    assert_eq!(finding.params["reportedSum"], "[99, 101]");
    assert_eq!(finding.params["computedSum"], "50");
    assert_eq!(finding.params["contextID"], "I2020");
}

#[test]
fn test_balance_chains_adjacent_periods() {
    let build = |end: &str| {
        Instance::new(vec![
            ConceptDef::monetary("ex:Cash", PeriodType::Instant, None),
            ConceptDef::monetary("ex:CashChange", PeriodType::Duration, None),
        ])
        .usd("ex:Cash", "I2018", "400", 0)
        .usd("ex:Cash", "I2020", end, 0)
        .usd("ex:CashChange", "FY2019", "30", 0)
        .usd("ex:CashChange", "FY2020", "70", 0)
        .arc(Arcrole::BalanceChanges, "ex:Cash", "ex:CashChange", 1)
        .report()
    };

    let report = build("500");
    assert!(report.findings().is_empty(), "{:?}", report.codes());

    let report = build("520");
    assert_eq!(report.codes(), vec!["calc2e:balanceInconsistency"]);
    assert_eq!(report.findings()[0].params["computedSum"], "[99, 101]");
}

#[test]
fn test_static_relationship_checks() {
    let report = Instance::new(vec![
        duration("ex:Total"),
        duration("ex:A"),
        ConceptDef::monetary("ex:Assets", PeriodType::Instant, Some(Balance::Debit)),
        ConceptDef::monetary("ex:Liabilities", PeriodType::Instant, Some(Balance::Credit)),
        ConceptDef::item("ex:Text", PeriodType::Duration),
    ])
    .usd("ex:A", "FY2020", "1", 0)
    .relationship(
        RelationshipDef::concepts(Arcrole::SummationItem, ROLE, "ex:Total", "ex:A")
            .with_weight(Decimal::new(5, 1)),
    )
    .arc(Arcrole::SummationItem, "ex:Assets", "ex:Liabilities", 1)
    .arc(Arcrole::SummationItem, "ex:Total", "ex:Text", 1)
    .arc(Arcrole::BalanceChanges, "ex:Total", "ex:A", 1)
    .report();

    assert_eq!(report.count("calc2e:invalidWeight"), 1);
    assert_eq!(report.count("calc2e:balanceCalcWeightIllegalPositive"), 1);
    assert_eq!(report.count("calc2e:nonNumericCalc"), 1);
    assert_eq!(report.count("calc2e:invalidBalanceChangesPeriodType"), 1);
    let weight = report.with_code("calc2e:invalidWeight").next().unwrap();
    assert_eq!(weight.params["weight"], "0.5");
}

fn segmented_revenue(total: &str) -> ValidationReport {
    let e = entity();
    Instance::new(vec![
        duration("ex:Revenue"),
        ConceptDef::explicit_dimension("ex:SegmentAxis"),
        ConceptDef::domain("ex:AllSegments"),
        ConceptDef::domain("ex:Retail"),
        ConceptDef::domain("ex:Wholesale"),
    ])
    .context(
        ContextDef::duration("FY2020_Retail", &e, date(2020, 1, 1), date(2020, 12, 31))
            .with_member("ex:SegmentAxis", "ex:Retail"),
    )
    .context(
        ContextDef::duration("FY2020_Wholesale", &e, date(2020, 1, 1), date(2020, 12, 31))
            .with_member("ex:SegmentAxis", "ex:Wholesale"),
    )
    .usd("ex:Revenue", "FY2020", total, 0)
    .usd("ex:Revenue", "FY2020_Retail", "120", 0)
    .usd("ex:Revenue", "FY2020_Wholesale", "180", 0)
    .relationship(
        RelationshipDef::concepts(Arcrole::AggregationDomain, ROLE, "ex:Revenue", "ex:Revenue")
            .with_dimension("ex:SegmentAxis"),
    )
    .relationship(RelationshipDef::concepts(
        Arcrole::DimensionDomain,
        OTHER_ROLE,
        "ex:SegmentAxis",
        "ex:AllSegments",
    ))
    .relationship(RelationshipDef::concepts(
        Arcrole::DomainMember,
        OTHER_ROLE,
        "ex:AllSegments",
        "ex:Retail",
    ))
    .relationship(RelationshipDef::concepts(
        Arcrole::DomainMember,
        OTHER_ROLE,
        "ex:AllSegments",
        "ex:Wholesale",
    ))
    .report()
}

#[test]
fn test_aggregation_consistent() {
    let report = segmented_revenue("300");
    assert!(report.findings().is_empty(), "{:?}", report.codes());
}

#[test]
fn test_aggregation_inconsistent() {
    let report = segmented_revenue("290");
    assert_eq!(report.codes(), vec!["calc2e:aggregationInconsistency"]);
    let finding = &report.findings()[0];
    assert_eq!(finding.params["dimension"], "ex:SegmentAxis");
    assert_eq!(finding.params["member"], "ex:AllSegments");
    assert_eq!(finding.params["computedSum"], "[299, 301]");
}

#[test]
fn test_invalid_aggregation_arcs() {
    let report = Instance::new(vec![duration("ex:Revenue"), duration("ex:Costs")])
        .usd("ex:Revenue", "FY2020", "1", 0)
        .relationship(
            RelationshipDef::concepts(Arcrole::AggregationDomain, ROLE, "ex:Revenue", "ex:Revenue")
                .with_dimension("ex:Costs"),
        )
        .relationship(RelationshipDef::concepts(
            Arcrole::AggregationDomain,
            ROLE,
            "ex:Revenue",
            "ex:Costs",
        ))
        .report();
    assert_eq!(report.count("calc2e:invalidAggregationDimension"), 2);

    let report = Instance::new(vec![
        duration("ex:Revenue"),
        duration("ex:Costs"),
        ConceptDef::explicit_dimension("ex:SegmentAxis"),
    ])
    .usd("ex:Revenue", "FY2020", "1", 0)
    .relationship(
        RelationshipDef::concepts(Arcrole::AggregationDomain, ROLE, "ex:Revenue", "ex:Costs")
            .with_dimension("ex:SegmentAxis"),
    )
    .report();
    assert_eq!(report.codes(), vec!["calc2e:invalidAggregationDomain"]);
}

#[test]
fn test_section_link_roles_scope_calculations() {
    let mut instance = Instance::new(vec![duration("ex:Total"), duration("ex:A")])
        .usd("ex:Total", "FY2020", "999", 0)
        .usd("ex:A", "FY2020", "1", 0)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1);
    instance.doc.concepts[0] = ConceptDef::item("ex:Section", PeriodType::Duration)
        .with_calc_linkroles(&[OTHER_ROLE]);
    let report = instance.report();
    assert!(report.findings().is_empty(), "{:?}", report.codes());
}

#[test]
fn test_sections_are_checked_independently() {
    let report = Instance::new(vec![duration("ex:Total"), duration("ex:A"), duration("ex:B")])
        .usd("ex:Total", "FY2020", "300", 0)
        .usd("ex:A", "FY2020", "120", 0)
        .usd("ex:B", "FY2020", "180", 0)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:B", 1)
        .section("notes", "ex:Notes", "Notes")
        .fact_in("notes", FactDef::numeric("ex:Total", "FY2020_copy", "USD", "130", 0))
        .fact_in("notes", FactDef::numeric("ex:A", "FY2020_copy", "USD", "120", 0))
        .report();

    // ex:B is only in the first section, and the two ex:Total facts never meet
    assert_eq!(report.codes(), vec!["calc2e:summationInconsistency"]);
    let finding = &report.findings()[0];
    assert_eq!(finding.params["section"], "Notes");
    assert_eq!(finding.params["reportedSum"], "130");
    assert_eq!(finding.params["computedSum"], "120");
    assert_eq!(finding.params["unreportedContributors"], "ex:B");
    assert_eq!(finding.objects, vec!["f4", "f5"]);
}

#[test]
fn test_document_wide_duplicate_facts() {
    let model = Instance::new(vec![duration("ex:Revenue"), duration("ex:Costs")])
        .usd("ex:Revenue", "FY2020", "100", 0)
        .usd("ex:Revenue", "FY2020_copy", "100.2", 1)
        .usd("ex:Costs", "FY2020", "40", 0)
        .fact(FactDef::numeric("ex:Costs", "FY2020_copy", "usd_copy", "45", 0))
        .model();

    let options = ValidationOptions::from_json_str(r#"{"duplicate_facts": "inconsistent"}"#).unwrap();
    let report = validate_model(&model, &options).unwrap();
    assert_eq!(
        report.codes(),
        vec![
            "duplicates:inconsistentDuplicateFacts",
            "calc2e:inconsistentDuplicateInSection"
        ]
    );
    let finding = &report.findings()[0];
    assert_eq!(finding.objects, vec!["f3", "f4"]);
    assert_eq!(finding.params["values"], "40, 45");

    let options = ValidationOptions {
        duplicate_facts: DuplicateTypeArg::Incomplete,
        validate_calculations: false,
        ..Default::default()
    };
    let report = validate_model(&model, &options).unwrap();
    assert_eq!(report.count("duplicates:incompleteDuplicateFacts"), 2);
    assert!(!report.has_errors());

    let report = validate_model(&model, &ValidationOptions::default()).unwrap();
    assert_eq!(report.count("duplicates:inconsistentDuplicateFacts"), 0);
}

#[test]
fn test_no_sections() {
    let mut instance = Instance::new(vec![duration("ex:Revenue")]).usd("ex:Revenue", "FY2020", "1", 0);
    instance
        .doc
        .relationships
        .retain(|rel| rel.arcrole != Arcrole::SectionFact);
    let report = instance.report();
    assert_eq!(report.codes(), vec!["calc2e:noSections"]);
}

#[test]
fn test_inferring_precision_required() {
    let model = Instance::new(vec![duration("ex:Revenue")])
        .usd("ex:Revenue", "FY2020", "1", 0)
        .model();
    let options = ValidationOptions {
        infer_decimals: false,
        ..Default::default()
    };
    let err = validate_model(&model, &options).unwrap_err();
    assert!(matches!(err, XbrlValidationError::InferDecimalsRequired));
}

#[test]
fn test_cancelled_run_stops_early() {
    let model = Instance::new(vec![duration("ex:Total"), duration("ex:A")])
        .usd("ex:Total", "FY2020", "999", 0)
        .usd("ex:A", "FY2020", "1", 0)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1)
        .model();
    let options = ValidationOptions::default();

    let report = ValidationEngine::validate(&model, &options).unwrap();
    assert_eq!(report.count("calc2e:summationInconsistency"), 1);

    let cancel = Arc::new(AtomicBool::new(true));
    let report = ValidationEngine::validate_with_cancellation(&model, &options, cancel).unwrap();
    assert!(report.cancelled);
    assert!(report.findings().is_empty());
}

#[test]
fn test_dimension_and_calculation_findings_together() {
    let report = Instance::new(vec![
        duration("ex:Total"),
        duration("ex:A"),
        ConceptDef::hypercube("ex:Table"),
    ])
    .usd("ex:Total", "FY2020", "10", 0)
    .usd("ex:A", "FY2020", "1", 0)
    .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1)
    .relationship(RelationshipDef::concepts(Arcrole::All, ROLE, "ex:Total", "ex:Table"))
    .report();
    assert_eq!(
        report.codes(),
        vec!["SBR.NL.2.3.6.04", "calc2e:summationInconsistency"]
    );
}

#[test]
fn test_validate_json_document() -> anyhow::Result<()> {
    let instance = Instance::new(vec![duration("ex:Total"), duration("ex:A"), duration("ex:B")])
        .usd("ex:Total", "FY2020", "300", 0)
        .usd("ex:A", "FY2020", "120", 0)
        .usd("ex:B", "FY2020", "170", 0)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:A", 1)
        .arc(Arcrole::SummationItem, "ex:Total", "ex:B", 1);
    let json = serde_json::to_string(&instance.doc)?;

    let options = ValidationOptions::from_json_str(r#"{"disclosure_system": "gfm"}"#)?;
    let report = validate_document(&json, &options)?;
    assert_eq!(report.count("calc2e:summationInconsistency"), 1);

    let output = report.to_json()?;
    assert!(output.contains("calc2e:summationInconsistency"));
    Ok(())
}

#[test]
fn test_invalid_document_is_an_error() {
    let err = validate_document("{ not json", &ValidationOptions::default()).unwrap_err();
    assert!(matches!(err, XbrlValidationError::SerializationError(_)));

    let doc = DocumentSource {
        facts: vec![FactDef::numeric("ex:Missing", "c", "u", "1", 0)],
        ..Default::default()
    };
    let err = XbrlModel::from_source(doc).unwrap_err();
    assert!(matches!(err, XbrlValidationError::InvalidModel { .. }));
}

#[test]
fn test_schema_generation() {
    let schema = DocumentSource::schema_as_json().unwrap();
    assert!(schema.contains("relationships"));
    let options_schema = serde_json::to_string(&ValidationOptions::generate_json_schema()).unwrap();
    assert!(options_schema.contains("disclosure_system"));
}
