use approx::assert_relative_eq;
use cutdata::catalog::DifficultyClass;
use cutdata::handbook::recommend::EnvelopeSource;
use cutdata::handbook::{KienzleCorrections, Severity};
use cutdata::report::Outcome;
use cutdata::{
    parse_script, run_script, Catalog, EvalError, EvaluatorConfig, Handbook, ModelWarning,
    Operation,
};

fn handbook() -> Handbook<'static> {
    Handbook::new(
        Catalog::builtin().expect("built-in catalog"),
        EvaluatorConfig::default(),
    )
}

#[test]
fn harder_variants_cut_harder_and_wear_faster() {
    let catalog = Catalog::builtin().unwrap();

    for (alloy, group) in catalog.by_alloy() {
        for pair in group.windows(2) {
            let (softer, harder) = (pair[0], pair[1]);
            assert!(
                harder.kienzle.kc1_1 > softer.kienzle.kc1_1,
                "{}: {} kc1.1 should exceed {}",
                alloy,
                harder.id,
                softer.id
            );
            assert!(
                harder.taylor.c < softer.taylor.c,
                "{}: {} Taylor C should be below {}",
                alloy,
                harder.id,
                softer.id
            );
        }
    }
}

#[test]
fn hardened_variants_exceed_annealed_kc11() {
    let catalog = Catalog::builtin().unwrap();
    for group in catalog.by_alloy().values() {
        let annealed = group.iter().find(|m| !m.is_hardened()).expect("annealed variant");
        for hardened in group.iter().filter(|m| m.hardness.rockwell_c >= 50.0) {
            assert!(hardened.kienzle.kc1_1 > annealed.kienzle.kc1_1, "{}", hardened.id);
        }
    }
}

#[test]
fn builtin_catalog_validates_without_warnings() {
    let issues = handbook().validate_catalog();
    let serious: Vec<_> = issues
        .iter()
        .filter(|i| i.severity >= Severity::Warning)
        .collect();
    assert!(serious.is_empty(), "{:#?}", serious);
}

#[test]
fn every_material_and_operation_recommends() {
    let hb = handbook();
    for id in hb.catalog().ids() {
        for operation in Operation::ALL {
            let rec = hb
                .recommend(id, operation)
                .unwrap_or_else(|e| panic!("{} {}: {}", id, operation, e));

            for (field, bounds) in rec.value.envelope.fields() {
                assert!(bounds.is_consistent(), "{} {} {}: {:?}", id, operation, field, bounds);
            }
            assert!(
                !rec.warnings
                    .iter()
                    .any(|w| matches!(w, ModelWarning::StoredEnvelopeDeviates { .. })),
                "{} {} stored envelope disagrees with the model: {:?}",
                id,
                operation,
                rec.warnings
            );
        }
    }
}

#[test]
fn stored_envelopes_are_used_where_present() {
    let hb = handbook();
    let stored = hb.recommend("P-CS-110", Operation::Milling).unwrap();
    assert_eq!(stored.value.source, EnvelopeSource::Stored);

    let derived = hb.recommend("P-CS-112", Operation::Milling).unwrap();
    assert_eq!(derived.value.source, EnvelopeSource::Derived);
}

#[test]
fn a2_annealed_specific_cutting_force() {
    let kc = handbook()
        .specific_cutting_force("P-CS-109", 0.15, &KienzleCorrections::default())
        .unwrap();
    // 2150 * 0.15^-0.22
    assert_relative_eq!(kc.value, 3263.6, max_relative = 1e-4);
}

#[test]
fn a2_hardened_dry_tool_life() {
    let hb = handbook();
    let life = hb.tool_life("P-CS-110", 30.0, 1.5, "dry").unwrap();
    assert!(life.value > 0.0 && life.value.is_finite());
    assert!(life.warnings.is_empty());

    let record = hb.material("P-CS-110").unwrap();
    assert_eq!(record.machinability.difficulty_class, DifficultyClass::Difficult);
    assert_eq!(record.hardness.rockwell_c, 60.0);
}

#[test]
fn nitrogen_is_never_a_coolant() {
    let err = handbook().tool_life("P-CS-110", 30.0, 1.5, "nitrogen").unwrap_err();
    assert!(matches!(err, EvalError::InvalidCoolant { .. }), "{:?}", err);
}

#[test]
fn catalog_file_matches_builtin() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/tool_steels.json");
    let from_file = Catalog::from_file(path).unwrap();
    let builtin = Catalog::builtin().unwrap();

    assert_eq!(from_file.len(), builtin.len());
    for record in builtin.iter() {
        assert_eq!(from_file.get(&record.id), Some(record));
    }
}

#[test]
fn demo_script_runs_clean() {
    let source = include_str!("../demos/a2_roughing.cut");
    let script = parse_script(source).expect("demo script parses");
    let report = run_script(&handbook(), &script);

    let failures: Vec<_> = report
        .entries
        .iter()
        .filter_map(|e| match &e.outcome {
            Outcome::Error { message } => Some((e.line, message.clone())),
            Outcome::Ok { .. } => None,
        })
        .collect();
    assert!(failures.is_empty(), "{:?}", failures);
    assert_eq!(report.entries.len(), 11);
}
