//! End-to-end tests through the public API: construction, closure repair,
//! eligibility, enumeration, dispositions and config loading.

use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use lgrcore::pattern::{Matcher, Rule};
use lgrcore::{
    Action, ActionIndex, AddOptions, Check, EntryInput, Lgr, LgrConfig, LgrError, Policy,
    RangeInput, TableDatabase, VariantInput, load_config,
};

fn new_lgr() -> Lgr {
    Lgr::new(Arc::new(TableDatabase::new()))
}

fn add_cps(lgr: &mut Lgr, cps: &[u32]) {
    for &cp in cps {
        lgr.add_cp(EntryInput::new(&[cp]), &AddOptions::default())
            .unwrap();
    }
}

fn add_variant(lgr: &mut Lgr, from: u32, to: u32, ty: &str) {
    lgr.add_variant(&[from], VariantInput::new(&[to], Some(ty)), &AddOptions::default())
        .unwrap();
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn blocked_pair_dispositions() {
    let mut lgr = new_lgr();
    add_cps(&mut lgr, &[0x61, 0x62]);
    add_variant(&mut lgr, 0x61, 0x62, "blocked");
    add_variant(&mut lgr, 0x62, 0x61, "blocked");

    let all = lgr.compute_label_disposition(&[0x61], false, false).unwrap();
    let original: Vec<_> = all.iter().filter(|d| d.is_original).collect();
    assert_eq!(original.len(), 1);
    assert_eq!(original[0].label, vec![0x61]);
    let b = all.iter().find(|d| d.label == vec![0x62]).unwrap();
    assert_eq!(b.types, set(&["blocked"]));
    assert_eq!(b.disposition, "blocked");
}

#[test]
fn range_expansion_keeps_attributes() {
    let config = LgrConfig {
        idna_policy: Policy::Warn,
        ..LgrConfig::default()
    };
    let mut lgr = Lgr::with_config(Arc::new(TableDatabase::new()), config);
    let id = lgr.add_reference("RFC 7940", None, None).unwrap();
    let mut range = RangeInput::new(0x41, 0x45);
    range.comment = Some("capitals".to_string());
    range.tags = vec!["upper".to_string()];
    range.references = vec![id.clone()];
    range.when = Some("r1".to_string());
    lgr.add_range(range, &AddOptions::default()).unwrap();
    assert_eq!(lgr.repertoire().ranges().len(), 1);

    lgr.expand_range(0x41, 0x45).unwrap();
    assert!(lgr.repertoire().ranges().is_empty());
    let entries: Vec<_> = lgr.repertoire().entries().collect();
    assert_eq!(entries.len(), 5);
    for entry in entries {
        assert_eq!(entry.cp.len(), 1);
        assert_eq!(entry.comment.as_deref(), Some("capitals"));
        assert_eq!(entry.tags, vec!["upper".to_string()]);
        assert_eq!(entry.references, vec![id.clone()]);
        assert_eq!(entry.context.when(), Some("r1"));
    }
}

#[test]
fn upper_case_range_is_rejected_by_default() {
    let mut lgr = new_lgr();
    assert_eq!(
        lgr.add_range(RangeInput::new(0x41, 0x45), &AddOptions::default()),
        Err(LgrError::IdnaInvalid(vec![0x41]))
    );
    assert!(lgr.repertoire().is_empty());
}

#[test]
fn reversed_range_fails_before_mutation() {
    let mut lgr = new_lgr();
    add_cps(&mut lgr, &[0x61]);
    let result = lgr.add_range(RangeInput::new(10, 5), &AddOptions::forced());
    assert!(matches!(result, Err(LgrError::InvalidParameter(_))));
    assert_eq!(lgr.repertoire().len(), 1);
    assert!(lgr.repertoire().ranges().is_empty());
}

#[test]
fn invalid_action_before_defaults() {
    let mut lgr = new_lgr();
    add_cps(&mut lgr, &[0x61, 0x62]);
    add_variant(&mut lgr, 0x61, 0x61, "invalid");
    lgr.add_action(Action::new("invalid").any_variant(["invalid"]), false, false)
        .unwrap();

    let report = lgr.test_label_eligible(&[0x61]).unwrap();
    assert_eq!(report.types, set(&["invalid"]));
    assert_eq!(report.disposition, "invalid");
    assert_eq!(report.action, Some(ActionIndex::Explicit(0)));

    let report = lgr.test_label_eligible(&[0x62]).unwrap();
    assert!(report.types.is_empty());
    assert_eq!(report.disposition, "valid");
    assert!(matches!(report.action, Some(ActionIndex::Default(_))));
}

#[test]
fn populate_then_checks_are_clean() {
    let mut lgr = new_lgr();
    add_cps(&mut lgr, &[0x61, 0x62]);
    add_variant(&mut lgr, 0x61, 0x62, "blocked");
    add_variant(&mut lgr, 0x62, 0x63, "blocked");

    let checks: Vec<Check> = lgr.check_symmetry().iter().map(|d| d.check).collect();
    assert_eq!(checks, vec![Check::Symmetry, Check::MissingTarget]);
    assert!(!lgr.check_transitivity().is_empty());

    let report = lgr.populate_variants();
    assert_eq!(report.added_entries, vec![vec![0x63]]);
    assert!(lgr.check_symmetry().is_empty());
    assert!(lgr.check_transitivity().is_empty());
    assert!(lgr.repertoire().contains(&[0x63]));

    let again = lgr.populate_variants();
    assert!(again.is_empty());
}

#[test]
fn index_labels_identify_variant_sets() {
    let mut lgr = new_lgr();
    add_cps(&mut lgr, &[0x61, 0x62, 0x63, 0x64]);
    add_variant(&mut lgr, 0x61, 0x62, "blocked");
    add_variant(&mut lgr, 0x62, 0x63, "blocked");
    lgr.populate_variants();

    let index = |label: &[u32]| lgr.generate_index_label(label).unwrap();
    assert_eq!(index(&[0x63, 0x64]), index(&[0x61, 0x64]));
    assert_eq!(index(&[0x62, 0x64]), vec![0x61, 0x64]);
    assert_ne!(index(&[0x64]), index(&[0x61]));

    // Every generated variant shares the index label of the original.
    let original = index(&[0x62, 0x64]);
    for variant in lgr.generate_label_variants(&[0x62, 0x64], false) {
        let variant = variant.unwrap();
        assert_eq!(index(&variant.cp), original);
    }
}

#[test]
fn every_eligible_label_gets_one_original_disposition() {
    let mut lgr = new_lgr();
    add_cps(&mut lgr, &[0x61, 0x62, 0x63]);
    add_variant(&mut lgr, 0x61, 0x62, "allocatable");
    add_variant(&mut lgr, 0x62, 0x61, "allocatable");
    add_variant(&mut lgr, 0x63, 0x63, "activated");
    let labels: Vec<Vec<u32>> = vec![vec![0x61], vec![0x62, 0x63], vec![0x63, 0x63, 0x61]];
    for result in lgr.compute_label_dispositions(&labels, false, false) {
        let all = result.unwrap();
        let originals: Vec<_> = all.iter().filter(|d| d.is_original).collect();
        assert_eq!(originals.len(), 1);
        assert!(originals[0].action.is_some());
        assert!(!originals[0].disposition.is_empty());
    }
}

#[test]
fn enumeration_can_stop_early() {
    let mut lgr = new_lgr();
    let letters: Vec<u32> = (0x61..=0x69).collect();
    add_cps(&mut lgr, &letters);
    for &a in &letters {
        for &b in &letters {
            if a != b {
                add_variant(&mut lgr, a, b, "blocked");
            }
        }
    }
    let label = vec![0x61; 10];
    assert_eq!(lgr.estimate_variant_number(&label, false).unwrap(), 9u64.pow(10));
    let first: Vec<_> = lgr
        .generate_label_variants(&label, false)
        .take(5)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(first.len(), 5);
    let all = lgr.compute_label_disposition(&label, false, false).unwrap();
    assert_eq!(all.len() as u64, LgrConfig::default().max_variants + 1);
    let original = all.last().unwrap();
    assert!(original.is_original && original.capped);
    assert_eq!(original.label, label);
}

#[test]
fn context_rules_gate_entries() {
    let mut lgr = new_lgr();
    add_cps(&mut lgr, &[0x61]);
    lgr.add_rule(
        Rule::new(
            "after-a",
            vec![Matcher::LookBehind(vec![Matcher::char(0x61)]), Matcher::Anchor],
        ),
        false,
        false,
    )
    .unwrap();
    let mut dot = EntryInput::new(&[0xB7]);
    dot.when = Some("after-a".to_string());
    lgr.add_cp(dot, &AddOptions::default()).unwrap();

    assert!(lgr.test_label_eligible(&[0x61, 0xB7]).unwrap().eligible);
    assert!(!lgr.test_label_eligible(&[0xB7, 0x61]).unwrap().eligible);
    assert!(lgr.validate_references().is_empty());
}

#[test]
fn force_mode_downgrades_recoverable_errors() {
    let mut lgr = new_lgr();
    add_cps(&mut lgr, &[0x61]);
    assert_eq!(
        lgr.add_cp(EntryInput::new(&[0x61]), &AddOptions::default()),
        Err(LgrError::AlreadyExists(vec![0x61]))
    );
    assert!(lgr.add_cp(EntryInput::new(&[0x61]), &AddOptions::forced()).is_ok());

    let mut both = EntryInput::new(&[0x62]);
    both.when = Some("w".to_string());
    both.not_when = Some("nw".to_string());
    assert!(lgr.add_cp(both.clone(), &AddOptions::default()).is_err());
    lgr.add_cp(both, &AddOptions::forced()).unwrap();
    assert_eq!(lgr.repertoire().get(&[0x62]).unwrap().context.when(), Some("w"));

    // Empty input is never recoverable.
    assert_eq!(
        lgr.add_cp(EntryInput::new(&[]), &AddOptions::forced()),
        Err(LgrError::EmptyCodePoints)
    );
}

#[test]
fn script_policy_follows_metadata_languages() {
    let mut lgr = new_lgr();
    lgr.metadata_mut().set_languages(vec!["und-Latn".to_string()]);
    add_cps(&mut lgr, &[0x61]);
    // Greek is outside the LGR scripts but the default policy only warns.
    add_cps(&mut lgr, &[0x3B1]);

    let config = LgrConfig {
        script_policy: Policy::Reject,
        ..LgrConfig::default()
    };
    let mut strict = Lgr::with_config(Arc::new(TableDatabase::new()), config);
    strict.metadata_mut().set_languages(vec!["und-Latn".to_string()]);
    assert!(matches!(
        strict.add_cp(EntryInput::new(&[0x3B1]), &AddOptions::default()),
        Err(LgrError::OutOfScript { .. })
    ));
    // Common script code points are always allowed.
    strict
        .add_cp(EntryInput::new(&[0x2D]), &AddOptions::default())
        .unwrap();
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lgr.yml");
    fs::write(
        &path,
        "UnicodeValidity:\n  Idna: warn\nMaxVariants: 2\nPopulatedVariantType: r-populated\n",
    )
    .unwrap();
    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.idna_policy, Policy::Warn);
    assert_eq!(config.max_variants, 2);

    let mut lgr = Lgr::with_config(Arc::new(TableDatabase::new()), config);
    add_cps(&mut lgr, &[0x41, 0x61]);
    add_variant(&mut lgr, 0x41, 0x61, "blocked");
    add_variant(&mut lgr, 0x61, 0x41, "blocked");
    assert!(lgr.compute_label_disposition(&[0x61], false, false).is_ok());
    let all = lgr.compute_label_disposition(&[0x61, 0x61], false, false).unwrap();
    assert_eq!(all.len(), 3);
    assert!(all[2].is_original && all[2].capped);
}

#[test]
fn missing_config_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(Some(&dir.path().join("absent.yml"))).unwrap();
    assert_eq!(config.max_variants, LgrConfig::default().max_variants);
}

#[test]
fn results_serialize_to_json() {
    let mut lgr = new_lgr();
    add_cps(&mut lgr, &[0x61, 0x62]);
    add_variant(&mut lgr, 0x61, 0x62, "blocked");
    let diags = lgr.check_symmetry();
    let json = serde_json::to_value(&diags).unwrap();
    assert_eq!(json[0]["check"], "symmetry");
    assert_eq!(json[0]["severity"], "error");

    let report = lgr.test_label_eligible(&[0x61, 0x7A]).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["eligible"], false);
    assert_eq!(json["invalid"][0]["reason"], "not_in_repertoire");
}
