//! Tests for the rule loader module.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glyco_core::FactSchema;
use tempfile::TempDir;

use super::*;
use crate::store::RuleStore;

const VALID_RULE_YAML: &str = r#"
apiVersion: v1
kind: TreatmentRule
metadata:
  id: metformin-first
  name: Metformin first line
spec:
  category: first-line
  action: Initiate metformin.
  priority: 10
  when:
    operator: and
    conditions:
      - flag: has_diabetes
      - operator: not
        conditions:
          - field: medications
            contains: metformin
  requires: [has_diabetes, medications]
  rationale: Metformin is the preferred first-line agent.
"#;

const BUNDLE_YAML: &str = r#"
apiVersion: v1
kind: RuleBundle
metadata:
  id: renal-pack
  name: Renal pack
rules:
  - metadata: { id: advanced-ckd, name: Advanced CKD }
    spec:
      category: renal
      action: Avoid metformin; refer to nephrology.
      priority: 90
      when: { field: egfr, op: lt, value: 30 }
      rationale: "eGFR {{ egfr }} is below 30."
  - metadata: { id: ckd-albuminuria, name: CKD with albuminuria, enabled: false }
    spec:
      category: renal
      action: Add SGLT2 inhibitor.
      priority: 70
      when: { field: urine_albumin, op: gte, value: 200 }
      rationale: Albuminuria.
"#;

fn temp_dir() -> TempDir {
    TempDir::new().expect("create tempdir")
}

fn loader() -> RuleLoader {
    RuleLoader::new(FactSchema::diabetes())
}

#[test]
fn load_single_file() {
    let dir = temp_dir();
    let path = dir.path().join("metformin.yml");
    fs::write(&path, VALID_RULE_YAML).unwrap();

    let set = loader().load(&RuleSource::File(path)).unwrap();
    assert_eq!(set.len(), 1);
    let rule = set.get("metformin-first").unwrap();
    assert_eq!(rule.name, "Metformin first line");
    assert_eq!(rule.requires.len(), 2);
}

#[test]
fn load_dir_skips_dotfiles_and_non_yaml() {
    let dir = temp_dir();
    fs::write(dir.path().join("rule1.yml"), VALID_RULE_YAML).unwrap();
    fs::write(dir.path().join(".hidden.yml"), "not: [valid").unwrap();
    fs::write(dir.path().join("readme.txt"), "not a rule").unwrap();

    let source = RuleSource::Dir(dir.path().to_path_buf());
    let report = loader().validate(&source);
    assert!(report.is_valid());

    let skipped = report
        .files
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Skipped { .. }))
        .count();
    assert_eq!(report.files_loaded(), 1);
    assert_eq!(skipped, 2);

    assert_eq!(loader().load(&source).unwrap().len(), 1);
}

#[test]
fn load_dir_recursive_with_bundle() {
    let dir = temp_dir();
    fs::write(dir.path().join("first-line.yml"), VALID_RULE_YAML).unwrap();
    let sub = dir.path().join("renal");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("renal.yaml"), BUNDLE_YAML).unwrap();

    let set = load_rules(&RuleSource::Dir(dir.path().to_path_buf()), &FactSchema::diabetes()).unwrap();

    // Disabled bundle member is validated but excluded.
    let ids: Vec<&str> = set.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["advanced-ckd", "metformin-first"]);

    let report = validate_source(&RuleSource::Dir(dir.path().to_path_buf()), &FactSchema::diabetes());
    assert_eq!(report.rules_checked, 3);
    assert!(report.warnings.iter().any(|w| w.path.contains("ckd-albuminuria.metadata.enabled")));
}

#[cfg(unix)]
#[test]
fn symlinked_directories_are_not_followed() {
    let dir = temp_dir();
    fs::write(dir.path().join("first-line.yml"), VALID_RULE_YAML).unwrap();
    let sub = dir.path().join("renal");
    fs::create_dir(&sub).unwrap();
    fs::write(sub.join("renal.yaml"), BUNDLE_YAML).unwrap();
    // A link back to the root would recurse forever if followed.
    std::os::unix::fs::symlink(dir.path(), sub.join("loop")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("first-line.yml"), dir.path().join("linked.txt")).unwrap();

    let source = RuleSource::Dir(dir.path().to_path_buf());
    let report = loader().validate(&source);
    assert!(report.is_valid(), "{:?}", report.errors);
    assert_eq!(report.files_loaded(), 2);
    assert!(report.files.iter().any(|r| r.path.ends_with("renal/loop")
        && matches!(&r.status, LoadStatus::Skipped { reason } if reason == "symlinked directory")));

    let ids: Vec<String> = loader().load(&source).unwrap().iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids, vec!["advanced-ckd", "metformin-first"]);
}

#[test]
fn errors_across_files_are_aggregated() {
    let dir = temp_dir();
    fs::write(
        dir.path().join("a.yml"),
        VALID_RULE_YAML.replace("contains: metformin", "contains: metformin\n            op: gt"),
    )
    .unwrap();
    fs::write(dir.path().join("b.yml"), BUNDLE_YAML.replace("op: lt", "op: lesser")).unwrap();
    fs::write(dir.path().join("c.yml"), "apiVersion: v2\nkind: TreatmentRule\nmetadata: { id: c, name: c }\n").unwrap();

    let err = loader().load(&RuleSource::Dir(dir.path().to_path_buf())).unwrap_err();
    let errors = err.errors();
    assert_eq!(errors.len(), 3, "{err}");
    assert!(errors.iter().any(|e| matches!(e, RuleLoadError::Parse { .. })));
    assert!(errors.iter().any(|e| matches!(
        e,
        RuleLoadError::UnknownOperator { rule_id, operator, .. } if rule_id == "advanced-ckd" && operator == "lesser"
    )));
    assert!(errors.iter().any(|e| matches!(
        e,
        RuleLoadError::UnsupportedApiVersion { found, .. } if found == "v2"
    )));
}

#[test]
fn duplicate_ids_name_both_files() {
    let dir = temp_dir();
    fs::write(dir.path().join("a.yml"), VALID_RULE_YAML).unwrap();
    fs::write(dir.path().join("b.yml"), VALID_RULE_YAML).unwrap();

    let err = loader().load(&RuleSource::Dir(dir.path().to_path_buf())).unwrap_err();
    match err {
        RuleLoadError::DuplicateId { id, first, second } => {
            assert_eq!(id, "metformin-first");
            assert!(first.ends_with("a.yml"));
            assert!(second.ends_with("b.yml"));
        }
        other => panic!("unexpected: {other}"),
    }
}

#[test]
fn unknown_kind_suggests_closest() {
    let yaml = VALID_RULE_YAML.replace("kind: TreatmentRule", "kind: TreatmentRules");
    let err = loader().load(&RuleSource::Yaml(yaml)).unwrap_err();
    match err {
        RuleLoadError::UnknownKind { kind, suggestion, .. } => {
            assert_eq!(kind, "TreatmentRules");
            assert_eq!(suggestion.as_deref(), Some("TreatmentRule"));
        }
        other => panic!("unexpected: {other}"),
    }
}

#[test]
fn unknown_field_is_rejected_with_suggestion() {
    let yaml = VALID_RULE_YAML.replace("field: medications", "field: medication");
    let err = loader().load(&RuleSource::Yaml(yaml)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "rule 'metformin-first': unknown fact field 'medication' (did you mean 'medications'?)"
    );
}

#[test]
fn field_type_mismatch_is_rejected() {
    let yaml = VALID_RULE_YAML.replace("- flag: has_diabetes", "- field: has_diabetes\n        op: gt\n        value: 0");
    let err = loader().load(&RuleSource::Yaml(yaml)).unwrap_err();
    assert!(matches!(err, RuleLoadError::FieldType { ref field, .. } if field == "has_diabetes"), "{err}");
}

#[test]
fn missing_directory_is_read_error() {
    let dir = temp_dir();
    let missing = dir.path().join("nope");
    let err = loader().load(&RuleSource::Dir(missing.clone())).unwrap_err();
    assert!(matches!(err, RuleLoadError::Read { ref path, .. } if *path == missing));
}

#[test]
fn strict_ids_turn_warnings_into_errors() {
    let yaml = VALID_RULE_YAML.replace("id: metformin-first", "id: Metformin_First");
    let relaxed = loader().validate(&RuleSource::Yaml(yaml.clone()));
    assert!(relaxed.is_valid());
    assert_eq!(relaxed.warnings.len(), 1);

    let strict = loader().strict_ids(true).validate(&RuleSource::Yaml(yaml));
    assert!(!strict.is_valid());
}

#[test]
fn watcher_hot_reloads_and_keeps_snapshot_on_bad_edit() {
    let dir = temp_dir();
    let path = dir.path().join("rules.yml");
    fs::write(&path, VALID_RULE_YAML).unwrap();

    let source = RuleSource::Dir(dir.path().to_path_buf());
    let store = Arc::new(RuleStore::new(loader().load(&source).unwrap()));
    let initial = store.snapshot().fingerprint().to_string();

    let watcher = RuleWatcher::spawn(Arc::clone(&store), loader(), dir.path(), Duration::from_millis(50)).unwrap();

    fs::write(&path, VALID_RULE_YAML.replace("priority: 10", "priority: 20")).unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while store.snapshot().fingerprint() == initial && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(25));
    }
    let reloaded = store.snapshot();
    assert_ne!(reloaded.fingerprint(), initial, "watcher never reloaded");
    assert_eq!(reloaded.get("metformin-first").map(|r| r.priority), Some(20));

    // A broken edit leaves the last good snapshot in place.
    fs::write(&path, "apiVersion: v1\nkind: [").unwrap();
    std::thread::sleep(Duration::from_millis(500));
    assert_eq!(store.snapshot().fingerprint(), reloaded.fingerprint());

    watcher.stop();
}
