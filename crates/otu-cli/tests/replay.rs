//! File-backed replay, verify and diff

use otu_cli::{diff_documents, load_config, load_json, run_replay, verify_document, Script};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const SCRIPT: &str = r"
user: alice
references:
  - _id: plants
    name: Plant viruses
    restrict_source_types: true
    source_types: [isolate, strain]
steps:
  - op: create
    reference: plants
    name: Prunus virus F
    abbreviation: PVF
    schema:
      - name: RNA1
        molecule: ssRNA
      - name: RNA2
        molecule: ssRNA
    as: pvf
  - op: add_isolate
    otu: pvf
    source_type: isolate
    source_name: 8816-s2
    as: iso
  - op: add_isolate
    otu: pvf
    source_type: genotype
    source_name: X
  - op: create_sequence
    otu: pvf
    isolate: iso
    accession: KX269872
    definition: Prunus virus F isolate 8816-s2 segment RNA1
    host: sweet cherry
    sequence: |
      TGTTTAAGAGATTAAACAACCGCTTTC
      GTTACAAAGAATTTTCAGGAAAATCA
    segment: RNA1
  - op: create_sequence
    otu: pvf
    isolate: iso
    accession: KX269873
    definition: Prunus virus F isolate 8816-s2 segment RNA2
    sequence: TGTTTAAGAGATTAAACAACCG
    segment: RNA3
  - op: create_sequence
    otu: pvf
    isolate: iso
    accession: KX269873
    definition: Prunus virus F isolate 8816-s2 segment RNA2
    sequence: TGTTTAAGAGATTAAACAACCG
    segment: RNA2
  - op: edit_sequence
    otu: pvf
    isolate: iso
    accession: KX269873
";

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn replay_from_file() {
    let dir = TempDir::new().unwrap();
    let script_path = write(&dir, "script.yaml", SCRIPT);
    let config_path = write(&dir, "otu.toml", "id_length = 6\nlog_filter = \"debug\"\n");

    let config = load_config(Some(config_path.as_path())).unwrap();
    assert_eq!(config.id_length, 6);

    let script = Script::load(&script_path).unwrap();
    let report = run_replay(&script, config).await.unwrap();

    let statuses: Vec<_> = report.steps.iter().map(|step| step.status).collect();
    assert_eq!(
        statuses,
        [None, None, Some(400), None, Some(400), None, Some(400)]
    );

    let otu = &report.otus[0];
    assert_eq!(otu.id.as_str().len(), 6);
    assert_eq!(otu.version, 3);
    assert!(otu.verified);
    assert_eq!(otu.isolates[0].sequences[0].sequence.len(), 53);
    assert_eq!(report.history.len(), 4);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["steps"][0], serde_json::json!({"index": 1, "op": "create"}));
    assert_eq!(json["history"][0]["method_name"], "create");
}

#[test]
fn missing_script_names_the_path() {
    let dir = TempDir::new().unwrap();
    let err = Script::load(dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("absent.yaml"));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "otu.toml", "default_per_page = 500\n");
    assert!(load_config(Some(path.as_path())).is_err());
    assert_eq!(load_config(None).unwrap().max_per_page, 100);
}

#[tokio::test]
async fn replayed_history_diffs_apply() {
    let dir = TempDir::new().unwrap();
    let script = Script::load(write(&dir, "script.yaml", SCRIPT)).unwrap();
    let report = run_replay(&script, Default::default()).await.unwrap();

    let snapshot = report.otus[0].to_joined().to_document().unwrap();
    let old = write(&dir, "old.json", &serde_json::to_string(&snapshot).unwrap());

    let mut edited = snapshot.clone();
    edited["abbreviation"] = serde_json::json!("PrVF");
    let new = write(&dir, "new.json", &serde_json::to_string(&edited).unwrap());

    let ops = diff_documents(&load_json(&old).unwrap(), &load_json(&new).unwrap());
    assert_eq!(
        serde_json::to_value(&ops).unwrap(),
        serde_json::json!([["change", "abbreviation", ["PVF", "PrVF"]]])
    );
    assert_eq!(otu_model::apply(&snapshot, &ops).unwrap(), edited);

    assert_eq!(verify_document(load_json(&old).unwrap()).unwrap(), None);
}

#[test]
fn bad_json_reports_file() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.json", "{not json");
    let err = load_json(&path).unwrap_err();
    assert!(format!("{err:#}").contains("broken.json"));
}
