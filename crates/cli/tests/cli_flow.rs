use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn docindex(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("docindex").expect("binary");
    cmd.current_dir(workdir)
        .env_remove("DOCINDEX_CONFIG")
        .env_remove("DOCINDEX_SNAPSHOT")
        .env_remove("DOCINDEX_EMBED_MODE")
        .env_remove("DOCINDEX_EMBED_URL")
        .env_remove("DOCINDEX_EMBED_MODEL")
        .args(["--embed-mode", "stub", "--dimension", "16"]);
    cmd
}

fn run_json(workdir: &Path, args: &[&str]) -> Value {
    let output = docindex(workdir)
        .arg("--json")
        .args(args)
        .output()
        .expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn write_docs(root: &Path) {
    fs::write(
        root.join("docs.json"),
        r#"[
  {"id": "lic-1", "name": "Driver license renewal", "text": "Bring your current license and proof of address to renew."},
  {"id": "veh-2", "name": "Vehicle registration", "text": "Register a new vehicle with the invoice and insurance policy."},
  {"id": "fine-3", "name": "Traffic fines", "text": "Pay traffic fines online or at any authorized office."}
]"#,
    )
    .unwrap();
}

#[test]
fn ingest_then_query_returns_exact_match_first() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write_docs(root);

    let report = run_json(root, &["ingest", "--file", "docs.json"]);
    assert_eq!(report["requested"], 3);
    assert_eq!(report["indexed"], 3);
    assert_eq!(report["persistence"]["status"], "saved");
    assert!(root.join(".docindex").join("index.snapshot").exists());

    let outcome = run_json(
        root,
        &[
            "query",
            "Register a new vehicle with the invoice and insurance policy.",
            "-k",
            "2",
        ],
    );
    assert_eq!(outcome["status"], "success");
    let results = outcome["results"].as_array().expect("results");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["id"], "veh-2");
    assert_eq!(results[0]["name"], "Vehicle registration");
    assert_eq!(results[0]["distance"].as_f64(), Some(0.0));

    let stats = run_json(root, &["stats"]);
    assert_eq!(stats["documents"], 3);
    assert_eq!(stats["dimension"], 16);
}

#[test]
fn context_flag_renders_named_blocks() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write_docs(root);
    run_json(root, &["ingest", "--file", "docs.json"]);

    docindex(root)
        .args([
            "query",
            "Pay traffic fines online or at any authorized office.",
            "-k",
            "1",
            "--excerpt",
            "8",
            "--context",
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("--- Traffic fines ---\nPay traf"));
}

#[test]
fn query_on_missing_index_reports_empty() {
    let temp = tempdir().unwrap();
    let outcome = run_json(temp.path(), &["query", "anything at all"]);
    assert_eq!(outcome["status"], "empty");
    assert_eq!(outcome["results"].as_array().map(Vec::len), Some(0));
}

#[test]
fn upsert_mode_keeps_index_size() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write_docs(root);

    run_json(root, &["ingest", "--file", "docs.json"]);
    let report = run_json(
        root,
        &["ingest", "--file", "docs.json", "--mode", "upsert-by-id"],
    );
    assert_eq!(report["replaced"], 3);
    assert_eq!(report["total_documents"], 3);

    let report = run_json(root, &["ingest", "--file", "docs.json"]);
    assert_eq!(report["total_documents"], 6);
}

#[test]
fn ingest_directory_with_config_file() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("corpus/guides")).unwrap();
    fs::write(root.join("corpus/guides/permits.md"), "# Permits\nApply at city hall.").unwrap();
    fs::write(root.join("corpus/hours.txt"), "Offices open 9 to 5.").unwrap();
    fs::write(root.join("corpus/logo.png"), [0x89, 0x50, 0x4e, 0x47]).unwrap();
    fs::write(
        root.join("docindex.toml"),
        "snapshot_path = \"store/docs.snapshot\"\n[query]\nk = 1\n",
    )
    .unwrap();

    let report = run_json(root, &["ingest", "--dir", "corpus"]);
    assert_eq!(report["indexed"], 2);
    assert!(root.join("store/docs.snapshot").exists());

    let outcome = run_json(root, &["query", "Offices open 9 to 5."]);
    let results = outcome["results"].as_array().expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], "hours.txt");
}

#[test]
fn unknown_embed_mode_in_config_is_rejected() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(root.join("custom.toml"), "[embedder]\nmode = \"onnx\"\n").unwrap();

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("docindex").expect("binary");
    cmd.current_dir(root)
        .env_remove("DOCINDEX_EMBED_MODE")
        .args(["--config", "custom.toml", "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported embedding mode"));
}

#[test]
fn ingest_requires_a_source() {
    let temp = tempdir().unwrap();
    docindex(temp.path()).arg("ingest").assert().failure();
}
