use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn qnah_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("qnah");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    fs::write(
        data_dir.join("qna.json"),
        r#"[
  {"tanya": "Jam buka?", "jawab": "Setiap hari 08:00-17:00"},
  {"question": "alamat", "answer": "Jl. Merdeka 1, Bandung"}
]"#,
    )
    .unwrap();

    // Nothing listens on port 1, and the key variables are never set, so
    // both providers are unavailable.
    let config_content = format!(
        r#"[data]
qna_path = "{root}/data/qna.json"
corpus_path = "{root}/data/corpus.json"
log_path = "{root}/data/log.json"

[embedding]
provider = "disabled"

[providers.primary]
base_url = "http://127.0.0.1:1"
model = "gpt-4o-mini"
api_key_env = "QNAH_TEST_UNSET_PRIMARY_KEY"

[providers.secondary]
base_url = "http://127.0.0.1:1"
model = "llama-3.1-8b-instant"
timeout_secs = 2
api_key_env = "QNAH_TEST_UNSET_SECONDARY_KEY"

[chat]
fallback_reply = "Belum tahu."

[server]
bind = "127.0.0.1"
port = 7331
"#,
        root = root.display()
    );

    let config_path = config_dir.join("qna.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_qnah(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = qnah_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("PORT")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run qnah binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn ask_json(config_path: &Path, message: &str) -> Value {
    let (stdout, stderr, success) = run_qnah(config_path, &["ask", "--json", message]);
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("ask did not print JSON ({}): {}", e, stdout))
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn data_path(config_path: &Path, name: &str) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("data").join(name)
}

#[test]
fn test_ask_exact_match_logs_one_entry() {
    let (_tmp, config_path) = setup_test_env();

    let body = ask_json(&config_path, "  JAM BUKA?  ");
    assert_eq!(body["reply"], "Setiap hari 08:00-17:00");
    assert_eq!(body["tier"], "exact");
    assert!(body.get("index").is_none());

    let log = read_json(&data_path(&config_path, "log.json"));
    assert_eq!(log, json!([{"user": "jam buka?", "ai": "Setiap hari 08:00-17:00"}]));
}

#[test]
fn test_ask_plain_output() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_qnah(&config_path, &["ask", "alamat"]);
    assert!(success, "ask failed: {}", stderr);
    assert_eq!(stdout.trim(), "Jl. Merdeka 1, Bandung");
}

#[test]
fn test_ask_blank_message_logs_nothing() {
    let (_tmp, config_path) = setup_test_env();

    let body = ask_json(&config_path, "   ");
    assert_eq!(body["reply"], "Pesan kosong.");
    assert_eq!(body["tier"], "empty");

    let log = read_json(&data_path(&config_path, "log.json"));
    assert_eq!(log, json!([]));
}

#[test]
fn test_ask_falls_back_when_providers_unavailable() {
    let (_tmp, config_path) = setup_test_env();

    let body = ask_json(&config_path, "cuaca besok?");
    assert_eq!(body["reply"], "Belum tahu.");
    assert_eq!(body["tier"], "fallback");

    let log = read_json(&data_path(&config_path, "log.json"));
    assert_eq!(log, json!([{"user": "cuaca besok?", "ai": "Belum tahu."}]));
}

#[test]
fn test_missing_data_files_are_created_empty() {
    let (_tmp, config_path) = setup_test_env();
    let corpus = data_path(&config_path, "corpus.json");
    assert!(!corpus.exists());

    ask_json(&config_path, "halo");

    assert_eq!(read_json(&corpus), json!([]));
}

#[test]
fn test_restart_keeps_files_and_appends() {
    let (_tmp, config_path) = setup_test_env();
    let qna_path = data_path(&config_path, "qna.json");
    let qna_before = fs::read_to_string(&qna_path).unwrap();

    ask_json(&config_path, "jam buka?");
    ask_json(&config_path, "jam buka?");

    let log = read_json(&data_path(&config_path, "log.json"));
    assert_eq!(log.as_array().unwrap().len(), 2, "no deduplication across runs");
    assert_eq!(fs::read_to_string(&qna_path).unwrap(), qna_before);
}

#[test]
fn test_corrupt_qna_file_degrades_and_is_not_rewritten() {
    let (_tmp, config_path) = setup_test_env();
    let qna_path = data_path(&config_path, "qna.json");
    fs::write(&qna_path, "[{\"tanya\": ").unwrap();

    let body = ask_json(&config_path, "jam buka?");
    assert_eq!(body["tier"], "fallback");
    assert_eq!(fs::read_to_string(&qna_path).unwrap(), "[{\"tanya\": ");
}

#[test]
fn test_status_lists_files_and_providers() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_qnah(&config_path, &["status"]);
    assert!(success, "status failed: {}", stderr);
    assert!(stdout.contains("qna"));
    assert!(stdout.contains("MISSING"), "corpus.json does not exist yet");
    assert!(stdout.contains("NO KEY (QNAH_TEST_UNSET_PRIMARY_KEY)"));
    assert!(stdout.contains("secondary"));
}

#[test]
fn test_corpus_add_appends_entries() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_qnah(&config_path, &["corpus", "add", "harga kopi"]);
    assert!(success, "corpus add failed: {}", stderr);
    let (stdout, stderr, success) = run_qnah(
        &config_path,
        &["corpus", "add", "harga teh", "--answer", "Rp 8.000"],
    );
    assert!(success, "corpus add failed: {}", stderr);
    assert!(stdout.contains("entry 1"));

    let corpus = read_json(&data_path(&config_path, "corpus.json"));
    assert_eq!(
        corpus,
        json!(["harga kopi", {"user": "harga teh", "ai": "Rp 8.000"}])
    );
}

#[test]
fn test_corpus_add_refuses_corrupt_corpus() {
    let (_tmp, config_path) = setup_test_env();
    let corpus = data_path(&config_path, "corpus.json");
    fs::write(&corpus, "{ not an array").unwrap();

    let (_, _, success) = run_qnah(&config_path, &["corpus", "add", "harga kopi"]);
    assert!(!success);
    assert_eq!(fs::read_to_string(&corpus).unwrap(), "{ not an array");
}

#[test]
fn test_invalid_config_fails() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[retrieval]\nsimilarity_threshold = 2.0\n").unwrap();

    let (_, stderr, success) = run_qnah(&config_path, &["status"]);
    assert!(!success);
    assert!(stderr.contains("similarity_threshold"));
}
