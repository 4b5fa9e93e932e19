use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn alink_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("alink");
    path
}

fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn setup_test_env(extra_backend: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let port = unused_port();

    let config_content = format!(
        r#"[backend]
primary_url = "http://127.0.0.1:{port}/"
fallback_urls = ["http://127.0.0.1:{port}", "https://backup.example.com"]
{extra_backend}

[timeouts]
request_ms = 500
wake_ms = 500
probe_ms = 500

[health]
probe_paths = ["/api/health", "/"]

[search]
cache_dir = "{root}/cache"

[session]
token_path = "{root}/session/token"
"#,
        port = port,
        extra_backend = extra_backend,
        root = root.display(),
    );

    let config_path = config_dir.join("alink.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_alink(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = alink_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("ALINK_BACKEND_URL")
        .env_remove("ALINK_FALLBACK_URLS")
        .env_remove("ALINK_DEV_PROXY")
        .env_remove("ALINK_PROXY_URL")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run alink binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_candidates_are_deduplicated() {
    let (_tmp, config) = setup_test_env("");
    let (stdout, stderr, success) = run_alink(&config, &["candidates"]);
    assert!(success, "candidates failed: {}", stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2, "{}", stdout);
    assert!(lines[0].starts_with("1. http://127.0.0.1:"));
    assert!(!lines[0].ends_with('/'));
    assert_eq!(lines[1], "2. https://backup.example.com");
}

#[test]
fn test_dev_proxy_comes_first() {
    let (_tmp, config) = setup_test_env(
        "dev_proxy = true\nproxy_url = \"http://localhost:5173\"",
    );
    let (stdout, _, success) = run_alink(&config, &["candidates"]);
    assert!(success);
    assert!(stdout.starts_with("1. proxy (http://localhost:5173)"), "{}", stdout);
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("alink.toml");
    fs::write(&config, "[backend]\nprimary_url = \"ftp://example.com\"\n").unwrap();

    let (_, stderr, success) = run_alink(&config, &["candidates"]);
    assert!(!success);
    assert!(stderr.contains("http or https"), "{}", stderr);
}

#[test]
fn test_missing_config_file() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_alink(&tmp.path().join("nope.toml"), &["candidates"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_health_disconnected_exits_nonzero() {
    let (_tmp, config) = setup_test_env("");
    // Only the unreachable local candidate.
    let content = fs::read_to_string(&config)
        .unwrap()
        .replace(", \"https://backup.example.com\"", "");
    fs::write(&config, content).unwrap();

    let (stdout, _, success) = run_alink(&config, &["health"]);
    assert!(!success);
    assert!(stdout.starts_with("disconnected:"), "{}", stdout);
}

#[test]
fn test_login_and_logout() {
    let (tmp, config) = setup_test_env("");
    let token_file = tmp.path().join("session").join("token");

    let (stdout, stderr, success) = run_alink(&config, &["login", "secret-token"]);
    assert!(success, "login failed: {}", stderr);
    assert!(stdout.contains("Token stored"));
    assert_eq!(fs::read_to_string(&token_file).unwrap(), "secret-token");

    let (_, _, success) = run_alink(&config, &["logout"]);
    assert!(success);
    assert!(!token_file.exists());
}

#[test]
fn test_login_rejects_blank_token() {
    let (_tmp, config) = setup_test_env("");
    let (_, _, success) = run_alink(&config, &["login", "  "]);
    assert!(!success);
}

#[test]
fn test_blank_search_makes_no_requests() {
    let (_tmp, config) = setup_test_env("");
    let (stdout, stderr, success) = run_alink(&config, &["search", "   ", "--json"]);
    assert!(success, "search failed: {}", stderr);

    let envelope: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(envelope["totalResults"], 0);
    assert_eq!(envelope["categories"], serde_json::json!({}));
}

#[test]
fn test_search_uses_offline_cache() {
    let (tmp, config) = setup_test_env("");
    let content = fs::read_to_string(&config)
        .unwrap()
        .replace(", \"https://backup.example.com\"", "");
    fs::write(&config, content).unwrap();

    let cache_dir = tmp.path().join("cache");
    fs::create_dir_all(&cache_dir).unwrap();
    fs::write(
        cache_dir.join("notes.json"),
        r#"[{"id": "n1", "title": "Project Plan", "content": "Kickoff agenda"},
            {"id": "n2", "title": "Groceries", "content": "Milk"}]"#,
    )
    .unwrap();

    let (stdout, stderr, success) =
        run_alink(&config, &["search", "project", "--only", "notes", "--json"]);
    assert!(success, "search failed: {}", stderr);

    let envelope: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(envelope["totalResults"], 1);
    assert_eq!(envelope["categories"]["notes"]["items"][0]["id"], "n1");
    assert!(envelope["categories"].get("tasks").is_none());
}

#[test]
fn test_suggest_falls_back_to_static_keywords() {
    let (_tmp, config) = setup_test_env("");
    let content = fs::read_to_string(&config)
        .unwrap()
        .replace(", \"https://backup.example.com\"", "");
    fs::write(&config, content).unwrap();

    let (stdout, _, success) = run_alink(&config, &["suggest", "remind"]);
    assert!(success);
    assert_eq!(stdout.trim(), "reminders");
}

#[test]
fn test_completions_need_no_config() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, success) = run_alink(&tmp.path().join("absent.toml"), &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("alink"));
}
