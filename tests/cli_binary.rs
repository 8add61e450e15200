mod common;

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;

use assert_cmd::Command;
use predicates::prelude::*;

use common::{run_git, setup_empty_git_repo, setup_git_repo};

fn integration_enabled() -> bool {
    std::env::var("LINGO_INTEGRATION").is_ok()
}

#[allow(deprecated)]
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("lingo-review").unwrap();
    cmd.env_remove("LINGO_TOKEN").env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &Path, address: &str, token: Option<&str>) -> String {
    let token = token
        .map(|t| format!("token = \"{t}\"\n"))
        .unwrap_or_default();
    let path = dir.join("platform.toml");
    fs::write(
        &path,
        format!(
            "[service]\naddress = \"{address}\"\n{token}\n[git]\nserver_addr = \"github.com\"\nremote_name = \"origin\"\n"
        ),
    )
    .unwrap();
    path.to_str().unwrap().to_string()
}

/// Answer one review request with `body`.
fn serve_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.eq_ignore_ascii_case("content-length")
            {
                content_length = value.trim().parse().unwrap();
            }
        }
        let mut request_body = vec![0u8; content_length];
        reader.read_exact(&mut request_body).unwrap();
        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nConnection: close\r\n\r\n{body}"
        )
        .unwrap();
    });
    address
}

// --- Help & version ---

#[test]
fn help_flag() {
    if !integration_enabled() {
        return;
    }
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--lingo-file"))
        .stdout(predicate::str::contains("--keep-all"));
}

#[test]
fn version_flag() {
    if !integration_enabled() {
        return;
    }
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lingo-review"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    if !integration_enabled() {
        return;
    }
    cmd().arg("--bogus").assert().failure().code(2);
}

// --- Prerequisites ---

#[test]
fn outside_a_working_copy() {
    if !integration_enabled() {
        return;
    }
    let tmp = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(&tmp)
        .env_remove("P4CLIENT")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not inside a git or perforce working copy"));
}

#[test]
fn config_file_not_found() {
    if !integration_enabled() {
        return;
    }
    let repo = setup_empty_git_repo();
    cmd()
        .current_dir(repo.path())
        .args(["--config", "/nonexistent/platform.toml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn invalid_toml_config() {
    if !integration_enabled() {
        return;
    }
    let repo = setup_empty_git_repo();
    let home = tempfile::tempdir().unwrap();
    fs::write(home.path().join("platform.toml"), "not valid {{{{ toml").unwrap();
    cmd()
        .current_dir(repo.path())
        .env("LINGO_HOME", home.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config parse error"));
}

#[test]
fn missing_token_fails_auth() {
    if !integration_enabled() {
        return;
    }
    let repo = setup_empty_git_repo();
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "http://127.0.0.1:9", None);
    cmd()
        .current_dir(repo.path())
        .args(["--config", &config])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "error: prerequisite auth not met: prerequisite failed: no service token configured",
        ));
}

#[test]
fn debug_prints_the_error_trace() {
    if !integration_enabled() {
        return;
    }
    let repo = setup_empty_git_repo();
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "http://127.0.0.1:9", None);
    cmd()
        .current_dir(repo.path())
        .args(["--config", &config, "--debug"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("prerequisite auth not met"));
}

// --- Review flow ---

#[test]
fn unsupported_format_rejected() {
    if !integration_enabled() {
        return;
    }
    let repo = setup_empty_git_repo();
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "http://127.0.0.1:9", Some("t"));
    cmd()
        .current_dir(repo.path())
        .args(["--config", &config, "--format", "yaml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unsupported format: yaml"));
}

#[test]
fn repository_without_commits() {
    if !integration_enabled() {
        return;
    }
    let repo = setup_empty_git_repo();
    run_git(
        repo.path(),
        &["remote", "add", "origin", "git@github.com:acme/widgets.git"],
    );
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), "http://127.0.0.1:9", Some("t"));
    cmd()
        .current_dir(repo.path())
        .args(["--config", &config, "--keep-all"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "This repository has no commits yet.",
        ));
}

#[test]
fn clean_review_prints_no_issues() {
    if !integration_enabled() {
        return;
    }
    let (_bare, repo) = setup_git_repo();
    let address = serve_once("{\"done\": true}\n");
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), &address, Some("t"));
    cmd()
        .args(["-d", repo.path().to_str().unwrap(), "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("Done! No issues found."))
        .stderr(predicate::str::contains("Syncing your repo..."));
}

#[test]
fn keep_all_writes_the_report_file() {
    if !integration_enabled() {
        return;
    }
    let (_bare, repo) = setup_git_repo();
    let address = serve_once(concat!(
        "{\"issue\": {\"name\": \"no-todo\", \"comment\": \"resolve it\"}}\n",
        "{\"done\": true}\n"
    ));
    let home = tempfile::tempdir().unwrap();
    let config = write_config(home.path(), &address, Some("t"));
    let out = home.path().join("issues.json");
    cmd()
        .current_dir(repo.path())
        .args([
            "--config",
            &config,
            "--keep-all",
            "--format",
            "json",
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Done! Found 1 issue and saved them to"));

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.contains("\"name\":\"no-todo\""));
    assert!(!written.contains("discard"));
}
