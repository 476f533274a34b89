//! Integration tests for the Babelbook CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// Fixture
// =============================================================================

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const CONTENT_OPF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>The Time Machine</dc:title>
    <dc:creator>H. G. Wells</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ch1" href="ch01.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="ch02.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

/// Build a small EPUB under `dir` and return its path
fn create_test_epub(dir: &TempDir) -> PathBuf {
    let tree = dir.path().join("fixture-tree");
    fs::create_dir_all(tree.join("META-INF")).unwrap();
    fs::create_dir_all(tree.join("OEBPS")).unwrap();
    fs::write(tree.join("mimetype"), "application/epub+zip").unwrap();
    fs::write(tree.join("META-INF/container.xml"), CONTAINER_XML).unwrap();
    fs::write(tree.join("OEBPS/content.opf"), CONTENT_OPF).unwrap();
    fs::write(
        tree.join("OEBPS/ch01.xhtml"),
        "<html><body><p>The Time Traveller was expounding.</p></body></html>",
    )
    .unwrap();
    fs::write(
        tree.join("OEBPS/ch02.xhtml"),
        "<html><body><p>The fire burned brightly.</p></body></html>",
    )
    .unwrap();

    let epub = dir.path().join("wells.epub");
    babelbook_core::archive::pack(&tree, &epub).unwrap();
    epub
}

/// Write a complete provider configuration pointing at `base_url`
fn create_test_config(dir: &TempDir, base_url: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    let config = format!(
        r#"default_provider = "openai"
batch_size = 1

[providers.openai]
base_url = "{base_url}"
api_key = "sk-test"
model = "gpt-3.5-turbo"
retry_count = 1
retry_delay_ms = 10
"#
    );
    fs::write(&path, config).unwrap();
    path
}

/// Minimal chat completions stub: answers every request with the same
/// translated content, one request per connection
fn spawn_chat_stub(content: &str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let body = format!(r#"{{"choices":[{{"message":{{"content":"{content}"}}}}]}}"#);

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut data = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).unwrap_or(0);
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&chunk[..n]);
                if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&data[..pos]);
                    let content_length = headers
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            if name.eq_ignore_ascii_case("content-length") {
                                value.trim().parse::<usize>().ok()
                            } else {
                                None
                            }
                        })
                        .unwrap_or(0);
                    if data.len() - pos - 4 >= content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    addr
}

fn babelbook() -> Command {
    let mut cmd = Command::cargo_bin("babelbook").unwrap();
    // Keep host environment out of provider key resolution
    cmd.env_remove("BABELBOOK_OPENAI_API_KEY");
    cmd.env_remove("BABELBOOK_DEEPSEEK_API_KEY");
    cmd
}

// =============================================================================
// Help and argument parsing
// =============================================================================

#[test]
fn test_help() {
    babelbook()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("translate"))
        .stdout(predicate::str::contains("info"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version() {
    babelbook()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("babelbook"));
}

#[test]
fn test_translate_help() {
    babelbook()
        .args(["translate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Translate an EPUB"))
        .stdout(predicate::str::contains("--output-dir"))
        .stdout(predicate::str::contains("--provider"))
        .stdout(predicate::str::contains("--batch-size"))
        .stdout(predicate::str::contains("--skip-probe"));
}

#[test]
fn test_info_help() {
    babelbook()
        .args(["info", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Display information"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_check_help() {
    babelbook()
        .args(["check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Check provider configuration"))
        .stdout(predicate::str::contains("--live"));
}

#[test]
fn test_translate_missing_input() {
    babelbook()
        .arg("translate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_translate_invalid_batch_size() {
    babelbook()
        .args(["translate", "book.epub", "--batch-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn test_translate_unknown_provider() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(&temp_dir);
    let config = create_test_config(&temp_dir, "http://127.0.0.1:1");

    babelbook()
        .args([
            "translate",
            input.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--provider",
            "llamacpp",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown translation provider"));
}

// =============================================================================
// Info
// =============================================================================

#[test]
fn test_info_nonexistent_file() {
    babelbook()
        .args(["info", "/nonexistent/book.epub"])
        .assert()
        .failure();
}

#[test]
fn test_info_shows_metadata_and_pages() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(&temp_dir);

    babelbook()
        .args(["info", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("The Time Machine"))
        .stdout(predicate::str::contains("H. G. Wells"))
        .stdout(predicate::str::contains("OEBPS/ch01.xhtml"));
}

#[test]
fn test_info_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(&temp_dir);

    let output = babelbook()
        .args(["info", "--json", input.to_str().unwrap()])
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("Output should be valid JSON");
    assert_eq!(json["title"], "The Time Machine");
    assert_eq!(json["pages"], 2);
    assert_eq!(json["page_ids"][0], "OEBPS/ch01.xhtml");
}

// =============================================================================
// Check
// =============================================================================

#[test]
fn test_check_missing_api_key() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("config.toml");
    fs::write(&config, "default_provider = \"openai\"\n").unwrap();

    babelbook()
        .args(["check", "--config", config.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api_key"));
}

#[test]
fn test_check_complete_config_offline() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&temp_dir, "http://127.0.0.1:1");

    babelbook()
        .args(["check", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("complete"))
        .stdout(predicate::str::contains("gpt-3.5-turbo"));
}

#[test]
fn test_check_live_probe_against_stub() {
    let addr = spawn_chat_stub("Bonjour");
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&temp_dir, &format!("http://{addr}"));

    babelbook()
        .args(["check", "--live", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("answered the probe"));
}

// =============================================================================
// Translate
// =============================================================================

#[test]
fn test_translate_nonexistent_input() {
    let temp_dir = TempDir::new().unwrap();
    let config = create_test_config(&temp_dir, "http://127.0.0.1:1");

    babelbook()
        .args([
            "translate",
            "/nonexistent/book.epub",
            "--config",
            config.to_str().unwrap(),
            "--skip-probe",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to translate"));
}

#[test]
fn test_translate_without_api_key_fails_fast() {
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(&temp_dir);

    babelbook()
        .args(["translate", input.to_str().unwrap(), "--skip-probe"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api_key"));
}

#[test]
fn test_translate_end_to_end_against_stub() {
    let addr = spawn_chat_stub("译文");
    let temp_dir = TempDir::new().unwrap();
    let input = create_test_epub(&temp_dir);
    let config = create_test_config(&temp_dir, &format!("http://{addr}"));
    let out_dir = temp_dir.path().join("out");

    babelbook()
        .args([
            "translate",
            input.to_str().unwrap(),
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("wells.translated.epub"));

    let output = out_dir.join("wells.translated.epub");
    assert!(output.exists(), "Translated archive should exist");

    // The output is a conformant archive with translated pages in place
    let file = fs::File::open(&output).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    {
        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "mimetype");
    }
    let mut ch01 = String::new();
    archive
        .by_name("OEBPS/ch01.xhtml")
        .unwrap()
        .read_to_string(&mut ch01)
        .unwrap();
    assert_eq!(ch01, "译文");
}
