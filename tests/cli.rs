//! Drives the `wtff` binary with HOME pointed at a temp directory so the
//! user's real config, profiles and history are never touched.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENV_VARS: [&str; 6] = [
    "WTFFMPEG_MODEL",
    "WTFFMPEG_OPENAI_API_KEY",
    "WTFFMPEG_BEARER_TOKEN",
    "WTFFMPEG_LLM_API_URL",
    "WTFFMPEG_PROFILE",
    "WTFFMPEG_PROVIDER",
];

fn wtff(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wtff").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_flags() {
    let home = tempfile::tempdir().unwrap();
    wtff(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--prompt-once").and(predicate::str::contains("--list-profiles")));
}

#[test]
fn lists_builtin_and_user_profiles() {
    let home = tempfile::tempdir().unwrap();
    let profiles = home.path().join("profiles");
    fs::create_dir_all(&profiles).unwrap();
    fs::write(profiles.join("gifs.txt"), "Only produce GIF commands.").unwrap();

    wtff(home.path())
        .arg("--list-profiles")
        .arg("--profile-dir")
        .arg(&profiles)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("  gifs\n")
                .and(predicate::str::contains("  minimal\n"))
                .and(predicate::str::contains("  examples\n")),
        );
}

#[test]
fn empty_prompt_once_is_a_usage_error() {
    let home = tempfile::tempdir().unwrap();
    wtff(home.path())
        .args(["-p", "   "])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("non-empty prompt"));
}

#[test]
fn unknown_profile_fails_startup_with_alternatives() {
    let home = tempfile::tempdir().unwrap();
    wtff(home.path())
        .args(["-p", "convert a.mov", "--profile", "nope"])
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("Profile 'nope' not found")
                .and(predicate::str::contains("minimal")),
        );
}

#[test]
fn bad_boolean_in_config_file_is_fatal() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("config.env");
    fs::write(&config, "copy=sometimes\n").unwrap();

    wtff(home.path())
        .arg("--config")
        .arg(&config)
        .args(["-p", "anything"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Bad boolean for copy: sometimes"));
}

#[test]
fn unreachable_endpoint_is_a_generation_failure() {
    let home = tempfile::tempdir().unwrap();
    wtff(home.path())
        .args(["-p", "convert a.mov", "--url", "http://127.0.0.1:9"])
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("http://127.0.0.1:9/v1/chat/completions")
                .and(predicate::str::contains("Failed to generate a command.")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn single_shot_prints_clean_command() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "```bash\nffmpeg -i in.mp4 out.webm\n```"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    wtff(home.path())
        .args(["-p", "convert in.mp4 to webm", "--url", &server.uri()])
        .assert()
        .success()
        .stdout("ffmpeg -i in.mp4 out.webm\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn single_shot_without_command_prints_raw_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "```\n```"}}]
        })))
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    wtff(home.path())
        .args(["-p", "do something", "--url", &server.uri()])
        .assert()
        .code(1)
        .stdout("```\n```\n")
        .stderr(predicate::str::contains("Failed to generate a command."));
}

#[test]
fn repl_exits_on_end_of_input() {
    let home = tempfile::tempdir().unwrap();
    wtff(home.path())
        .args(["--url", "http://127.0.0.1:9", "--no-nag"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exiting interactive mode."));
}
