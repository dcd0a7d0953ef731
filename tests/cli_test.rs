//! CLI smoke tests: argument surface, fingerprint commands end to end,
//! and the session commands that work without a browser present.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn maskfleet() -> Command {
    Command::cargo_bin("maskfleet").unwrap()
}

mod help {
    use super::*;

    #[test]
    fn shows_help() {
        maskfleet()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("maskfleet"))
            .stdout(predicate::str::contains("fingerprint"))
            .stdout(predicate::str::contains("session"));
    }

    #[test]
    fn shows_version() {
        maskfleet()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("maskfleet"));
    }
}

mod fingerprint_command {
    use super::*;

    #[test]
    fn generate_prints_camel_case_json() {
        maskfleet()
            .args(["fingerprint", "generate", "--seed", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"userAgent\""))
            .stdout(predicate::str::contains("\"screenResolution\""))
            .stdout(predicate::str::contains("\"webglRenderer\""));
    }

    #[test]
    fn seeded_generation_is_deterministic() {
        let first = maskfleet()
            .args(["fingerprint", "generate", "--seed", "42"])
            .output()
            .unwrap();
        let second = maskfleet()
            .args(["fingerprint", "generate", "--seed", "42"])
            .output()
            .unwrap();
        assert_eq!(first.stdout, second.stdout);
    }

    #[test]
    fn generate_rejects_unknown_platform() {
        maskfleet()
            .args(["fingerprint", "generate", "--platform", "beos"])
            .assert()
            .failure();
    }

    #[test]
    fn generate_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("fp.json");
        maskfleet()
            .args(["fingerprint", "generate", "--seed", "7", "-o"])
            .arg(&out)
            .assert()
            .success();
        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.contains("\"userAgent\""));
    }

    #[test]
    fn validate_passes_generated_fingerprint() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("fp.json");
        maskfleet()
            .args(["fingerprint", "generate", "--seed", "7", "-o"])
            .arg(&out)
            .assert()
            .success();

        maskfleet()
            .args(["--json", "fingerprint", "validate"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"isValid\": true"));
    }

    #[test]
    fn validate_fails_on_garbage_input() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not even json").unwrap();

        maskfleet()
            .args(["fingerprint", "validate"])
            .arg(&bad)
            .assert()
            .failure();
    }

    #[test]
    fn similarity_of_a_file_with_itself_is_one() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("fp.json");
        maskfleet()
            .args(["fingerprint", "generate", "--seed", "9", "-o"])
            .arg(&out)
            .assert()
            .success();

        maskfleet()
            .args(["fingerprint", "similarity"])
            .arg(&out)
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("1.0000"));
    }

    #[test]
    fn uniqueness_without_population_is_full_score() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("fp.json");
        maskfleet()
            .args(["fingerprint", "generate", "--seed", "11", "-o"])
            .arg(&out)
            .assert()
            .success();

        maskfleet()
            .args(["fingerprint", "uniqueness"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::contains("100.0"));
    }
}

mod session_command {
    use super::*;

    #[test]
    fn launch_requires_profile_and_fingerprint() {
        maskfleet()
            .args(["session", "launch"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--profile"));
    }

    #[test]
    fn launch_rejects_proxy_credentials_without_server() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("fp.json");
        maskfleet()
            .args(["fingerprint", "generate", "--seed", "3", "-o"])
            .arg(&out)
            .assert()
            .success();

        maskfleet()
            .args(["session", "launch", "--profile", "p1", "--fingerprint"])
            .arg(&out)
            .args(["--proxy-user", "alice"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--proxy"));
    }

    #[test]
    fn launch_help_offers_no_password_flag() {
        let output = maskfleet()
            .args(["session", "launch", "--help"])
            .output()
            .unwrap();
        let help = String::from_utf8_lossy(&output.stdout);
        assert!(help.contains("--proxy-pass-env"));
        assert!(!help.contains("--proxy-pass <"));
        assert!(!help.contains("--proxy-password"));
    }

    #[test]
    fn list_with_empty_store_reports_nothing() {
        let dir = TempDir::new().unwrap();
        maskfleet()
            .env("MASKFLEET_SESSIONS__DIR", dir.path())
            .args(["session", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No recorded sessions"));
    }

    #[test]
    fn close_unknown_profile_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        maskfleet()
            .env("MASKFLEET_SESSIONS__DIR", dir.path())
            .args(["--json", "session", "close", "--profile", "ghost"])
            .assert()
            .success()
            .stdout(predicate::str::contains("not_found"));
    }

    #[test]
    fn status_of_dead_recorded_session_is_not_running() {
        let dir = TempDir::new().unwrap();
        let record = serde_json::json!({
            "profileId": "stale-one",
            "pid": 4_000_000u32,
            "debugPort": 19993,
            "controlEndpoint": "ws://127.0.0.1:19993/devtools/browser/x",
            "startedAt": 0,
        });
        std::fs::write(
            dir.path().join("stale-one.json"),
            serde_json::to_string(&record).unwrap(),
        )
        .unwrap();

        maskfleet()
            .env("MASKFLEET_SESSIONS__DIR", dir.path())
            .args(["--json", "session", "status", "--profile", "stale-one"])
            .assert()
            .success()
            .stdout(predicate::str::contains("not running"));
    }
}

mod browsers_command {
    use super::*;

    #[test]
    fn browsers_json_is_an_array() {
        maskfleet()
            .args(["--json", "browsers"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("["));
    }
}

mod config_command {
    use super::*;

    #[test]
    fn config_requires_subcommand() {
        maskfleet()
            .arg("config")
            .assert()
            .failure()
            .stderr(predicate::str::contains("subcommand"));
    }

    #[test]
    fn config_path_prints_toml_location() {
        maskfleet()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_json_has_launch_section() {
        maskfleet()
            .args(["--json", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"launch\""))
            .stdout(predicate::str::contains("\"timeout_secs\""));
    }
}

mod global_flags {
    use super::*;

    #[test]
    fn json_flag_available_globally() {
        maskfleet()
            .args(["--json", "fingerprint", "generate", "--seed", "1"])
            .assert()
            .success();
    }

    #[test]
    fn browser_path_flag_available_globally() {
        maskfleet()
            .args(["--browser-path", "/usr/bin/chromium", "config", "path"])
            .assert()
            .success();
    }
}
