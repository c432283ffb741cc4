//! Integration tests for modcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use serde_json::{json, Value};
    use std::path::{Path, PathBuf};
    use std::time::UNIX_EPOCH;
    use tempfile::TempDir;

    /// Binary with its config pointed into `dir`, away from the user's
    fn modcache(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("modcache");
        cmd.env("MODCACHE_CONFIG", dir.join("config.toml"));
        cmd.env("CI", "1");
        cmd
    }

    fn mtime_millis(path: &Path) -> i64 {
        let modified = std::fs::metadata(path).unwrap().modified().unwrap();
        modified.duration_since(UNIX_EPOCH).unwrap().as_millis() as i64
    }

    /// A project with one live module and one deleted module in the cache
    fn fixture() -> (TempDir, PathBuf, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let live = dir.path().join("index.js");
        let gone = dir.path().join("gone.js");
        std::fs::write(&live, "require('./gone')").unwrap();

        let cache = json!({
            "modules": {
                live.to_str().unwrap(): {
                    "id": live.to_str().unwrap(),
                    "file": live.to_str().unwrap(),
                    "source": "require('./gone')",
                    "deps": {"./gone": gone.to_str().unwrap()}
                },
                gone.to_str().unwrap(): {
                    "id": gone.to_str().unwrap(),
                    "file": gone.to_str().unwrap(),
                    "source": "",
                    "deps": {}
                }
            },
            "mtimes": {
                live.to_str().unwrap(): mtime_millis(&live),
                gone.to_str().unwrap(): 1
            },
            "bundlerVersion": "17.0.0"
        });
        let cache_file = dir.path().join("modcache.json");
        std::fs::write(&cache_file, serde_json::to_string_pretty(&cache).unwrap()).unwrap();

        (dir, cache_file, live, gone)
    }

    fn read_cache(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        modcache(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("invalidate"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        modcache(dir.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("modcache"));
    }

    #[test]
    fn invalidate_reports_and_prunes() {
        let (dir, cache_file, live, gone) = fixture();

        modcache(dir.path())
            .args(["invalidate", "--format", "plain", "--cache-file"])
            .arg(&cache_file)
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("deleted\t{}", gone.display())))
            .stdout(predicate::str::contains(live.to_str().unwrap()).not());

        let cache = read_cache(&cache_file);
        assert!(cache["modules"].get(gone.to_str().unwrap()).is_none());
        assert!(cache["modules"].get(live.to_str().unwrap()).is_some());
        assert_eq!(cache["bundlerVersion"], "17.0.0");

        // Nothing left to report
        modcache(dir.path())
            .args(["invalidate", "--format", "plain", "--cache-file"])
            .arg(&cache_file)
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn invalidate_dry_run_keeps_file() {
        let (dir, cache_file, _, gone) = fixture();
        let before = std::fs::read_to_string(&cache_file).unwrap();

        modcache(dir.path())
            .args(["invalidate", "--dry-run", "--format", "json", "--cache-file"])
            .arg(&cache_file)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"deleted\""))
            .stdout(predicate::str::contains(gone.to_str().unwrap()));

        assert_eq!(std::fs::read_to_string(&cache_file).unwrap(), before);
    }

    #[test]
    fn invalidate_uses_configured_cache_file() {
        let (dir, cache_file, _, gone) = fixture();
        std::fs::write(
            dir.path().join("config.toml"),
            format!("[cache]\nfile = {:?}\n", cache_file.to_str().unwrap()),
        )
        .unwrap();

        modcache(dir.path())
            .args(["invalidate", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(gone.to_str().unwrap()));
    }

    #[test]
    fn show_summarizes_cache() {
        let (dir, cache_file, _, _) = fixture();

        let output = modcache(dir.path())
            .args(["show", "--format", "json", "--cache-file"])
            .arg(&cache_file)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let summary: Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(summary["modules"], 2);
        assert_eq!(summary["tracked_files"], 2);
    }

    #[test]
    fn missing_cache_file_fails_with_hint() {
        let dir = TempDir::new().unwrap();

        modcache(dir.path())
            .args(["show", "--cache-file"])
            .arg(dir.path().join("nope.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cache file not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn unconfigured_cache_file_fails() {
        let dir = TempDir::new().unwrap();

        modcache(dir.path())
            .arg("invalidate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No cache file configured"));
    }

    #[test]
    fn corrupt_cache_file_fails() {
        let dir = TempDir::new().unwrap();
        let cache_file = dir.path().join("modcache.json");
        std::fs::write(&cache_file, "{ not json").unwrap();

        modcache(dir.path())
            .args(["invalidate", "--cache-file"])
            .arg(&cache_file)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse cache file"));
    }

    #[test]
    fn clear_deletes_with_yes() {
        let (dir, cache_file, _, _) = fixture();

        modcache(dir.path())
            .args(["clear", "--yes", "--cache-file"])
            .arg(&cache_file)
            .assert()
            .success();

        assert!(!cache_file.exists());
    }

    #[test]
    fn clear_without_yes_keeps_file_in_ci() {
        let (dir, cache_file, _, _) = fixture();

        modcache(dir.path())
            .args(["clear", "--cache-file"])
            .arg(&cache_file)
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache file kept"));

        assert!(cache_file.exists());
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        modcache(dir.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_init_then_set() {
        let dir = TempDir::new().unwrap();

        modcache(dir.path())
            .args(["config", "init"])
            .assert()
            .success();
        assert!(dir.path().join("config.toml").exists());

        modcache(dir.path())
            .args(["config", "set", "cache.concurrency", "8"])
            .assert()
            .success();

        modcache(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("concurrency = 8"));
    }

    #[test]
    fn config_set_rejects_unknown_key() {
        let dir = TempDir::new().unwrap();
        modcache(dir.path())
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }
}
