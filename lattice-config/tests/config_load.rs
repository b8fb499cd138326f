use lattice_common::BrowserEngine;
use lattice_config::{LatticeConfigLoader, Selectors};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn loads_file_with_env_expansion() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
engine: chromium
headless: false
base_url: "https://www.linkedin.com"
auth_state_path: "${LATTICE_STATE_DIR}/auth.json"
selector_timeout_ms: 5000
"#;
    let p = write_yaml(&tmp, "lattice.yaml", file_yaml);

    temp_env::with_var("LATTICE_STATE_DIR", Some("/var/lib/lattice"), || {
        let config = LatticeConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load scraper config");

        assert_eq!(config.engine, BrowserEngine::Chromium);
        assert!(!config.headless);
        assert_eq!(
            config.auth_state_path.as_deref(),
            Some(std::path::Path::new("/var/lib/lattice/auth.json"))
        );
        assert_eq!(config.selector_timeout_ms, 5000);
        // Untouched sections fall back to defaults.
        assert!(config.block_resources);
        assert_eq!(config.selectors.login.username, "#username");
    });
}

#[test]
#[serial]
fn defaults_apply_without_any_file() {
    let config = LatticeConfigLoader::new()
        .with_yaml_str("{}")
        .load()
        .expect("defaults");

    assert_eq!(config.engine, BrowserEngine::Firefox);
    assert!(config.headless);
    assert!(config.block_resources);
    assert!(config.auth_state_path.is_none());
    assert_eq!(config.base_url, "https://www.linkedin.com");
}

#[test]
#[serial]
fn selector_overrides_merge_over_defaults() {
    let config = LatticeConfigLoader::new()
        .with_yaml_str(
            r#"
selectors:
  login:
    username: "input[name='session_key']"
    password: "input[name='session_password']"
    submit: "button.sign-in-form__submit-button"
"#,
        )
        .load()
        .expect("selector override");

    assert_eq!(
        config.selectors.login.username,
        "input[name='session_key']"
    );
    // Sibling maps keep their defaults.
    assert!(config
        .selectors
        .job_listing
        .pagination
        .contains("artdeco-pagination"));
}

#[test]
#[serial]
fn selectors_load_standalone_from_yaml() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "selectors.yaml",
        r##"
login:
  username: "#member-email"
  password: "#member-password"
  submit: "#login-submit"
"##,
    );

    let selectors = Selectors::from_yaml_file(&p).expect("standalone selectors");
    assert_eq!(selectors.login.username, "#member-email");
    assert_eq!(selectors.login.submit, "#login-submit");
}
