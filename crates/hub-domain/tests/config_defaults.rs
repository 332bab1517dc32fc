use hub_domain::config::Config;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn explicit_bind_all_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8787
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn default_app_mode_is_unconfigured_until_wizard_runs() {
    let config = Config::default();
    assert_eq!(
        config.auth.app_mode,
        hub_domain::config::AppMode::Unconfigured
    );
}
