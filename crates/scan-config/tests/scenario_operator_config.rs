//! Typed operator config: defaults, unknown keys, env overrides, secrets guard.

use std::collections::HashMap;
use std::net::SocketAddr;

use scan_config::{
    load_layered_yaml_from_strings, OperatorConfig, ENV_ERROR_REQUEUE_SECS, ENV_LOG_FILTER,
    ENV_PROBE_ADDR, ENV_WATCH_NAMESPACE,
};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |k| map.get(k).cloned()
}

#[test]
fn no_layers_yields_defaults() {
    let cfg = load_layered_yaml_from_strings(&[])
        .unwrap()
        .operator_config()
        .unwrap();
    assert_eq!(cfg, OperatorConfig::default());
    assert_eq!(cfg.probe_addr, SocketAddr::from(([0, 0, 0, 0], 8081)));
    assert_eq!(cfg.error_requeue_secs, 30);
    assert_eq!(cfg.watch_namespace, None);
}

#[test]
fn empty_yaml_file_is_no_overrides() {
    let cfg = load_layered_yaml_from_strings(&["", "# comment only\n"])
        .unwrap()
        .operator_config()
        .unwrap();
    assert_eq!(cfg, OperatorConfig::default());
}

#[test]
fn unknown_keys_are_rejected() {
    let loaded = load_layered_yaml_from_strings(&["watch_namespaces: sec\n"]).unwrap();
    assert!(loaded.operator_config().is_err());
}

#[test]
fn zero_requeue_is_rejected() {
    let loaded = load_layered_yaml_from_strings(&["error_requeue_secs: 0\n"]).unwrap();
    let err = loaded.operator_config().unwrap_err();
    assert!(format!("{err:#}").contains("error_requeue_secs"));
}

#[test]
fn env_overrides_replace_yaml_values() {
    let cfg = OperatorConfig::default()
        .apply_env_overrides(env(&[
            (ENV_WATCH_NAMESPACE, "audit"),
            (ENV_PROBE_ADDR, "127.0.0.1:9090"),
            (ENV_ERROR_REQUEUE_SECS, "7"),
            (ENV_LOG_FILTER, "warn"),
        ]))
        .unwrap();

    assert_eq!(cfg.watch_namespace.as_deref(), Some("audit"));
    assert_eq!(cfg.probe_addr, SocketAddr::from(([127, 0, 0, 1], 9090)));
    assert_eq!(cfg.error_requeue_secs, 7);
    assert_eq!(cfg.log_filter, "warn");
}

#[test]
fn empty_namespace_override_means_all_namespaces() {
    let base = OperatorConfig {
        watch_namespace: Some("sec".to_string()),
        ..OperatorConfig::default()
    };
    let cfg = base
        .apply_env_overrides(env(&[(ENV_WATCH_NAMESPACE, "  ")]))
        .unwrap();
    assert_eq!(cfg.watch_namespace, None);
}

#[test]
fn unparseable_override_is_an_error() {
    let err = OperatorConfig::default()
        .apply_env_overrides(env(&[(ENV_ERROR_REQUEUE_SECS, "soon")]))
        .unwrap_err();
    assert!(err.to_string().contains(ENV_ERROR_REQUEUE_SECS));

    assert!(OperatorConfig::default()
        .apply_env_overrides(env(&[(ENV_PROBE_ADDR, "localhost")]))
        .is_err());
}

#[test]
fn secret_literals_are_refused() {
    let yaml = "log_filter: \"ghp_0123456789abcdef\"\n";
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("CONFIG_SECRET_DETECTED"));
    assert!(!msg.contains("ghp_0123456789abcdef"), "secret must be redacted");
}
