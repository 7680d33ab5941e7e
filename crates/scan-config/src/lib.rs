//! scan-config
//!
//! Operator configuration: layered YAML files merged in order, then
//! environment overrides, then typed into [`OperatorConfig`].
//!
//! The merged document is hashed (SHA-256 over canonical JSON) so the running
//! operator can log exactly which configuration it booted with.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::net::SocketAddr;

/// Secret-looking literal prefixes. Operator config is plain settings only;
/// credentials come from the in-cluster service account or kubeconfig.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI style
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "glpat-",     // GitLab PAT
    "xoxb-",      // Slack bot token
    "eyJhbGci",   // JWT / service-account token
];

pub const ENV_WATCH_NAMESPACE: &str = "SCAN_WATCH_NAMESPACE";
pub const ENV_PROBE_ADDR: &str = "SCAN_PROBE_ADDR";
pub const ENV_ERROR_REQUEUE_SECS: &str = "SCAN_ERROR_REQUEUE_SECS";
pub const ENV_LOG_FILTER: &str = "SCAN_LOG_FILTER";

// ---------------------------------------------------------------------------
// Typed config
// ---------------------------------------------------------------------------

/// Settings consumed by the operator binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    /// Restrict watches to one namespace. `None` watches the whole cluster.
    #[serde(default)]
    pub watch_namespace: Option<String>,

    /// Listen address of the `/healthz` + `/readyz` probe server.
    #[serde(default = "default_probe_addr")]
    pub probe_addr: SocketAddr,

    /// Delay before a failed reconciliation is retried.
    #[serde(default = "default_error_requeue_secs")]
    pub error_requeue_secs: u64,

    /// `tracing-subscriber` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_probe_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8081))
}

fn default_error_requeue_secs() -> u64 {
    30
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            probe_addr: default_probe_addr(),
            error_requeue_secs: default_error_requeue_secs(),
            log_filter: default_log_filter(),
        }
    }
}

impl OperatorConfig {
    /// Type a merged config document. Unknown keys are rejected.
    pub fn from_json(v: &Value) -> Result<Self> {
        let cfg: OperatorConfig =
            serde_json::from_value(v.clone()).context("invalid operator config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `SCAN_*` overrides read through `lookup`.
    ///
    /// An override that is set but unparseable is an error, not a silent
    /// fallback. An empty `SCAN_WATCH_NAMESPACE` means "all namespaces".
    pub fn apply_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ns) = lookup(ENV_WATCH_NAMESPACE) {
            let ns = ns.trim().to_string();
            self.watch_namespace = if ns.is_empty() { None } else { Some(ns) };
        }
        if let Some(addr) = lookup(ENV_PROBE_ADDR) {
            self.probe_addr = addr
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PROBE_ADDR}: invalid socket address '{addr}'"))?;
        }
        if let Some(secs) = lookup(ENV_ERROR_REQUEUE_SECS) {
            self.error_requeue_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{ENV_ERROR_REQUEUE_SECS}: invalid integer '{secs}'"))?;
        }
        if let Some(filter) = lookup(ENV_LOG_FILTER) {
            self.log_filter = filter;
        }
        self.validate()?;
        Ok(self)
    }

    /// Apply overrides from the process environment.
    pub fn with_process_env(self) -> Result<Self> {
        self.apply_env_overrides(|k| std::env::var(k).ok())
    }

    fn validate(&self) -> Result<()> {
        if self.error_requeue_secs == 0 {
            bail!("CONFIG_INVALID error_requeue_secs must be > 0");
        }
        if self.log_filter.trim().is_empty() {
            bail!("CONFIG_INVALID log_filter must not be empty");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Layered YAML
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    pub fn operator_config(&self) -> Result<OperatorConfig> {
        OperatorConfig::from_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML docs in order: earlier docs are base, later docs override.
/// Zero docs yields an empty object (all defaults).
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        // An empty file parses as null; treat it as "no overrides".
        if v_yaml.is_null() {
            continue;
        }
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json's default Map is a BTreeMap, so keys serialize sorted.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => out.push(prefix.to_string()),
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
