//! Configuration for the UASC runtime
//!
//! Loaded from the YAML file named by `UASC_CONFIG` (defaults when unset),
//! then overridden from the environment, then validated.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uasc_core::domain::glyph::{code_for_token, is_dynamic_glyph, AUTHORITY_MAX, DOMAIN_MAX};
use uasc_core::{Domain, DEFAULT_MAX_ITERATIONS, DEFAULT_VALIDITY_DAYS};
use uasc_monitoring::MonitoringConfig;

use crate::error::{RuntimeError, RuntimeResult};

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "UASC_CONFIG";

/// Upper bound for binding and certificate validity
pub const MAX_VALIDITY_DAYS: i64 = 36_500;

/// A domain certificate issued by the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCertConfig {
    /// Domain name as used in URIs, e.g. `smart_city`
    pub domain: String,
    /// Issuing body
    pub name: String,
    /// Certificate key material
    #[serde(default)]
    pub public_key: String,
    /// Root signature; an empty signature fails verification
    #[serde(default)]
    pub signature: String,
    /// Validity from load time
    #[serde(default = "default_cert_days")]
    pub valid_days: i64,
}

/// An authority certificate issued by a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorityCertConfig {
    /// Domain name as used in URIs
    pub domain: String,
    /// 12-bit authority id
    pub authority_id: u16,
    /// Authority display name
    pub name: String,
    /// Certificate key material
    #[serde(default)]
    pub public_key: String,
    /// Domain signature; an empty signature fails verification
    #[serde(default)]
    pub signature: String,
    /// Validity from load time
    #[serde(default = "default_cert_days")]
    pub valid_days: i64,
}

/// A glyph binding created at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// `0x8003`, decimal, or a token such as `@C3`
    pub glyph: String,
    /// Graph to bind
    pub graph_id: String,
    /// Binding validity from load time
    #[serde(default = "default_validity_days")]
    pub validity_days: i64,
}

impl BindingConfig {
    /// Parsed opcode
    pub fn glyph_code(&self) -> Option<u16> {
        parse_glyph_code(&self.glyph)
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Registry identifier, part of every binding signature
    #[serde(default = "default_registry_id")]
    pub registry_id: String,

    /// Domain served by the registry
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Authority that owns the registry
    #[serde(default)]
    pub authority: u16,

    /// Trust anchor key
    #[serde(default = "default_root_key")]
    pub root_key: String,

    /// Directory of graph documents loaded at startup
    #[serde(default)]
    pub graph_dir: Option<PathBuf>,

    /// Node visit cap per execution
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Log level filter
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// JSON log lines
    #[serde(default)]
    pub json_logs: bool,

    /// Emit execution metrics through the `metrics` recorder
    #[serde(default = "default_enable_metrics")]
    pub enable_metrics: bool,

    /// Domain certificates
    #[serde(default)]
    pub domains: Vec<DomainCertConfig>,

    /// Authority certificates
    #[serde(default)]
    pub authorities: Vec<AuthorityCertConfig>,

    /// Bindings created after graphs are loaded
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

fn default_registry_id() -> String {
    "uasc-local".to_string()
}

fn default_domain() -> String {
    "smart_city".to_string()
}

fn default_root_key() -> String {
    "UASC_ROOT_DEVELOPMENT_KEY".to_string()
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_enable_metrics() -> bool {
    true
}

fn default_cert_days() -> i64 {
    DEFAULT_VALIDITY_DAYS
}

fn default_validity_days() -> i64 {
    DEFAULT_VALIDITY_DAYS
}

/// Parse `0x8003`, `32771` or a glyph token
pub fn parse_glyph_code(text: &str) -> Option<u16> {
    let text = text.trim();
    if text.starts_with('@') {
        return code_for_token(text);
    }
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

impl RuntimeConfig {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> RuntimeResult<Self> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;

        info!(
            registry_id = %config.registry_id,
            graph_dir = ?config.graph_dir,
            bindings = config.bindings.len(),
            "Loaded runtime configuration"
        );
        Ok(config)
    }

    /// Parse a YAML configuration file without validating it
    pub fn from_file(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| RuntimeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse YAML configuration text without validating it
    pub fn from_yaml(yaml: &str) -> RuntimeResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply `UASC_*` overrides; `lookup` resolves a variable name
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(registry_id) = lookup("UASC_REGISTRY_ID") {
            self.registry_id = registry_id;
        }

        if let Some(graph_dir) = lookup("UASC_GRAPH_DIR") {
            self.graph_dir = Some(PathBuf::from(graph_dir));
        }

        if let Some(max_iterations) = lookup("UASC_MAX_ITERATIONS") {
            match max_iterations.parse::<usize>() {
                Ok(value) => self.max_iterations = value,
                Err(_) => warn!("Invalid UASC_MAX_ITERATIONS value: {}", max_iterations),
            }
        }

        if let Some(log_filter) = lookup("UASC_LOG_FILTER") {
            self.log_filter = log_filter;
        }

        if let Some(json_logs) = lookup("UASC_JSON_LOGS") {
            match json_logs.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.json_logs = true,
                "0" | "false" | "no" => self.json_logs = false,
                _ => warn!("Invalid UASC_JSON_LOGS value: {}", json_logs),
            }
        }
    }

    /// Check field ranges and references
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.registry_id.trim().is_empty() {
            return Err(RuntimeError::ConfigError("registry_id must not be empty".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(RuntimeError::ConfigError(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        self.domain()?;
        if self.authority > AUTHORITY_MAX {
            return Err(RuntimeError::ConfigError(format!(
                "authority 0x{:X} exceeds 12 bits",
                self.authority
            )));
        }

        for cert in &self.domains {
            parse_domain(&cert.domain)?;
            check_validity_days(&cert.name, cert.valid_days)?;
            if cert.signature.is_empty() {
                warn!(domain = %cert.domain, "Domain certificate has no signature");
            }
        }
        for cert in &self.authorities {
            parse_domain(&cert.domain)?;
            check_validity_days(&cert.name, cert.valid_days)?;
            if cert.authority_id > AUTHORITY_MAX {
                return Err(RuntimeError::ConfigError(format!(
                    "authority 0x{:X} exceeds 12 bits",
                    cert.authority_id
                )));
            }
            if cert.signature.is_empty() {
                warn!(authority = %cert.name, "Authority certificate has no signature");
            }
        }

        for binding in &self.bindings {
            let code = binding.glyph_code().ok_or_else(|| {
                RuntimeError::ConfigError(format!("invalid glyph '{}'", binding.glyph))
            })?;
            if !is_dynamic_glyph(code) {
                return Err(RuntimeError::ConfigError(format!(
                    "glyph 0x{:04X} is outside the dynamic range",
                    code
                )));
            }
            check_validity_days(&binding.glyph, binding.validity_days)?;
        }

        if !self.bindings.is_empty() && self.graph_dir.is_none() {
            warn!("Bindings configured without a graph_dir; binding will fail");
        }

        Ok(())
    }

    /// Domain served by the registry
    pub fn domain(&self) -> RuntimeResult<Domain> {
        parse_domain(&self.domain)
    }

    /// Monitoring settings derived from this configuration
    pub fn monitoring(&self) -> MonitoringConfig {
        MonitoringConfig {
            service_name: format!("uasc-runtime/{}", self.registry_id),
            log_filter: self.log_filter.clone(),
            json_logs: self.json_logs,
            enable_metrics: self.enable_metrics,
        }
    }
}

fn check_validity_days(owner: &str, days: i64) -> RuntimeResult<()> {
    if !(0..=MAX_VALIDITY_DAYS).contains(&days) {
        return Err(RuntimeError::ConfigError(format!(
            "validity of '{}' must be within 0..={} days, got {}",
            owner, MAX_VALIDITY_DAYS, days
        )));
    }
    Ok(())
}

/// Domain by URI name; only 4-bit codes can appear in a frame
pub(crate) fn parse_domain(name: &str) -> RuntimeResult<Domain> {
    Domain::from_uri_name(name)
        .filter(|domain| domain.code() <= DOMAIN_MAX)
        .ok_or_else(|| RuntimeError::ConfigError(format!("unknown domain '{}'", name)))
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            registry_id: default_registry_id(),
            domain: default_domain(),
            authority: 0,
            root_key: default_root_key(),
            graph_dir: None,
            max_iterations: default_max_iterations(),
            log_filter: default_log_filter(),
            json_logs: false,
            enable_metrics: default_enable_metrics(),
            domains: Vec::new(),
            authorities: Vec::new(),
            bindings: Vec::new(),
        }
    }
}
