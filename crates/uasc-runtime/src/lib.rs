//!
//! UASC Runtime - wires the registry, trust chain, standard actions and
//! interpreter from a [`RuntimeConfig`] and executes frames read line by line.
//!
//! Input lines are either hex frames (8 or 16 hex digits, optional `0x`) or
//! `UASC://` URIs. Every line produces one JSON [`ExecutionResult`].

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};
use uasc_core::domain::codec::URI_SCHEME;
use uasc_core::domain::trust::ROOT_ISSUER;
use uasc_core::{
    ActionRegistry, Certificate, ExecutionResult, ExecutionStatus, GlyphCodec, GlyphFrame,
    Interpreter, ParamMap, Registry, TrustVerifier,
};
use uasc_monitoring::ExecutionMetrics;
use uasc_stdlib::{register_standard_actions, TrafficControl};

/// Configuration module
pub mod config;

/// Error module
pub mod error;

// Re-export key types
pub use config::RuntimeConfig;
pub use error::{RuntimeError, RuntimeResult};

/// A configured UASC runtime
pub struct Runtime {
    config: RuntimeConfig,
    registry: Arc<Registry>,
    trust: Arc<TrustVerifier>,
    traffic: Arc<TrafficControl>,
    interpreter: Interpreter,
    metrics: ExecutionMetrics,
}

impl Runtime {
    /// Build every component described by `config`.
    ///
    /// Graphs are loaded before bindings are created; any invalid graph,
    /// unknown graph id or rejected binding aborts startup.
    pub fn from_config(config: RuntimeConfig) -> RuntimeResult<Self> {
        config.validate()?;

        let registry = Arc::new(Registry::new(
            config.registry_id.clone(),
            config.domain()?,
            config.authority,
        ));

        if let Some(dir) = &config.graph_dir {
            for graph in uasc_dsl::load_graph_dir(dir)? {
                registry.register_graph(graph)?;
            }
        }

        for binding in &config.bindings {
            let glyph_code = binding.glyph_code().ok_or_else(|| {
                RuntimeError::ConfigError(format!("invalid glyph '{}'", binding.glyph))
            })?;
            registry.bind_glyph(glyph_code, &binding.graph_id, binding.validity_days)?;
        }

        let trust = Arc::new(build_trust(&config)?);

        let traffic = Arc::new(TrafficControl::new());
        let mut actions = ActionRegistry::new();
        register_standard_actions(&mut actions, traffic.clone())?;
        let actions = Arc::new(actions);

        let interpreter = Interpreter::new(registry.clone(), trust.clone(), actions)
            .with_max_iterations(config.max_iterations);

        for graph_id in registry.graph_ids() {
            if let Some(graph) = registry.graph(&graph_id) {
                let missing = interpreter.unbound_operations(&graph);
                if !missing.is_empty() {
                    warn!(graph_id = %graph_id, missing = ?missing, "Graph uses unregistered operations");
                }
            }
        }

        info!(
            registry_id = %config.registry_id,
            graphs = registry.graph_ids().len(),
            bindings = config.bindings.len(),
            "Runtime ready"
        );

        let metrics = ExecutionMetrics::from_config(&config.monitoring());

        Ok(Self {
            config,
            registry,
            trust,
            traffic,
            interpreter,
            metrics,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Shared registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Shared trust verifier
    pub fn trust(&self) -> &Arc<TrustVerifier> {
        &self.trust
    }

    /// Simulated traffic backend behind the `traffic.*` actions
    pub fn traffic(&self) -> &Arc<TrafficControl> {
        &self.traffic
    }

    /// Interpreter, including its execution log
    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Execution metrics
    pub fn metrics(&self) -> &ExecutionMetrics {
        &self.metrics
    }

    /// Execute a decoded frame and record its metrics
    pub async fn execute(&self, frame: &GlyphFrame) -> ExecutionResult {
        let result = self.interpreter.execute(frame).await;
        self.metrics
            .record(&format!("0x{:04X}", frame.glyph_code), &result);
        result
    }

    /// Execute one input line. Unparseable lines become rejected results.
    pub async fn execute_line(&self, line: &str) -> ExecutionResult {
        match parse_frame(line) {
            Ok(frame) => self.execute(&frame).await,
            Err(e) => {
                warn!(line = %line, error = %e, "Rejected input line");
                let result = ExecutionResult {
                    status: ExecutionStatus::Rejected,
                    outputs: ParamMap::new(),
                    execution_time_ms: 0,
                    node_trace: Vec::new(),
                    error: Some(e.to_string()),
                };
                self.metrics.record("invalid", &result);
                result
            }
        }
    }

    /// Read frames from `reader` until EOF, writing one JSON result per line.
    /// Blank lines and `#` comments are skipped. Returns the number of frames
    /// processed.
    pub async fn run_lines<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<usize>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut processed = 0;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let result = self.execute_line(line).await;
            let mut json = serde_json::to_string(&result)?;
            json.push('\n');
            writer.write_all(json.as_bytes()).await?;
            writer.flush().await?;
            processed += 1;
        }

        debug!(processed, "Input exhausted");
        Ok(processed)
    }
}

/// Parse a hex frame or `UASC://` URI
pub fn parse_frame(line: &str) -> RuntimeResult<GlyphFrame> {
    let line = line.trim();
    if line
        .get(..URI_SCHEME.len())
        .map_or(false, |scheme| scheme.eq_ignore_ascii_case(URI_SCHEME))
    {
        let uri = format!("{}{}", URI_SCHEME, &line[URI_SCHEME.len()..]);
        return Ok(GlyphCodec::from_text(&uri)?);
    }

    let digits = line
        .strip_prefix("0x")
        .or_else(|| line.strip_prefix("0X"))
        .unwrap_or(line);
    if digits.len() != 8 && digits.len() != 16 {
        return Err(RuntimeError::InvalidFrame(format!(
            "expected 8 or 16 hex digits, got {}",
            digits.len()
        )));
    }
    let bytes = hex::decode(digits)
        .map_err(|e| RuntimeError::InvalidFrame(format!("invalid hex: {}", e)))?;
    Ok(GlyphCodec::decode(&bytes)?)
}

fn valid_until(now: DateTime<Utc>, name: &str, days: i64) -> RuntimeResult<DateTime<Utc>> {
    Duration::try_days(days)
        .and_then(|validity| now.checked_add_signed(validity))
        .ok_or_else(|| {
            RuntimeError::ConfigError(format!("validity of '{}' is out of range: {} days", name, days))
        })
}

fn build_trust(config: &RuntimeConfig) -> RuntimeResult<TrustVerifier> {
    let now = Utc::now();
    let verifier = TrustVerifier::new(config.root_key.clone());

    for cert in &config.domains {
        verifier.add_domain_certificate(Certificate {
            authority_id: ROOT_ISSUER,
            domain: config::parse_domain(&cert.domain)?,
            name: cert.name.clone(),
            public_key: cert.public_key.clone(),
            valid_from: now,
            valid_until: valid_until(now, &cert.name, cert.valid_days)?,
            issuer_id: ROOT_ISSUER,
            signature: cert.signature.clone(),
        });
    }

    for cert in &config.authorities {
        verifier.add_authority_certificate(Certificate {
            authority_id: cert.authority_id,
            domain: config::parse_domain(&cert.domain)?,
            name: cert.name.clone(),
            public_key: cert.public_key.clone(),
            valid_from: now,
            valid_until: valid_until(now, &cert.name, cert.valid_days)?,
            issuer_id: 0,
            signature: cert.signature.clone(),
        });
    }

    Ok(verifier)
}
