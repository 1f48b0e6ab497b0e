//! Graph store and glyph bindings.

use crate::domain::glyph::{is_dynamic_glyph, Domain};
use crate::domain::graph::ExecutionGraph;
use crate::error::RegistryError;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default binding lifetime
pub const DEFAULT_VALIDITY_DAYS: i64 = 365;

/// Authoritative link from a glyph code to a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphBinding {
    /// Bound opcode
    pub glyph_code: u16,

    /// Target graph
    pub graph_id: String,

    /// Authority that issued the binding
    pub authority: u16,

    /// Start of the validity window
    pub valid_from: DateTime<Utc>,

    /// End of the validity window
    pub valid_until: DateTime<Utc>,

    /// Binding signature
    pub signature: String,
}

impl GlyphBinding {
    /// Whether `now` lies inside the validity window (inclusive)
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_until
    }

    /// [`GlyphBinding::is_valid_at`] for the current time
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

/// A revoked glyph code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revocation {
    /// Revoked opcode
    pub glyph_code: u16,
    /// Free-form reason
    pub reason: String,
    /// When the revocation was recorded
    pub revoked_at: DateTime<Utc>,
}

/// Exported binding, for synchronisation between registries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingRecord {
    /// Opcode as `0xXXXX`
    pub glyph_code: String,
    /// Target graph
    pub graph_id: String,
    /// RFC 3339 start of the window
    pub valid_from: String,
    /// RFC 3339 end of the window
    pub valid_until: String,
}

/// Exported revocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationRecord {
    /// Opcode as `0xXXXX`
    pub glyph_code: String,
    /// Reason given at revocation time
    pub reason: String,
}

/// Serializable view of a registry's bindings and revocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Registry identifier
    pub registry_id: String,
    /// Domain the registry serves
    pub domain: Domain,
    /// Authority that issues this registry's bindings
    pub authority: u16,
    /// Bindings ordered by code
    pub bindings: Vec<BindingRecord>,
    /// Revocations ordered by code
    pub revocations: Vec<RevocationRecord>,
}

#[derive(Default)]
struct RegistryState {
    graphs: HashMap<String, Arc<ExecutionGraph>>,
    bindings: HashMap<u16, GlyphBinding>,
    revocations: BTreeMap<u16, Revocation>,
}

/// In-memory registry of execution graphs and glyph bindings.
///
/// Safe to share through `Arc`; writes take an exclusive lock.
pub struct Registry {
    registry_id: String,
    domain: Domain,
    authority: u16,
    state: RwLock<RegistryState>,
}

impl Registry {
    /// Create an empty registry
    pub fn new(registry_id: impl Into<String>, domain: Domain, authority: u16) -> Self {
        Self {
            registry_id: registry_id.into(),
            domain,
            authority,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Registry identifier
    pub fn registry_id(&self) -> &str {
        &self.registry_id
    }

    /// Domain served by this registry
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Authority issuing bindings
    pub fn authority(&self) -> u16 {
        self.authority
    }

    /// Validate and store a graph, replacing any graph with the same id
    pub fn register_graph(&self, graph: ExecutionGraph) -> Result<String, RegistryError> {
        let violations = graph.validate();
        if !violations.is_empty() {
            warn!(
                graph_id = %graph.graph_id,
                violations = violations.len(),
                "Rejected invalid execution graph"
            );
            return Err(RegistryError::InvalidGraph {
                graph_id: graph.graph_id,
                violations,
            });
        }

        let graph_id = graph.graph_id.clone();
        info!(
            graph_id = %graph_id,
            version = %graph.version,
            checksum = %graph.checksum(),
            "Registered execution graph"
        );
        self.state.write().graphs.insert(graph_id.clone(), Arc::new(graph));
        Ok(graph_id)
    }

    /// Bind `glyph_code` to a registered graph for `validity_days` from now
    pub fn bind_glyph(
        &self,
        glyph_code: u16,
        graph_id: &str,
        validity_days: i64,
    ) -> Result<GlyphBinding, RegistryError> {
        let now = Utc::now();
        let valid_until = Duration::try_days(validity_days)
            .and_then(|validity| now.checked_add_signed(validity))
            .ok_or_else(|| {
                RegistryError::InvalidWindow(format!(
                    "validity of {} days is out of range",
                    validity_days
                ))
            })?;
        self.bind_glyph_window(glyph_code, graph_id, now, valid_until)
    }

    /// Bind `glyph_code` to a registered graph with an explicit window
    pub fn bind_glyph_window(
        &self,
        glyph_code: u16,
        graph_id: &str,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Result<GlyphBinding, RegistryError> {
        if valid_until < valid_from {
            return Err(RegistryError::InvalidWindow(format!(
                "valid_until {} precedes valid_from {}",
                valid_until.to_rfc3339(),
                valid_from.to_rfc3339()
            )));
        }

        let mut state = self.state.write();

        if !state.graphs.contains_key(graph_id) {
            return Err(RegistryError::UnknownGraph(graph_id.to_string()));
        }
        if !is_dynamic_glyph(glyph_code) {
            return Err(RegistryError::OutOfRange(glyph_code));
        }
        if state.revocations.contains_key(&glyph_code) {
            return Err(RegistryError::Revoked(glyph_code));
        }

        let binding = GlyphBinding {
            glyph_code,
            graph_id: graph_id.to_string(),
            authority: self.authority,
            valid_from,
            valid_until,
            signature: self.sign_binding(glyph_code, graph_id),
        };

        if let Some(previous) = state.bindings.insert(glyph_code, binding.clone()) {
            debug!(
                glyph_code = %format!("0x{:04X}", glyph_code),
                previous_graph = %previous.graph_id,
                "Replaced existing binding"
            );
        }
        info!(
            glyph_code = %format!("0x{:04X}", glyph_code),
            graph_id = %graph_id,
            valid_until = %binding.valid_until.to_rfc3339(),
            "Bound glyph"
        );

        Ok(binding)
    }

    /// Current binding for a code, regardless of window or revocation
    pub fn get_binding(&self, glyph_code: u16) -> Option<GlyphBinding> {
        self.state.read().bindings.get(&glyph_code).cloned()
    }

    /// Graph for `glyph_code` if bound, unrevoked and inside its window
    pub fn lookup(&self, glyph_code: u16) -> Option<Arc<ExecutionGraph>> {
        self.lookup_at(glyph_code, Utc::now())
    }

    /// [`Registry::lookup`] evaluated at `now`
    pub fn lookup_at(&self, glyph_code: u16, now: DateTime<Utc>) -> Option<Arc<ExecutionGraph>> {
        let state = self.state.read();

        if state.revocations.contains_key(&glyph_code) {
            return None;
        }

        let binding = state.bindings.get(&glyph_code)?;
        if !binding.is_valid_at(now) {
            return None;
        }

        state.graphs.get(&binding.graph_id).cloned()
    }

    /// Revoke a bound code. Irreversible for the lifetime of the registry.
    pub fn revoke(&self, glyph_code: u16, reason: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write();

        if !state.bindings.contains_key(&glyph_code) {
            return Err(RegistryError::UnknownBinding(glyph_code));
        }

        state.revocations.entry(glyph_code).or_insert_with(|| Revocation {
            glyph_code,
            reason: reason.to_string(),
            revoked_at: Utc::now(),
        });
        warn!(
            glyph_code = %format!("0x{:04X}", glyph_code),
            reason = %reason,
            "Revoked glyph binding"
        );
        Ok(())
    }

    /// Whether `glyph_code` has been revoked
    pub fn is_revoked(&self, glyph_code: u16) -> bool {
        self.state.read().revocations.contains_key(&glyph_code)
    }

    /// Revocation record for `glyph_code`, if any
    pub fn revocation(&self, glyph_code: u16) -> Option<Revocation> {
        self.state.read().revocations.get(&glyph_code).cloned()
    }

    /// Registered graph by id
    pub fn graph(&self, graph_id: &str) -> Option<Arc<ExecutionGraph>> {
        self.state.read().graphs.get(graph_id).cloned()
    }

    /// Registered graph ids, sorted
    pub fn graph_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.read().graphs.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Export bindings and revocations for synchronisation
    pub fn export_bindings(&self) -> RegistrySnapshot {
        let state = self.state.read();

        let mut bindings: Vec<&GlyphBinding> = state.bindings.values().collect();
        bindings.sort_by_key(|b| b.glyph_code);

        RegistrySnapshot {
            registry_id: self.registry_id.clone(),
            domain: self.domain,
            authority: self.authority,
            bindings: bindings
                .into_iter()
                .map(|b| BindingRecord {
                    glyph_code: format!("0x{:04X}", b.glyph_code),
                    graph_id: b.graph_id.clone(),
                    valid_from: b.valid_from.to_rfc3339(),
                    valid_until: b.valid_until.to_rfc3339(),
                })
                .collect(),
            revocations: state
                .revocations
                .values()
                .map(|r| RevocationRecord {
                    glyph_code: format!("0x{:04X}", r.glyph_code),
                    reason: r.reason.clone(),
                })
                .collect(),
        }
    }

    fn sign_binding(&self, glyph_code: u16, graph_id: &str) -> String {
        let content = format!(
            "{}:{}:{}:{}",
            self.registry_id, glyph_code, graph_id, self.authority
        );
        hex::encode(Sha256::digest(content.as_bytes()))[..32].to_string()
    }
}
