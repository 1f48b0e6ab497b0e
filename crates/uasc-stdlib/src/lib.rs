//!
//! Standard action handlers for UASC execution graphs
//!
//! Handlers are plain functions over resolved parameters, registered on an
//! [`ActionRegistry`] under `traffic.*` and `system.*`.

use std::sync::Arc;
use uasc_core::{ActionError, ActionRegistry};

pub mod components;

pub use components::{
    register_system_actions, register_traffic_actions, SignalMode, TrafficControl,
    TrafficSignal, TrafficZone,
};

/// Register every standard handler against one shared traffic backend
pub fn register_standard_actions(
    registry: &mut ActionRegistry,
    traffic: Arc<TrafficControl>,
) -> Result<(), ActionError> {
    register_traffic_actions(registry, traffic)?;
    register_system_actions(registry)?;
    Ok(())
}

/// Registry holding every standard handler over a fresh traffic backend
pub fn standard_registry() -> Result<(ActionRegistry, Arc<TrafficControl>), ActionError> {
    let traffic = Arc::new(TrafficControl::new());
    let mut registry = ActionRegistry::new();
    register_standard_actions(&mut registry, traffic.clone())?;
    Ok((registry, traffic))
}
