// Module definitions for the action handler families

pub mod system;
pub mod traffic;

pub use system::register_system_actions;
pub use traffic::{register_traffic_actions, SignalMode, TrafficControl, TrafficSignal, TrafficZone};
