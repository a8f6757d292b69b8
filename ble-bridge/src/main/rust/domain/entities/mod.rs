mod advertising_lifecycle;
mod bridge_session;
mod sighting_table;

pub use advertising_lifecycle::{
    AdvertisingLifecycle, LifecycleSnapshot, StateTransition, TransitionSnapshot,
};
pub use bridge_session::{BridgeSession, Delivery, SessionState};
pub use sighting_table::SightingTable;
