//! Authoritative simulation core for the isles arena server.

pub mod collision;
pub mod config;
pub mod entity;
pub mod error;
pub mod gamemodes;
pub mod mechanics;
pub mod server;
pub mod sim;
pub mod spatial;
pub mod world;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfigError, IntentError, RealmError, SimulationError};
pub use server::{
    GameState, Identity, LifeState, LocalRealm, OfflineRealm, Outgoing, Realm, SharedState, StatusReport, run,
    shared_state,
};
pub use sim::KillOutcome;
