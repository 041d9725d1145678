//! Round-boundary collaborator: persistence hand-off and reward grants.

use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::info;

use super::round::RoundSummary;
use crate::config::RewardConfig;
use crate::error::RealmError;

/// Reward economy in effect for the next round.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardEconomy {
    pub kind: String,
    pub quantity: u32,
}

/// Permission to place one reward in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardGrant {
    pub kind: String,
    pub quantity: u32,
}

/// External realm. Calls happen outside the game state lock.
pub trait Realm: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Persist a finished round and return the economy for the next one.
    fn save_round(&self, summary: RoundSummary) -> BoxFuture<'_, Result<RewardEconomy, RealmError>>;

    /// Ask for a reward to spawn. `None` means nothing to grant right now.
    fn fetch_reward(&self) -> BoxFuture<'_, Result<Option<RewardGrant>, RealmError>>;
}

/// Work the game state asks the runtime to carry out against the realm.
#[derive(Debug, Clone)]
pub enum RealmRequest {
    SaveRound(RoundSummary),
    FetchReward,
}

/// In-process realm granting rewards straight from config.
#[derive(Debug)]
pub struct LocalRealm {
    economy: RewardEconomy,
    connected: AtomicBool,
    saved: Mutex<Vec<RoundSummary>>,
}

impl LocalRealm {
    pub fn new(config: &RewardConfig) -> Self {
        Self {
            economy: RewardEconomy { kind: config.kind.clone(), quantity: config.quantity },
            connected: AtomicBool::new(true),
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn shared(config: &RewardConfig) -> Arc<dyn Realm> {
        Arc::new(Self::new(config))
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    /// Rounds persisted so far.
    pub async fn saved_rounds(&self) -> Vec<RoundSummary> {
        self.saved.lock().await.clone()
    }
}

impl Realm for LocalRealm {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn save_round(&self, summary: RoundSummary) -> BoxFuture<'_, Result<RewardEconomy, RealmError>> {
        Box::pin(async move {
            if !self.is_connected() {
                return Err(RealmError::Offline);
            }
            info!(
                "Round {} saved: {} participants, {} claims",
                summary.round_id,
                summary.participants.len(),
                summary.claims.len()
            );
            self.saved.lock().await.push(summary);
            Ok(self.economy.clone())
        })
    }

    fn fetch_reward(&self) -> BoxFuture<'_, Result<Option<RewardGrant>, RealmError>> {
        Box::pin(async move {
            if !self.is_connected() {
                return Err(RealmError::Offline);
            }
            Ok(Some(RewardGrant { kind: self.economy.kind.clone(), quantity: self.economy.quantity }))
        })
    }
}

/// A realm that is never reachable. Rewards stay paused.
#[derive(Debug, Default)]
pub struct OfflineRealm;

impl Realm for OfflineRealm {
    fn is_connected(&self) -> bool {
        false
    }

    fn save_round(&self, _summary: RoundSummary) -> BoxFuture<'_, Result<RewardEconomy, RealmError>> {
        Box::pin(async { Err(RealmError::Offline) })
    }

    fn fetch_reward(&self) -> BoxFuture<'_, Result<Option<RewardGrant>, RealmError>> {
        Box::pin(async { Err(RealmError::Offline) })
    }
}
