use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;

use crate::domain::value_objects::{AdvertisingConfig, AdvertisingState};

/// Transitions kept for diagnostics
const MAX_HISTORY: usize = 64;

/// State transition record
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: AdvertisingState,
    pub to: AdvertisingState,
    pub timestamp: Instant,
    pub reason: Option<String>,
}

/// Point-in-time view of the lifecycle, served over HTTP
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleSnapshot {
    pub state: &'static str,
    pub local_name: Option<String>,
    pub uptime_secs: Option<u64>,
    pub failures: u64,
    /// Oldest first
    pub transitions: Vec<TransitionSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionSnapshot {
    pub from: &'static str,
    pub to: &'static str,
    pub age_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Domain entity representing the bridge's advertising role
#[derive(Debug)]
pub struct AdvertisingLifecycle {
    current_state: AdvertisingState,
    state_history: VecDeque<StateTransition>,
    advertising_since: Option<Instant>,
    failures: u64,
}

impl AdvertisingLifecycle {
    pub fn new() -> Self {
        Self {
            current_state: AdvertisingState::Idle,
            state_history: VecDeque::new(),
            advertising_since: None,
            failures: 0,
        }
    }

    pub fn current_state(&self) -> &AdvertisingState {
        &self.current_state
    }

    /// Time spent advertising with the current configuration
    pub fn uptime(&self) -> Option<std::time::Duration> {
        self.advertising_since.map(|start| start.elapsed())
    }

    pub fn transition_count(&self) -> usize {
        self.state_history.len()
    }

    pub fn last_transition(&self) -> Option<&StateTransition> {
        self.state_history.back()
    }

    pub fn history(&self) -> impl Iterator<Item = &StateTransition> {
        self.state_history.iter()
    }

    pub fn failure_count(&self) -> u64 {
        self.failures
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        let now = Instant::now();
        LifecycleSnapshot {
            state: self.current_state.label(),
            local_name: self
                .current_state
                .active_config()
                .map(|config| config.local_name().to_string()),
            uptime_secs: self.uptime().map(|uptime| uptime.as_secs()),
            failures: self.failures,
            transitions: self
                .state_history
                .iter()
                .map(|t| TransitionSnapshot {
                    from: t.from.label(),
                    to: t.to.label(),
                    age_ms: now.saturating_duration_since(t.timestamp).as_millis() as u64,
                    reason: t.reason.clone(),
                })
                .collect(),
        }
    }

    /// Transition to advertising; a restart replaces the active configuration
    pub fn transition_to_advertising(&mut self, config: AdvertisingConfig) {
        self.record_transition(AdvertisingState::Advertising(config), None);
        self.advertising_since = Some(Instant::now());
    }

    /// Transition to idle; recorded even when already idle
    pub fn transition_to_idle(&mut self, reason: Option<String>) {
        self.record_transition(AdvertisingState::Idle, reason);
        self.advertising_since = None;
    }

    /// A failed start leaves the state untouched
    pub fn record_failure(&mut self, reason: String) {
        self.failures += 1;
        let state = self.current_state.clone();
        self.record_transition(state, Some(reason));
    }

    fn record_transition(&mut self, new_state: AdvertisingState, reason: Option<String>) {
        tracing::debug!(
            from = %self.current_state,
            to = %new_state,
            reason = reason.as_deref().unwrap_or(""),
            "Advertising transition"
        );

        let transition = StateTransition {
            from: self.current_state.clone(),
            to: new_state.clone(),
            timestamp: Instant::now(),
            reason,
        };

        if self.state_history.len() == MAX_HISTORY {
            self.state_history.pop_front();
        }
        self.state_history.push_back(transition);
        self.current_state = new_state;
    }
}

impl Default for AdvertisingLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
