//! Types for the resolver.

use serde::{Deserialize, Serialize};

use crate::debrid::{ResolutionResult, ResolutionStatus};
use crate::matching::Selection;

/// Steps a single resolution goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveState {
    Submitting,
    Waiting,
    Ready,
    Error,
    Timeout,
    NotFound,
}

impl ResolveState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolveState::Ready | ResolveState::Error | ResolveState::Timeout | ResolveState::NotFound
        )
    }
}

/// Full outcome of [`Resolver::resolve`](super::Resolver::resolve).
#[derive(Debug, Clone)]
pub struct ResolveOutcome {
    pub result: ResolutionResult,
    /// States visited, in order. The last one is terminal.
    pub states: Vec<ResolveState>,
    /// File picked from the provider manifest, when one was.
    pub selection: Option<Selection>,
    /// Whether the resolved link can be played without transcoding.
    pub web_ready: bool,
}

impl ResolveOutcome {
    pub fn status(&self) -> ResolutionStatus {
        self.result.status()
    }

    pub fn final_state(&self) -> Option<ResolveState> {
        self.states.last().copied()
    }
}

/// A playable stream handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStream {
    pub url: String,
    pub filename: String,
    pub web_ready: bool,
}
