use serde::{Deserialize, Serialize};
use std::fmt;

use super::price::PriceSeries;

/// Data side of a chart view: what has been fetched so far.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState {
    #[default]
    NotStarted,
    Loading,
    Loaded(PriceSeries),
    Failed(String),
}

impl LoadState {
    pub fn phase(&self) -> ViewPhase {
        match self {
            LoadState::NotStarted => ViewPhase::Idle,
            LoadState::Loading => ViewPhase::Loading,
            LoadState::Loaded(_) => ViewPhase::Displaying,
            LoadState::Failed(_) => ViewPhase::ErrorShown,
        }
    }

    pub fn series(&self) -> Option<&PriceSeries> {
        match self {
            LoadState::Loaded(series) => Some(series),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Presentation side of a chart view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewPhase {
    Idle,
    Loading,
    Displaying,
    ErrorShown,
}

impl fmt::Display for ViewPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewPhase::Idle => write!(f, "idle"),
            ViewPhase::Loading => write!(f, "loading"),
            ViewPhase::Displaying => write!(f, "displaying"),
            ViewPhase::ErrorShown => write!(f, "error"),
        }
    }
}
