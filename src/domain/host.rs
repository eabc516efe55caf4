use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Host chosen for the attempt, returned for immediate display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Host {
    pub hostname: String,
    #[serde(rename = "display-name")]
    pub display_name: String,
}

/// One candidate from the hostnames call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostEntry {
    pub hostname: String,
    #[serde(rename = "display-name", default)]
    pub display_name: String,
    #[serde(default)]
    pub offline: bool,
    #[serde(rename = "capacity-score", default)]
    pub capacity_score: i64,
}

impl HostEntry {
    pub fn to_host(&self) -> Host {
        let display_name = if self.display_name.is_empty() {
            self.hostname.clone()
        } else {
            self.display_name.clone()
        };
        Host {
            hostname: self.hostname.clone(),
            display_name,
        }
    }
}

pub fn parse_host_list(json: &str) -> serde_json::Result<Vec<HostEntry>> {
    serde_json::from_str(json)
}

/// Picks one host out of a region's candidates.
pub trait HostSelector: Send + Sync {
    fn select(&self, candidates: &[HostEntry]) -> Option<Host>;
}

pub type HostSelectorBox = Box<dyn HostSelector>;

fn online(candidates: &[HostEntry]) -> Vec<&HostEntry> {
    candidates
        .iter()
        .filter(|h| !h.offline && !h.hostname.is_empty())
        .collect()
}

/// Host selection policy.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HostSelection {
    #[default]
    LeastLoaded,
    Random,
}

impl HostSelection {
    pub fn selector(self) -> HostSelectorBox {
        match self {
            HostSelection::LeastLoaded => Box::new(LeastLoadedSelector),
            HostSelection::Random => Box::new(RandomSelector),
        }
    }
}

/// Online host with the lowest capacity score; earlier entries win ties.
#[derive(Debug, Default, Clone, Copy)]
pub struct LeastLoadedSelector;

impl HostSelector for LeastLoadedSelector {
    fn select(&self, candidates: &[HostEntry]) -> Option<Host> {
        online(candidates)
            .into_iter()
            .min_by_key(|h| h.capacity_score)
            .map(HostEntry::to_host)
    }
}

/// Uniformly random online host.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl HostSelector for RandomSelector {
    fn select(&self, candidates: &[HostEntry]) -> Option<Host> {
        online(candidates)
            .choose(&mut rand::thread_rng())
            .map(|h| h.to_host())
    }
}
