//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::target::{UpstreamError, UpstreamTarget};
use crate::load_balancer::LoadBalancer;

/// Round-robin selector.
/// Stores an internal counter to rotate through a fixed list of upstreams.
#[derive(Debug, Default)]
pub struct RoundRobin {
    targets: Vec<UpstreamTarget>,
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new(targets: Vec<UpstreamTarget>) -> Self {
        Self {
            targets,
            counter: AtomicUsize::new(0),
        }
    }

    /// Build a selector from a comma-separated list of upstream URLs.
    ///
    /// Blank entries are skipped and an empty list yields a selector with no
    /// targets. Any entry that fails to parse rejects the whole list.
    pub fn from_list(raw: &str) -> Result<Self, UpstreamError> {
        let targets = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(UpstreamTarget::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(targets))
    }

    pub fn targets(&self) -> &[UpstreamTarget] {
        &self.targets
    }
}

impl LoadBalancer for RoundRobin {
    fn next_target(&self) -> Option<&UpstreamTarget> {
        if self.targets.is_empty() {
            return None;
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % self.targets.len();
        self.targets.get(index)
    }

    fn count(&self) -> usize {
        self.targets.len()
    }
}
