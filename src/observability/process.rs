//! Process memory sampling for `app_memory_usage_bytes`.

use super::metrics::PrometheusSink;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// How often resident memory is re-read.
pub const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_secs(10);

/// Reads this process's resident set size.
pub struct ProcessSampler {
    system: System,
    pid: Option<Pid>,
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("Cannot resolve own pid, memory gauge disabled: {e}");
                None
            }
        };
        Self {
            system: System::new(),
            pid,
        }
    }

    /// Resident memory in bytes, or `None` if the platform can't report it.
    pub fn resident_bytes(&mut self) -> Option<u64> {
        let pid = self.pid?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        self.system.process(pid).map(|p| p.memory())
    }

    /// Take one sample and publish it to `sink`.
    pub fn sample_into(&mut self, sink: &PrometheusSink) -> bool {
        match self.resident_bytes() {
            Some(bytes) => {
                sink.set_memory_usage(bytes);
                true
            }
            None => false,
        }
    }
}

/// Refresh the memory gauge every `period` until the task is dropped.
pub async fn run_memory_sampler(sink: Arc<PrometheusSink>, period: Duration) {
    let mut sampler = ProcessSampler::new();
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        if !sampler.sample_into(&sink) {
            tracing::debug!("Process memory not available; gauge left unchanged");
        }
    }
}
