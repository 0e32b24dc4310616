//! Synthetic instrumentation source
//!
//! Drives the probe handlers from plain threads with randomised traffic so
//! the aggregation pipeline can run without kernel attachment.

use super::handlers::Probes;
use rand::Rng;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Callbacks issued per producer between pauses
const BURST: usize = 64;
const PAUSE: Duration = Duration::from_millis(5);

pub struct SyntheticLoad {
    handles: Vec<JoinHandle<u64>>,
}

impl SyntheticLoad {
    /// Start `producers` threads that run until `shutdown` is cancelled
    pub fn spawn(probes: Probes, producers: usize, shutdown: CancellationToken) -> Self {
        info!("Starting {} synthetic producers", producers);

        let handles = (0..producers)
            .map(|index| {
                let probes = probes.clone();
                let shutdown = shutdown.clone();
                thread::Builder::new()
                    .name(format!("synthetic-{}", index))
                    .spawn(move || produce(&probes, index as u32, &shutdown))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!("Failed to spawn synthetic producer: {}", e);
                    None
                }
            })
            .collect();

        Self { handles }
    }

    /// Wait for every producer to exit, returning the callbacks issued
    pub fn join(self) -> u64 {
        self.handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .sum()
    }
}

fn produce(probes: &Probes, index: u32, shutdown: &CancellationToken) -> u64 {
    let mut rng = rand::thread_rng();
    let mut issued = 0u64;
    // Keep each producer's pids disjoint
    let pid_base = 10_000 + index * 100_000;

    while !shutdown.is_cancelled() {
        for _ in 0..BURST {
            match rng.gen_range(0..100u32) {
                0..=79 => probes.record_rtt(rng.gen_range(1..=200)),
                80..=84 => probes.on_tcp_retransmit(),
                85..=89 => probes.on_skb_drop(rng.gen_range(0..8)),
                _ => {
                    let pid = pid_base + rng.gen_range(0..1_000);
                    probes.on_sched_wakeup(pid);
                    probes.on_sched_switch(pid);
                }
            }
            issued += 1;
        }
        thread::sleep(PAUSE);
    }

    debug!("Synthetic producer {} stopped after {} callbacks", index, issued);
    issued
}
