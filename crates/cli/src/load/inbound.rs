use super::LoadReport;
use ferrous_orb_domain::{Config, ContactInfo};
use ferrous_orb_infrastructure::cache::ConnectionCacheFactory;
use ferrous_orb_infrastructure::queue::LmsQueue;
use ferrous_orb_infrastructure::transport::{LoopbackConnection, LoopbackContactInfo};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{info, warn};

/// Simulated acceptor: the calling thread queues requests from a pool of
/// peer connections twice the cache's high-water mark, worker threads
/// drain the queue and walk each request through the inbound cache.
pub fn run_inbound(config: &Config) -> anyhow::Result<LoadReport> {
    let cache = ConnectionCacheFactory::inbound_from_config::<LoopbackConnection>(&config.inbound)?;
    let load = &config.load;

    let acceptor = LoopbackContactInfo::new("acceptor");
    let peers = (config.inbound.high_water_mark * 2).max(1);
    let connections = (0..peers)
        .map(|_| acceptor.create_connection())
        .collect::<io::Result<Vec<_>>>()?;

    let total = load.threads * load.iterations;
    let requests: LmsQueue<LoopbackConnection> = LmsQueue::new();
    let handled = AtomicUsize::new(0);
    let reconnects = AtomicU64::new(0);
    let stop = AtomicBool::new(false);

    info!(
        concurrency = config.inbound.concurrency.as_str(),
        threads = load.threads,
        requests = total,
        peers,
        "Inbound load started"
    );
    let started = Instant::now();

    let produced = thread::scope(|s| {
        for worker in 0..load.threads {
            let cache = &cache;
            let requests = &requests;
            let handled = &handled;
            let reconnects = &reconnects;
            let stop = &stop;
            s.spawn(move || {
                let mut rng = fastrand::Rng::with_seed(1_000 + worker as u64);
                while handled.load(Ordering::Acquire) < total && !stop.load(Ordering::Acquire) {
                    let Some(conn) = requests.dequeue() else {
                        thread::yield_now();
                        continue;
                    };
                    // A reclaimed peer would reconnect; the cache registers it again.
                    if conn.is_closed() {
                        reconnects.fetch_add(1, Ordering::Relaxed);
                    }
                    cache.request_received(&conn);
                    let responses = rng.usize(..=load.max_responses_per_request);
                    cache.request_processed(&conn, responses);
                    for _ in 0..responses {
                        cache.response_sent(&conn);
                    }
                    handled.fetch_add(1, Ordering::AcqRel);
                }
            });
        }

        let mut rng = fastrand::Rng::with_seed(42);
        for produced in 0..total {
            let conn = connections[rng.usize(..connections.len())].clone();
            if let Err(e) = requests.enqueue(conn) {
                stop.store(true, Ordering::Release);
                return Err(anyhow::anyhow!(e).context(format!(
                    "Request queue rejected request {} of {}",
                    produced, total
                )));
            }
        }
        Ok(())
    });
    produced?;

    let reconnects = reconnects.into_inner();
    if reconnects > 0 {
        info!(reconnects, "Requests arrived on reclaimed connections");
    }
    if requests.len_hint() > 0 {
        warn!(left = requests.len_hint(), "Requests left unprocessed");
    }

    Ok(LoadReport {
        operations: handled.into_inner() as u64,
        failures: 0,
        elapsed: started.elapsed(),
        stats: cache.stats(),
    })
}
