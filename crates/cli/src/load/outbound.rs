use super::LoadReport;
use anyhow::Context;
use ferrous_orb_domain::{Config, ContactInfo};
use ferrous_orb_infrastructure::cache::ConnectionCacheFactory;
use ferrous_orb_infrastructure::transport::{LoopbackContactInfo, TcpContactInfo};
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Drives `get`/`release`/`response_received` cycles from worker threads,
/// against TCP endpoints when configured and loopback ones otherwise.
pub fn run_outbound(config: &Config) -> anyhow::Result<LoadReport> {
    if config.load.endpoints.is_empty() {
        let contacts: Vec<_> = (0..config.load.contact_infos)
            .map(|i| LoopbackContactInfo::new(format!("orb-{}", i)))
            .collect();
        return drive(config, &contacts);
    }

    let timeout = Duration::from_millis(config.load.connect_timeout_ms);
    let contacts = config
        .load
        .endpoints
        .iter()
        .map(|endpoint| {
            resolve(endpoint).map(|addr| TcpContactInfo::new(addr).with_connect_timeout(timeout))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    drive(config, &contacts)
}

fn resolve(endpoint: &str) -> anyhow::Result<SocketAddr> {
    endpoint
        .to_socket_addrs()
        .with_context(|| format!("Invalid endpoint: {}", endpoint))?
        .next()
        .ok_or_else(|| anyhow::anyhow!("Endpoint {} resolved to no address", endpoint))
}

fn drive<CI: ContactInfo>(config: &Config, contacts: &[CI]) -> anyhow::Result<LoadReport> {
    let cache = ConnectionCacheFactory::outbound_from_config::<CI>(&config.outbound)?;
    let load = &config.load;
    let failures = AtomicU64::new(0);

    info!(
        concurrency = config.outbound.concurrency.as_str(),
        threads = load.threads,
        iterations = load.iterations,
        contact_infos = contacts.len(),
        "Outbound load started"
    );
    let started = Instant::now();

    thread::scope(|s| {
        for worker in 0..load.threads {
            let cache = &cache;
            let failures = &failures;
            s.spawn(move || {
                let mut rng = fastrand::Rng::with_seed(worker as u64);
                for _ in 0..load.iterations {
                    let contact = &contacts[rng.usize(..contacts.len())];
                    match cache.get(contact, None) {
                        Ok(conn) => {
                            let responses = rng.usize(..=load.max_responses_per_request);
                            cache.release(&conn, responses);
                            for _ in 0..responses {
                                cache.response_received(&conn);
                            }
                        }
                        Err(e) => {
                            failures.fetch_add(1, Ordering::Relaxed);
                            debug!(worker, error = %e, "Outbound get failed");
                        }
                    }
                }
            });
        }
    });

    Ok(LoadReport {
        operations: (load.threads * load.iterations) as u64,
        failures: failures.into_inner(),
        elapsed: started.elapsed(),
        stats: cache.stats(),
    })
}
