mod helpers;

use helpers::{inbound_caches, Inbound, MockConnection, MockContactInfo};
use ferrous_orb_domain::ContactInfo;

fn assert_counts(label: &str, cache: &Inbound, total: usize, idle: usize, busy: usize) {
    assert_eq!(cache.number_of_connections(), total, "{label}: total");
    assert_eq!(cache.number_of_idle_connections(), idle, "{label}: idle");
    assert_eq!(cache.number_of_busy_connections(), busy, "{label}: busy");
}

fn accepted(endpoint: &MockContactInfo, count: usize) -> Vec<MockConnection> {
    (0..count)
        .map(|_| endpoint.create_connection().unwrap())
        .collect()
}

#[test]
fn test_request_registers_connection_as_busy() {
    for (label, cache) in inbound_caches(10, 2) {
        let conns = accepted(&MockContactInfo::new("acceptor"), 1);

        cache.request_received(&conns[0]);
        assert_counts(label, &cache, 1, 0, 1);
        assert_eq!(cache.stats().created, 1, "{label}");

        cache.request_processed(&conns[0], 0);
        assert_counts(label, &cache, 1, 1, 0);
        assert_eq!(cache.number_of_reclaimable_connections(), 1, "{label}");

        cache.request_received(&conns[0]);
        assert_counts(label, &cache, 1, 0, 1);
        assert_eq!(cache.number_of_reclaimable_connections(), 0, "{label}");
        assert_eq!(cache.stats().created, 1, "{label}");
    }
}

#[test]
fn test_owed_responses_pin_connection() {
    for (label, cache) in inbound_caches(10, 2) {
        let conns = accepted(&MockContactInfo::new("acceptor"), 1);
        let conn = &conns[0];

        cache.request_received(conn);
        cache.request_processed(conn, 2);
        assert_counts(label, &cache, 1, 0, 1);

        cache.response_sent(conn);
        assert_counts(label, &cache, 1, 0, 1);

        cache.response_sent(conn);
        assert_counts(label, &cache, 1, 1, 0);
    }
}

#[test]
fn test_overlapping_requests_on_one_connection() {
    for (label, cache) in inbound_caches(10, 2) {
        let conns = accepted(&MockContactInfo::new("acceptor"), 1);
        let conn = &conns[0];

        cache.request_received(conn);
        cache.request_received(conn);
        cache.request_processed(conn, 1);
        cache.request_processed(conn, 0);
        assert_counts(label, &cache, 1, 0, 1);

        cache.response_sent(conn);
        assert_counts(label, &cache, 1, 1, 0);
    }
}

#[test]
fn test_new_connection_over_the_mark_reclaims_oldest_idle() {
    for (label, cache) in inbound_caches(2, 1) {
        let conns = accepted(&MockContactInfo::new("acceptor"), 3);

        for conn in &conns[..2] {
            cache.request_received(conn);
            cache.request_processed(conn, 0);
        }
        cache.request_received(&conns[2]);

        assert!(conns[0].is_closed(), "{label}");
        assert!(!conns[1].is_closed(), "{label}");
        assert_counts(label, &cache, 2, 1, 1);
        assert_eq!(cache.stats().reclaimed, 1, "{label}");
    }
}

#[test]
fn test_connection_going_idle_over_the_mark_is_reclaimed() {
    for (label, cache) in inbound_caches(1, 1) {
        let conns = accepted(&MockContactInfo::new("acceptor"), 2);
        cache.request_received(&conns[0]);
        cache.request_received(&conns[1]);
        assert_counts(label, &cache, 2, 0, 2);

        cache.request_processed(&conns[0], 0);
        assert!(conns[0].is_closed(), "{label}");
        assert_counts(label, &cache, 1, 0, 1);

        cache.request_processed(&conns[1], 0);
        assert!(!conns[1].is_closed(), "{label}");
        assert_counts(label, &cache, 1, 1, 0);
    }
}

#[test]
fn test_updates_for_unknown_connections_are_ignored() {
    for (label, cache) in inbound_caches(10, 2) {
        let stray = MockConnection::stray();

        cache.request_processed(&stray, 1);
        cache.response_sent(&stray);
        assert_counts(label, &cache, 0, 0, 0);

        cache.request_received(&stray);
        cache.response_sent(&stray);
        assert_counts(label, &cache, 1, 0, 1);
    }
}

#[test]
fn test_force_close_drops_connection() {
    for (label, cache) in inbound_caches(10, 2) {
        let conns = accepted(&MockContactInfo::new("acceptor"), 2);
        cache.request_received(&conns[0]);
        cache.request_received(&conns[1]);
        cache.request_processed(&conns[1], 0);

        cache.close(&conns[0]);
        cache.close(&conns[1]);
        assert!(conns[0].is_closed() && conns[1].is_closed(), "{label}");
        assert_counts(label, &cache, 0, 0, 0);
        assert_eq!(cache.number_of_reclaimable_connections(), 0, "{label}");
        assert_eq!(cache.stats().force_closed, 2, "{label}");

        // A closed connection that sends again is registered afresh.
        cache.request_received(&conns[0]);
        assert_counts(label, &cache, 1, 0, 1);
    }
}

#[test]
fn test_close_failure_is_counted() {
    for (label, cache) in inbound_caches(1, 2) {
        let broken = MockContactInfo::new("broken");
        broken.fail_close();
        let conns = accepted(&broken, 2);

        cache.request_received(&conns[0]);
        cache.request_processed(&conns[0], 0);
        cache.request_received(&conns[1]);

        assert!(conns[0].is_closed(), "{label}");
        assert_eq!(cache.number_of_connections(), 1, "{label}");
        assert_eq!(cache.stats().close_failures, 1, "{label}");
    }
}
