//! End-to-end protocol runs over the simulated network.

use forklock_core::ProtocolError;
use forklock_mutex::MutexConfig;
use forklock_simulation::{
    CriticalSectionRecord, NetworkConfig, SimulationConfig, SimulationError, SimulationRunner,
    WorkloadPlan,
};
use forklock_types::{ForkPriority, ForkState, ProcessId};
use std::time::Duration;
use tracing_test::traced_test;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn manual_config(n: u32, priority: ForkPriority) -> SimulationConfig {
    SimulationConfig::new(n)
        .with_network(NetworkConfig::new(n).with_fixed_latency(ms(1)))
        .with_mutex(MutexConfig::default().with_priority(priority))
        .with_workload(WorkloadPlan::manual())
}

fn assert_no_overlap(records: &[CriticalSectionRecord]) {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.entered_at);
    for pair in sorted.windows(2) {
        let left = pair[0].left_at.expect("every entry is released");
        assert!(
            pair[1].entered_at >= left,
            "{} entered at {:?} before {} left at {:?}",
            pair[1].process,
            pair[1].entered_at,
            pair[0].process,
            left
        );
    }
}

#[traced_test]
#[test]
fn test_release_hands_fork_to_deferred_requester() {
    let mut runner =
        SimulationRunner::new(manual_config(3, ForkPriority::HigherIdHolds), 0).unwrap();
    runner.schedule_lock_request(ProcessId(1), ms(0)).unwrap();
    runner
        .schedule_lock_request(ProcessId(2), Duration::from_micros(1500))
        .unwrap();

    // Both grants reach process 1 at 2ms.
    runner.run_until(ms(2)).unwrap();
    assert_eq!(runner.holder(), Some(ProcessId(1)));

    // Process 2's request arrived while process 1 was inside.
    runner.run_until(ms(5)).unwrap();
    let p1 = runner.node(ProcessId(1)).unwrap();
    assert_eq!(p1.fork_state(ProcessId(2)), Some(ForkState::Clean));
    assert_eq!(p1.is_deferred(ProcessId(2)), Some(true));
    let p2 = runner.node(ProcessId(2)).unwrap();
    assert!(p2.wants_cs());
    assert_eq!(p2.pending_grants(), 1);

    runner.run_until_quiescent().unwrap();

    let records = runner.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].process, ProcessId(1));
    assert_eq!(records[0].entered_at, ms(2));
    assert_eq!(records[0].left_at, Some(ms(7)));
    assert_eq!(records[1].process, ProcessId(2));
    assert_eq!(records[1].entered_at, ms(8));

    let stats = runner.stats();
    assert_eq!(stats.requests_sent, 4);
    assert_eq!(stats.grants_sent, 4);
}

#[traced_test]
#[test]
fn test_dirty_fork_is_requested_back_after_grant() {
    let mut runner =
        SimulationRunner::new(manual_config(3, ForkPriority::LowerIdHolds), 0).unwrap();
    runner.schedule_lock_request(ProcessId(2), ms(0)).unwrap();
    runner.schedule_lock_request(ProcessId(3), ms(0)).unwrap();

    runner.run_until_quiescent().unwrap();

    // Process 2 gave up its dirty fork to 3 and asked for it straight back.
    let audit = runner.audit();
    assert_eq!(audit.requests_sent(ProcessId(3), ProcessId(2)), 1);
    assert_eq!(audit.grants_sent(ProcessId(2), ProcessId(3)), 1);
    assert_eq!(audit.requests_sent(ProcessId(2), ProcessId(3)), 1);
    assert_eq!(audit.grants_sent(ProcessId(3), ProcessId(2)), 1);

    let order: Vec<_> = runner.records().iter().map(|r| r.process).collect();
    assert_eq!(order, vec![ProcessId(3), ProcessId(2)]);
    assert_eq!(runner.records()[0].entered_at, ms(2));
    assert_eq!(runner.records()[1].entered_at, ms(8));
}

#[traced_test]
#[test]
fn test_holder_of_every_fork_enters_without_messages() {
    let mut runner =
        SimulationRunner::new(manual_config(4, ForkPriority::LowerIdHolds), 0).unwrap();
    runner.schedule_lock_request(ProcessId(1), ms(0)).unwrap();
    runner.run_until_quiescent().unwrap();

    assert_eq!(runner.stats().entries, 1);
    assert_eq!(runner.stats().immediate_entries, 1);
    assert_eq!(runner.stats().messages_sent, 0);
}

#[traced_test]
#[test]
fn test_single_process_cluster() {
    let config = SimulationConfig::new(1)
        .with_network(NetworkConfig::new(1))
        .with_workload(WorkloadPlan::default().with_requests_per_process(3));
    let mut runner = SimulationRunner::new(config, 5).unwrap();
    let stats = runner.run_until_quiescent().unwrap();

    assert_eq!(stats.entries, 3);
    assert_eq!(stats.messages_sent, 0);
}

#[traced_test]
#[test]
fn test_double_lock_request_fails_the_run() {
    let mut runner =
        SimulationRunner::new(manual_config(2, ForkPriority::LowerIdHolds), 0).unwrap();
    runner.schedule_lock_request(ProcessId(1), ms(0)).unwrap();
    runner.schedule_lock_request(ProcessId(1), ms(0)).unwrap();

    let err = runner.run_until_quiescent().unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Protocol {
            process: ProcessId(1),
            source: ProtocolError::AlreadyRequested,
            ..
        }
    ));
}

#[traced_test]
#[test]
fn test_non_default_process_ids() {
    let network = NetworkConfig::new(3).with_first_process_id(100);
    let config = SimulationConfig::new(3).with_network(network);
    let mut runner = SimulationRunner::new(config, 17).unwrap();

    assert_eq!(
        runner.process_ids(),
        vec![ProcessId(100), ProcessId(101), ProcessId(102)]
    );
    runner.run_until_quiescent().unwrap();
    assert_eq!(runner.stats().entries, 15);
}

#[test]
fn test_every_request_is_served_across_seeds() {
    for priority in [ForkPriority::LowerIdHolds, ForkPriority::HigherIdHolds] {
        for n in 2..=8u32 {
            for seed in 0..20u64 {
                let config = SimulationConfig::new(n)
                    .with_network(NetworkConfig::new(n).with_latency(ms(1), ms(10)))
                    .with_mutex(MutexConfig::default().with_priority(priority));
                let mut runner = SimulationRunner::new(config, seed).unwrap_or_else(|e| {
                    panic!("setup failed: n={n} seed={seed} {priority:?}: {e}")
                });

                let stats = runner
                    .run_until_quiescent()
                    .unwrap_or_else(|e| panic!("n={n} seed={seed} {priority:?}: {e}"))
                    .clone();

                assert_eq!(stats.lock_requests, u64::from(n) * 5);
                assert_eq!(stats.entries, stats.lock_requests);
                assert_eq!(stats.requests_sent, stats.grants_sent);
                assert_no_overlap(runner.records());
            }
        }
    }
}

#[test]
fn test_heavy_contention_stays_live() {
    let workload = WorkloadPlan::default()
        .with_requests_per_process(25)
        .with_hold_time(ms(1))
        .with_think_time(Duration::ZERO, Duration::ZERO)
        .with_start_jitter(Duration::ZERO);

    for seed in 0..10u64 {
        let config = SimulationConfig::new(6)
            .with_network(NetworkConfig::new(6).with_latency(Duration::from_micros(100), ms(20)))
            .with_workload(workload.clone());
        let mut runner = SimulationRunner::new(config, seed).unwrap();
        runner
            .run_until_quiescent()
            .unwrap_or_else(|e| panic!("seed={seed}: {e}"));

        assert_eq!(runner.records().len(), 150);
        assert_no_overlap(runner.records());
        for id in runner.process_ids() {
            let entries = runner.records().iter().filter(|r| r.process == id).count();
            assert_eq!(entries, 25, "{id} was starved");
        }
    }
}

#[test]
fn test_same_seed_same_trace() {
    let run = |seed| {
        let mut runner = SimulationRunner::new(SimulationConfig::new(5), seed).unwrap();
        runner.run_until_quiescent().unwrap();
        (runner.records().to_vec(), runner.stats().clone())
    };

    assert_eq!(run(99), run(99));
    assert_ne!(run(99).0, run(100).0);
}
