//! Simulation runner.

use crate::{
    EventKey, ForkAudit, NetworkConfig, NodeIndex, SimulatedNetwork, SimulationError, WorkloadPlan,
};
use forklock_core::{Action, Event, StateMachine};
use forklock_mutex::{MutexConfig, MutexState};
use forklock_types::{ProcessId, StaticTopology};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, trace};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Cluster size and link latencies.
    pub network: NetworkConfig,

    /// Protocol configuration shared by every process.
    pub mutex: MutexConfig,

    /// Application behavior.
    pub workload: WorkloadPlan,

    /// Upper bound on processed events before the run is declared stuck.
    pub max_events: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            mutex: MutexConfig::default(),
            workload: WorkloadPlan::default(),
            max_events: 1_000_000,
        }
    }
}

impl SimulationConfig {
    /// Create a config for `num_processes` processes.
    pub fn new(num_processes: u32) -> Self {
        Self {
            network: NetworkConfig::new(num_processes),
            ..Default::default()
        }
    }

    /// Set the network configuration.
    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Set the protocol configuration.
    pub fn with_mutex(mut self, mutex: MutexConfig) -> Self {
        self.mutex = mutex;
        self
    }

    /// Set the workload.
    pub fn with_workload(mut self, workload: WorkloadPlan) -> Self {
        self.workload = workload;
        self
    }

    /// Set the event limit.
    pub fn with_max_events(mut self, max_events: u64) -> Self {
        self.max_events = max_events;
        self
    }
}

/// One pass through the critical section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriticalSectionRecord {
    /// Process that entered.
    pub process: ProcessId,
    /// When the lock request was handled.
    pub requested_at: Duration,
    /// When the process entered.
    pub entered_at: Duration,
    /// When the process left, if it has.
    pub left_at: Option<Duration>,
}

impl CriticalSectionRecord {
    /// Time between the request and the entry.
    pub fn wait_time(&self) -> Duration {
        self.entered_at.saturating_sub(self.requested_at)
    }
}

/// Statistics collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationStats {
    /// Events taken off the queue.
    pub events_processed: u64,
    /// Messages handed to the network.
    pub messages_sent: u64,
    /// Request messages sent.
    pub requests_sent: u64,
    /// Grant messages sent.
    pub grants_sent: u64,
    /// Lock requests handled.
    pub lock_requests: u64,
    /// Critical section entries.
    pub entries: u64,
    /// Entries that needed no messages at all.
    pub immediate_entries: u64,
    /// Simulated time of the last processed event.
    pub final_time: Duration,
}

/// Deterministic discrete-event runner for a cluster of processes.
///
/// Every step takes the earliest event off the queue, hands it to the
/// destination process, turns the returned actions into new events and then
/// audits the whole cluster. Any protocol error or invariant violation ends
/// the run.
pub struct SimulationRunner {
    nodes: Vec<MutexState>,
    index_of: HashMap<ProcessId, NodeIndex>,
    queue: BTreeMap<EventKey, Event>,
    network: SimulatedNetwork,
    workload: WorkloadPlan,
    rng: ChaCha8Rng,
    audit: ForkAudit,
    now: Duration,
    sequence: u64,
    max_events: u64,
    /// Workload requests each node has yet to issue.
    remaining_requests: Vec<u32>,
    /// When each node's pending lock request was handled.
    requested_at: Vec<Option<Duration>>,
    /// Node currently inside the critical section.
    holder: Option<NodeIndex>,
    records: Vec<CriticalSectionRecord>,
    stats: SimulationStats,
}

impl SimulationRunner {
    /// Build the cluster and schedule the first workload requests.
    pub fn new(config: SimulationConfig, seed: u64) -> Result<Self, SimulationError> {
        let network_config = config.network.clone();
        let first = network_config.first_process_id;
        let count = u64::from(network_config.num_processes);

        let end = first
            .checked_add(count)
            .ok_or(SimulationError::ProcessIdOverflow { first, count })?;

        let mut nodes = Vec::with_capacity(count as usize);
        let mut index_of = HashMap::new();
        for (index, id) in (first..end).map(ProcessId).enumerate() {
            let topology = StaticTopology::contiguous(id, first, count)?;
            nodes.push(MutexState::new(topology.into_arc(), config.mutex.clone()));
            index_of.insert(id, index as NodeIndex);
        }

        let mut runner = Self {
            nodes,
            index_of,
            queue: BTreeMap::new(),
            network: SimulatedNetwork::new(network_config),
            remaining_requests: vec![config.workload.requests_per_process; count as usize],
            workload: config.workload,
            rng: ChaCha8Rng::seed_from_u64(seed),
            audit: ForkAudit::new(),
            now: Duration::ZERO,
            sequence: 0,
            max_events: config.max_events,
            requested_at: vec![None; count as usize],
            holder: None,
            records: Vec::new(),
            stats: SimulationStats::default(),
        };

        for node in 0..count as NodeIndex {
            if runner.take_workload_request(node) {
                let at = runner.workload.sample_start(&mut runner.rng);
                runner.schedule(at, node, Event::LockRequested);
            }
        }

        info!(
            processes = count,
            seed,
            requests_per_process = runner.workload.requests_per_process,
            "Simulation initialized"
        );

        Ok(runner)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    /// Get the current simulated time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Get all processes in id order.
    pub fn nodes(&self) -> &[MutexState] {
        &self.nodes
    }

    /// Get a process by id.
    pub fn node(&self, id: ProcessId) -> Option<&MutexState> {
        self.index_of
            .get(&id)
            .map(|&index| &self.nodes[index as usize])
    }

    /// Get every process id in the cluster.
    pub fn process_ids(&self) -> Vec<ProcessId> {
        self.nodes.iter().map(|n| n.local_process_id()).collect()
    }

    /// Get the process inside the critical section, if any.
    pub fn holder(&self) -> Option<ProcessId> {
        self.holder.map(|index| self.id_of(index))
    }

    /// Get every critical section pass so far, in entry order.
    pub fn records(&self) -> &[CriticalSectionRecord] {
        &self.records
    }

    /// Get the run statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Get the link audit.
    pub fn audit(&self) -> &ForkAudit {
        &self.audit
    }

    /// Get the number of events still queued.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Scheduling
    // ═══════════════════════════════════════════════════════════════════════════

    /// Schedule a lock request outside the workload plan.
    ///
    /// The entry it leads to is released after the plan's hold time.
    pub fn schedule_lock_request(
        &mut self,
        process: ProcessId,
        at: Duration,
    ) -> Result<(), SimulationError> {
        let node = self.index(process)?;
        self.schedule(at.max(self.now), node, Event::LockRequested);
        Ok(())
    }

    fn schedule(&mut self, at: Duration, node: NodeIndex, event: Event) {
        let key = EventKey::new(at, node, self.sequence, &event);
        self.sequence += 1;
        self.queue.insert(key, event);
    }

    fn take_workload_request(&mut self, node: NodeIndex) -> bool {
        let remaining = &mut self.remaining_requests[node as usize];
        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        true
    }

    fn index(&self, process: ProcessId) -> Result<NodeIndex, SimulationError> {
        self.index_of
            .get(&process)
            .copied()
            .ok_or(SimulationError::UnknownProcess(process))
    }

    fn id_of(&self, node: NodeIndex) -> ProcessId {
        self.nodes[node as usize].local_process_id()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Execution
    // ═══════════════════════════════════════════════════════════════════════════

    /// Process the earliest queued event.
    ///
    /// Returns `false` once the queue is empty.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        let Some((key, event)) = self.queue.pop_first() else {
            return Ok(false);
        };

        self.now = key.time;
        self.stats.events_processed += 1;
        self.stats.final_time = self.now;

        let node = key.node;
        let process = self.id_of(node);
        trace!(time = ?self.now, %process, event = event.type_name(), "Processing event");

        let lock_request = matches!(event, Event::LockRequested);
        match &event {
            Event::MessageReceived { from, message } => {
                self.audit.on_delivered(*from, process, *message);
            }
            Event::LockRequested => {
                self.stats.lock_requests += 1;
                self.requested_at[node as usize] = Some(self.now);
            }
            Event::UnlockRequested => {}
        }

        let actions =
            self.nodes[node as usize]
                .handle(event)
                .map_err(|source| SimulationError::Protocol {
                    process,
                    time: self.now,
                    source,
                })?;

        for action in actions {
            trace!(%process, action = action.type_name(), "Executing action");
            self.execute(node, action, lock_request)?;
        }

        self.audit.check(&self.nodes)?;
        Ok(true)
    }

    fn execute(
        &mut self,
        node: NodeIndex,
        action: Action,
        lock_request: bool,
    ) -> Result<(), SimulationError> {
        let process = self.id_of(node);

        match action {
            Action::SendMessage { to, message } => {
                let to_node = self.index(to)?;
                let at = self
                    .network
                    .delivery_time(node, to_node, self.now, &mut self.rng);
                self.audit.on_sent(process, to, message);
                self.stats.messages_sent += 1;
                if message.is_request() {
                    self.stats.requests_sent += 1;
                } else {
                    self.stats.grants_sent += 1;
                }
                self.schedule(
                    at,
                    to_node,
                    Event::MessageReceived {
                        from: process,
                        message,
                    },
                );
            }

            Action::EnteredCriticalSection => {
                if let Some(holder) = self.holder {
                    return Err(SimulationError::SafetyViolation {
                        holder: self.id_of(holder),
                        entering: process,
                        time: self.now,
                    });
                }
                self.holder = Some(node);
                self.stats.entries += 1;
                // Entering while handling the lock request itself means no
                // fork was missing.
                if lock_request {
                    self.stats.immediate_entries += 1;
                }

                let requested_at = self.requested_at[node as usize]
                    .take()
                    .unwrap_or(self.now);
                self.records.push(CriticalSectionRecord {
                    process,
                    requested_at,
                    entered_at: self.now,
                    left_at: None,
                });
                debug!(time = ?self.now, %process, "Entered critical section");

                let release_at = self.now + self.workload.hold_time;
                self.schedule(release_at, node, Event::UnlockRequested);
            }

            Action::LeftCriticalSection => {
                if self.holder == Some(node) {
                    self.holder = None;
                }
                if let Some(record) = self
                    .records
                    .iter_mut()
                    .rev()
                    .find(|r| r.process == process && r.left_at.is_none())
                {
                    record.left_at = Some(self.now);
                }
                debug!(time = ?self.now, %process, "Left critical section");

                if self.take_workload_request(node) {
                    let at = self.now + self.workload.sample_think_time(&mut self.rng);
                    self.schedule(at, node, Event::LockRequested);
                }
            }
        }

        Ok(())
    }

    /// Run until the queue drains, then check that the cluster settled.
    pub fn run_until_quiescent(&mut self) -> Result<&SimulationStats, SimulationError> {
        while self.step()? {
            if self.stats.events_processed > self.max_events {
                return Err(SimulationError::EventLimitExceeded {
                    limit: self.max_events,
                });
            }
        }

        self.check_quiescent()?;

        info!(
            events = self.stats.events_processed,
            entries = self.stats.entries,
            messages = self.stats.messages_sent,
            final_time = ?self.stats.final_time,
            "Simulation quiescent"
        );

        Ok(&self.stats)
    }

    /// Process every event scheduled at or before `until`.
    pub fn run_until(&mut self, until: Duration) -> Result<(), SimulationError> {
        while let Some((key, _)) = self.queue.first_key_value() {
            if key.time > until {
                break;
            }
            self.step()?;
            if self.stats.events_processed > self.max_events {
                return Err(SimulationError::EventLimitExceeded {
                    limit: self.max_events,
                });
            }
        }
        self.now = self.now.max(until);
        Ok(())
    }

    /// Check that no process wants or holds the section and every request
    /// has been answered.
    pub fn check_quiescent(&self) -> Result<(), SimulationError> {
        for node in &self.nodes {
            if node.wants_cs() || node.in_cs() || node.pending_grants() != 0 {
                return Err(SimulationError::NotQuiescent {
                    process: node.local_process_id(),
                    wants_cs: node.wants_cs(),
                    in_cs: node.in_cs(),
                    pending_grants: node.pending_grants(),
                });
            }
        }
        self.audit.check_all_answered()
    }
}
