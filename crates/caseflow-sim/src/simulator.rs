//! The virtual-time simulation kernel.
//!
//! A single-threaded cooperative scheduler: processes (the arrivals
//! generator plus one pathway per patient) suspend on timeouts and are
//! resumed from a wake queue keyed by `(virtual_time, sequence)`. The
//! sequence number makes resumptions at the same instant run in FIFO
//! insertion order, which the anti-leapfrog rule depends on.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use anyhow::{Context, Result};
use tracing::debug;

use caseflow_core::{Booker, InputTables, Scenario, ScenarioConfig};

use crate::events::{EventKind, EventLog, EventRecord, PathwayLabel};
use crate::metrics::WaitingTimeResults;
use crate::pathway::PatientPathway;

/// A scheduled resumption.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Wake {
    time: f64,
    seq: u64,
    process: usize,
}

impl Eq for Wake {}

impl Ord for Wake {
    // Reversed so the std max-heap pops the earliest (time, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Wake {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-queue of wakes, FIFO within a virtual instant.
#[derive(Debug, Default)]
struct WakeQueue {
    heap: BinaryHeap<Wake>,
    next_seq: u64,
}

impl WakeQueue {
    fn schedule(&mut self, time: f64, process: usize) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Wake { time, seq, process });
    }

    fn pop(&mut self) -> Option<Wake> {
        self.heap.pop()
    }
}

enum Process {
    /// The long-lived daily arrivals generator.
    Arrivals,
    Patient(PatientPathway),
}

/// Everything a single run produces.
#[derive(Debug)]
pub struct SimulationOutput {
    /// Ordered event log of the whole run.
    pub event_log: EventLog,
    /// Waiting times of patients who attended after warm-up.
    pub results: WaitingTimeResults,
    /// Final scenario state: diaries and caseload as the run left them.
    pub scenario: Scenario,
}

impl SimulationOutput {
    /// Final bookings, sliced to the results window `[warm_up, run_length)`.
    pub fn bookings_window(&self) -> Vec<Vec<u32>> {
        let diary = self.scenario.diary();
        diary.bookings().window(
            self.scenario.warm_up() as usize,
            self.scenario.run_length() as usize,
        )
    }

    /// Remaining public capacity over the results window.
    pub fn available_window(&self) -> Vec<Vec<u32>> {
        let diary = self.scenario.diary();
        diary.available().window(
            self.scenario.warm_up() as usize,
            self.scenario.run_length() as usize,
        )
    }
}

/// Single-run orchestrator for the assessment referral model.
pub struct Simulator {
    scenario: Scenario,
    processes: Vec<Process>,
    queue: WakeQueue,
    event_log: EventLog,
}

/// The arrivals generator is always process 0.
const ARRIVALS: usize = 0;

impl Simulator {
    pub fn new(scenario: Scenario) -> Self {
        let mut queue = WakeQueue::default();
        queue.schedule(0.0, ARRIVALS);
        Self {
            scenario,
            processes: vec![Process::Arrivals],
            queue,
            event_log: EventLog::new(),
        }
    }

    /// Build the scenario from config and tables, validating both.
    pub fn from_config(config: &ScenarioConfig, tables: InputTables) -> Result<Self> {
        let scenario =
            Scenario::new(config, tables).context("failed to construct scenario")?;
        Ok(Self::new(scenario))
    }

    /// Drive virtual time until `run_length`; pathways still in flight at
    /// the end are abandoned unresumed.
    pub fn run(mut self) -> Result<SimulationOutput> {
        let run_length = self.scenario.run_length() as f64;

        while let Some(wake) = self.queue.pop() {
            if wake.time >= run_length {
                break;
            }
            if wake.process == ARRIVALS {
                self.generate_arrivals(wake.time)
                    .with_context(|| format!("arrivals generation on day {}", wake.time))?;
                continue;
            }
            if let Process::Patient(pathway) = &mut self.processes[wake.process] {
                let next = pathway
                    .resume(wake.time, &mut self.scenario, &mut self.event_log)
                    .with_context(|| {
                        format!("resuming patient {} at {}", pathway.identifier(), wake.time)
                    })?;
                if let Some(delay) = next {
                    self.queue.schedule(wake.time + delay, wake.process);
                }
            }
        }

        let results = WaitingTimeResults::from_pathways(self.processes.iter().filter_map(
            |p| match p {
                Process::Patient(pathway) => Some(pathway),
                Process::Arrivals => None,
            },
        ));

        Ok(SimulationOutput {
            event_log: self.event_log,
            results,
            scenario: self.scenario,
        })
    }

    /// One day of referrals: sample the count, triage each patient and
    /// spawn a pathway for everyone accepted, then sleep until tomorrow.
    fn generate_arrivals(&mut self, now: f64) -> Result<()> {
        let day = now as usize;
        let referrals = self.scenario.sample_arrivals();
        debug!(day, referrals, "daily referrals generated");

        for i in 0..referrals {
            let identifier = format!("{day}_{i}");
            let home_clinic = self.scenario.sample_clinic();

            if self.scenario.sample_referred_out(home_clinic) {
                self.log_referred_out(&identifier, home_clinic, now);
                continue;
            }

            let priority = self.scenario.sample_priority();
            let booker = Booker::for_priority(priority);
            let collect = now > self.scenario.warm_up() as f64;
            let pathway =
                PatientPathway::new(identifier, day, home_clinic, booker, collect);

            let pid = self.processes.len();
            self.processes.push(Process::Patient(pathway));
            self.queue.schedule(now, pid);
        }

        self.queue.schedule(now + 1.0, ARRIVALS);
        Ok(())
    }

    /// Triage triple for a patient the service refers elsewhere.
    fn log_referred_out(&mut self, identifier: &str, home_clinic: usize, now: f64) {
        for (kind, time) in [
            (EventKind::Arrival, now),
            (EventKind::ReferredOut, now),
            (EventKind::Depart, now + 1.0),
        ] {
            self.event_log.push(EventRecord::new(
                identifier,
                PathwayLabel::ReferredOut,
                kind,
                home_clinic,
                time,
            ));
        }
    }
}
