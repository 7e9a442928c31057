//! caseflow-sim — discrete-event kernel for the assessment booking model.
//!
//! This crate **orchestrates** the simulation; `caseflow-core` **decides**
//! where bookings land. Patients flow through as cooperative processes on
//! a single-threaded virtual clock: referrals arrive daily, get triaged,
//! book an assessment in the shared diary, attend, and (probabilistically)
//! run a follow-up sequence until discharge.
//!
//! # Key components
//!
//! - [`Simulator`]: wake queue, arrivals generator and run loop
//! - [`PatientPathway`]: one referral's state machine between suspensions
//! - [`EventLog`]: the ordered, byte-deterministic record of a run
//! - [`WaitingTimeResults`]: post-run partition of waits by priority

pub mod events;
pub mod metrics;
pub mod pathway;
pub mod simulator;

// Re-exports for convenience
pub use events::{
    AppointmentType, EventClass, EventKind, EventLog, EventRecord, PathwayLabel,
};
pub use metrics::{mean, slot_utilisation, WaitingTimeResults, TARGET_HIGH, TARGET_LOW};
pub use pathway::PatientPathway;
pub use simulator::{SimulationOutput, Simulator};
