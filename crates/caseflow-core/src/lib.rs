//! caseflow-core — booking domain for the community assessment model.
//!
//! This crate **decides** where bookings land; `caseflow-sim`
//! **orchestrates** patients through it. It owns the seeded sampling
//! streams, the pre-parsed input tables, the forward-dated slot diaries
//! and the three booking strategies.
//!
//! # Key components
//!
//! - [`Scenario`]: exclusive owner of the diaries, caseload vector and
//!   sampling streams for one run
//! - [`Booker`]: the low-priority pooled, high-priority pooled and repeat
//!   booking strategies behind one contract
//! - [`Diary`]: the carve-out/public/bookings grids with a single
//!   `reserve` mutation path
//! - [`sampling`]: seedable Bernoulli, Discrete, Poisson and Lognormal
//!   streams plus the seed-vector generator

pub mod booker;
pub mod config;
pub mod diary;
pub mod error;
pub mod sampling;
pub mod scenario;
pub mod tables;

// Re-export commonly used types
pub use booker::{
    Booker, BookerKind, Priority, BOOKING_TIME_THRESHOLD, HIGH_INTENSITY_FOLLOW_UP_TARGET_INTERVAL,
    HIGH_PRIORITY_MIN_WAIT, LOW_INTENSITY_FOLLOW_UP_TARGET_INTERVAL, LOW_PRIORITY_MIN_WAIT,
};
pub use config::ScenarioConfig;
pub use diary::{Diary, SlotGrid, SlotPool};
pub use error::{CoreError, Result};
pub use sampling::{generate_seed_vector, Bernoulli, Discrete, Lognormal, Poisson};
pub use scenario::{Clinic, Intensity, Scenario};
pub use tables::{
    CaseloadTable, InputTables, PoolingTable, ReferralTable, ShiftTable, WORKING_DAYS_PER_WEEK,
};
