//! Scenario state: input tables, diaries, caseload and sampling streams.
//!
//! A `Scenario` is built once per run and exclusively owns everything the
//! pathways mutate: the three diaries, the live caseload vector and every
//! seeded sampling stream. Pathways reach all of it through the operations
//! here, never through raw indices.

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::booker::Priority;
use crate::config::ScenarioConfig;
use crate::diary::{Diary, SlotPool};
use crate::error::Result;
use crate::sampling::{Bernoulli, Discrete, Lognormal, Poisson};
use crate::tables::InputTables;

/// Proportion of high-priority patients who go on to ongoing appointments.
pub const PROP_HIGH_PRIORITY_ONGOING_APPOINTMENTS: f64 = 0.95;
/// Proportion of low-priority patients who go on to ongoing appointments.
pub const PROP_LOW_PRIORITY_ONGOING_APPOINTMENTS: f64 = 0.8;
/// Proportion of high-priority patients whose follow-up is high intensity.
pub const PROP_HIGH_PRIORITY_HIGH_INTENSITY: f64 = 0.7;
/// Proportion of low-priority patients whose follow-up is high intensity.
pub const PROP_LOW_PRIORITY_HIGH_INTENSITY: f64 = 0.2;

/// Mean and stdev of the follow-up count, by intensity.
pub const MEAN_FOLLOW_UPS_HIGH_INTENSITY: f64 = 10.0;
pub const STDEV_FOLLOW_UPS_HIGH_INTENSITY: f64 = 6.0;
pub const MEAN_FOLLOW_UPS_LOW_INTENSITY: f64 = 6.0;
pub const STDEV_FOLLOW_UPS_LOW_INTENSITY: f64 = 3.0;

/// Caseload headroom kept free per clinician for urgent work.
const CASELOAD_BUFFER: f64 = 1.0;

/// Follow-up intensity, sampled after the assessment is attended.
///
/// High intensity occupies one weekly caseload unit, low intensity half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Low,
    High,
}

impl Intensity {
    /// Caseload units this intensity occupies.
    pub fn caseload_units(&self) -> f64 {
        match self {
            Intensity::High => 1.0,
            Intensity::Low => 0.5,
        }
    }
}

/// A clinic triages its referrals and may refer them out of the service.
#[derive(Debug, Clone)]
pub struct Clinic {
    prob_referral_out: f64,
    ref_out_dist: Bernoulli,
}

impl Clinic {
    fn new(prob_referral_out: f64, seed: u64) -> Result<Self> {
        Ok(Self {
            prob_referral_out,
            ref_out_dist: Bernoulli::new(prob_referral_out, seed)?,
        })
    }

    pub fn prob_referral_out(&self) -> f64 {
        self.prob_referral_out
    }
}

/// All mutable state of one model run.
#[derive(Debug, Clone)]
pub struct Scenario {
    run_length: u32,
    warm_up: u32,
    prop_carve_out: f64,

    diary: Diary,
    caseload: Vec<f64>,
    weekly_totals: Vec<u32>,
    tables: InputTables,
    clinics: Vec<Clinic>,

    // Sampling streams, in seed-vector order.
    arrival_dist: Poisson,
    priority_dist: Bernoulli,
    follow_up_dist_high_priority: Bernoulli,
    follow_up_dist_low_priority: Bernoulli,
    intensity_dist_high_priority: Bernoulli,
    intensity_dist_low_priority: Bernoulli,
    num_follow_up_dist_high_intensity: Lognormal,
    num_follow_up_dist_low_intensity: Lognormal,
    clinic_dist: Discrete,
    tie_break: StdRng,
}

impl Scenario {
    /// Build a scenario from a validated configuration and input tables.
    ///
    /// Seed-vector layout: 0 arrivals, 1 priority, 2/3 follow-up necessity
    /// (high/low priority), 4/5 intensity (high/low priority), 6/7 follow-up
    /// counts (high/low intensity), 8 clinic choice, 9..9+C per-clinic
    /// referral-out, last element tie-breaking.
    pub fn new(config: &ScenarioConfig, tables: InputTables) -> Result<Self> {
        config.validate(&tables)?;
        let seeds = &config.seeds;

        let diary = Diary::new(&tables.shifts, config.prop_carve_out, config.run_length);
        let caseload = tables.caseload.values().to_vec();
        let weekly_totals = tables.shifts.weekly_totals();

        let clinic_count = tables.clinics();
        let clinics = (0..clinic_count)
            .map(|i| Clinic::new(tables.referrals.referred_out(i), seeds[9 + i]))
            .collect::<Result<Vec<_>>>()?;

        let clinic_dist = Discrete::new(
            (0..clinic_count).collect(),
            tables.referrals.props(),
            seeds[8],
        )?;

        Ok(Self {
            run_length: config.run_length,
            warm_up: config.warm_up,
            prop_carve_out: config.prop_carve_out,
            diary,
            caseload,
            weekly_totals,
            clinics,
            arrival_dist: Poisson::new(config.daily_arrival_rate(), seeds[0])?,
            priority_dist: Bernoulli::new(config.prop_high_priority, seeds[1])?,
            follow_up_dist_high_priority: Bernoulli::new(
                PROP_HIGH_PRIORITY_ONGOING_APPOINTMENTS,
                seeds[2],
            )?,
            follow_up_dist_low_priority: Bernoulli::new(
                PROP_LOW_PRIORITY_ONGOING_APPOINTMENTS,
                seeds[3],
            )?,
            intensity_dist_high_priority: Bernoulli::new(
                PROP_HIGH_PRIORITY_HIGH_INTENSITY,
                seeds[4],
            )?,
            intensity_dist_low_priority: Bernoulli::new(
                PROP_LOW_PRIORITY_HIGH_INTENSITY,
                seeds[5],
            )?,
            num_follow_up_dist_high_intensity: Lognormal::new(
                MEAN_FOLLOW_UPS_HIGH_INTENSITY,
                STDEV_FOLLOW_UPS_HIGH_INTENSITY,
                seeds[6],
            )?,
            num_follow_up_dist_low_intensity: Lognormal::new(
                MEAN_FOLLOW_UPS_LOW_INTENSITY,
                STDEV_FOLLOW_UPS_LOW_INTENSITY,
                seeds[7],
            )?,
            clinic_dist,
            tie_break: StdRng::seed_from_u64(seeds[seeds.len() - 1]),
            tables,
        })
    }

    pub fn run_length(&self) -> u32 {
        self.run_length
    }

    pub fn warm_up(&self) -> u32 {
        self.warm_up
    }

    pub fn prop_carve_out(&self) -> f64 {
        self.prop_carve_out
    }

    pub fn clinic_count(&self) -> usize {
        self.clinics.len()
    }

    pub fn diary(&self) -> &Diary {
        &self.diary
    }

    pub fn caseload(&self) -> &[f64] {
        &self.caseload
    }

    /// Clinics eligible for `home`'s initial assessments under pooling.
    pub fn pooled_with(&self, home: usize) -> Vec<usize> {
        self.tables.pooling.pooled_with(home)
    }

    /// Consume one slot from the named pool on `(day, clinic)`.
    pub fn reserve(&mut self, day: usize, clinic: usize, pool: SlotPool) -> Result<()> {
        self.diary.reserve(day, clinic, pool)
    }

    /// Shift a clinician's live caseload by `delta` weekly-slot units.
    pub fn adjust_caseload(&mut self, clinic: usize, delta: f64) {
        self.caseload[clinic] += delta;
    }

    /// Per-clinician admission headroom: weekly slot total minus live
    /// caseload, minus one slot kept free for urgent patients.
    pub fn headroom(&self, clinic: usize) -> f64 {
        self.weekly_totals[clinic] as f64 - self.caseload[clinic] - CASELOAD_BUFFER
    }

    /// Boolean mask of clinicians with positive admission headroom.
    pub fn headroom_mask(&self) -> Vec<bool> {
        (0..self.clinic_count()).map(|c| self.headroom(c) > 0.0).collect()
    }

    // ------------------------------------------------------------------
    // Sampling
    // ------------------------------------------------------------------

    /// Number of referrals arriving on one working day.
    pub fn sample_arrivals(&mut self) -> u32 {
        self.arrival_dist.sample()
    }

    /// Home clinic of a new referral, by empirical proportions.
    pub fn sample_clinic(&mut self) -> usize {
        self.clinic_dist.sample()
    }

    /// Whether triage at `clinic` refers the patient out of the service.
    pub fn sample_referred_out(&mut self, clinic: usize) -> bool {
        self.clinics[clinic].ref_out_dist.sample()
    }

    /// Triage priority of an accepted referral.
    pub fn sample_priority(&mut self) -> Priority {
        if self.priority_dist.sample() {
            Priority::High
        } else {
            Priority::Low
        }
    }

    /// Whether the patient needs any follow-up appointments.
    pub fn sample_follow_up_needed(&mut self, priority: Priority) -> bool {
        match priority {
            Priority::High => self.follow_up_dist_high_priority.sample(),
            Priority::Low => self.follow_up_dist_low_priority.sample(),
        }
    }

    /// Follow-up intensity for a patient that needs ongoing appointments.
    pub fn sample_intensity(&mut self, priority: Priority) -> Intensity {
        let high = match priority {
            Priority::High => self.intensity_dist_high_priority.sample(),
            Priority::Low => self.intensity_dist_low_priority.sample(),
        };
        if high {
            Intensity::High
        } else {
            Intensity::Low
        }
    }

    /// How many follow-ups the patient will have; lognormal truncated to
    /// an integer.
    pub fn sample_num_follow_ups(&mut self, intensity: Intensity) -> u32 {
        let raw = match intensity {
            Intensity::High => self.num_follow_up_dist_high_intensity.sample(),
            Intensity::Low => self.num_follow_up_dist_low_intensity.sample(),
        };
        raw as u32
    }

    /// Uniform pick among `n` equally good clinicians.
    ///
    /// A draw is consumed even when `n == 1` so the stream stays aligned
    /// with the booking sequence regardless of how ties fall.
    pub fn tie_break_index(&mut self, n: usize) -> usize {
        self.tie_break.gen_range(0..n)
    }
}
