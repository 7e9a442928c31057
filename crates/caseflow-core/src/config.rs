//! Scenario configuration.
//!
//! Mirrors the shape the service planners work with: a handful of named
//! knobs with sensible defaults, loadable from YAML for reproducible
//! experiments. Validation happens once, before the kernel starts.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::sampling::generate_seed_vector;
use crate::tables::{InputTables, WORKING_DAYS_PER_WEEK};

/// Default annual referral demand across the whole service.
pub const ANNUAL_DEMAND: u32 = 1_500;
/// Default probability that a triaged patient is graded high priority.
pub const PROP_HIGH_PRIORITY: f64 = 0.15;
/// Default fraction of weekly slots reserved for high-priority patients.
pub const PROP_CARVE_OUT: f64 = 0.15;

/// Master seed used when no explicit seed vector is supplied.
pub const DEFAULT_MASTER_SEED: u64 = 42;
/// Length of the default seed vector.
pub const SEED_VECTOR_LEN: usize = 20;

/// Seed-vector slots 0..=8 are fixed streams, 9..9+C are per-clinic
/// referral-out streams and the final element seeds tie-breaking.
const FIXED_SEED_STREAMS: usize = 9;

fn default_prop_carve_out() -> f64 {
    PROP_CARVE_OUT
}

fn default_prop_high_priority() -> f64 {
    PROP_HIGH_PRIORITY
}

fn default_annual_demand() -> u32 {
    ANNUAL_DEMAND
}

fn default_seeds() -> Vec<u64> {
    generate_seed_vector(DEFAULT_MASTER_SEED, SEED_VECTOR_LEN)
}

/// Configuration of a single model run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Total simulation horizon in days.
    pub run_length: u32,

    /// Results below this virtual time are discarded.
    #[serde(default)]
    pub warm_up: u32,

    /// Fraction of weekly slots carved out for high-priority assessments.
    #[serde(default = "default_prop_carve_out")]
    pub prop_carve_out: f64,

    /// Probability a triaged patient is graded high priority.
    #[serde(default = "default_prop_high_priority")]
    pub prop_high_priority: f64,

    /// Annual referral demand; divided by 52 * 5 for the daily arrival rate.
    #[serde(default = "default_annual_demand")]
    pub annual_demand: u32,

    /// Seed vector for the deterministic streams, in the documented order.
    /// Defaults to `generate_seed_vector(42, 20)`.
    #[serde(default = "default_seeds")]
    pub seeds: Vec<u64>,
}

impl ScenarioConfig {
    /// A config with the given horizon and all other knobs at defaults.
    pub fn new(run_length: u32) -> Self {
        Self {
            run_length,
            warm_up: 0,
            prop_carve_out: PROP_CARVE_OUT,
            prop_high_priority: PROP_HIGH_PRIORITY,
            annual_demand: ANNUAL_DEMAND,
            seeds: default_seeds(),
        }
    }

    /// Parse a config from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| CoreError::Configuration(format!("bad scenario yaml: {e}")))
    }

    /// Check the config against the input tables it will run with.
    pub fn validate(&self, tables: &InputTables) -> Result<()> {
        tables.validate()?;
        if self.run_length == 0 {
            return Err(CoreError::Configuration("run_length must be positive".into()));
        }
        if self.run_length <= self.warm_up {
            return Err(CoreError::Configuration(format!(
                "run_length ({}) must exceed warm_up ({})",
                self.run_length, self.warm_up
            )));
        }
        if self.annual_demand == 0 {
            return Err(CoreError::Configuration(
                "annual_demand must be positive".into(),
            ));
        }
        for (name, p) in [
            ("prop_carve_out", self.prop_carve_out),
            ("prop_high_priority", self.prop_high_priority),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(CoreError::Configuration(format!(
                    "{name} ({p}) must lie in [0, 1]"
                )));
            }
        }
        let clinics = tables.clinics();
        if self.seeds.len() < SEED_VECTOR_LEN {
            return Err(CoreError::Configuration(format!(
                "seed vector needs at least {SEED_VECTOR_LEN} elements, got {}",
                self.seeds.len()
            )));
        }
        // Per-clinic streams occupy 9..9+C and tie-breaking takes the last
        // element; the two ranges must not collide.
        if FIXED_SEED_STREAMS + clinics >= self.seeds.len() {
            return Err(CoreError::Configuration(format!(
                "seed vector of length {} supports at most {} clinics, got {clinics}",
                self.seeds.len(),
                self.seeds.len() - FIXED_SEED_STREAMS - 1
            )));
        }
        Ok(())
    }

    /// Daily Poisson arrival rate implied by the annual demand.
    pub fn daily_arrival_rate(&self) -> f64 {
        self.annual_demand as f64 / 52.0 / WORKING_DAYS_PER_WEEK as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{CaseloadTable, PoolingTable, ReferralTable, ShiftTable};

    fn tables(clinics: usize) -> InputTables {
        InputTables {
            shifts: ShiftTable::new(vec![vec![5; clinics]; WORKING_DAYS_PER_WEEK]).unwrap(),
            referrals: ReferralTable::new(
                vec![1.0 / clinics as f64; clinics],
                vec![0.0; clinics],
            )
            .unwrap(),
            pooling: PoolingTable::full(clinics),
            caseload: CaseloadTable::zeros(clinics),
        }
    }

    #[test]
    fn defaults_are_applied_from_yaml() {
        let config = ScenarioConfig::from_yaml("run_length: 100").unwrap();
        assert_eq!(config.run_length, 100);
        assert_eq!(config.warm_up, 0);
        assert_eq!(config.annual_demand, ANNUAL_DEMAND);
        assert_eq!(config.prop_carve_out, PROP_CARVE_OUT);
        assert_eq!(config.seeds, generate_seed_vector(42, 20));
    }

    #[test]
    fn yaml_overrides_defaults() {
        let config = ScenarioConfig::from_yaml(
            "run_length: 60\nwarm_up: 10\nannual_demand: 2600\nprop_carve_out: 0.5",
        )
        .unwrap();
        assert_eq!(config.warm_up, 10);
        assert_eq!(config.annual_demand, 2_600);
        assert_eq!(config.prop_carve_out, 0.5);
    }

    #[test]
    fn missing_run_length_is_rejected() {
        assert!(ScenarioConfig::from_yaml("warm_up: 5").is_err());
    }

    #[test]
    fn warm_up_must_be_shorter_than_run() {
        let mut config = ScenarioConfig::new(50);
        config.warm_up = 50;
        assert!(config.validate(&tables(2)).is_err());
    }

    #[test]
    fn proportions_outside_unit_interval_rejected() {
        let mut config = ScenarioConfig::new(50);
        config.prop_carve_out = 1.2;
        assert!(config.validate(&tables(2)).is_err());
    }

    #[test]
    fn seed_vector_bounds_clinician_count() {
        let config = ScenarioConfig::new(50);
        assert!(config.validate(&tables(10)).is_ok());
        assert!(config.validate(&tables(11)).is_err());
    }

    #[test]
    fn daily_rate_divides_annual_demand() {
        let mut config = ScenarioConfig::new(10);
        config.annual_demand = 2_600;
        assert!((config.daily_arrival_rate() - 10.0).abs() < 1e-12);
    }
}
