//! Pre-parsed input tables.
//!
//! File ingestion is a boundary concern; the engine receives these tables
//! already parsed and only checks their shapes. Clinician counts must agree
//! across all four tables, which [`InputTables::validate`] enforces before
//! any scenario is built.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// The model runs on a 5-day working week.
pub const WORKING_DAYS_PER_WEEK: usize = 5;

/// Weekly template of slot counts: one row per working day, one column per
/// clinician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftTable {
    rows: Vec<Vec<u32>>,
}

impl ShiftTable {
    pub fn new(rows: Vec<Vec<u32>>) -> Result<Self> {
        if rows.len() != WORKING_DAYS_PER_WEEK {
            return Err(CoreError::Configuration(format!(
                "shift table must have {WORKING_DAYS_PER_WEEK} rows, got {}",
                rows.len()
            )));
        }
        let clinics = rows[0].len();
        if clinics == 0 {
            return Err(CoreError::Configuration(
                "shift table must have at least one clinician column".into(),
            ));
        }
        if rows.iter().any(|r| r.len() != clinics) {
            return Err(CoreError::Configuration(
                "shift table rows have unequal clinician counts".into(),
            ));
        }
        Ok(Self { rows })
    }

    pub fn clinics(&self) -> usize {
        self.rows[0].len()
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    /// Total weekly slots per clinician, the basis of the caseload
    /// headroom rule.
    pub fn weekly_totals(&self) -> Vec<u32> {
        (0..self.clinics())
            .map(|c| self.rows.iter().map(|r| r[c]).sum())
            .collect()
    }
}

/// Per-clinic referral mix: empirical arrival proportion and the
/// probability that triage refers the patient out of the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralTable {
    prop: Vec<f64>,
    referred_out: Vec<f64>,
}

impl ReferralTable {
    pub fn new(prop: Vec<f64>, referred_out: Vec<f64>) -> Result<Self> {
        if prop.len() != referred_out.len() {
            return Err(CoreError::Configuration(format!(
                "referral table columns disagree: {} proportions vs {} referred-out probabilities",
                prop.len(),
                referred_out.len()
            )));
        }
        if prop.is_empty() {
            return Err(CoreError::Configuration("referral table is empty".into()));
        }
        if prop.iter().any(|p| *p < 0.0 || !p.is_finite()) {
            return Err(CoreError::Configuration(
                "arrival proportions must be finite and non-negative".into(),
            ));
        }
        if referred_out.iter().any(|p| *p < 0.0 || *p > 1.0) {
            return Err(CoreError::Configuration(
                "referred-out probabilities must lie in [0, 1]".into(),
            ));
        }
        if prop.iter().sum::<f64>() <= 0.0 {
            return Err(CoreError::Configuration(
                "arrival proportions must not all be zero".into(),
            ));
        }
        Ok(Self { prop, referred_out })
    }

    pub fn clinics(&self) -> usize {
        self.prop.len()
    }

    pub fn props(&self) -> &[f64] {
        &self.prop
    }

    pub fn referred_out(&self, clinic: usize) -> f64 {
        self.referred_out[clinic]
    }
}

/// Boolean pooling relation: `pooled(i, j)` means clinic `i` may book into
/// clinic `j`'s slots for an initial assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolingTable {
    matrix: Vec<Vec<bool>>,
}

impl PoolingTable {
    pub fn new(matrix: Vec<Vec<bool>>) -> Result<Self> {
        let n = matrix.len();
        if n == 0 {
            return Err(CoreError::Configuration("pooling matrix is empty".into()));
        }
        if matrix.iter().any(|row| row.len() != n) {
            return Err(CoreError::Configuration(
                "pooling matrix must be square".into(),
            ));
        }
        Ok(Self { matrix })
    }

    /// Identity pooling: every clinic only uses its own slots.
    pub fn identity(clinics: usize) -> Self {
        let matrix = (0..clinics)
            .map(|i| (0..clinics).map(|j| i == j).collect())
            .collect();
        Self { matrix }
    }

    /// Full pooling: every clinic may use every other clinic's slots.
    pub fn full(clinics: usize) -> Self {
        Self {
            matrix: vec![vec![true; clinics]; clinics],
        }
    }

    pub fn clinics(&self) -> usize {
        self.matrix.len()
    }

    pub fn pooled(&self, home: usize, other: usize) -> bool {
        self.matrix[home][other]
    }

    /// Clinics eligible for `home`'s initial assessments, in index order.
    pub fn pooled_with(&self, home: usize) -> Vec<usize> {
        self.matrix[home]
            .iter()
            .enumerate()
            .filter(|(_, &p)| p)
            .map(|(j, _)| j)
            .collect()
    }
}

/// Pre-existing caseload per clinician, in fractional weekly-slot units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseloadTable {
    values: Vec<f64>,
}

impl CaseloadTable {
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(CoreError::Configuration("caseload table is empty".into()));
        }
        if values.iter().any(|v| *v < 0.0 || !v.is_finite()) {
            return Err(CoreError::Configuration(
                "caseload values must be finite and non-negative".into(),
            ));
        }
        Ok(Self { values })
    }

    /// An empty caseload for `clinics` clinicians.
    pub fn zeros(clinics: usize) -> Self {
        Self {
            values: vec![0.0; clinics],
        }
    }

    pub fn clinics(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// The four input tables a scenario is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTables {
    pub shifts: ShiftTable,
    pub referrals: ReferralTable,
    pub pooling: PoolingTable,
    pub caseload: CaseloadTable,
}

impl InputTables {
    pub fn clinics(&self) -> usize {
        self.shifts.clinics()
    }

    /// Check that every table agrees on the clinician count.
    pub fn validate(&self) -> Result<()> {
        let c = self.shifts.clinics();
        for (name, n) in [
            ("referrals", self.referrals.clinics()),
            ("pooling", self.pooling.clinics()),
            ("caseload", self.caseload.clinics()),
        ] {
            if n != c {
                return Err(CoreError::Configuration(format!(
                    "{name} table has {n} clinicians but shifts has {c}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shifts(clinics: usize, slots: u32) -> ShiftTable {
        ShiftTable::new(vec![vec![slots; clinics]; WORKING_DAYS_PER_WEEK]).unwrap()
    }

    #[test]
    fn shift_table_rejects_wrong_row_count() {
        assert!(ShiftTable::new(vec![vec![1, 2]; 4]).is_err());
    }

    #[test]
    fn shift_table_rejects_ragged_rows() {
        let mut rows = vec![vec![1, 2]; WORKING_DAYS_PER_WEEK];
        rows[3] = vec![1];
        assert!(ShiftTable::new(rows).is_err());
    }

    #[test]
    fn weekly_totals_sum_columns() {
        let table = ShiftTable::new(vec![
            vec![1, 0],
            vec![2, 0],
            vec![3, 1],
            vec![0, 1],
            vec![4, 0],
        ])
        .unwrap();
        assert_eq!(table.weekly_totals(), vec![10, 2]);
    }

    #[test]
    fn referral_table_rejects_bad_probabilities() {
        assert!(ReferralTable::new(vec![1.0], vec![1.2]).is_err());
        assert!(ReferralTable::new(vec![-0.5], vec![0.0]).is_err());
        assert!(ReferralTable::new(vec![0.0], vec![0.0]).is_err());
    }

    #[test]
    fn pooling_identity_restricts_to_home() {
        let pooling = PoolingTable::identity(3);
        assert_eq!(pooling.pooled_with(1), vec![1]);
        assert!(!pooling.pooled(0, 2));
    }

    #[test]
    fn pooling_rejects_non_square() {
        assert!(PoolingTable::new(vec![vec![true, false]]).is_err());
    }

    #[test]
    fn validate_catches_clinician_mismatch() {
        let tables = InputTables {
            shifts: shifts(2, 5),
            referrals: ReferralTable::new(vec![1.0], vec![0.0]).unwrap(),
            pooling: PoolingTable::full(2),
            caseload: CaseloadTable::zeros(2),
        };
        assert!(tables.validate().is_err());
    }

    #[test]
    fn tables_round_trip_through_serde() {
        let tables = InputTables {
            shifts: shifts(2, 5),
            referrals: ReferralTable::new(vec![0.6, 0.4], vec![0.1, 0.0]).unwrap(),
            pooling: PoolingTable::identity(2),
            caseload: CaseloadTable::new(vec![1.5, 0.0]).unwrap(),
        };
        let json = serde_json::to_string(&tables).unwrap();
        let back: InputTables = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tables);
    }
}
