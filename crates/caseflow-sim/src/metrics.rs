//! Post-run summarisation.
//!
//! The engine only exposes raw vectors and simple ratios; descriptive
//! statistics beyond that are a reporting-boundary responsibility.

use serde::Serialize;

use caseflow_core::{Diary, Priority};

use crate::pathway::PatientPathway;

/// Waiting-time target for high-priority assessments, in working days.
pub const TARGET_HIGH: f64 = 5.0;
/// Waiting-time target for low-priority assessments, in working days.
pub const TARGET_LOW: f64 = 20.0;

/// Assessment waiting times of the run, partitioned by priority.
///
/// Only patients who attended their assessment appear; patients still
/// waiting at clock exhaustion have no waiting time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaitingTimeResults {
    pub all: Vec<f64>,
    pub low_priority: Vec<f64>,
    pub high_priority: Vec<f64>,
}

impl WaitingTimeResults {
    /// Partition waits from completed pathways, skipping anyone who
    /// arrived during warm-up.
    pub(crate) fn from_pathways<'a>(
        pathways: impl Iterator<Item = &'a PatientPathway>,
    ) -> Self {
        let mut results = Self::default();
        for pathway in pathways {
            if !pathway.collectable() {
                continue;
            }
            let Some(wait) = pathway.waiting_time() else {
                continue;
            };
            results.all.push(wait);
            match pathway.priority() {
                Priority::Low => results.low_priority.push(wait),
                Priority::High => results.high_priority.push(wait),
            }
        }
        results
    }

    /// Share of each priority's waits at or under its target, if any
    /// patients attended.
    pub fn within_target(&self) -> TargetAttainment {
        TargetAttainment {
            low_priority: share_within(&self.low_priority, TARGET_LOW),
            high_priority: share_within(&self.high_priority, TARGET_HIGH),
        }
    }
}

/// Proportion of attended assessments within the waiting-time targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetAttainment {
    pub low_priority: Option<f64>,
    pub high_priority: Option<f64>,
}

fn share_within(waits: &[f64], target: f64) -> Option<f64> {
    if waits.is_empty() {
        return None;
    }
    let hit = waits.iter().filter(|&&w| w <= target).count();
    Some(hit as f64 / waits.len() as f64)
}

/// Arithmetic mean, or `None` for an empty vector.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Per-clinician slot utilisation over days `[from, to)`: bookings taken
/// as a share of the capacity that was on the books.
pub fn slot_utilisation(diary: &Diary, from: usize, to: usize) -> Vec<f64> {
    (0..diary.clinics())
        .map(|clinic| {
            let booked = diary.bookings().column_sum(clinic, from, to) as f64;
            let open = diary.available().column_sum(clinic, from, to) as f64;
            if booked + open == 0.0 {
                0.0
            } else {
                booked / (booked + open)
            }
        })
        .collect()
}
