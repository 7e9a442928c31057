//! Booking strategies over the shared diary.
//!
//! Three strategies share one contract: `find_slot` scans the forward
//! window for the earliest bookable day and `book_slot` consumes exactly
//! one capacity unit for it. Which pool gets consumed, how long the
//! minimum wait is and which clinicians are eligible is what tells the
//! strategies apart.

use tracing::warn;

use crate::diary::SlotPool;
use crate::error::{CoreError, Result};
use crate::scenario::Scenario;

/// Days a low-priority patient must wait before an assessment slot.
pub const LOW_PRIORITY_MIN_WAIT: usize = 7;
/// Days a high-priority patient must wait before an assessment slot.
pub const HIGH_PRIORITY_MIN_WAIT: usize = 1;
/// Target days between follow-ups for high-intensity patients.
pub const HIGH_INTENSITY_FOLLOW_UP_TARGET_INTERVAL: usize = 7;
/// Target days between follow-ups for low-intensity patients.
pub const LOW_INTENSITY_FOLLOW_UP_TARGET_INTERVAL: usize = 14;
/// Bookings further ahead than this are flagged in the log; the books are
/// getting too full for the service's liking.
pub const BOOKING_TIME_THRESHOLD: usize = 28;

/// Triage priority of a patient pathway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    Low,
    High,
}

impl Priority {
    /// Numeric pathway label used in the event log (1 = low, 2 = high).
    pub fn pathway(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::High => 2,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::High),
            other => Err(CoreError::UnknownPriority(other)),
        }
    }
}

/// Which booking strategy a [`Booker`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookerKind {
    /// Pooled assessment booking from public capacity only.
    LowPriorityPooled,
    /// Pooled assessment booking from carve-out capacity first.
    HighPriorityPooled,
    /// Follow-up booking pinned to the assessing clinician.
    Repeat { clinic: usize },
}

impl BookerKind {
    fn label(&self) -> &'static str {
        match self {
            BookerKind::LowPriorityPooled => "low-priority pooled",
            BookerKind::HighPriorityPooled => "high-priority pooled",
            BookerKind::Repeat { .. } => "repeat",
        }
    }
}

/// A booking strategy plus its current minimum wait.
///
/// `min_wait` is mutable because the anti-leapfrog rule briefly shortens
/// it by one day; each pathway owns its booker, so the adjustment is never
/// observed by another patient.
#[derive(Debug, Clone)]
pub struct Booker {
    kind: BookerKind,
    min_wait: usize,
}

impl Booker {
    pub fn low_priority_pooled() -> Self {
        Self {
            kind: BookerKind::LowPriorityPooled,
            min_wait: LOW_PRIORITY_MIN_WAIT,
        }
    }

    pub fn high_priority_pooled() -> Self {
        Self {
            kind: BookerKind::HighPriorityPooled,
            min_wait: HIGH_PRIORITY_MIN_WAIT,
        }
    }

    /// Repeat booker pinned to `clinic`, aiming for one appointment every
    /// `ideal_frequency` days. The minimum wait is one day fewer so a
    /// slot on the target cadence itself is bookable.
    pub fn repeat(ideal_frequency: usize, clinic: usize) -> Self {
        Self {
            kind: BookerKind::Repeat { clinic },
            min_wait: ideal_frequency - 1,
        }
    }

    /// The assessment booker matching a triage priority.
    pub fn for_priority(priority: Priority) -> Self {
        match priority {
            Priority::Low => Self::low_priority_pooled(),
            Priority::High => Self::high_priority_pooled(),
        }
    }

    pub fn kind(&self) -> BookerKind {
        self.kind
    }

    pub fn min_wait(&self) -> usize {
        self.min_wait
    }

    pub fn set_min_wait(&mut self, min_wait: usize) {
        self.min_wait = min_wait;
    }

    /// Priority of the patients this booker books for. Repeat bookings
    /// are low priority: carve-out stays reserved for assessments.
    pub fn priority(&self) -> Priority {
        match self.kind {
            BookerKind::HighPriorityPooled => Priority::High,
            BookerKind::LowPriorityPooled | BookerKind::Repeat { .. } => Priority::Low,
        }
    }

    /// Capacity visible to this strategy on `(day, clinic)`.
    fn day_capacity(&self, scenario: &Scenario, day: usize, clinic: usize) -> u32 {
        let public = scenario.diary().available().get(day, clinic);
        match self.kind {
            BookerKind::HighPriorityPooled => {
                public + scenario.diary().carve_out().get(day, clinic)
            }
            BookerKind::LowPriorityPooled | BookerKind::Repeat { .. } => public,
        }
    }

    /// Find the earliest bookable `(day, clinic)` at or after
    /// `from_day + min_wait`.
    ///
    /// For the pooled strategies the eligible set is the pooling row of
    /// `home_clinic`, further restricted by `mask` when given; ties on the
    /// best day are broken uniformly at random. The repeat strategy
    /// ignores pooling and sticks to its pinned clinician.
    pub fn find_slot(
        &self,
        scenario: &mut Scenario,
        from_day: usize,
        home_clinic: usize,
        mask: Option<&[bool]>,
    ) -> Result<(usize, usize)> {
        let start = from_day + self.min_wait;
        let horizon = scenario.diary().horizon_days();

        let found = match self.kind {
            BookerKind::Repeat { clinic } => (start..horizon)
                .find(|&day| self.day_capacity(scenario, day, clinic) > 0)
                .map(|day| (day, clinic)),
            BookerKind::LowPriorityPooled | BookerKind::HighPriorityPooled => {
                let eligible: Vec<usize> = scenario
                    .pooled_with(home_clinic)
                    .into_iter()
                    .filter(|&c| mask.map_or(true, |m| m[c]))
                    .collect();
                let mut hit = None;
                for day in start..horizon {
                    let open: Vec<usize> = eligible
                        .iter()
                        .copied()
                        .filter(|&c| self.day_capacity(scenario, day, c) > 0)
                        .collect();
                    if !open.is_empty() {
                        let pick = scenario.tie_break_index(open.len());
                        hit = Some((day, open[pick]));
                        break;
                    }
                }
                hit
            }
        };

        let (day, clinic) = found.ok_or(CoreError::CapacityExhausted {
            day: start,
            clinic: home_clinic,
            booker: self.kind.label(),
        })?;

        if day - from_day > BOOKING_TIME_THRESHOLD {
            warn!(
                day,
                clinic,
                wait = day - from_day,
                booker = self.kind.label(),
                "booking beyond the forward threshold"
            );
        }
        Ok((day, clinic))
    }

    /// Consume one capacity unit for the booking found by `find_slot`.
    ///
    /// The high-priority strategy spends carve-out first and falls back to
    /// public capacity; the others never touch carve-out.
    pub fn book_slot(&self, scenario: &mut Scenario, day: usize, clinic: usize) -> Result<()> {
        let pool = match self.kind {
            BookerKind::HighPriorityPooled
                if scenario.diary().carve_out().get(day, clinic) > 0 =>
            {
                SlotPool::CarveOut
            }
            _ => SlotPool::Public,
        };
        scenario.reserve(day, clinic, pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScenarioConfig;
    use crate::tables::{
        CaseloadTable, InputTables, PoolingTable, ReferralTable, ShiftTable,
        WORKING_DAYS_PER_WEEK,
    };

    fn scenario(clinics: usize, slots: u32, prop_carve_out: f64) -> Scenario {
        let tables = InputTables {
            shifts: ShiftTable::new(vec![vec![slots; clinics]; WORKING_DAYS_PER_WEEK]).unwrap(),
            referrals: ReferralTable::new(
                vec![1.0 / clinics as f64; clinics],
                vec![0.0; clinics],
            )
            .unwrap(),
            pooling: PoolingTable::full(clinics),
            caseload: CaseloadTable::zeros(clinics),
        };
        let mut config = ScenarioConfig::new(40);
        config.prop_carve_out = prop_carve_out;
        Scenario::new(&config, tables).unwrap()
    }

    #[test]
    fn priority_maps_to_pathway_labels() {
        assert_eq!(Priority::Low.pathway(), 1);
        assert_eq!(Priority::High.pathway(), 2);
        assert_eq!(Priority::try_from(2).unwrap(), Priority::High);
        assert!(matches!(
            Priority::try_from(3),
            Err(CoreError::UnknownPriority(3))
        ));
    }

    #[test]
    fn low_priority_waits_a_full_week() {
        let mut s = scenario(1, 5, 0.0);
        let booker = Booker::low_priority_pooled();
        let (day, clinic) = booker.find_slot(&mut s, 3, 0, None).unwrap();
        assert_eq!(day, 10);
        assert_eq!(clinic, 0);
    }

    #[test]
    fn high_priority_books_next_day() {
        let mut s = scenario(1, 5, 0.0);
        let booker = Booker::high_priority_pooled();
        let (day, _) = booker.find_slot(&mut s, 3, 0, None).unwrap();
        assert_eq!(day, 4);
    }

    #[test]
    fn low_priority_cannot_see_carve_out() {
        // All capacity carved out: nothing is visible to the public pool.
        let mut s = scenario(1, 4, 1.0);
        let low = Booker::low_priority_pooled();
        assert!(matches!(
            low.find_slot(&mut s, 0, 0, None),
            Err(CoreError::CapacityExhausted { .. })
        ));
        let high = Booker::high_priority_pooled();
        assert!(high.find_slot(&mut s, 0, 0, None).is_ok());
    }

    #[test]
    fn high_priority_spends_carve_out_first() {
        let mut s = scenario(1, 4, 0.5);
        let booker = Booker::high_priority_pooled();
        let (day, clinic) = booker.find_slot(&mut s, 0, 0, None).unwrap();
        let carve_before = s.diary().carve_out().get(day, clinic);
        booker.book_slot(&mut s, day, clinic).unwrap();
        assert_eq!(s.diary().carve_out().get(day, clinic), carve_before - 1);

        // Drain the carve-out pool; the next booking falls back to public.
        booker.book_slot(&mut s, day, clinic).unwrap();
        let public_before = s.diary().available().get(day, clinic);
        booker.book_slot(&mut s, day, clinic).unwrap();
        assert_eq!(s.diary().available().get(day, clinic), public_before - 1);
    }

    #[test]
    fn low_priority_booking_never_touches_carve_out() {
        let mut s = scenario(1, 4, 0.5);
        let booker = Booker::low_priority_pooled();
        let (day, clinic) = booker.find_slot(&mut s, 0, 0, None).unwrap();
        let carve_before = s.diary().carve_out().get(day, clinic);
        booker.book_slot(&mut s, day, clinic).unwrap();
        assert_eq!(s.diary().carve_out().get(day, clinic), carve_before);
        assert_eq!(s.diary().bookings().get(day, clinic), 1);
    }

    #[test]
    fn mask_restricts_the_pooled_set() {
        let mut s = scenario(3, 2, 0.0);
        let booker = Booker::low_priority_pooled();
        let mask = vec![false, true, false];
        for _ in 0..20 {
            let (_, clinic) = booker.find_slot(&mut s, 0, 0, Some(&mask)).unwrap();
            assert_eq!(clinic, 1);
        }
    }

    #[test]
    fn fully_masked_set_is_capacity_exhausted() {
        let mut s = scenario(2, 2, 0.0);
        let booker = Booker::low_priority_pooled();
        let mask = vec![false, false];
        assert!(matches!(
            booker.find_slot(&mut s, 0, 0, Some(&mask)),
            Err(CoreError::CapacityExhausted { .. })
        ));
    }

    #[test]
    fn repeat_booker_sticks_to_its_clinician() {
        let mut s = scenario(3, 2, 0.0);
        let booker = Booker::repeat(HIGH_INTENSITY_FOLLOW_UP_TARGET_INTERVAL, 2);
        let (day, clinic) = booker.find_slot(&mut s, 10, 0, None).unwrap();
        assert_eq!(clinic, 2);
        assert_eq!(day, 16);
        assert_eq!(booker.priority(), Priority::Low);
    }

    #[test]
    fn repeat_booker_reports_exhaustion_instead_of_day_zero() {
        let mut s = scenario(1, 1, 0.0);
        let booker = Booker::repeat(7, 0);
        // Book out the entire forward horizon.
        for day in 6..s.diary().horizon_days() {
            s.reserve(day, 0, SlotPool::Public).unwrap();
        }
        assert!(matches!(
            booker.find_slot(&mut s, 0, 0, None),
            Err(CoreError::CapacityExhausted { day: 6, clinic: 0, .. })
        ));
    }

    #[test]
    fn tie_break_is_deterministic_under_a_fixed_seed() {
        let picks_a: Vec<usize> = {
            let mut s = scenario(3, 2, 0.0);
            let booker = Booker::low_priority_pooled();
            (0..10)
                .map(|_| booker.find_slot(&mut s, 0, 0, None).unwrap().1)
                .collect()
        };
        let picks_b: Vec<usize> = {
            let mut s = scenario(3, 2, 0.0);
            let booker = Booker::low_priority_pooled();
            (0..10)
                .map(|_| booker.find_slot(&mut s, 0, 0, None).unwrap().1)
                .collect()
        };
        assert_eq!(picks_a, picks_b);
    }
}
