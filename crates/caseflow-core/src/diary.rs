//! Forward-dated slot diaries.
//!
//! Three day-indexed grids back the whole booking model: reserved
//! (carve-out) capacity, public capacity and the bookings taken so far.
//! The grids run 1.5x the simulated horizon so patients can always book
//! ahead, and every mutation funnels through [`Diary::reserve`], which
//! keeps the pools non-negative and the bookings ledger consistent.

use crate::error::{CoreError, Result};
use crate::tables::{ShiftTable, WORKING_DAYS_PER_WEEK};

/// Which capacity pool a booking consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPool {
    /// Openly bookable capacity.
    Public,
    /// Capacity reserved for high-priority assessments.
    CarveOut,
}

/// Day-major grid of slot counts, one column per clinician.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGrid {
    days: usize,
    clinics: usize,
    data: Vec<u32>,
}

impl SlotGrid {
    fn zeros(days: usize, clinics: usize) -> Self {
        Self {
            days,
            clinics,
            data: vec![0; days * clinics],
        }
    }

    /// Tile a weekly template down the day axis `repeats` times.
    fn from_template(template: &[Vec<u32>], repeats: usize) -> Self {
        let clinics = template[0].len();
        let mut data = Vec::with_capacity(template.len() * repeats * clinics);
        for _ in 0..repeats {
            for row in template {
                data.extend_from_slice(row);
            }
        }
        Self {
            days: template.len() * repeats,
            clinics,
            data,
        }
    }

    fn idx(&self, day: usize, clinic: usize) -> usize {
        debug_assert!(day < self.days && clinic < self.clinics);
        day * self.clinics + clinic
    }

    pub fn days(&self) -> usize {
        self.days
    }

    pub fn clinics(&self) -> usize {
        self.clinics
    }

    pub fn get(&self, day: usize, clinic: usize) -> u32 {
        self.data[self.idx(day, clinic)]
    }

    fn decrement(&mut self, day: usize, clinic: usize) -> Result<()> {
        let i = self.idx(day, clinic);
        if self.data[i] == 0 {
            return Err(CoreError::Configuration(format!(
                "slot pool underflow at day {day}, clinic {clinic}"
            )));
        }
        self.data[i] -= 1;
        Ok(())
    }

    fn increment(&mut self, day: usize, clinic: usize) {
        let i = self.idx(day, clinic);
        self.data[i] += 1;
    }

    /// Sum over one clinician's column for days in `[from, to)`.
    pub fn column_sum(&self, clinic: usize, from: usize, to: usize) -> u64 {
        (from..to.min(self.days))
            .map(|d| self.get(d, clinic) as u64)
            .sum()
    }

    /// Clone out the rows for days in `[from, to)`.
    pub fn window(&self, from: usize, to: usize) -> Vec<Vec<u32>> {
        (from..to.min(self.days))
            .map(|d| (0..self.clinics).map(|c| self.get(d, c)).collect())
            .collect()
    }
}

/// The shared forward calendar: carve-out and public capacity plus the
/// bookings ledger, all owned together so they can only move in lockstep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diary {
    carve_out: SlotGrid,
    available: SlotGrid,
    bookings: SlotGrid,
}

impl Diary {
    /// Build the diaries from the weekly shift template.
    ///
    /// The carve-out template is `round(slots * prop_carve_out)` per cell
    /// and the public template is its complement; both repeat down the day
    /// axis for `ceil(1.5 * run_length)` days rounded up to whole weeks.
    pub fn new(shifts: &ShiftTable, prop_carve_out: f64, run_length: u32) -> Self {
        let horizon_days = (run_length as usize * 3 + 1) / 2;
        let repeats = horizon_days.div_ceil(WORKING_DAYS_PER_WEEK);

        let carve_template: Vec<Vec<u32>> = shifts
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&slots| (slots as f64 * prop_carve_out).round() as u32)
                    .collect()
            })
            .collect();
        let open_template: Vec<Vec<u32>> = shifts
            .rows()
            .iter()
            .zip(&carve_template)
            .map(|(week, carve)| week.iter().zip(carve).map(|(&w, &c)| w - c).collect())
            .collect();

        let carve_out = SlotGrid::from_template(&carve_template, repeats);
        let available = SlotGrid::from_template(&open_template, repeats);
        let bookings = SlotGrid::zeros(carve_out.days(), carve_out.clinics());
        Self {
            carve_out,
            available,
            bookings,
        }
    }

    pub fn horizon_days(&self) -> usize {
        self.available.days()
    }

    pub fn clinics(&self) -> usize {
        self.available.clinics()
    }

    pub fn carve_out(&self) -> &SlotGrid {
        &self.carve_out
    }

    pub fn available(&self) -> &SlotGrid {
        &self.available
    }

    pub fn bookings(&self) -> &SlotGrid {
        &self.bookings
    }

    /// Consume exactly one unit of the named pool and record the booking.
    ///
    /// This is the only mutation path into the diaries.
    pub fn reserve(&mut self, day: usize, clinic: usize, pool: SlotPool) -> Result<()> {
        match pool {
            SlotPool::Public => self.available.decrement(day, clinic)?,
            SlotPool::CarveOut => self.carve_out.decrement(day, clinic)?,
        }
        self.bookings.increment(day, clinic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ShiftTable;

    fn shifts(clinics: usize, slots: u32) -> ShiftTable {
        ShiftTable::new(vec![vec![slots; clinics]; WORKING_DAYS_PER_WEEK]).unwrap()
    }

    #[test]
    fn horizon_covers_one_and_a_half_runs_in_whole_weeks() {
        let diary = Diary::new(&shifts(1, 4), 0.0, 100);
        assert_eq!(diary.horizon_days(), 150);
        let diary = Diary::new(&shifts(1, 4), 0.0, 7);
        // ceil(10.5) = 11 days, rounded up to 3 weeks.
        assert_eq!(diary.horizon_days(), 15);
    }

    #[test]
    fn carve_out_template_rounds_per_cell() {
        let diary = Diary::new(&shifts(1, 10), 0.25, 10);
        for day in 0..diary.horizon_days() {
            assert_eq!(diary.carve_out().get(day, 0), 3);
            assert_eq!(diary.available().get(day, 0), 7);
        }
    }

    #[test]
    fn zero_carve_out_leaves_all_capacity_public() {
        let diary = Diary::new(&shifts(2, 5), 0.0, 20);
        for day in 0..diary.horizon_days() {
            for clinic in 0..2 {
                assert_eq!(diary.carve_out().get(day, clinic), 0);
                assert_eq!(diary.available().get(day, clinic), 5);
            }
        }
    }

    #[test]
    fn reserve_moves_one_unit_from_the_named_pool() {
        let mut diary = Diary::new(&shifts(1, 4), 0.5, 10);
        diary.reserve(3, 0, SlotPool::Public).unwrap();
        diary.reserve(3, 0, SlotPool::CarveOut).unwrap();
        assert_eq!(diary.available().get(3, 0), 1);
        assert_eq!(diary.carve_out().get(3, 0), 1);
        assert_eq!(diary.bookings().get(3, 0), 2);
    }

    #[test]
    fn reserve_refuses_to_underflow() {
        let mut diary = Diary::new(&shifts(1, 1), 0.0, 10);
        diary.reserve(0, 0, SlotPool::Public).unwrap();
        assert!(diary.reserve(0, 0, SlotPool::Public).is_err());
        assert!(diary.reserve(0, 0, SlotPool::CarveOut).is_err());
    }

    #[test]
    fn bookings_equal_capacity_drawn_down() {
        let initial = Diary::new(&shifts(2, 3), 0.34, 10);
        let mut diary = initial.clone();
        diary.reserve(0, 0, SlotPool::Public).unwrap();
        diary.reserve(0, 0, SlotPool::CarveOut).unwrap();
        diary.reserve(4, 1, SlotPool::Public).unwrap();

        for day in 0..diary.horizon_days() {
            for clinic in 0..2 {
                let drawn = (initial.available().get(day, clinic)
                    - diary.available().get(day, clinic))
                    + (initial.carve_out().get(day, clinic)
                        - diary.carve_out().get(day, clinic));
                assert_eq!(diary.bookings().get(day, clinic), drawn);
            }
        }
    }

    #[test]
    fn window_slices_rows() {
        let diary = Diary::new(&shifts(2, 3), 0.0, 10);
        let window = diary.available().window(2, 5);
        assert_eq!(window.len(), 3);
        assert_eq!(window[0], vec![3, 3]);
    }
}
