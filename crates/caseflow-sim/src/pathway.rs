//! Patient pathway processes.
//!
//! Each accepted referral runs one `PatientPathway`: a state machine the
//! kernel resumes at its scheduled wake times. Everything between two
//! suspensions executes atomically, so a find/book pair can never observe
//! the diary half-mutated.

use anyhow::Result;
use tracing::debug;

use caseflow_core::{
    Booker, Intensity, Priority, Scenario, HIGH_INTENSITY_FOLLOW_UP_TARGET_INTERVAL,
    LOW_INTENSITY_FOLLOW_UP_TARGET_INTERVAL,
};

use crate::events::{AppointmentType, EventKind, EventLog, EventRecord, PathwayLabel};

/// Where a pathway is between suspensions.
#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Not yet started; the first resume logs the arrival.
    Created,
    /// Low priority, waiting for caseload headroom. `first_check` marks
    /// the check right after the anti-leapfrog day, which runs with the
    /// minimum wait shortened by one.
    AwaitingAdmission { first_check: bool },
    /// Booked; suspended until the assessment day.
    WaitingAssessment { appointment_day: usize },
    /// Suspended until follow-up `index`, booked `interval` days out.
    FollowUpWait {
        index: u32,
        intended: u32,
        interval: f64,
    },
    /// Discharged (or abandoned at clock exhaustion).
    Done,
}

/// One patient's journey from referral to discharge.
#[derive(Debug, Clone)]
pub struct PatientPathway {
    identifier: String,
    referral_t: usize,
    home_clinic: usize,
    booked_clinic: usize,
    priority: Priority,
    /// The assessment booker at first; swapped for a repeat booker once
    /// follow-ups begin.
    booker: Booker,
    state: State,
    waiting_time: Option<f64>,
    follow_up_intensity: Option<Intensity>,
    collect: bool,
}

impl PatientPathway {
    /// `collect` marks patients that arrived after the warm-up period and
    /// therefore count towards the run's results.
    pub fn new(
        identifier: String,
        referral_t: usize,
        home_clinic: usize,
        booker: Booker,
        collect: bool,
    ) -> Self {
        Self {
            identifier,
            referral_t,
            home_clinic,
            booked_clinic: home_clinic,
            priority: booker.priority(),
            booker,
            state: State::Created,
            waiting_time: None,
            follow_up_intensity: None,
            collect,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Triage priority, fixed when the kernel attached the assessment
    /// booker.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn waiting_time(&self) -> Option<f64> {
        self.waiting_time
    }

    pub fn collectable(&self) -> bool {
        self.collect
    }

    fn event(&self, kind: EventKind, time: f64) -> EventRecord {
        EventRecord::new(
            self.identifier.clone(),
            PathwayLabel::from(self.priority()),
            kind,
            self.home_clinic,
            time,
        )
    }

    /// Advance the pathway at virtual time `now`.
    ///
    /// Returns `Some(delay)` to be resumed `delay` days later, or `None`
    /// once the patient has departed.
    pub fn resume(
        &mut self,
        now: f64,
        scenario: &mut Scenario,
        log: &mut EventLog,
    ) -> Result<Option<f64>> {
        match self.state {
            State::Created => self.start(now, scenario, log),
            State::AwaitingAdmission { first_check } => {
                self.check_admission(now, first_check, scenario, log)
            }
            State::WaitingAssessment { appointment_day } => {
                self.attend_assessment(now, appointment_day, scenario, log)
            }
            State::FollowUpWait {
                index,
                intended,
                interval,
            } => self.attend_follow_up(now, index, intended, interval, scenario, log),
            State::Done => Ok(None),
        }
    }

    fn start(
        &mut self,
        now: f64,
        scenario: &mut Scenario,
        log: &mut EventLog,
    ) -> Result<Option<f64>> {
        log.push(self.event(EventKind::Arrival, now));
        log.push(self.event(EventKind::WaitingAppointmentToBeScheduled, now));

        match self.priority() {
            // High priority books the next available slot outright, however
            // far ahead it is.
            Priority::High => {
                let (day, clinic) =
                    self.booker
                        .find_slot(scenario, self.referral_t, self.home_clinic, None)?;
                self.booker.book_slot(scenario, day, clinic)?;
                self.booked_clinic = clinic;

                let mut record = self.event(EventKind::AppointmentBookedWaiting, now);
                record.booked_clinic = Some(clinic);
                log.push(record);

                self.state = State::WaitingAssessment {
                    appointment_day: day,
                };
                Ok(Some(day as f64 - now))
            }
            // Low priority waits a day first so patients already in the
            // admission queue re-check before today's arrivals compete for
            // the same headroom.
            Priority::Low => {
                self.state = State::AwaitingAdmission { first_check: true };
                Ok(Some(1.0))
            }
        }
    }

    fn check_admission(
        &mut self,
        now: f64,
        first_check: bool,
        scenario: &mut Scenario,
        log: &mut EventLog,
    ) -> Result<Option<f64>> {
        if first_check {
            // Offset the anti-leapfrog day so the effective wait from
            // referral is unchanged.
            self.booker.set_min_wait(self.booker.min_wait() - 1);
        }

        let mask = scenario.headroom_mask();
        if !mask.iter().any(|&m| m) {
            if first_check {
                self.booker.set_min_wait(self.booker.min_wait() + 1);
            }
            debug!(
                patient = %self.identifier,
                day = now,
                "no caseload headroom, checking again tomorrow"
            );
            self.state = State::AwaitingAdmission { first_check: false };
            return Ok(Some(1.0));
        }

        // On the first check the search window is anchored at the referral
        // day; after waiting for headroom it starts from today.
        let from_day = if first_check {
            self.referral_t
        } else {
            now as usize
        };
        let (day, clinic) = self
            .booker
            .find_slot(scenario, from_day, self.home_clinic, Some(&mask))?;
        self.booker.book_slot(scenario, day, clinic)?;
        self.booked_clinic = clinic;

        let mut record = self.event(EventKind::AppointmentBookedWaiting, now);
        record.booked_clinic = Some(clinic);
        log.push(record);

        // The patient now counts towards the clinician's caseload; the
        // estimate is reconciled once intensity is known.
        scenario.adjust_caseload(clinic, 1.0);

        self.state = State::WaitingAssessment {
            appointment_day: day,
        };
        Ok(Some(day as f64 - now))
    }

    fn attend_assessment(
        &mut self,
        now: f64,
        appointment_day: usize,
        scenario: &mut Scenario,
        log: &mut EventLog,
    ) -> Result<Option<f64>> {
        let wait = appointment_day as f64 - self.referral_t as f64;
        self.waiting_time = Some(wait);

        let mut record = self.event(EventKind::HaveAppointment, now);
        record.booked_clinic = Some(self.booked_clinic);
        record.appointment_type = Some(AppointmentType::Assessment);
        record.wait = Some(wait);
        log.push(record);

        if !scenario.sample_follow_up_needed(self.priority()) {
            // Low-priority patients joined the caseload at booking and
            // leave it on discharge when no ongoing work materialises.
            if self.priority() == Priority::Low {
                scenario.adjust_caseload(self.booked_clinic, -1.0);
            }
            return self.depart(now, log);
        }

        let intensity = scenario.sample_intensity(self.priority());
        self.follow_up_intensity = Some(intensity);

        // The admission estimate assumed high priority -> high intensity
        // and low priority -> low intensity; correct the half-unit error
        // where the sample went the other way.
        match (self.priority(), intensity) {
            (Priority::High, Intensity::Low) => {
                scenario.adjust_caseload(self.booked_clinic, -0.5)
            }
            (Priority::Low, Intensity::High) => {
                scenario.adjust_caseload(self.booked_clinic, 0.5)
            }
            _ => {}
        }

        let intended = scenario.sample_num_follow_ups(intensity);
        let ideal_frequency = match intensity {
            Intensity::High => HIGH_INTENSITY_FOLLOW_UP_TARGET_INTERVAL,
            Intensity::Low => LOW_INTENSITY_FOLLOW_UP_TARGET_INTERVAL,
        };
        self.booker = Booker::repeat(ideal_frequency, self.booked_clinic);

        if intended == 0 {
            self.release_caseload(scenario);
            return self.depart(now, log);
        }
        self.book_follow_up(0, intended, now, scenario, log)
    }

    fn attend_follow_up(
        &mut self,
        now: f64,
        index: u32,
        intended: u32,
        interval: f64,
        scenario: &mut Scenario,
        log: &mut EventLog,
    ) -> Result<Option<f64>> {
        let mut record = self.event(EventKind::HaveAppointment, now);
        record.booked_clinic = Some(self.booked_clinic);
        record.appointment_type = Some(AppointmentType::FollowUp);
        record.interval = Some(interval);
        record.follow_up = Some(index);
        record.follow_up_intensity = self.follow_up_intensity;
        record.follow_ups_intended = Some(intended);
        log.push(record);

        let next = index + 1;
        if next < intended {
            self.book_follow_up(next, intended, now, scenario, log)
        } else {
            self.release_caseload(scenario);
            self.depart(now, log)
        }
    }

    fn book_follow_up(
        &mut self,
        index: u32,
        intended: u32,
        now: f64,
        scenario: &mut Scenario,
        log: &mut EventLog,
    ) -> Result<Option<f64>> {
        let (day, clinic) =
            self.booker
                .find_slot(scenario, now as usize, self.booked_clinic, None)?;
        self.booker.book_slot(scenario, day, clinic)?;

        let mut record = self.event(EventKind::FollowUpAppointmentBookedWaiting, now);
        record.booked_clinic = Some(self.booked_clinic);
        record.follow_up = Some(index);
        record.follow_up_intensity = self.follow_up_intensity;
        record.follow_ups_intended = Some(intended);
        log.push(record);

        let interval = day as f64 - now;
        self.state = State::FollowUpWait {
            index,
            intended,
            interval,
        };
        Ok(Some(interval))
    }

    /// Remove the patient's ongoing load on discharge, by sampled
    /// intensity.
    fn release_caseload(&self, scenario: &mut Scenario) {
        if let Some(intensity) = self.follow_up_intensity {
            scenario.adjust_caseload(self.booked_clinic, -intensity.caseload_units());
        }
    }

    fn depart(&mut self, now: f64, log: &mut EventLog) -> Result<Option<f64>> {
        log.push(self.event(EventKind::Depart, now + 1.0));
        self.state = State::Done;
        Ok(None)
    }
}
