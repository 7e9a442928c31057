//! The ordered event log.
//!
//! Every pathway step appends one typed record; the log's order is the
//! virtual-time execution order and, given identical seeds and inputs, is
//! byte-identical across runs. Downstream consumers (dashboards, frame
//! builders) read it as JSON lines.

use serde::Serialize;

use caseflow_core::{Intensity, Priority};

/// Which pathway a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathwayLabel {
    /// Accepted referral, triaged low priority (pathway 1).
    LowPriority,
    /// Accepted referral, triaged high priority (pathway 2).
    HighPriority,
    /// Triaged as unsuitable and referred out of the service.
    ReferredOut,
}

impl From<Priority> for PathwayLabel {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => PathwayLabel::LowPriority,
            Priority::High => PathwayLabel::HighPriority,
        }
    }
}

/// Broad class of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    ArrivalDeparture,
    Queue,
}

/// The specific step a record marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Arrival,
    WaitingAppointmentToBeScheduled,
    AppointmentBookedWaiting,
    HaveAppointment,
    FollowUpAppointmentBookedWaiting,
    ReferredOut,
    Depart,
}

impl EventKind {
    pub fn class(&self) -> EventClass {
        match self {
            EventKind::Arrival | EventKind::Depart => EventClass::ArrivalDeparture,
            EventKind::WaitingAppointmentToBeScheduled
            | EventKind::AppointmentBookedWaiting
            | EventKind::HaveAppointment
            | EventKind::FollowUpAppointmentBookedWaiting
            | EventKind::ReferredOut => EventClass::Queue,
        }
    }
}

/// Whether an attended appointment was the assessment or a follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Assessment,
    FollowUp,
}

/// One row of the event log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub patient: String,
    pub pathway: PathwayLabel,
    pub event_type: EventClass,
    pub event: EventKind,
    pub home_clinic: usize,
    /// Virtual time in days.
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_clinic: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<AppointmentType>,
    /// Days from referral to assessment, recorded on attendance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<f64>,
    /// Days since the previous appointment, for follow-ups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<f64>,
    /// Zero-based index of a follow-up appointment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_intensity: Option<Intensity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_ups_intended: Option<u32>,
}

impl EventRecord {
    /// A bare record with every optional field unset.
    pub fn new(
        patient: impl Into<String>,
        pathway: PathwayLabel,
        event: EventKind,
        home_clinic: usize,
        time: f64,
    ) -> Self {
        Self {
            patient: patient.into(),
            pathway,
            event_type: event.class(),
            event,
            home_clinic,
            time,
            booked_clinic: None,
            appointment_type: None,
            wait: None,
            interval: None,
            follow_up: None,
            follow_up_intensity: None,
            follow_ups_intended: None,
        }
    }
}

/// Append-only record of everything that happened, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: EventRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records for one patient, in execution order.
    pub fn for_patient<'a>(&'a self, patient: &'a str) -> impl Iterator<Item = &'a EventRecord> {
        self.records.iter().filter(move |r| r.patient == patient)
    }

    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.event == kind)
    }

    /// Serialise the log as JSON lines, one record per line.
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&serde_json::to_string(record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_their_class() {
        assert_eq!(EventKind::Arrival.class(), EventClass::ArrivalDeparture);
        assert_eq!(EventKind::Depart.class(), EventClass::ArrivalDeparture);
        assert_eq!(EventKind::ReferredOut.class(), EventClass::Queue);
        assert_eq!(EventKind::HaveAppointment.class(), EventClass::Queue);
    }

    #[test]
    fn json_lines_omit_unset_fields() {
        let mut log = EventLog::new();
        log.push(EventRecord::new(
            "0_0",
            PathwayLabel::LowPriority,
            EventKind::Arrival,
            1,
            0.0,
        ));
        let lines = log.to_json_lines().unwrap();
        assert!(lines.contains("\"arrival\""));
        assert!(lines.contains("\"arrival_departure\""));
        assert!(!lines.contains("booked_clinic"));
        assert!(!lines.contains("interval"));
    }

    #[test]
    fn patient_filter_preserves_order() {
        let mut log = EventLog::new();
        for (id, kind) in [
            ("0_0", EventKind::Arrival),
            ("0_1", EventKind::Arrival),
            ("0_0", EventKind::Depart),
        ] {
            log.push(EventRecord::new(
                id,
                PathwayLabel::LowPriority,
                kind,
                0,
                0.0,
            ));
        }
        let kinds: Vec<EventKind> = log.for_patient("0_0").map(|r| r.event).collect();
        assert_eq!(kinds, vec![EventKind::Arrival, EventKind::Depart]);
    }
}
