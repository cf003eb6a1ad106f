//! Display projections of the solver's wire records, plus the transforms
//! between the two.
//!
//! The transforms are deliberately asymmetric: `display_trains` drops
//! priority and planned departure, and `solver_state` fabricates them back
//! as constants with a fixed section topology. Round-tripping does not
//! reproduce the original record; that asymmetry is specified behavior.

use chrono::prelude::*;
use chrono::Duration;
use serde_derive::{Serialize, Deserialize};

use crate::wire::{TrainRecord, SectionRecord, NetworkState, PredictedConflict};

/// Display status of a train.
///
/// `Conflict` exists in the display vocabulary but is never produced by
/// `display_trains`: conflicts are a separate list, not a train status.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainStatus {
    #[serde(rename = "on-time")]
    OnTime,
    #[serde(rename = "delayed")]
    Delayed,
    #[serde(rename = "conflict")]
    Conflict
}

/// A train as the dashboard renders it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DisplayTrain {
    pub id: String,
    /// Human-readable name ("Train T1").
    pub name: String,
    pub status: TrainStatus,
    /// Section the train is currently in.
    pub current_location: String,
    /// Next section on the route.
    pub next_station: String,
    pub delay_minutes: i64,
    /// Absolute arrival estimate, computed from `due_time` at transform time.
    pub eta: DateTime<Utc>
}

/// Conflict severity. Invented dashboard-side from the lead time; the
/// solver doesn't classify conflicts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High
}
impl Severity {
    /// Conflicts closer than this many minutes are High.
    pub const HIGH_WITHIN_MINS: f64 = 5.0;
    /// Conflicts closer than this many minutes (but not High) are Medium.
    pub const MEDIUM_WITHIN_MINS: f64 = 15.0;
    pub fn from_lead_time(mins: f64) -> Self {
        if mins < Self::HIGH_WITHIN_MINS {
            Severity::High
        }
        else if mins < Self::MEDIUM_WITHIN_MINS {
            Severity::Medium
        }
        else {
            Severity::Low
        }
    }
}

/// A predicted conflict as the dashboard renders it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DisplayConflict {
    pub train_ids: Vec<String>,
    /// Section id where the conflict is predicted.
    pub location: String,
    /// Minutes until the predicted conflict.
    pub time_to_conflict: f64,
    pub severity: Severity,
    /// Templated suggestion text. Not solver output.
    pub resolution: String
}

/// Fallback location for a train with an empty route.
pub static LOCATION_DEPOT: &str = "DEPOT";
/// Fallback next station for a train on its last section.
pub static LOCATION_TERMINUS: &str = "TERMINUS";

/// Projects solver train records into display records.
///
/// Status is derived solely from the delay: positive delay minutes means
/// `Delayed`, anything else `OnTime`. The ETA is `now + due_time`, so two
/// transforms of the same snapshot at different times yield different ETAs;
/// `now` is a parameter so callers (and tests) can see that drift.
pub fn display_trains(trains: &[TrainRecord], now: DateTime<Utc>) -> Vec<DisplayTrain> {
    trains.iter().map(|t| {
        let delay = t.current_delay_minutes.unwrap_or(0);
        let status = if delay > 0 { TrainStatus::Delayed } else { TrainStatus::OnTime };
        DisplayTrain {
            id: t.id.clone(),
            name: format!("Train {}", t.id),
            status,
            current_location: t.route_sections.get(0).cloned()
                .unwrap_or_else(|| LOCATION_DEPOT.into()),
            next_station: t.route_sections.get(1).cloned()
                .unwrap_or_else(|| LOCATION_TERMINUS.into()),
            delay_minutes: delay,
            eta: now + Duration::seconds(t.due_time.unwrap_or(0.0) as i64)
        }
    }).collect()
}

/// Projects predicted conflicts into display records, widening them with a
/// severity label and a suggestion string naming every involved train.
pub fn display_conflicts(conflicts: &[PredictedConflict]) -> Vec<DisplayConflict> {
    conflicts.iter().map(|c| {
        let resolution = match c.train_ids.split_first() {
            None => format!("No trains identified for section {}", c.section_id),
            Some((lead, rest)) if rest.is_empty() => {
                format!("Review the pathing of {} through {}", lead, c.section_id)
            },
            Some((lead, rest)) => {
                format!("Hold {} at the approach to {} and let {} run through first",
                        rest.join(" and "), c.section_id, lead)
            }
        };
        DisplayConflict {
            train_ids: c.train_ids.clone(),
            location: c.section_id.clone(),
            time_to_conflict: c.predicted_conflict_time,
            severity: Severity::from_lead_time(c.predicted_conflict_time),
            resolution
        }
    }).collect()
}

/// Section topology used for every outbound state. The dashboard doesn't
/// track real topology; the solver ignores it for the calls we make.
pub static OUTBOUND_SECTIONS: [&str; 3] = ["S1", "S2", "S3"];

/// Reconstructs a solver-shaped state from display trains.
///
/// This is the lossy reverse transform: fabricated constants via
/// `TrainRecord::outbound`, and always the fixed `OUTBOUND_SECTIONS`
/// topology with capacity 1, regardless of the input trains.
pub fn solver_state(trains: &[DisplayTrain]) -> NetworkState {
    let trains = trains.iter().map(|t| {
        TrainRecord::outbound(
            t.id.clone(),
            vec![t.current_location.clone(), t.next_station.clone()],
            t.delay_minutes
        )
    }).collect();
    let sections = OUTBOUND_SECTIONS.iter().map(|id| SectionRecord {
        id: (*id).into(),
        platform_capacity: Some(1),
        conflicts_with: None
    }).collect();
    NetworkState { trains, sections }
}

/// Maps display conflicts back to the wire shape for `/resolve`.
pub fn wire_conflicts(conflicts: &[DisplayConflict]) -> Vec<PredictedConflict> {
    conflicts.iter().map(|c| PredictedConflict {
        train_ids: c.train_ids.clone(),
        section_id: c.location.clone(),
        predicted_conflict_time: c.time_to_conflict
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train(id: &str, sections: &[&str], delay: Option<i64>, due: Option<f64>) -> TrainRecord {
        TrainRecord {
            id: id.into(),
            priority: 3,
            planned_departure: 120.0,
            route_sections: sections.iter().map(|s| (*s).to_string()).collect(),
            due_time: due,
            current_delay_minutes: delay
        }
    }

    #[test]
    fn delayed_train_projection() {
        let now = Utc.ymd(2019, 6, 1).and_hms(12, 0, 0);
        let out = display_trains(&[train("T1", &["S1", "S2"], Some(7), Some(600.0))], now);
        assert_eq!(out.len(), 1);
        let t = &out[0];
        assert_eq!(t.id, "T1");
        assert_eq!(t.status, TrainStatus::Delayed);
        assert_eq!(t.delay_minutes, 7);
        assert_eq!(t.current_location, "S1");
        assert_eq!(t.next_station, "S2");
        assert_eq!(t.eta, now + Duration::seconds(600));
    }
    #[test]
    fn status_never_conflict() {
        // Status only ever reflects the delay; the conflict list is separate.
        let now = Utc::now();
        let trains = vec![
            train("T1", &["S1"], Some(0), None),
            train("T2", &["S1", "S2"], Some(-3), None),
            train("T3", &[], None, Some(60.0)),
            train("T4", &["S2", "S3", "S1"], Some(120), None),
        ];
        for t in display_trains(&trains, now) {
            assert!(t.status == TrainStatus::OnTime || t.status == TrainStatus::Delayed,
                    "train {} got status {:?}", t.id, t.status);
        }
    }
    #[test]
    fn zero_and_negative_delay_are_on_time() {
        let now = Utc::now();
        let out = display_trains(&[
            train("T1", &["S1"], Some(0), None),
            train("T2", &["S1"], Some(-1), None),
            train("T3", &["S1"], None, None),
        ], now);
        for t in out {
            assert_eq!(t.status, TrainStatus::OnTime);
        }
    }
    #[test]
    fn route_fallbacks() {
        let now = Utc::now();
        let out = display_trains(&[
            train("T1", &[], None, None),
            train("T2", &["S3"], None, None),
        ], now);
        assert_eq!(out[0].current_location, LOCATION_DEPOT);
        assert_eq!(out[0].next_station, LOCATION_TERMINUS);
        assert_eq!(out[1].current_location, "S3");
        assert_eq!(out[1].next_station, LOCATION_TERMINUS);
    }
    #[test]
    fn eta_moves_with_the_clock() {
        // Same snapshot, later transform: the ETA drifts. Known property of
        // the projection, pinned here so nobody "fixes" it by accident.
        let t = [train("T1", &["S1"], None, Some(300.0))];
        let first = Utc.ymd(2019, 6, 1).and_hms(12, 0, 0);
        let later = first + Duration::minutes(10);
        assert_eq!(display_trains(&t, later)[0].eta - display_trains(&t, first)[0].eta,
                   Duration::minutes(10));
    }
    #[test]
    fn conflict_projection() {
        let out = display_conflicts(&[PredictedConflict {
            train_ids: vec!["T1".into(), "T2".into()],
            section_id: "S2".into(),
            predicted_conflict_time: 12.0
        }]);
        let c = &out[0];
        assert_eq!(c.location, "S2");
        assert_eq!(c.time_to_conflict, 12.0);
        assert_eq!(c.severity, Severity::Medium);
        assert!(c.resolution.contains("T1"));
        assert!(c.resolution.contains("T2"));
    }
    #[test]
    fn severity_thresholds() {
        assert_eq!(Severity::from_lead_time(0.0), Severity::High);
        assert_eq!(Severity::from_lead_time(4.9), Severity::High);
        assert_eq!(Severity::from_lead_time(5.0), Severity::Medium);
        assert_eq!(Severity::from_lead_time(14.9), Severity::Medium);
        assert_eq!(Severity::from_lead_time(15.0), Severity::Low);
        assert_eq!(Severity::from_lead_time(45.0), Severity::Low);
    }
    #[test]
    fn solver_state_fixed_topology() {
        let now = Utc::now();
        for n in &[0usize, 1, 7] {
            let trains: Vec<_> = (0..*n)
                .map(|i| train(&format!("T{}", i), &["S1", "S2"], Some(i as i64), None))
                .collect();
            let state = solver_state(&display_trains(&trains, now));
            assert_eq!(state.trains.len(), *n);
            let ids: Vec<_> = state.sections.iter().map(|s| &s.id as &str).collect();
            assert_eq!(ids, vec!["S1", "S2", "S3"]);
            for s in &state.sections {
                assert_eq!(s.platform_capacity, Some(1));
            }
        }
    }
    #[test]
    fn round_trip_is_lossy() {
        let now = Utc::now();
        let orig = train("T1", &["S1", "S2", "S3"], Some(2), Some(60.0));
        let back = solver_state(&display_trains(&[orig.clone()], now));
        let rt = &back.trains[0];
        assert_eq!(rt.id, orig.id);
        // Priority, departure and the route tail are all gone.
        assert_ne!(rt.priority, orig.priority);
        assert_ne!(rt.planned_departure, orig.planned_departure);
        assert_ne!(rt.route_sections, orig.route_sections);
        assert_eq!(rt.due_time, None);
    }
}
