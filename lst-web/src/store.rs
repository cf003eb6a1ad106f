//! The dashboard's mirrored state, and the reducer that advances it.
//!
//! Everything the dashboard shows is one immutable `Dashboard` value;
//! every change goes through `Dashboard::apply` as an `Event`, in arrival
//! order. That makes the last-write-wins behavior explicit: a slow fetch
//! whose result applies after a newer one simply wins, and nothing here
//! tries to stop it.

use chrono::prelude::*;
use serde_derive::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use lst_types::display::{DisplayTrain, DisplayConflict, TrainStatus};

/// Everything the dashboard mirrors from the solver, plus connectivity.
#[derive(Serialize, Debug, Clone, Default)]
pub struct Dashboard {
    pub trains: Vec<DisplayTrain>,
    pub conflicts: Vec<DisplayConflict>,
    /// A fetch is currently in progress.
    pub loading: bool,
    /// Message of the last failure, cleared by the next successful fetch.
    pub error: Option<String>,
    /// Whether the last fetch succeeded. Automatic polling only runs while
    /// this is true; a failed session stays down until a manual connect.
    pub connected: bool,
    pub last_update: Option<DateTime<Utc>>,
}

/// The closed set of events that can change the mirror.
#[derive(Debug, Clone)]
pub enum Event {
    FetchStarted,
    FetchSucceeded {
        trains: Vec<DisplayTrain>,
        conflicts: Vec<DisplayConflict>,
        at: DateTime<Utc>,
    },
    FetchFailed {
        error: String,
    },
    /// The poll timer fired.
    TimerTick,
    /// Optimistic local edit of one train (operator hold/expedite). It is
    /// expected to be overwritten by the follow-up fetch.
    TrainAdjusted {
        id: String,
        status: TrainStatus,
        delay_minutes: i64,
    },
}

/// What the caller should do after applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    None,
    /// Fire a fetch (timer tick arrived while connected).
    Poll,
}

impl Dashboard {
    /// Applies one event, returning the next state and any follow-up work.
    pub fn apply(mut self, ev: Event) -> (Dashboard, Followup) {
        let mut followup = Followup::None;
        match ev {
            Event::FetchStarted => {
                self.loading = true;
            },
            Event::FetchSucceeded { trains, conflicts, at } => {
                // Wholesale replacement: any optimistic edit since the fetch
                // started is discarded here.
                self.trains = trains;
                self.conflicts = conflicts;
                self.connected = true;
                self.error = None;
                self.loading = false;
                self.last_update = Some(at);
            },
            Event::FetchFailed { error } => {
                self.error = Some(error);
                self.connected = false;
                self.loading = false;
            },
            Event::TimerTick => {
                if self.connected {
                    followup = Followup::Poll;
                }
            },
            Event::TrainAdjusted { id, status, delay_minutes } => {
                for t in self.trains.iter_mut() {
                    if t.id == id {
                        t.status = status;
                        t.delay_minutes = delay_minutes;
                    }
                }
            },
        }
        (self, followup)
    }
    /// Per-section occupancy, derived from current train locations.
    pub fn occupancy(&self) -> Vec<SectionOccupancy> {
        let mut by_section: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for t in self.trains.iter() {
            by_section.entry(&t.current_location).or_insert_with(Vec::new)
                .push(&t.id);
        }
        by_section.into_iter()
            .map(|(section, trains)| SectionOccupancy {
                section: section.into(),
                trains: trains.into_iter().map(|t| t.into()).collect(),
            })
            .collect()
    }
}

/// Trains currently in one section.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SectionOccupancy {
    pub section: String,
    pub trains: Vec<String>,
}

/// The store shared between the HTTP workers and the poller thread. The
/// mutex makes each event application atomic, but imposes no ordering
/// across requests.
pub type SharedDashboard = Arc<Mutex<Dashboard>>;

/// Applies an event to a shared store, returning the follow-up.
pub fn apply(store: &SharedDashboard, ev: Event) -> Followup {
    let mut guard = store.lock().unwrap();
    let (next, followup) = guard.clone().apply(ev);
    *guard = next;
    followup
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display_train(id: &str, status: TrainStatus, delay: i64) -> DisplayTrain {
        DisplayTrain {
            id: id.into(),
            name: format!("Train {}", id),
            status,
            current_location: "S1".into(),
            next_station: "S2".into(),
            delay_minutes: delay,
            eta: Utc.ymd(2019, 6, 1).and_hms(12, 0, 0),
        }
    }
    fn success(trains: Vec<DisplayTrain>) -> Event {
        Event::FetchSucceeded {
            trains,
            conflicts: vec![],
            at: Utc.ymd(2019, 6, 1).and_hms(12, 0, 0),
        }
    }

    #[test]
    fn failed_fetch_disconnects() {
        let d = Dashboard::default();
        let (d, _) = d.apply(Event::FetchStarted);
        assert!(d.loading);
        let (d, _) = d.apply(Event::FetchFailed { error: "solver unreachable".into() });
        assert!(!d.loading);
        assert!(!d.connected);
        assert_eq!(d.error, Some("solver unreachable".into()));
    }
    #[test]
    fn successful_fetch_clears_error() {
        let d = Dashboard::default();
        let (d, _) = d.apply(Event::FetchFailed { error: "boom".into() });
        let (d, _) = d.apply(Event::FetchStarted);
        let (d, _) = d.apply(success(vec![display_train("T1", TrainStatus::OnTime, 0)]));
        assert!(d.connected);
        assert!(!d.loading);
        assert_eq!(d.error, None);
        assert_eq!(d.trains.len(), 1);
        assert!(d.last_update.is_some());
    }
    #[test]
    fn tick_only_polls_while_connected() {
        let d = Dashboard::default();
        let (d, f) = d.apply(Event::TimerTick);
        assert_eq!(f, Followup::None);
        let (d, _) = d.apply(success(vec![]));
        let (d, f) = d.apply(Event::TimerTick);
        assert_eq!(f, Followup::Poll);
        let (d, _) = d.apply(Event::FetchFailed { error: "gone".into() });
        let (_, f) = d.apply(Event::TimerTick);
        assert_eq!(f, Followup::None);
    }
    #[test]
    fn adjustment_patches_one_train() {
        let d = Dashboard::default();
        let (d, _) = d.apply(success(vec![
            display_train("T1", TrainStatus::OnTime, 0),
            display_train("T2", TrainStatus::OnTime, 0),
        ]));
        let (d, _) = d.apply(Event::TrainAdjusted {
            id: "T1".into(),
            status: TrainStatus::Delayed,
            delay_minutes: 5,
        });
        assert_eq!(d.trains[0].status, TrainStatus::Delayed);
        assert_eq!(d.trains[0].delay_minutes, 5);
        assert_eq!(d.trains[1].status, TrainStatus::OnTime);
        assert_eq!(d.trains[1].delay_minutes, 0);
    }
    #[test]
    fn fetch_overwrites_optimistic_edit() {
        // Last write wins: the refetch result replaces the local edit.
        let d = Dashboard::default();
        let (d, _) = d.apply(success(vec![display_train("T1", TrainStatus::OnTime, 0)]));
        let (d, _) = d.apply(Event::TrainAdjusted {
            id: "T1".into(),
            status: TrainStatus::Delayed,
            delay_minutes: 5,
        });
        let (d, _) = d.apply(success(vec![display_train("T1", TrainStatus::OnTime, 0)]));
        assert_eq!(d.trains[0].status, TrainStatus::OnTime);
        assert_eq!(d.trains[0].delay_minutes, 0);
    }
    #[test]
    fn stale_fetch_still_wins() {
        // Two overlapping fetches: whichever response applies last is kept,
        // even if it was the older request. Specified behavior.
        let d = Dashboard::default();
        let (d, _) = d.apply(Event::FetchStarted);
        let (d, _) = d.apply(Event::FetchStarted);
        let (d, _) = d.apply(success(vec![display_train("T1", TrainStatus::Delayed, 9)]));
        let (d, _) = d.apply(success(vec![display_train("T1", TrainStatus::OnTime, 0)]));
        assert_eq!(d.trains[0].status, TrainStatus::OnTime);
    }
    #[test]
    fn occupancy_groups_by_section() {
        let mut t1 = display_train("T1", TrainStatus::OnTime, 0);
        t1.current_location = "S2".into();
        let t2 = display_train("T2", TrainStatus::OnTime, 0);
        let t3 = display_train("T3", TrainStatus::Delayed, 4);
        let (d, _) = Dashboard::default().apply(success(vec![t1, t2, t3]));
        let occ = d.occupancy();
        assert_eq!(occ, vec![
            SectionOccupancy { section: "S1".into(), trains: vec!["T2".into(), "T3".into()] },
            SectionOccupancy { section: "S2".into(), trains: vec!["T1".into()] },
        ]);
    }
}
