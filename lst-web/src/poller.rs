//! Background worker that keeps the mirror fresh.
//!
//! A fetch is one snapshot call plus one predict call, transformed into
//! display shape and applied to the store as events. The timer only fires
//! while the dashboard is connected; manual wake-ups over the channel
//! bypass that gate (operator actions always refetch).

use chrono::prelude::*;
use log::*;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use lst_types::display::{DisplayTrain, DisplayConflict, display_trains, display_conflicts};
use lst_util::rpc::RpcError;

use crate::config::Config;
use crate::errors::Result;
use crate::solver::SolverApi;
use crate::store::{self, SharedDashboard, Event, Followup};

/// Seconds between automatic refreshes (default value).
pub static POLL_INTERVAL_SECS: u64 = 30;

/// Messages that wake the poller outside its timer.
#[derive(Debug, Clone, Copy)]
pub enum Wakeup {
    /// Refetch immediately, regardless of the timer and connectivity.
    RefetchNow,
}

pub type PollSender = Sender<Wakeup>;

fn fetch(api: &SolverApi) -> Result<(Vec<DisplayTrain>, Vec<DisplayConflict>), RpcError> {
    let state = api.snapshot(None)?;
    let predict = api.predict(&state)?;
    let now = Utc::now();
    Ok((display_trains(&state.trains, now),
        display_conflicts(&predict.predicted_conflicts)))
}

/// Maps a fetch failure to the event that should hit the store, if any.
///
/// A duplicate-in-flight rejection is a local guard, not lost solver
/// connectivity: the fetch already running will settle the store, so it
/// must not apply `FetchFailed` (which would disconnect the dashboard and
/// stop the timer).
fn failure_event(e: &RpcError) -> Option<Event> {
    match *e {
        RpcError::DuplicateInFlight => None,
        ref e => Some(Event::FetchFailed { error: e.to_string() }),
    }
}

/// Fetches a fresh snapshot + prediction and applies the outcome to the
/// store. The failure (if any) is recorded in the store *and* returned, so
/// request handlers can surface it too.
pub fn refresh(api: &SolverApi, store: &SharedDashboard) -> Result<(), RpcError> {
    store::apply(store, Event::FetchStarted);
    match fetch(api) {
        Ok((trains, conflicts)) => {
            store::apply(store, Event::FetchSucceeded {
                trains, conflicts,
                at: Utc::now(),
            });
            Ok(())
        },
        Err(e) => {
            if let Some(ev) = failure_event(&e) {
                store::apply(store, ev);
            }
            else {
                debug!("Refresh skipped: identical fetch already in flight");
            }
            Err(e)
        }
    }
}

pub struct Poller {
    api: Arc<SolverApi>,
    store: SharedDashboard,
    rx: Receiver<Wakeup>,
    tx: Option<Sender<Wakeup>>,
    interval: Duration,
}
impl Poller {
    pub fn new(api: Arc<SolverApi>, store: SharedDashboard, cfg: &Config) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            api, store, rx,
            tx: Some(tx),
            interval: Duration::from_secs(cfg.poll_interval_secs.unwrap_or(POLL_INTERVAL_SECS)),
        }
    }
    pub fn take_sender(&mut self) -> PollSender {
        self.tx.take().unwrap()
    }
    pub fn run(self) -> Result<()> {
        info!("Running poll loop (interval: {}s)", self.interval.as_secs());
        thread::Builder::new()
            .name("lst-web: solver poller".into())
            .spawn(move || {
                let mut last_poll = Instant::now();
                loop {
                    if last_poll.elapsed() >= self.interval {
                        last_poll = Instant::now();
                        if store::apply(&self.store, Event::TimerTick) == Followup::Poll {
                            if let Err(e) = refresh(&self.api, &self.store) {
                                warn!("Automatic refresh failed: {}", e);
                            }
                        }
                        else {
                            debug!("Not connected; skipping automatic refresh");
                        }
                    }
                    if let Ok(w) = self.rx.try_recv() {
                        debug!("Poller woken: {:?}", w);
                        match w {
                            Wakeup::RefetchNow => {
                                last_poll = Instant::now();
                                if let Err(e) = refresh(&self.api, &self.store) {
                                    warn!("Triggered refresh failed: {}", e);
                                }
                            }
                        }
                    }
                    thread::sleep(Duration::from_millis(1000));
                }
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use crate::store::Dashboard;

    #[test]
    fn duplicate_in_flight_is_not_a_failure() {
        assert!(failure_event(&RpcError::DuplicateInFlight).is_none());
        match failure_event(&RpcError::RemoteServiceUnavailable) {
            Some(Event::FetchFailed { error }) => {
                assert_eq!(error, "remote service unavailable");
            },
            other => panic!("unexpected event: {:?}", other),
        }
    }
    #[test]
    fn duplicate_rejection_keeps_dashboard_connected() {
        // A second Refresh while a fetch is still running gets bounced by
        // the dedup guard; that must not read as lost connectivity.
        let store: SharedDashboard = Arc::new(Mutex::new(Dashboard::default()));
        store::apply(&store, Event::FetchSucceeded {
            trains: vec![],
            conflicts: vec![],
            at: Utc::now(),
        });
        store::apply(&store, Event::FetchStarted);
        if let Some(ev) = failure_event(&RpcError::DuplicateInFlight) {
            store::apply(&store, ev);
        }
        let dash = store.lock().unwrap().clone();
        assert!(dash.connected);
        assert_eq!(dash.error, None);
        assert_eq!(store::apply(&store, Event::TimerTick), Followup::Poll);
    }
}
