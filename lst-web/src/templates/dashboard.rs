//! Views for the dashboard page.

use serde_derive::Serialize;
use lst_types::display::{TrainStatus, Severity};

use crate::store::Dashboard;

fn status_str(status: TrainStatus) -> &'static str {
    match status {
        TrainStatus::OnTime => "on-time",
        TrainStatus::Delayed => "delayed",
        TrainStatus::Conflict => "conflict"
    }
}
fn severity_str(sev: Severity) -> &'static str {
    match sev {
        Severity::Low => "low",
        Severity::Medium => "medium",
        Severity::High => "high"
    }
}

#[derive(Serialize)]
pub struct TrainView {
    pub id: String,
    pub name: String,
    pub status: &'static str,
    pub current_location: String,
    pub next_station: String,
    pub delay_minutes: i64,
    pub eta: String
}
#[derive(Serialize)]
pub struct ConflictView {
    pub trains: String,
    pub location: String,
    pub time_to_conflict: String,
    pub severity: &'static str,
    pub resolution: String
}
#[derive(Serialize)]
pub struct OccupancyView {
    pub section: String,
    pub trains: String,
    pub count: usize
}
#[derive(Serialize)]
pub struct DashboardView {
    pub connected: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub last_update: String,
    pub trains: Vec<TrainView>,
    pub conflicts: Vec<ConflictView>,
    pub occupancy: Vec<OccupancyView>
}
impl DashboardView {
    pub fn from_state(dash: &Dashboard) -> Self {
        let trains = dash.trains.iter().map(|t| TrainView {
            id: t.id.clone(),
            name: t.name.clone(),
            status: status_str(t.status),
            current_location: t.current_location.clone(),
            next_station: t.next_station.clone(),
            delay_minutes: t.delay_minutes,
            eta: t.eta.format("%H:%M:%S").to_string()
        }).collect();
        let conflicts = dash.conflicts.iter().map(|c| ConflictView {
            trains: c.train_ids.join(", "),
            location: c.location.clone(),
            time_to_conflict: format!("{:.0}", c.time_to_conflict),
            severity: severity_str(c.severity),
            resolution: c.resolution.clone()
        }).collect();
        let occupancy = dash.occupancy().into_iter().map(|o| OccupancyView {
            section: o.section,
            count: o.trains.len(),
            trains: o.trains.join(", ")
        }).collect();
        DashboardView {
            connected: dash.connected,
            loading: dash.loading,
            error: dash.error.clone(),
            last_update: dash.last_update
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".into()),
            trains, conflicts, occupancy
        }
    }
}
