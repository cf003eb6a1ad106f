//! Wire-level records, as the solver service defines them.
//!
//! The solver owns all of these shapes; the dashboard reads them, and only
//! ever constructs them when sending state back (see `TrainRecord::outbound`).

use serde_derive::{Serialize, Deserialize};
use serde_json::Value;

/// A train as the solver sees it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TrainRecord {
    /// Train identifier (e.g. "T1").
    pub id: String,
    /// Scheduling priority. Higher is more important.
    pub priority: u32,
    /// Planned departure time, in seconds from the start of the horizon.
    pub planned_departure: f64,
    /// Ordered list of route section ids this train runs through.
    pub route_sections: Vec<String>,
    /// Time the train is due, in seconds from now.
    #[serde(default)]
    pub due_time: Option<f64>,
    /// Current delay, in minutes.
    #[serde(default)]
    pub current_delay_minutes: Option<i64>
}
impl TrainRecord {
    /// Builds a record for sending dashboard state back to the solver.
    ///
    /// The dashboard doesn't track priority or planned departure (the solver
    /// re-derives both), so fixed values are substituted. This conversion is
    /// lossy by design: round-tripping a train through the display projection
    /// and back does *not* reproduce the original record.
    pub fn outbound(id: String, route_sections: Vec<String>, delay_minutes: i64) -> Self {
        Self {
            id,
            priority: Self::OUTBOUND_PRIORITY,
            planned_departure: Self::OUTBOUND_DEPARTURE,
            route_sections,
            due_time: None,
            current_delay_minutes: Some(delay_minutes)
        }
    }
    /// Fixed priority used for outbound records.
    pub const OUTBOUND_PRIORITY: u32 = 1;
    /// Fixed planned departure used for outbound records.
    pub const OUTBOUND_DEPARTURE: f64 = 0.0;
}

/// A route section. Opaque pass-through: the dashboard never interprets
/// capacities or conflict relations, it just hands them back to the solver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SectionRecord {
    /// Section identifier (e.g. "S2").
    pub id: String,
    /// Platform capacity, if this section is a platform.
    #[serde(default)]
    pub platform_capacity: Option<u32>,
    /// Ids of sections this one conflicts with.
    #[serde(default)]
    pub conflicts_with: Option<Vec<String>>
}

/// The full network state: request body for every solver call, and the
/// response shape of `/live/snapshot`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NetworkState {
    pub trains: Vec<TrainRecord>,
    pub sections: Vec<SectionRecord>
}

/// A conflict the solver predicts will occur.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictedConflict {
    /// The trains involved.
    pub train_ids: Vec<String>,
    /// Where the conflict is predicted to occur.
    pub section_id: String,
    /// Minutes from now until the predicted conflict.
    pub predicted_conflict_time: f64
}

/// Response of `/predict`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PredictResponse {
    /// Per-train delay predictions. Displayed raw, never interpreted.
    #[serde(default)]
    pub predicted_delays: Value,
    #[serde(default)]
    pub predicted_conflicts: Vec<PredictedConflict>
}

/// Response of `/schedule`, `/resolve` and `/whatif`: KPIs plus a per-train
/// schedule. Both are solver-owned shapes, carried as opaque JSON.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SolverPlan {
    #[serde(default)]
    pub kpis: Value,
    #[serde(default)]
    pub schedule: Value
}

/// Request body for `/resolve`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResolveRequest {
    pub state: NetworkState,
    pub predicted_conflicts: Vec<PredictedConflict>
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_snapshot() {
        let data = r#"{
            "trains": [
                {"id": "T1", "priority": 2, "planned_departure": 60.0,
                 "route_sections": ["S1", "S2"], "due_time": 900.0,
                 "current_delay_minutes": 7}
            ],
            "sections": [
                {"id": "S1", "platform_capacity": 1},
                {"id": "S2", "conflicts_with": ["S3"]}
            ]
        }"#;
        let state: NetworkState = serde_json::from_str(data).unwrap();
        assert_eq!(state.trains[0].id, "T1");
        assert_eq!(state.trains[0].due_time, Some(900.0));
        assert_eq!(state.sections[1].conflicts_with, Some(vec!["S3".into()]));
        assert_eq!(state.sections[1].platform_capacity, None);
    }
    #[test]
    fn parse_predict_response() {
        let data = r#"{
            "predicted_delays": {"T1": 4.2},
            "predicted_conflicts": [
                {"train_ids": ["T1", "T2"], "section_id": "S2",
                 "predicted_conflict_time": 12.0}
            ]
        }"#;
        let resp: PredictResponse = serde_json::from_str(data).unwrap();
        assert_eq!(resp.predicted_conflicts.len(), 1);
        assert_eq!(resp.predicted_conflicts[0].section_id, "S2");
    }
    #[test]
    fn parse_plan_with_missing_fields() {
        let resp: SolverPlan = serde_json::from_str("{}").unwrap();
        assert!(resp.kpis.is_null());
        assert!(resp.schedule.is_null());
    }
    #[test]
    fn outbound_fabricates_constants() {
        let rec = TrainRecord::outbound("T9".into(), vec!["S1".into()], 3);
        assert_eq!(rec.priority, TrainRecord::OUTBOUND_PRIORITY);
        assert_eq!(rec.planned_departure, TrainRecord::OUTBOUND_DEPARTURE);
        assert_eq!(rec.current_delay_minutes, Some(3));
        assert_eq!(rec.due_time, None);
    }
}
