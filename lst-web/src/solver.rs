//! Typed calls to the solver's HTTP API.
//!
//! The solver owns all the actual scheduling and conflict-prediction logic;
//! this module is the only place its endpoints are spelled out.

use lst_util::rpc::{ServiceRpc, RpcError, DEFAULT_TIMEOUT_SECS};
use lst_util::user_agent;
use lst_types::wire::{NetworkState, PredictResponse, ResolveRequest, SolverPlan};
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;

/// Query parameters shared by the scheduling endpoints.
#[derive(Debug, Clone)]
pub struct SolverOpts {
    pub otp_tolerance: f64,
    pub solver: String,
    pub use_live: bool,
    pub max_trains: u32,
}
impl SolverOpts {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            otp_tolerance: cfg.otp_tolerance.unwrap_or(5.0),
            solver: cfg.solver.clone().unwrap_or_else(|| "greedy".into()),
            use_live: cfg.use_live.unwrap_or(true),
            max_trains: cfg.max_trains.unwrap_or(20),
        }
    }
}

pub struct SolverApi {
    rpc: ServiceRpc,
    opts: SolverOpts,
}
impl SolverApi {
    pub fn new(cfg: &Config) -> Result<Self, RpcError> {
        let timeout = Duration::from_secs(cfg.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let rpc = ServiceRpc::new(user_agent!(), "solver", cfg.service_solver.clone(), timeout)?;
        Ok(Self { rpc, opts: SolverOpts::from_config(cfg) })
    }
    /// Fetches the current train/section snapshot, optionally seeding it
    /// with a known state.
    pub fn snapshot(&self, state: Option<&NetworkState>) -> Result<NetworkState, RpcError> {
        let url = format!("/live/snapshot?use_live={}&max_trains={}",
                          self.opts.use_live, self.opts.max_trains);
        match state {
            Some(s) => self.rpc.post(url, s),
            None => self.rpc.post(url, &Value::Null),
        }
    }
    /// Predicted delays and conflicts for the given state.
    pub fn predict(&self, state: &NetworkState) -> Result<PredictResponse, RpcError> {
        self.rpc.post("/predict", state)
    }
    /// Optimized schedule + KPIs for the given state.
    pub fn schedule(&self, state: &NetworkState) -> Result<SolverPlan, RpcError> {
        self.rpc.post(format!("/schedule?otp_tolerance={}", self.opts.otp_tolerance), state)
    }
    /// Asks the solver to resolve the given predicted conflicts.
    pub fn resolve(&self, req: &ResolveRequest) -> Result<SolverPlan, RpcError> {
        self.rpc.post(format!("/resolve?solver={}&otp_tolerance={}",
                              self.opts.solver, self.opts.otp_tolerance), req)
    }
    /// Hypothetical schedule for a modified state.
    pub fn whatif(&self, state: &NetworkState) -> Result<SolverPlan, RpcError> {
        self.rpc.post(format!("/whatif?otp_tolerance={}", self.opts.otp_tolerance), state)
    }
    /// Just the KPI object for the given state.
    pub fn kpis(&self, state: &NetworkState) -> Result<Value, RpcError> {
        self.rpc.post(format!("/kpis?otp_tolerance={}", self.opts.otp_tolerance), state)
    }
    /// Arbitrary demo payload, for exercising the dashboard without live data.
    pub fn demo(&self) -> Result<Value, RpcError> {
        self.rpc.get("/demo")
    }
}
