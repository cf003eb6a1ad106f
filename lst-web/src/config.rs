//! Standard configuration module.

use serde_derive::Deserialize;
use lst_util::{ConfigExt, crate_name};

fn default_solver_url() -> String {
    "http://127.0.0.1:8000".into()
}

/// `lst-web` configuration.
#[derive(Deserialize, Debug)]
pub struct Config {
    /// Address to listen on.
    pub listen: String,
    /// URL of the scheduling & conflict-prediction solver.
    #[serde(default = "default_solver_url")]
    pub service_solver: String,
    /// Seconds between automatic refreshes (default 30).
    pub poll_interval_secs: Option<u64>,
    /// Per-request timeout for solver calls, in seconds (default 30).
    pub request_timeout_secs: Option<u64>,
    /// On-time-performance tolerance passed to the scheduling endpoints.
    pub otp_tolerance: Option<f64>,
    /// Which solver backend `/resolve` should use.
    pub solver: Option<String>,
    /// Whether `/live/snapshot` should use live data.
    pub use_live: Option<bool>,
    /// Cap on trains returned by `/live/snapshot`.
    pub max_trains: Option<u32>,
}

impl ConfigExt for Config {
    fn crate_name() -> &'static str {
        crate_name!()
    }
}
