//! Operator dashboard for a railway traffic solver: mirrors trains and
//! predicted conflicts from the solver service, and forwards operator
//! actions (hold/expedite/reroute, optimization, conflict resolution) back
//! to it.

pub mod errors;
pub mod config;
pub mod solver;
pub mod store;
pub mod poller;
pub mod ctx;
pub mod tmpl;
pub mod templates;

use log::*;
use lst_util::ConfigExt;
use std::sync::{Arc, Mutex};

use crate::config::Config;
use crate::ctx::App;
use crate::errors::*;
use crate::poller::Poller;
use crate::solver::SolverApi;
use crate::store::Dashboard;

fn main() -> Result<()> {
    lst_util::setup_logging()?;
    info!("lst-web, but not yet");
    info!("loading config");
    let cfg = Config::load()?;
    info!("initialising Handlebars");
    let hbs = tmpl::handlebars_init()?;
    info!("initialising solver API (url = {})", cfg.service_solver);
    let api = Arc::new(SolverApi::new(&cfg)?);
    let store = Arc::new(Mutex::new(Dashboard::default()));
    info!("starting poller");
    let mut poller = Poller::new(api.clone(), store.clone(), &cfg);
    let poll_tx = poller.take_sender();
    poller.run()?;
    let app = App::new(hbs, api, store, poll_tx);
    lst_util::http::start_server(&cfg.listen, app);
}
