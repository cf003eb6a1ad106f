//! Main server context.

use handlebars::Handlebars;
use rouille::{Request, Response, router};
use log::*;
use std::sync::{Arc, Mutex};
use lst_util::http::HttpServer;
use lst_types::display::{solver_state, wire_conflicts, TrainStatus};
use lst_types::wire::{NetworkState, ResolveRequest};

use crate::errors::*;
use crate::poller::{self, PollSender, Wakeup};
use crate::solver::SolverApi;
use crate::store::{self, SharedDashboard, Dashboard, Event};
use crate::tmpl::TemplateContext;

/// Minutes an operator hold adds (and an expedite removes).
static HOLD_DELAY_MINS: i64 = 5;

/// Local train adjustments an operator can make. All of them are
/// optimistic: the follow-up refetch decides what actually sticks.
#[derive(Debug, Clone, Copy)]
enum Adjustment {
    Hold,
    Expedite,
    Reroute,
}

pub struct App {
    hbs: Handlebars,
    api: Arc<SolverApi>,
    store: SharedDashboard,
    poller: Mutex<PollSender>,
}

impl HttpServer for App {
    type Error = WebError;

    fn on_request(&self, req: &Request) -> WebResult<Response> {
        router!(req,
            (GET) (/) => {
                use crate::templates::dashboard::DashboardView;

                let tctx = TemplateContext {
                    template: "dashboard",
                    title: "leitstand".into(),
                    body: DashboardView::from_state(&self.dashboard())
                };
                tctx.render(&self.hbs)
            },
            (GET) (/state) => {
                Ok(Response::json(&self.dashboard()))
            },
            (POST) (/connect) => {
                self.refresh_now()
            },
            (POST) (/refresh) => {
                self.refresh_now()
            },
            (POST) (/trains/{id: String}/hold) => {
                self.adjust(id, Adjustment::Hold)
            },
            (POST) (/trains/{id: String}/expedite) => {
                self.adjust(id, Adjustment::Expedite)
            },
            (POST) (/trains/{id: String}/reroute) => {
                self.adjust(id, Adjustment::Reroute)
            },
            (POST) (/optimize) => {
                // The plan comes back to the caller verbatim; the mirror is
                // only ever updated from snapshots.
                let plan = self.api.schedule(&self.current_state())?;
                Ok(Response::json(&plan))
            },
            (POST) (/resolve) => {
                let dash = self.dashboard();
                let req = ResolveRequest {
                    state: solver_state(&dash.trains),
                    predicted_conflicts: wire_conflicts(&dash.conflicts),
                };
                let plan = self.api.resolve(&req)?;
                self.wake();
                Ok(Response::json(&plan))
            },
            (POST) (/whatif) => {
                let plan = self.api.whatif(&self.current_state())?;
                Ok(Response::json(&plan))
            },
            (GET) (/kpis) => {
                Ok(Response::json(&self.api.kpis(&self.current_state())?))
            },
            (GET) (/demo) => {
                Ok(Response::json(&self.api.demo()?))
            },
            _ => {
                let asset_resp = rouille::match_assets(req, "static");
                if asset_resp.is_success() {
                    Ok(asset_resp)
                }
                else {
                    Err(WebError::NotFound)
                }
            }
        )
    }
}

impl App {
    pub fn new(hbs: Handlebars, api: Arc<SolverApi>, store: SharedDashboard, poller: PollSender) -> Self {
        App { hbs, api, store, poller: Mutex::new(poller) }
    }
    fn dashboard(&self) -> Dashboard {
        self.store.lock().unwrap().clone()
    }
    fn current_state(&self) -> NetworkState {
        solver_state(&self.dashboard().trains)
    }
    /// Nudges the poller into an immediate background refetch.
    fn wake(&self) {
        if let Err(e) = self.poller.lock().unwrap().send(Wakeup::RefetchNow) {
            warn!("Poller is gone: {}", e);
        }
    }
    /// Synchronous fetch. On failure the error lands in the store (and
    /// therefore the banner); either way the operator goes back to the page.
    fn refresh_now(&self) -> WebResult<Response> {
        if let Err(e) = poller::refresh(&self.api, &self.store) {
            warn!("Manual refresh failed: {}", e);
        }
        Ok(Response::redirect_303("/"))
    }
    fn adjust(&self, id: String, adj: Adjustment) -> WebResult<Response> {
        let dash = self.dashboard();
        let train = dash.trains.iter()
            .find(|t| t.id == id)
            .ok_or_else(|| WebError::UnknownTrain(id.clone()))?;
        match adj {
            Adjustment::Hold => {
                store::apply(&self.store, Event::TrainAdjusted {
                    id,
                    status: TrainStatus::Delayed,
                    delay_minutes: train.delay_minutes + HOLD_DELAY_MINS,
                });
            },
            Adjustment::Expedite => {
                let delay = (train.delay_minutes - HOLD_DELAY_MINS).max(0);
                let status = if delay > 0 { TrainStatus::Delayed } else { TrainStatus::OnTime };
                store::apply(&self.store, Event::TrainAdjusted {
                    id, status,
                    delay_minutes: delay,
                });
            },
            // Routes are solver business; a reroute is just a refetch.
            Adjustment::Reroute => {},
        }
        self.wake();
        Ok(Response::redirect_303("/"))
    }
}
