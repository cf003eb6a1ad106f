//! Types shared between leitstand crates: wire-level records exchanged with
//! the solver service, and the display projections the dashboard renders.

pub mod wire;
pub mod display;
