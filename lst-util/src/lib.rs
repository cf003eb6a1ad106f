//! Shared plumbing for the leitstand crates: a couple of macros, logging
//! setup, config loading, and the HTTP bits (server helpers and the solver
//! RPC client).

use config as cfg;
use serde::de::DeserializeOwned;
use log::*;

pub mod http;
pub mod rpc;

#[macro_export]
macro_rules! crate_name {
    () => {module_path!().split("::").next().unwrap()}
}

/// Makes a User-Agent string for the calling crate.
#[macro_export]
macro_rules! user_agent {
    () => {
        format!("leitstand/{}/{}", $crate::crate_name!(), env!("CARGO_PKG_VERSION"))
    }
}

#[macro_export]
macro_rules! impl_from_for_error {
    ($error:ident, $($orig:ident => $var:ident),*) => {
        $(
            impl From<$orig> for $error {
                fn from(err: $orig) -> $error {
                    $error::$var(err)
                }
            }
         )*
    }
}

/// Fills in a crate's configuration struct.
///
/// Any `Deserialize` struct gets its values from `<crate name>.toml` in the
/// working directory, with `LST_*` environment variables layered on top
/// (so deployments can override the file without editing it).
pub trait ConfigExt: DeserializeOwned {
    fn crate_name() -> &'static str;
    fn load() -> Result<Self, failure::Error> {
        let cn = Self::crate_name();
        info!("Loading config for {}", cn);
        let mut settings = cfg::Config::default();
        if let Err(e) = settings.merge(cfg::File::with_name(cn)) {
            warn!("No config file loaded: {}", e);
            settings = cfg::Config::default();
        }
        let mut s2 = settings.clone();
        if let Err(e) = s2.merge(cfg::Environment::with_prefix("LST")) {
            warn!("No config loaded from environment: {}", e);
        }
        else {
            settings = s2;
        }
        let ret = settings.try_into()?;
        Ok(ret)
    }
}

/// Initialize logging: plain stdout at Info. Anything fancier can wait.
pub fn setup_logging() -> Result<(), failure::Error> {
    fern::Dispatch::new()
        .format(|out, msg, record| {
            out.finish(format_args!("[{} {}] {}",
                                    record.target(),
                                    record.level(),
                                    msg))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}
