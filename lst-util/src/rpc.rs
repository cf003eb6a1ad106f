//! Handling remote procedure calls (RPC) to the solver service.
//!
//! All solver endpoints speak JSON over HTTP. Calls are made with an
//! explicit timeout and a single-retry policy for transport errors, and
//! identical concurrent calls are de-duplicated via an in-flight registry
//! instead of being allowed to race.

use reqwest::Client;
use reqwest::Error as ReqwestError;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
pub use reqwest::Method;
use failure_derive::Fail;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Error as JsonError;
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use log::*;

use crate::impl_from_for_error;

/// Default per-request timeout (seconds).
pub static DEFAULT_TIMEOUT_SECS: u64 = 30;

/// An error encountered after an RPC call.
#[derive(Debug, Fail)]
pub enum RpcError {
    /// The remote service was unavailable.
    #[fail(display = "remote service unavailable")]
    RemoteServiceUnavailable,
    /// An identical call is already in flight.
    #[fail(display = "identical request already in flight")]
    DuplicateInFlight,
    /// The remote service returned an error.
    #[fail(display = "{} error (code {}): {}", service, code, error)]
    RemoteError {
        /// Name of the service responsible.
        service: &'static str,
        /// The HTTP status code returned.
        code: u16,
        /// The error text.
        error: String
    },
    /// Failed to serialize the request body.
    #[fail(display = "serializing request body: {}", _0)]
    Json(JsonError),
    /// reqwest error.
    #[fail(display = "reqwest: {}", _0)]
    Reqwest(ReqwestError)
}
impl_from_for_error!(RpcError,
                     ReqwestError => Reqwest,
                     JsonError => Json);

impl RpcError {
    pub fn status_code(&self) -> u16 {
        use self::RpcError::*;
        match *self {
            RemoteServiceUnavailable => 503,
            DuplicateInFlight => 429,
            RemoteError { .. } => 502,
            _ => 500
        }
    }
}

/// Key identifying a logical call (method, path and serialized body) in the
/// in-flight registry.
pub fn dedup_key(meth: &Method, path: &str, body: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    meth.as_str().hash(&mut hasher);
    path.hash(&mut hasher);
    body.hash(&mut hasher);
    hasher.finish()
}

/// Removes its key from the registry when the call finishes (or fails).
struct InFlightGuard {
    registry: Arc<Mutex<HashSet<u64>>>,
    key: u64
}
impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.lock().unwrap().remove(&self.key);
    }
}

#[derive(Clone)]
pub struct ServiceRpc {
    pub base_url: String,
    pub user_agent: String,
    pub name: &'static str,
    cli: Client,
    in_flight: Arc<Mutex<HashSet<u64>>>
}
impl ServiceRpc {
    pub fn new(ua: String, name: &'static str, base_url: String, timeout: Duration) -> Result<Self, RpcError> {
        let cli = Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            user_agent: ua,
            name, base_url, cli,
            in_flight: Arc::new(Mutex::new(HashSet::new()))
        })
    }
    /// GET `path`, deserializing the JSON response.
    pub fn get<T, U>(&self, path: T) -> Result<U, RpcError> where T: Display, U: DeserializeOwned {
        self.call(Method::GET, &path.to_string(), None)
    }
    /// POST `body` as JSON to `path`, deserializing the JSON response.
    pub fn post<T, B, U>(&self, path: T, body: &B) -> Result<U, RpcError> where T: Display, B: Serialize, U: DeserializeOwned {
        let body = serde_json::to_string(body)?;
        self.call(Method::POST, &path.to_string(), Some(body))
    }
    fn register(&self, key: u64) -> Result<InFlightGuard, RpcError> {
        let mut reg = self.in_flight.lock().unwrap();
        if !reg.insert(key) {
            return Err(RpcError::DuplicateInFlight);
        }
        Ok(InFlightGuard { registry: self.in_flight.clone(), key })
    }
    fn attempt(&self, meth: Method, url: &str, body: Option<&str>) -> Result<reqwest::Response, ReqwestError> {
        let mut req = self.cli.request(meth, url)
            .header(USER_AGENT, &self.user_agent as &str);
        if let Some(body) = body {
            req = req.header(CONTENT_TYPE, "application/json")
                .body(body.to_owned());
        }
        req.send()
    }
    fn call<U>(&self, meth: Method, path: &str, body: Option<String>) -> Result<U, RpcError> where U: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        let key = dedup_key(&meth, path, body.as_ref().map(|x| x as &str).unwrap_or(""));
        let _guard = self.register(key)?;
        debug!("RPC ({}): {} {}", self.name, meth, url);
        let body_ref = body.as_ref().map(|x| x as &str);
        let mut resp = match self.attempt(meth.clone(), &url, body_ref) {
            Ok(r) => r,
            Err(e) => {
                // One retry, and only for transport errors: an HTTP error
                // status comes back as Ok(resp) and is never retried, since
                // re-submitting something like /resolve isn't idempotent.
                warn!("RPC ({}): transport error (retrying once): {}", self.name, e);
                self.attempt(meth, &url, body_ref)?
            }
        };
        let status = resp.status();
        debug!("RPC ({}): response code {}", self.name, status.as_u16());
        if status.as_u16() == 503 {
            Err(RpcError::RemoteServiceUnavailable)?
        }
        if !status.is_success() {
            let text = resp.text()?;
            warn!("RPC ({}): request failed ({}): {}", self.name, status.as_u16(), text);
            Err(RpcError::RemoteError {
                service: self.name,
                code: status.as_u16(),
                error: text
            })?
        }
        let ret: U = resp.json()?;
        Ok(ret)
    }
}
