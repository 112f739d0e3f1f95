use crate::pubsub::model::BridgeState;
use anyhow::Context;
use log::info;
use serde_json::{json, Value};
use std::{
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use tokio::runtime::Builder;
use trafficcore::sink::{RecordPublisher, SinkError};
use warp::{http::StatusCode, Filter};

/// Pub/sub sink that keeps published payloads for the visualization layer
/// and optionally serves them over HTTP.
#[derive(Clone)]
pub struct HttpBridge {
    state: Arc<RwLock<BridgeState>>,
}

impl HttpBridge {
    pub fn new(history_limit: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(BridgeState::new(history_limit))),
        }
    }

    /// Starts the HTTP endpoint on a background thread and returns the bound
    /// address. `GET /topics/<topic>` returns the latest payload on a topic,
    /// `GET /history` the recent payloads across topics.
    pub fn serve(&self, address: SocketAddr) -> anyhow::Result<SocketAddr> {
        let state_for_filter = self.state.clone();
        let state_filter = warp::any().map(move || state_for_filter.clone());

        let topic_route = warp::path("topics")
            .and(warp::path::tail())
            .and(warp::get())
            .and(state_filter.clone())
            .map(|tail: warp::path::Tail, state: Arc<RwLock<BridgeState>>| {
                let (body, status) = match state.read() {
                    Ok(guard) => match guard.topics.get(tail.as_str()) {
                        Some(payload) => (payload.clone(), StatusCode::OK),
                        None => (
                            json!({ "error": format!("nothing published on {}", tail.as_str()) }),
                            StatusCode::NOT_FOUND,
                        ),
                    },
                    Err(_) => (
                        json!({ "error": "bridge state unavailable" }),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    ),
                };
                warp::reply::with_status(warp::reply::json(&body), status)
            });

        let history_route = warp::path("history")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter)
            .map(|state: Arc<RwLock<BridgeState>>| {
                let (body, status) = match state.read() {
                    Ok(guard) => (
                        Value::Array(guard.history.iter().cloned().collect()),
                        StatusCode::OK,
                    ),
                    Err(_) => (
                        json!({ "error": "bridge state unavailable" }),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    ),
                };
                warp::reply::with_status(warp::reply::json(&body), status)
            });

        let routes = topic_route.or(history_route);
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for HTTP bridge")?;
        let (bound, server) = runtime
            .block_on(async move { warp::serve(routes).try_bind_ephemeral(address) })
            .with_context(|| format!("binding HTTP bridge on {}", address))?;

        thread::Builder::new()
            .name("http-bridge".into())
            .spawn(move || runtime.block_on(server))
            .context("spawning HTTP bridge thread")?;

        info!("[bridge] serving on http://{}", bound);
        Ok(bound)
    }

    #[cfg(test)]
    pub fn latest(&self, topic: &str) -> Option<Value> {
        self.state
            .read()
            .ok()
            .and_then(|guard| guard.topics.get(topic).cloned())
    }

    #[cfg(test)]
    pub fn history(&self) -> Vec<Value> {
        self.state
            .read()
            .map(|guard| guard.history.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl RecordPublisher for HttpBridge {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), SinkError> {
        let value: Value = serde_json::from_str(payload)?;
        let mut guard = self
            .state
            .write()
            .map_err(|_| SinkError::Unavailable("bridge state poisoned".into()))?;
        guard.push(topic, value);
        Ok(())
    }
}
