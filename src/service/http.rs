//! tiny_http transport for [`SignatureService`].
//!
//! The store handle is injected at bind time and owned by the returned
//! [`ServerHandle`]; shutting the handle down stops the workers and closes
//! the store. There is no process-wide connection state.

use crate::config::ServerConfig;
use crate::service::{route, ApiResponse, Route, SignatureService};
use crate::store::SignatureStore;
use crate::{Error, Result};
use log::{debug, error, info, warn};
use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Request, Response, Server};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A running listener. Dropping it without calling [`ServerHandle::shutdown`]
/// leaves the worker threads running for the life of the process.
pub struct ServerHandle<S: SignatureStore + 'static> {
    server: Arc<Server>,
    service: Arc<SignatureService<S>>,
    stopping: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    addr: SocketAddr,
}

impl<S: SignatureStore + 'static> ServerHandle<S> {
    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://host:port`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn service(&self) -> &SignatureService<S> {
        &self.service
    }

    /// Stop accepting requests, wait for in-flight ones, close the store.
    pub fn shutdown(self) -> Result<()> {
        self.stopping.store(true, Ordering::SeqCst);
        for _ in &self.workers {
            self.server.unblock();
        }
        for worker in self.workers {
            if worker.join().is_err() {
                error!("request worker panicked");
            }
        }
        info!("server on {} stopped", self.addr);
        self.service.store().close()
    }
}

/// Bind the listener described by `config` and start serving `store`.
pub fn serve<S>(config: &ServerConfig, store: S) -> Result<ServerHandle<S>>
where
    S: SignatureStore + 'static,
{
    config.validate()?;
    let listen = config.listen_addr();
    let server = Server::http(&listen)
        .map_err(|e| Error::Other(format!("cannot bind {}: {}", listen, e)))?;
    let addr = server
        .server_addr()
        .to_ip()
        .ok_or_else(|| Error::Other(format!("{} is not an IP listener", listen)))?;

    let server = Arc::new(server);
    let service = Arc::new(SignatureService::new(store).with_max_body_bytes(config.max_body_bytes));
    let stopping = Arc::new(AtomicBool::new(false));
    let cors: Option<Arc<str>> = config.cors_origin.as_deref().map(Arc::from);

    let workers = (0..config.workers)
        .map(|n| {
            let server = Arc::clone(&server);
            let service = Arc::clone(&service);
            let stopping = Arc::clone(&stopping);
            let cors = cors.clone();
            thread::Builder::new()
                .name(format!("signbook-worker-{}", n))
                .spawn(move || worker_loop(&server, &service, &stopping, cors.as_deref()))
                .map_err(Error::Io)
        })
        .collect::<Result<Vec<_>>>()?;

    info!("listening on http://{} ({} workers)", addr, workers.len());

    Ok(ServerHandle {
        server,
        service,
        stopping,
        workers,
        addr,
    })
}

fn worker_loop<S: SignatureStore>(
    server: &Server,
    service: &SignatureService<S>,
    stopping: &AtomicBool,
    cors: Option<&str>,
) {
    while !stopping.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => handle_request(service, cors, request),
            Ok(None) => {}
            Err(e) => {
                if !stopping.load(Ordering::SeqCst) {
                    warn!("listener error: {}", e);
                }
                break;
            }
        }
    }
}

fn handle_request<S: SignatureStore>(
    service: &SignatureService<S>,
    cors: Option<&str>,
    mut request: Request,
) {
    let method = request.method().to_string();
    let url = request.url().to_string();

    // Read one byte past the limit so oversized bodies are detectable.
    let limit = service.max_body_bytes() as u64 + 1;
    let mut body = Vec::new();
    let api = match Read::take(request.as_reader(), limit).read_to_end(&mut body) {
        Ok(_) => service.handle(&method, &url, &body),
        Err(e) => ApiResponse::message(400, &format!("failed to read request body: {}", e)),
    };
    debug!("{} {} -> {}", method, url, api.status);

    let mut response = Response::from_data(api.body_bytes()).with_status_code(api.status);
    if let Some(content_type) = api.content_type() {
        add_header(&mut response, "Content-Type", content_type);
    }
    if let Some(origin) = cors {
        add_header(&mut response, "Access-Control-Allow-Origin", origin);
        if route(&method, &url) == Route::Preflight {
            add_header(
                &mut response,
                "Access-Control-Allow-Methods",
                "GET,POST,DELETE,OPTIONS",
            );
            add_header(&mut response, "Access-Control-Allow-Headers", "Content-Type");
        }
    }

    if let Err(e) = request.respond(response) {
        warn!("failed to write response for {} {}: {}", method, url, e);
    }
}

fn add_header<R: Read>(response: &mut Response<R>, name: &str, value: &str) {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(header) => response.add_header(header),
        Err(()) => warn!("dropping invalid header {}: {}", name, value),
    }
}
