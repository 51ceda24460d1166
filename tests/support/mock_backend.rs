//! In-process JSON-RPC double for the provisioning backend. Scenario tests
//! script it with failure injection and readiness sequences, then drive the
//! real `ApiClient` against it.

use std::{
    collections::{BTreeMap, HashSet},
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Method, Request, Response, Server, StatusCode};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// One scripted readiness reply.
#[derive(Clone, Copy, Debug)]
pub enum ReadinessReply {
    Ready,
    NotReady(&'static str),
    /// Answer the probe with an HTTP 500 so the client sees a transport
    /// failure rather than a JSON-RPC reply.
    TransportFailure,
}

/// A recorded train submission: module id, seed, optional neural net id.
pub type TrainCall = (String, u64, Option<String>);

/// A recorded evaluate submission: module id, model id.
pub type EvaluateCall = (String, String);

#[derive(Clone)]
pub struct BackendState {
    inner: Arc<StateInner>,
}

struct StateInner {
    workspace: RwLock<Value>,
    modules: RwLock<Vec<Value>>,
    models: RwLock<Vec<Value>>,
    neural_nets: RwLock<Vec<Value>>,
    module_map: RwLock<BTreeMap<String, String>>,
    readiness_plan: Mutex<Vec<ReadinessReply>>,
    readiness_fallback: Mutex<ReadinessReply>,
    failing_trains: RwLock<HashSet<String>>,
    save_mapping_fails: AtomicBool,
    get_workspace_fails: AtomicBool,
    job_counter: AtomicU64,
    trains: Mutex<Vec<TrainCall>>,
    evaluations: Mutex<Vec<EvaluateCall>>,
    calls: Mutex<Vec<String>>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StateInner {
                workspace: RwLock::new(json!({
                    "id": "pending",
                    "name": "Pending Workspace",
                    "selected_modules": [],
                    "seed": 1337
                })),
                modules: RwLock::new(Vec::new()),
                models: RwLock::new(Vec::new()),
                neural_nets: RwLock::new(Vec::new()),
                module_map: RwLock::new(BTreeMap::new()),
                readiness_plan: Mutex::new(Vec::new()),
                readiness_fallback: Mutex::new(ReadinessReply::Ready),
                failing_trains: RwLock::new(HashSet::new()),
                save_mapping_fails: AtomicBool::new(false),
                get_workspace_fails: AtomicBool::new(false),
                job_counter: AtomicU64::new(0),
                trains: Mutex::new(Vec::new()),
                evaluations: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn set_workspace(&self, selected: &[&str], seed: u64) -> &Self {
        *self.inner.workspace.write().unwrap() = json!({
            "id": "pending",
            "name": "Pending Workspace",
            "selected_modules": selected,
            "seed": seed
        });
        self
    }

    pub fn add_module(&self, id: &str, capability: &str, task: &str) -> &Self {
        self.inner.modules.write().unwrap().push(json!({
            "id": id,
            "name": id,
            "version": "1.0.0",
            "capabilities": [capability],
            "task": task,
            "ui_panels": []
        }));
        self
    }

    pub fn add_model(&self, id: &str, capability: &str, task: &str) -> &Self {
        self.inner.models.write().unwrap().push(json!({
            "id": id,
            "name": id,
            "capability": capability,
            "task": task
        }));
        self
    }

    pub fn add_neural_net(&self, id: &str, task: &str) -> &Self {
        self.inner.neural_nets.write().unwrap().push(json!({
            "id": id,
            "name": id,
            "family": "transformer",
            "task": task,
            "init": { "scheme": "xavier", "seed": 1337 }
        }));
        self
    }

    pub fn map_module(&self, module_id: &str, model_id: &str) -> &Self {
        self.inner
            .module_map
            .write()
            .unwrap()
            .insert(module_id.to_owned(), model_id.to_owned());
        self
    }

    pub fn fail_training_for(&self, module_id: &str) -> &Self {
        self.inner
            .failing_trains
            .write()
            .unwrap()
            .insert(module_id.to_owned());
        self
    }

    pub fn fail_save_mapping(&self) -> &Self {
        self.inner.save_mapping_fails.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_get_workspace(&self) -> &Self {
        self.inner.get_workspace_fails.store(true, Ordering::SeqCst);
        self
    }

    /// Scripts the next probes in order; once drained, `fallback` repeats.
    pub fn readiness_plan(&self, replies: Vec<ReadinessReply>, fallback: ReadinessReply) -> &Self {
        *self.inner.readiness_plan.lock().unwrap() = replies;
        *self.inner.readiness_fallback.lock().unwrap() = fallback;
        self
    }

    pub fn module_map(&self) -> BTreeMap<String, String> {
        self.inner.module_map.read().unwrap().clone()
    }

    pub fn trains(&self) -> Vec<TrainCall> {
        self.inner.trains.lock().unwrap().clone()
    }

    pub fn evaluations(&self) -> Vec<EvaluateCall> {
        self.inner.evaluations.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().unwrap().clone()
    }

    fn record_call(&self, method: &str) {
        self.inner.calls.lock().unwrap().push(method.to_owned());
    }

    fn next_readiness(&self) -> ReadinessReply {
        let mut plan = self.inner.readiness_plan.lock().unwrap();
        if plan.is_empty() {
            *self.inner.readiness_fallback.lock().unwrap()
        } else {
            plan.remove(0)
        }
    }

    fn module_capability_task(&self, module_id: &str) -> (String, String) {
        let modules = self.inner.modules.read().unwrap();
        let module = modules
            .iter()
            .find(|module| module["id"].as_str() == Some(module_id));
        match module {
            Some(module) => (
                module["capabilities"][0].as_str().unwrap_or("generic").to_owned(),
                module["task"].as_str().unwrap_or_default().to_owned(),
            ),
            None => ("generic".to_owned(), String::new()),
        }
    }
}

enum Reply {
    Result(Value),
    Error { code: i64, message: String },
    Transport,
}

fn dispatch(state: &BackendState, method: &str, params: &[Value]) -> Reply {
    match method {
        "health" => Reply::Result(json!({ "status": "ok", "offline": true })),
        "get_workspace" => {
            if state.inner.get_workspace_fails.load(Ordering::SeqCst) {
                return Reply::Error {
                    code: -32000,
                    message: "workspace store unavailable".into(),
                };
            }
            Reply::Result(state.inner.workspace.read().unwrap().clone())
        }
        "save_workspace" => {
            let selected = params.first().cloned().unwrap_or_else(|| json!([]));
            let name = params
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or("Pending Workspace");
            let seed = params.get(2).and_then(Value::as_u64).unwrap_or(1337);
            let snapshot = json!({
                "id": "pending",
                "name": name,
                "selected_modules": selected,
                "seed": seed
            });
            *state.inner.workspace.write().unwrap() = snapshot.clone();
            Reply::Result(json!({ "ok": true, "workspace": snapshot }))
        }
        "list_modules" => {
            Reply::Result(json!({ "modules": *state.inner.modules.read().unwrap() }))
        }
        "list_models" => Reply::Result(json!({ "models": *state.inner.models.read().unwrap() })),
        "list_neural_nets" => {
            Reply::Result(json!({ "neural_nets": *state.inner.neural_nets.read().unwrap() }))
        }
        "get_mapping" => {
            Reply::Result(json!({ "module_map": *state.inner.module_map.read().unwrap() }))
        }
        "save_mapping" => {
            if state.inner.save_mapping_fails.load(Ordering::SeqCst) {
                return Reply::Error {
                    code: -32000,
                    message: "mapping store is read-only".into(),
                };
            }
            if let Some(map) = params.first().and_then(Value::as_object) {
                let mut stored = state.inner.module_map.write().unwrap();
                stored.clear();
                for (module_id, model_id) in map {
                    if let Some(model_id) = model_id.as_str() {
                        stored.insert(module_id.clone(), model_id.to_owned());
                    }
                }
            }
            Reply::Result(json!({ "ok": true }))
        }
        "train" => {
            let module_id = params
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            let seed = params.get(1).and_then(Value::as_u64).unwrap_or(1337);
            let nn_id = params
                .get(2)
                .and_then(Value::as_str)
                .map(str::to_owned);
            state
                .inner
                .trains
                .lock()
                .unwrap()
                .push((module_id.clone(), seed, nn_id));

            if state
                .inner
                .failing_trains
                .read()
                .unwrap()
                .contains(&module_id)
            {
                return Reply::Error {
                    code: -32000,
                    message: format!("train failed: no dataset for {module_id}"),
                };
            }

            let job = state.inner.job_counter.fetch_add(1, Ordering::SeqCst);
            let model_id = format!("{module_id}_model_{seed}");
            let (capability, task) = state.module_capability_task(&module_id);
            state.inner.models.write().unwrap().push(json!({
                "id": model_id,
                "name": model_id,
                "capability": capability,
                "task": task,
                "train_seed": seed
            }));
            Reply::Result(json!({
                "ok": true,
                "job": {
                    "job_id": format!("train_{job:010}"),
                    "status": "finished",
                    "result": { "model_id": model_id }
                }
            }))
        }
        "evaluate" => {
            let module_id = params
                .first()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            let seed = params.get(1).and_then(Value::as_u64).unwrap_or(1337);
            let model_id = params
                .get(2)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            state
                .inner
                .evaluations
                .lock()
                .unwrap()
                .push((module_id, model_id));
            let job = state.inner.job_counter.fetch_add(1, Ordering::SeqCst);
            Reply::Result(json!({
                "ok": true,
                "job": {
                    "job_id": format!("evaluate_{job:010}"),
                    "status": "finished",
                    "result": { "accuracy": 0.91, "seed": seed }
                }
            }))
        }
        "readiness" => match state.next_readiness() {
            ReadinessReply::Ready => Reply::Result(json!({ "status": "ready", "errors": [] })),
            ReadinessReply::NotReady(code) => Reply::Result(json!({
                "status": "not_ready",
                "errors": [{
                    "error_code": code,
                    "human_message": format!("Workspace blocked by {code}."),
                    "hint": "Fix the reported item, then retry.",
                    "where_to_find_logs": "artifacts/logs/workspace.txt"
                }]
            })),
            ReadinessReply::TransportFailure => Reply::Transport,
        },
        unknown => Reply::Error {
            code: -32601,
            message: format!("method {unknown} not found"),
        },
    }
}

async fn serve(state: BackendState, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    if req.method() != Method::POST {
        return Ok(status_response(StatusCode::METHOD_NOT_ALLOWED));
    }
    if req.headers().get("Authorization").is_none() {
        return Ok(status_response(StatusCode::UNAUTHORIZED));
    }

    let bytes = match body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(_) => return Ok(status_response(StatusCode::BAD_REQUEST)),
    };
    let request: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(_) => return Ok(status_response(StatusCode::BAD_REQUEST)),
    };

    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = request
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let params = request
        .get("params")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    state.record_call(&method);

    let response = match dispatch(&state, &method, &params) {
        Reply::Result(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Reply::Error { code, message } => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }),
        Reply::Transport => return Ok(status_response(StatusCode::INTERNAL_SERVER_ERROR)),
    };

    Ok(json_response(&response))
}

fn json_response(value: &Value) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Body::from(value.to_string()))
        .expect("static response should build")
}

fn status_response(status: StatusCode) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::empty())
        .expect("static response should build")
}

/// The mock backend's HTTP server handle.
pub struct MockBackend {
    pub state: BackendState,
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start(state: BackendState) -> Result<Self> {
        let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
        let service_state = state.clone();
        let make_service = make_service_fn(move |_conn| {
            let state = service_state.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let state = state.clone();
                    serve(state, req)
                }))
            }
        });

        let server = Server::try_bind(&addr)
            .context("failed to bind mock backend")?
            .serve(make_service);
        let addr = server.local_addr();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock backend server error: {err}");
            }
        });

        Ok(Self {
            state,
            addr,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = self.handle.await;
    }
}
