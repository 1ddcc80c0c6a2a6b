use crate::config::SigningConfig;
use crate::controller::{Effect, Event, Mode, PlacementJob};
use crate::error::SignError;
use crate::features::document_store::{Document, DocumentStore};
use crate::features::placement::{place_signature, PlacementRequest, TapPoint, Viewport};
use crate::features::screens::{error_ui, render_signing_screen};
use crate::logging;
use crate::state::AppState;

use jni::objects::{JClass, JString};
use jni::sys::jstring;
use jni::JNIEnv;
use log::LevelFilter;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    ptr,
    sync::{mpsc, Arc, Mutex, MutexGuard, OnceLock},
    thread,
};

struct GlobalState {
    ui: OnceLock<Mutex<AppState>>,
    worker: Mutex<Option<WorkerRuntime>>,
    notifications: Mutex<Vec<WorkerResult>>,
}

impl GlobalState {
    const fn new() -> Self {
        Self {
            ui: OnceLock::new(),
            worker: Mutex::new(None),
            notifications: Mutex::new(Vec::new()),
        }
    }

    fn ui_lock(&self) -> MutexGuard<'_, AppState> {
        let ui = self.ui.get_or_init(|| Mutex::new(AppState::default()));
        match ui.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn enqueue(&self, job: WorkerJob) -> Result<(), String> {
        let mut worker = self
            .worker
            .lock()
            .map_err(|_| "worker_lock_poisoned".to_string())?;
        if worker.is_none() {
            *worker = Some(WorkerRuntime::new()?);
        }
        match worker.as_ref() {
            Some(runtime) => runtime.enqueue(job),
            None => Err("worker_unavailable".into()),
        }
    }

    fn push_worker_result(&self, result: WorkerResult) {
        if let Ok(mut guard) = self.notifications.lock() {
            guard.push(result);
        }
    }

    fn drain_worker_results(&self) -> Vec<WorkerResult> {
        self.notifications
            .lock()
            .map(|mut q| q.drain(..).collect())
            .unwrap_or_default()
    }
}

struct WorkerRuntime {
    #[cfg_attr(test, allow(dead_code))]
    sender: mpsc::Sender<WorkerJob>,
}

impl WorkerRuntime {
    fn new() -> Result<Self, String> {
        let (tx, rx) = mpsc::channel::<WorkerJob>();
        thread::Builder::new()
            .name("signpad-worker".into())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    let result = run_worker_job(job);
                    STATE.push_worker_result(result);
                }
            })
            .map_err(|e| format!("worker_spawn_failed:{e}"))?;

        Ok(Self { sender: tx })
    }

    #[cfg(not(test))]
    fn enqueue(&self, job: WorkerJob) -> Result<(), String> {
        self.sender
            .send(job)
            .map_err(|e| format!("worker_send_failed:{e}"))
    }

    // Tests run jobs inline so every command observes its own result.
    #[cfg(test)]
    fn enqueue(&self, job: WorkerJob) -> Result<(), String> {
        let result = run_worker_job(job);
        STATE.push_worker_result(result);
        Ok(())
    }
}

enum WorkerJob {
    Fetch {
        generation: u64,
        store: Arc<DocumentStore>,
        url: String,
        file_name: String,
    },
    Place {
        generation: u64,
        store: Arc<DocumentStore>,
        job: Box<PlacementJob>,
        stem: String,
    },
}

enum WorkerResult {
    Fetch {
        generation: u64,
        value: Result<Document, SignError>,
    },
    Place {
        generation: u64,
        value: Result<Document, SignError>,
    },
}

impl WorkerResult {
    fn generation(&self) -> u64 {
        match self {
            WorkerResult::Fetch { generation, .. } | WorkerResult::Place { generation, .. } => {
                *generation
            }
        }
    }

    fn into_event(self) -> Event {
        match self {
            WorkerResult::Fetch { value, .. } => Event::DownloadFinished(value),
            WorkerResult::Place { value, .. } => Event::PlacementFinished(value),
        }
    }
}

fn run_worker_job(job: WorkerJob) -> WorkerResult {
    match job {
        WorkerJob::Fetch {
            generation,
            store,
            url,
            file_name,
        } => WorkerResult::Fetch {
            generation,
            value: store.fetch(&url, &file_name),
        },
        WorkerJob::Place {
            generation,
            store,
            job,
            stem,
        } => {
            let request = PlacementRequest {
                document: &job.document.bytes,
                page_index: job.tap.page,
                signature_png: &job.signature.bytes,
                tap: job.tap,
                viewport: job.viewport,
                policy: job.policy,
            };
            let value = place_signature(&request).and_then(|out| store.persist(out.bytes, &stem));
            WorkerResult::Place { generation, value }
        }
    }
}

static STATE: GlobalState = GlobalState::new();

#[derive(Deserialize, Default)]
#[serde(default)]
struct Command {
    action: String,
    error: Option<String>,
    config: Option<Value>,
    data: Option<String>,
    page: Option<u32>,
    page_count: Option<u32>,
    x: Option<f64>,
    y: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
}

#[derive(Debug)]
enum Action {
    Init { config: Option<Value> },
    Reset,
    Poll,
    SignDocument,
    SignatureOk { data: String },
    SignatureEmpty,
    SignatureCancel,
    PageLayout { page_count: u32, viewport: Viewport },
    PageTap(TapPoint),
    ExportBase64,
}

fn parse_action(command: Command) -> Result<Action, String> {
    let Command {
        action,
        error,
        config,
        data,
        page,
        page_count,
        x,
        y,
        width,
        height,
    } = command;

    match action.as_str() {
        "init" => Ok(Action::Init { config }),
        "reset" => Ok(Action::Reset),
        "poll" => Ok(Action::Poll),
        "sign_document" => Ok(Action::SignDocument),
        "signature_ok" => Ok(Action::SignatureOk {
            data: data.ok_or_else(|| "missing_signature_data".to_string())?,
        }),
        "signature_empty" => Ok(Action::SignatureEmpty),
        "signature_cancel" => Ok(Action::SignatureCancel),
        "page_layout" => Ok(Action::PageLayout {
            page_count: page_count.unwrap_or(0),
            viewport: Viewport {
                width: width.ok_or_else(|| "missing_width".to_string())?,
                height: height.ok_or_else(|| "missing_height".to_string())?,
            },
        }),
        "page_tap" => Ok(Action::PageTap(TapPoint {
            page: page.ok_or_else(|| "missing_page".to_string())?,
            x: x.ok_or_else(|| "missing_x".to_string())?,
            y: y.ok_or_else(|| "missing_y".to_string())?,
        })),
        "export_base64" => Ok(Action::ExportBase64),
        "error" => Err(error.unwrap_or_else(|| "unknown_error".into())),
        other => Err(format!("unknown_action:{other}")),
    }
}

#[no_mangle]
pub extern "system" fn Java_app_signpad_MainActivity_dispatch(
    mut env: JNIEnv,
    _class: JClass,
    input: JString,
) -> jstring {
    let response = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let input_str: String = env
            .get_string(&input)
            .map(|s| s.into())
            .unwrap_or_else(|_| "{}".to_string());

        let command: Command = serde_json::from_str(&input_str).unwrap_or_else(|_| Command {
            action: "error".into(),
            error: Some("invalid_json".into()),
            ..Command::default()
        });

        handle_command(command)
    }));

    let json_value = match response {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => error_ui(&err),
        Err(_) => error_ui("panic"),
    };

    let output_string = json_value.to_string();
    match env.new_string(output_string) {
        Ok(java_str) => java_str.into_raw(),
        Err(_) => {
            let fallback = error_ui("jni_new_string_failed").to_string();
            env.new_string(fallback)
                .map(|s| s.into_raw())
                .unwrap_or(ptr::null_mut())
        }
    }
}

fn handle_command(command: Command) -> Result<Value, String> {
    let mut state = STATE.ui_lock();
    let parsed = parse_action(command);
    // Results of the session a reset ends must not land first.
    if !matches!(parsed, Ok(Action::Reset)) {
        apply_worker_results(&mut state);
    }

    let action = match parsed {
        Ok(action) => action,
        Err(err) => {
            log::warn!("rejected command: {err}");
            state.session.last_error = Some(err);
            return Ok(render_signing_screen(&state));
        }
    };

    match action {
        Action::Init { config } => handle_init(&mut state, config)?,
        Action::Reset => {
            let dropped = STATE.drain_worker_results().len();
            if dropped > 0 {
                log::debug!("reset discarded {dropped} pending worker results");
            }
            state.reset_runtime();
        }
        Action::Poll => {}
        Action::SignDocument => drive(&mut state, Event::SignRequested),
        Action::SignatureOk { data } => drive(&mut state, Event::SignatureCaptured(data)),
        Action::SignatureEmpty => drive(&mut state, Event::SignatureEmpty),
        Action::SignatureCancel => drive(&mut state, Event::SignatureCancelled),
        Action::PageLayout {
            page_count,
            viewport,
        } => drive(
            &mut state,
            Event::PageLayout {
                page_count,
                viewport,
            },
        ),
        Action::PageTap(tap) => drive(&mut state, Event::PageTapped(tap)),
        Action::ExportBase64 => return Ok(export_active_document(&state)),
    }

    apply_worker_results(&mut state);
    Ok(render_signing_screen(&state))
}

fn handle_init(state: &mut AppState, config: Option<Value>) -> Result<(), String> {
    if let Some(raw) = config {
        let parsed = SigningConfig::from_json(&raw)?;
        logging::init(logging::parse_level(&parsed.log_level).unwrap_or(LevelFilter::Info));
        if state.session.mode == Mode::Idle {
            *state = AppState::new(parsed);
        } else {
            log::debug!("init config ignored: session already started");
        }
    } else {
        logging::init(logging::parse_level(&state.config.log_level).unwrap_or(LevelFilter::Info));
    }
    drive(state, Event::Start);
    Ok(())
}

fn export_active_document(state: &AppState) -> Value {
    let Some(doc) = &state.session.document else {
        return error_ui("no_document");
    };
    match state.store.read_base64(&doc.path) {
        Ok(blob) => json!({
            "type": "Export",
            "path": doc.path.display().to_string(),
            "mime": "application/pdf",
            "base64": blob,
        }),
        Err(err) => {
            log::warn!("export failed: {err}");
            error_ui(err.code())
        }
    }
}

/// Runs one event through the controller and executes the resulting effects.
fn drive(state: &mut AppState, event: Event) {
    let effects = state.apply(event);
    run_effects(state, effects);
}

fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::Log { level, message } => log::log!(level, "{message}"),
            Effect::Fetch { url } => {
                let job = WorkerJob::Fetch {
                    generation: state.generation,
                    store: Arc::clone(&state.store),
                    url,
                    file_name: state.config.source_file_name.clone(),
                };
                if let Err(e) = STATE.enqueue(job) {
                    STATE.push_worker_result(WorkerResult::Fetch {
                        generation: state.generation,
                        value: Err(SignError::Network(e)),
                    });
                }
            }
            Effect::Place(job) => {
                let job = WorkerJob::Place {
                    generation: state.generation,
                    store: Arc::clone(&state.store),
                    job,
                    stem: state.config.output_stem().to_string(),
                };
                if let Err(e) = STATE.enqueue(job) {
                    STATE.push_worker_result(WorkerResult::Place {
                        generation: state.generation,
                        value: Err(SignError::Storage(e)),
                    });
                }
            }
        }
    }
}

fn apply_worker_results(state: &mut AppState) {
    loop {
        let results = STATE.drain_worker_results();
        if results.is_empty() {
            return;
        }
        for result in results {
            // Jobs queued before a reset or re-init belong to a dead session.
            if result.generation() != state.generation {
                log::debug!(
                    "dropped worker result from generation {} (current {})",
                    result.generation(),
                    state.generation
                );
                continue;
            }
            drive(state, result.into_event());
        }
    }
}
