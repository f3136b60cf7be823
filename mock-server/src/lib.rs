//! In-memory stand-in for the storage and job service.
//!
//! Jobs "run" instantly: ending a job's input marks it done and synthesizes
//! one output object per input for map-only jobs, or a single reducer output
//! otherwise. Errors use the service's `{"code","message"}` JSON shape.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Phase {
    #[serde(rename = "type")]
    pub phase_type: String,
    pub exec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

#[derive(Deserialize)]
pub struct CreateJob {
    #[serde(default)]
    pub name: String,
    pub phases: Vec<Phase>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub errors: u64,
    pub outputs: u64,
    pub retries: u64,
    pub tasks: u64,
    pub tasks_done: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub name: String,
    pub state: String,
    pub cancelled: bool,
    pub input_done: bool,
    pub stats: Stats,
    pub phases: Vec<Phase>,
    pub time_created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_done: Option<String>,
}

#[derive(Clone, Debug)]
struct JobRecord {
    account: String,
    job: Job,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

#[derive(Clone, Debug)]
struct StoredObject {
    content_type: String,
    data: Bytes,
    etag: String,
}

#[derive(Default)]
pub struct Store {
    jobs: RwLock<Vec<JobRecord>>,
    objects: RwLock<HashMap<String, StoredObject>>,
    secret: Option<Vec<u8>>,
}

pub type Db = Arc<Store>;

/// Router that only checks the presence of `date` and `Authorization`.
pub fn app() -> Router {
    router(Arc::new(Store::default()))
}

/// Router that also verifies `hmac-sha256` signatures made with `secret`.
pub fn app_with_secret(secret: impl Into<Vec<u8>>) -> Router {
    router(Arc::new(Store {
        secret: Some(secret.into()),
        ..Store::default()
    }))
}

fn router(db: Db) -> Router {
    Router::new()
        .route("/{account}/jobs", get(list_jobs).post(create_job))
        .route("/{account}/jobs/{id}/live/status", get(get_status))
        .route("/{account}/jobs/{id}/live/in", get(get_inputs).post(add_inputs))
        .route("/{account}/jobs/{id}/live/in/end", post(end_input))
        .route("/{account}/jobs/{id}/live/cancel", post(cancel_job))
        .route("/{account}/jobs/{id}/live/out", get(get_outputs))
        .route("/{account}/jobs/{id}/live/fail", get(get_failures))
        .route(
            "/{account}/stor/{*path}",
            get(get_object).put(put_object).delete(delete_object),
        )
        .layer(middleware::from_fn_with_state(db.clone(), require_signature))
        .with_state(db)
}

pub async fn run(listener: TcpListener, secret: Option<Vec<u8>>) -> Result<(), std::io::Error> {
    let app = match secret {
        Some(secret) => app_with_secret(secret),
        None => app(),
    };
    axum::serve(listener, app).await
}

fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "code": code, "message": message.into() });
    (status, Json(body)).into_response()
}

fn job_not_found(id: &str) -> Response {
    error(StatusCode::NOT_FOUND, "ResourceNotFound", format!("job {id} was not found"))
}

fn now() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

fn line_listing(lines: &[String], content_type: &str) -> Response {
    let mut body = lines.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::HeaderName::from_static("result-set-size"), lines.len().to_string()),
        ],
        body,
    )
        .into_response()
}

async fn require_signature(State(db): State<Db>, req: Request, next: Next) -> Response {
    let headers = req.headers();
    let Some(date) = headers.get("date").and_then(|v| v.to_str().ok()) else {
        return error(StatusCode::UNAUTHORIZED, "InvalidCredentials", "date header is required");
    };
    let Some(authorization) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return error(StatusCode::UNAUTHORIZED, "InvalidCredentials", "authorization header is required");
    };
    if let Some(secret) = &db.secret {
        if !signature_matches(secret, date, authorization) {
            return error(StatusCode::UNAUTHORIZED, "InvalidSignature", "the signature we calculated does not match the one you sent");
        }
    }
    next.run(req).await
}

fn signature_matches(secret: &[u8], date: &str, authorization: &str) -> bool {
    let Some(params) = authorization.strip_prefix("Signature ") else {
        return false;
    };
    let Some(signature) = params.split(',').find_map(|param| {
        param
            .trim()
            .strip_prefix("signature=\"")
            .and_then(|v| v.strip_suffix('"'))
    }) else {
        return false;
    };
    let Ok(provided) = B64.decode(signature) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("date: {date}").as_bytes());
    mac.verify_slice(&provided).is_ok()
}

async fn create_job(
    State(db): State<Db>,
    Path(account): Path<String>,
    body: Bytes,
) -> Response {
    let input: CreateJob = match serde_json::from_slice(&body) {
        Ok(input) => input,
        Err(err) => return error(StatusCode::BAD_REQUEST, "InvalidArgument", format!("invalid job: {err}")),
    };
    if input.phases.is_empty() {
        return error(StatusCode::CONFLICT, "InvalidArgument", "job must have at least one phase");
    }
    let id = Uuid::new_v4().to_string();
    let job = Job {
        id: id.clone(),
        name: input.name,
        state: "running".to_string(),
        cancelled: false,
        input_done: false,
        stats: Stats::default(),
        phases: input.phases,
        time_created: now(),
        time_done: None,
    };
    db.jobs.write().await.push(JobRecord {
        account: account.clone(),
        job,
        inputs: Vec::new(),
        outputs: Vec::new(),
    });
    tracing::debug!(%account, %id, "job created");
    (
        StatusCode::CREATED,
        [(header::LOCATION, format!("/{account}/jobs/{id}"))],
    )
        .into_response()
}

#[derive(Deserialize)]
struct ListQuery {
    state: Option<String>,
    limit: Option<usize>,
    marker: Option<String>,
}

#[derive(Serialize)]
struct ListEntry<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    entry_type: &'a str,
    mtime: &'a str,
}

async fn list_jobs(
    State(db): State<Db>,
    Path(account): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    let jobs = db.jobs.read().await;
    let mut matching: Vec<&JobRecord> = jobs
        .iter()
        .filter(|r| r.account == account)
        .filter(|r| query.state.as_deref().map_or(true, |state| r.job.state == state))
        .collect();
    if let Some(marker) = &query.marker {
        if let Some(pos) = matching.iter().position(|r| &r.job.id == marker) {
            matching = matching.split_off(pos + 1);
        }
    }
    if let Some(limit) = query.limit {
        matching.truncate(limit);
    }
    let lines: Vec<String> = matching
        .iter()
        .map(|r| {
            serde_json::to_string(&ListEntry {
                name: &r.job.id,
                entry_type: "directory",
                mtime: &r.job.time_created,
            })
            .unwrap_or_default()
        })
        .collect();
    line_listing(&lines, "application/x-json-stream; type=directory")
}

async fn get_status(State(db): State<Db>, Path((account, id)): Path<(String, String)>) -> Response {
    let jobs = db.jobs.read().await;
    match find(&jobs, &account, &id) {
        Some(record) => Json(record.job.clone()).into_response(),
        None => job_not_found(&id),
    }
}

async fn add_inputs(
    State(db): State<Db>,
    Path((account, id)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let Ok(body) = std::str::from_utf8(&body) else {
        return error(StatusCode::BAD_REQUEST, "InvalidArgument", "job inputs must be UTF-8 text");
    };
    let mut jobs = db.jobs.write().await;
    let Some(record) = find_mut(&mut jobs, &account, &id) else {
        return job_not_found(&id);
    };
    if record.job.input_done {
        return error(StatusCode::CONFLICT, "InvalidJobState", format!("job {id} is not accepting input"));
    }
    let added: Vec<String> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    record.job.stats.tasks += added.len() as u64;
    record.inputs.extend(added);
    StatusCode::NO_CONTENT.into_response()
}

async fn get_inputs(State(db): State<Db>, Path((account, id)): Path<(String, String)>) -> Response {
    let jobs = db.jobs.read().await;
    match find(&jobs, &account, &id) {
        Some(record) => line_listing(&record.inputs, "text/plain"),
        None => job_not_found(&id),
    }
}

async fn end_input(State(db): State<Db>, Path((account, id)): Path<(String, String)>) -> Response {
    let mut jobs = db.jobs.write().await;
    let Some(record) = find_mut(&mut jobs, &account, &id) else {
        return job_not_found(&id);
    };
    if record.job.input_done {
        return error(StatusCode::CONFLICT, "InvalidJobState", format!("job {id} input is already closed"));
    }
    record.job.input_done = true;
    finish(record);
    StatusCode::ACCEPTED.into_response()
}

async fn cancel_job(State(db): State<Db>, Path((account, id)): Path<(String, String)>) -> Response {
    let mut jobs = db.jobs.write().await;
    let Some(record) = find_mut(&mut jobs, &account, &id) else {
        return job_not_found(&id);
    };
    if record.job.state == "done" {
        return error(StatusCode::CONFLICT, "InvalidJobState", format!("job {id} is already done"));
    }
    record.job.cancelled = true;
    record.job.input_done = true;
    record.job.state = "done".to_string();
    record.job.time_done = Some(now());
    StatusCode::ACCEPTED.into_response()
}

async fn get_outputs(State(db): State<Db>, Path((account, id)): Path<(String, String)>) -> Response {
    let jobs = db.jobs.read().await;
    match find(&jobs, &account, &id) {
        Some(record) => line_listing(&record.outputs, "text/plain"),
        None => job_not_found(&id),
    }
}

async fn get_failures(State(db): State<Db>, Path((account, id)): Path<(String, String)>) -> Response {
    let jobs = db.jobs.read().await;
    match find(&jobs, &account, &id) {
        Some(_) => line_listing(&[], "text/plain"),
        None => job_not_found(&id),
    }
}

fn find<'a>(jobs: &'a [JobRecord], account: &str, id: &str) -> Option<&'a JobRecord> {
    jobs.iter().find(|r| r.account == account && r.job.id == id)
}

fn find_mut<'a>(jobs: &'a mut [JobRecord], account: &str, id: &str) -> Option<&'a mut JobRecord> {
    jobs.iter_mut().find(|r| r.account == account && r.job.id == id)
}

/// Mark the job done and synthesize its outputs.
fn finish(record: &mut JobRecord) {
    let base = format!("/{}/jobs/{}/stor", record.account, record.job.id);
    let has_reduce = record.job.phases.iter().any(|p| p.phase_type == "reduce");
    let last_phase = record.job.phases.len().saturating_sub(1);
    record.outputs = if has_reduce {
        vec![format!("{base}/reduce.{last_phase}.{}", Uuid::new_v4())]
    } else {
        record
            .inputs
            .iter()
            .map(|input| format!("{base}{input}.{last_phase}.{}", Uuid::new_v4()))
            .collect()
    };
    record.job.stats.tasks_done = record.job.stats.tasks;
    record.job.stats.outputs = record.outputs.len() as u64;
    record.job.state = "done".to_string();
    record.job.time_done = Some(now());
}

async fn put_object(
    State(db): State<Db>,
    Path((account, path)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let object = StoredObject {
        content_type,
        data: body,
        etag: Uuid::new_v4().to_string(),
    };
    db.objects
        .write()
        .await
        .insert(format!("/{account}/stor/{path}"), object);
    StatusCode::NO_CONTENT.into_response()
}

async fn get_object(State(db): State<Db>, Path((account, path)): Path<(String, String)>) -> Response {
    let key = format!("/{account}/stor/{path}");
    let objects = db.objects.read().await;
    match objects.get(&key) {
        Some(object) => (
            [
                (header::CONTENT_TYPE, object.content_type.clone()),
                (header::ETAG, object.etag.clone()),
            ],
            object.data.clone(),
        )
            .into_response(),
        None => error(StatusCode::NOT_FOUND, "ResourceNotFound", format!("{key} was not found")),
    }
}

async fn delete_object(State(db): State<Db>, Path((account, path)): Path<(String, String)>) -> Response {
    let key = format!("/{account}/stor/{path}");
    match db.objects.write().await.remove(&key) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error(StatusCode::NOT_FOUND, "ResourceNotFound", format!("{key} was not found")),
    }
}
