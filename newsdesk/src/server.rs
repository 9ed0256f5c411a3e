use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::fs::FileServer;
use rocket::http::{Header, Status};
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{catch, catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use serde::{Deserialize, Serialize};

use common::ServerConfig;

use crate::error::Error;
use crate::jobs::JobStatus;
use crate::models::{CollectParams, GeneratedItem, GenerateRequest, NewsCollection};
use crate::pipeline::Pipeline;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            started_at: Utc::now(),
            pipeline,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(default)]
    pub uptime_seconds: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobStarted {
    pub job_id: String,
    pub total_expected: usize,
}

/// Body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

/// `Error` rendered as `{error, detail}` with a matching status
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    fn status(&self) -> Status {
        match self.0 {
            Error::Validation(_) => Status::UnprocessableEntity,
            Error::NotFound(_) => Status::NotFound,
            Error::ProviderUnavailable => Status::ServiceUnavailable,
            Error::Generation(_)
            | Error::Store(_)
            | Error::Database(_)
            | Error::Io(_)
            | Error::Serialization(_) => Status::InternalServerError,
        }
    }

    fn label(&self) -> &'static str {
        match self.0 {
            Error::Validation(_) => "Validation error",
            Error::NotFound(_) => "Not found",
            Error::Generation(_) => "Generation failed",
            Error::ProviderUnavailable => "News provider unavailable",
            _ => "Internal server error",
        }
    }

    fn detail(&self) -> String {
        match &self.0 {
            Error::Validation(m) | Error::NotFound(m) | Error::Generation(m) => m.clone(),
            other => other.to_string(),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            tracing::error!(path = %req.uri(), "server: {}", self.0);
        } else {
            tracing::warn!(path = %req.uri(), "server: {}", self.0);
        }
        let body = Json(ErrorBody {
            error: self.label().to_string(),
            detail: self.detail(),
        });
        Response::build_from(body.respond_to(req)?).status(status).ok()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[get("/")]
async fn index(state: &State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running".into(),
        version: VERSION.into(),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

#[get("/health")]
async fn health(state: &State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: VERSION.into(),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

#[post("/api/news/collect?<count>&<days>")]
async fn collect_news(
    state: &State<AppState>,
    count: Option<&str>,
    days: Option<&str>,
) -> ApiResult<NewsCollection> {
    let params = CollectParams::from_query(count, days)?;
    Ok(Json(state.pipeline.collect(params).await?))
}

#[post("/api/generate", data = "<body>")]
async fn generate(
    state: &State<AppState>,
    body: Json<GenerateRequest>,
) -> ApiResult<Vec<GeneratedItem>> {
    Ok(Json(state.pipeline.generate(&body).await?))
}

#[post("/api/generate/async", data = "<body>")]
async fn generate_async(
    state: &State<AppState>,
    body: Json<GenerateRequest>,
) -> ApiResult<JobStarted> {
    let (job_id, total_expected) = state.pipeline.generate_async(body.into_inner()).await?;
    Ok(Json(JobStarted {
        job_id,
        total_expected,
    }))
}

#[get("/api/generate/status/<job_id>")]
async fn generate_status(state: &State<AppState>, job_id: &str) -> ApiResult<JobStatus> {
    Ok(Json(state.pipeline.tracker().status(job_id).await?))
}

/// CORS preflight for browser clients on other origins
#[options("/<_..>")]
fn preflight() -> Status {
    Status::NoContent
}

#[catch(default)]
fn json_catcher(status: Status, req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    let error = status.reason().unwrap_or("Error").to_string();
    let detail = match status.code {
        404 => format!("No route for {} {}", req.method(), req.uri()),
        422 => "Request body could not be parsed".to_string(),
        _ => error.clone(),
    };
    (status, Json(ErrorBody { error, detail }))
}

/// Adds permissive CORS headers to every response
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "CORS headers",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _req: &'r Request<'_>, res: &mut Response<'r>) {
        res.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        res.set_header(Header::new("Access-Control-Allow-Methods", "GET, POST, OPTIONS"));
        res.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
    }
}

/// Assemble the Rocket instance without launching it (tests drive it with a local client).
pub fn build_rocket(state: AppState, figment: rocket::figment::Figment, static_dir: Option<PathBuf>) -> Rocket<Build> {
    let mut rocket = rocket::custom(figment)
        .manage(state)
        .attach(Cors)
        .mount(
            "/",
            routes![
                index,
                health,
                collect_news,
                generate,
                generate_async,
                generate_status,
                preflight,
            ],
        )
        .register("/", catchers![json_catcher]);

    match static_dir {
        Some(dir) if dir.is_dir() => {
            tracing::info!(dir = %dir.display(), "server: serving web UI at /ui");
            rocket = rocket.mount("/ui", FileServer::from(dir));
        }
        Some(dir) => tracing::warn!(dir = %dir.display(), "server: static directory missing, web UI disabled"),
        None => {}
    }

    rocket
}

/// Build and launch the HTTP server; returns when Rocket shuts down.
pub async fn launch_rocket(state: AppState, server: &ServerConfig) -> Result<()> {
    let mut fig = rocket::Config::figment();
    if let Some(bind) = &server.bind {
        fig = fig.merge(("address", bind.clone()));
    }
    if let Some(port) = server.port {
        fig = fig.merge(("port", port));
    }

    let static_dir = server
        .static_dir
        .clone()
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("static")));

    tracing::info!("Starting Rocket HTTP server");
    build_rocket(state, fig, static_dir)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
