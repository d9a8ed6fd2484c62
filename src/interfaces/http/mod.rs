use crate::application::use_cases::ingestion::IncomingFile;
use crate::application::use_cases::workspace::Workspace;
use crate::domain::analysis::ComplianceStandard;
use crate::domain::error::AppError;
use crate::domain::project::ProjectDetails;
use crate::domain::scenario::{ScenarioDraft, ScenarioId};
use crate::domain::source::{SourceId, SourceOrigin};
use crate::infrastructure::config::HttpConfig;
use actix_cors::Cors;
use actix_web::{
    delete, dev::Server, get, http::StatusCode, post, put, web, App, HttpResponse, HttpServer,
    Responder,
};
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct HttpState {
    pub workspace: Arc<Workspace>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    pub data_base64: String,
}

#[derive(Deserialize)]
pub struct AddSourcesRequest {
    pub files: Vec<UploadedFile>,
}

#[derive(Deserialize)]
pub struct TranscriptRequest {
    pub text: String,
    #[serde(default)]
    pub listening: bool,
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub standards: Vec<ComplianceStandard>,
}

fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(action: &str, err: AppError) -> HttpResponse {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, action, "Request failed");
    } else {
        warn!(error = %err, action, status = status.as_u16(), "Request rejected");
    }
    HttpResponse::build(status).body(err.to_string())
}

fn decode_uploads(files: &[UploadedFile]) -> Result<Vec<IncomingFile>, AppError> {
    files
        .iter()
        .map(|file| {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(file.data_base64.trim())
                .map_err(|e| {
                    AppError::ValidationError(format!("Invalid base64 for {}: {}", file.name, e))
                })?;
            Ok(IncomingFile::from_bytes(&file.name, bytes))
        })
        .collect()
}

#[get("/sources")]
async fn list_sources(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(data.workspace.ingestion.snapshot())
}

#[post("/sources")]
async fn add_sources(
    data: web::Data<HttpState>,
    req: web::Json<AddSourcesRequest>,
) -> impl Responder {
    info!(count = req.files.len(), "Receiving uploaded sources");
    let result = decode_uploads(&req.files).and_then(|files| {
        data.workspace
            .ingestion
            .add_sources(files, SourceOrigin::Upload)
    });
    match result {
        Ok(ids) => HttpResponse::Accepted().json(ids),
        Err(e) => error_response("add_sources", e),
    }
}

#[delete("/sources")]
async fn reset_sources(data: web::Data<HttpState>) -> impl Responder {
    data.workspace.ingestion.reset();
    info!("Sources cleared");
    HttpResponse::NoContent().finish()
}

#[post("/sources/transcript")]
async fn add_transcript(
    data: web::Data<HttpState>,
    req: web::Json<TranscriptRequest>,
) -> impl Responder {
    match data
        .workspace
        .ingestion
        .on_transcript(&req.text, req.listening)
    {
        Ok(id) => HttpResponse::Ok().json(id),
        Err(e) => error_response("add_transcript", e),
    }
}

#[delete("/sources/{id}")]
async fn cancel_source(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let result = path
        .parse::<SourceId>()
        .and_then(|id| data.workspace.ingestion.cancel_source(&id));
    match result {
        Ok(source) => HttpResponse::Ok().json(source),
        Err(e) => error_response("cancel_source", e),
    }
}

#[post("/analysis")]
async fn analyze(data: web::Data<HttpState>, req: web::Json<AnalyzeRequest>) -> impl Responder {
    match data.workspace.analyze(&req.standards).await {
        Ok(handoff) => HttpResponse::Ok().json(handoff),
        Err(e) => error_response("analyze", e),
    }
}

#[get("/standards")]
async fn list_standards() -> impl Responder {
    let standards: Vec<_> = ComplianceStandard::ALL
        .iter()
        .map(|standard| json!({ "id": standard.id(), "label": standard.label() }))
        .collect();
    HttpResponse::Ok().json(standards)
}

#[get("/analysis/status")]
async fn analysis_status(data: web::Data<HttpState>) -> impl Responder {
    let analysis = &data.workspace.analysis;
    HttpResponse::Ok().json(json!({
        "pending": analysis.is_pending(),
        "result": analysis.last_result(),
    }))
}

#[get("/analysis/handoff")]
async fn get_handoff(data: web::Data<HttpState>) -> impl Responder {
    match data.workspace.handoff() {
        Some(handoff) => HttpResponse::Ok().json(handoff),
        None => HttpResponse::NotFound().body("No analysis result available"),
    }
}

#[delete("/analysis/handoff")]
async fn take_handoff(data: web::Data<HttpState>) -> impl Responder {
    match data.workspace.take_handoff() {
        Some(handoff) => HttpResponse::Ok().json(handoff),
        None => HttpResponse::NotFound().body("No analysis result available"),
    }
}

#[post("/project-details")]
async fn project_details(data: web::Data<HttpState>) -> impl Responder {
    match data.workspace.parse_project_details().await {
        Ok(details) => HttpResponse::Ok().json(details),
        Err(e) => error_response("project_details", e),
    }
}

#[get("/project-details")]
async fn get_project_details(data: web::Data<HttpState>) -> impl Responder {
    match data.workspace.project_details() {
        Some(details) => HttpResponse::Ok().json(details),
        None => HttpResponse::NotFound().body("No project details confirmed"),
    }
}

#[put("/project-details")]
async fn confirm_project_details(
    data: web::Data<HttpState>,
    req: web::Json<ProjectDetails>,
) -> impl Responder {
    match data.workspace.confirm_project_details(req.into_inner()) {
        Ok(details) => HttpResponse::Ok().json(details),
        Err(e) => error_response("confirm_project_details", e),
    }
}

#[get("/scenarios")]
async fn list_scenarios(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(data.workspace.scenarios.list())
}

#[post("/scenarios")]
async fn add_scenario(data: web::Data<HttpState>, req: web::Json<ScenarioDraft>) -> impl Responder {
    match data.workspace.scenarios.add(req.into_inner()) {
        Ok(scenario) => HttpResponse::Created().json(scenario),
        Err(e) => error_response("add_scenario", e),
    }
}

#[post("/scenarios/import")]
async fn import_scenarios(data: web::Data<HttpState>) -> impl Responder {
    match data.workspace.import_handoff() {
        Ok(created) => HttpResponse::Ok().json(created),
        Err(e) => error_response("import_scenarios", e),
    }
}

#[put("/scenarios/{id}")]
async fn edit_scenario(
    data: web::Data<HttpState>,
    path: web::Path<String>,
    req: web::Json<ScenarioDraft>,
) -> impl Responder {
    let id = ScenarioId::from(path.into_inner());
    match data.workspace.scenarios.edit(&id, req.into_inner()).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => error_response("edit_scenario", e),
    }
}

#[get("/scenarios/{id}/impact")]
async fn pending_impact(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let id = ScenarioId::from(path.into_inner());
    match data.workspace.scenarios.pending_analysis(&id) {
        Some(analysis) => HttpResponse::Ok().json(json!({ "scenarioId": id, "analysis": analysis })),
        None => HttpResponse::NotFound().body(format!("No pending edit for {}", id)),
    }
}

#[post("/scenarios/{id}/confirm")]
async fn confirm_edit(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let id = ScenarioId::from(path.into_inner());
    match data.workspace.scenarios.confirm_edit(&id) {
        Ok(scenario) => HttpResponse::Ok().json(scenario),
        Err(e) => error_response("confirm_edit", e),
    }
}

#[post("/scenarios/{id}/cancel")]
async fn cancel_edit(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let id = ScenarioId::from(path.into_inner());
    match data.workspace.scenarios.cancel_edit(&id) {
        Ok(scenario) => HttpResponse::Ok().json(scenario),
        Err(e) => error_response("cancel_edit", e),
    }
}

#[delete("/scenarios/{id}")]
async fn delete_scenario(data: web::Data<HttpState>, path: web::Path<String>) -> impl Responder {
    let id = ScenarioId::from(path.into_inner());
    match data.workspace.scenarios.delete(&id) {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => error_response("delete_scenario", e),
    }
}

#[post("/scenarios/{id}/generate")]
async fn generate_test_cases(
    data: web::Data<HttpState>,
    path: web::Path<String>,
) -> impl Responder {
    let id = ScenarioId::from(path.into_inner());
    match data.workspace.scenarios.generate_test_cases(&id).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => error_response("generate_test_cases", e),
    }
}

#[get("/notifications")]
async fn notifications(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(data.workspace.notifications.recent())
}

fn api_scope() -> actix_web::Scope {
    web::scope("/api")
        .service(list_sources)
        .service(add_transcript)
        .service(add_sources)
        .service(reset_sources)
        .service(cancel_source)
        .service(list_standards)
        .service(analyze)
        .service(analysis_status)
        .service(get_handoff)
        .service(take_handoff)
        .service(project_details)
        .service(get_project_details)
        .service(confirm_project_details)
        .service(list_scenarios)
        .service(import_scenarios)
        .service(add_scenario)
        .service(edit_scenario)
        .service(pending_impact)
        .service(confirm_edit)
        .service(cancel_edit)
        .service(delete_scenario)
        .service(generate_test_cases)
        .service(notifications)
}

pub fn start_server(workspace: Arc<Workspace>, config: &HttpConfig) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { workspace });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .service(api_scope())
    })
    .bind((config.host.as_str(), config.port))?
    .run();

    info!(host = %config.host, port = config.port, "HTTP API listening");
    Ok(server)
}
