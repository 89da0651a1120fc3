use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Serialize)]
struct RootResponse {
    message: String,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    jobs_tracked: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_batches: Option<usize>,
}

#[get("/")]
async fn root(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(RootResponse {
        message: format!("{} is running", state.app_name()),
    })
}

/// Health check endpoint
///
/// Reports how many jobs the store holds and how many batches are still running.
/// Use for load balancers and uptime monitors.
#[get("/health")]
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        jobs_tracked: Some(state.store().len()),
        active_batches: Some(state.active_batches()),
    })
}

/// Liveness check endpoint
///
/// Simple check that the process is alive. Does not look at any state.
#[get("/live")]
async fn liveness_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "alive",
        jobs_tracked: None,
        active_batches: None,
    })
}

pub fn health_config(config: &mut web::ServiceConfig) {
    config
        .service(root)
        .service(health_check)
        .service(liveness_check);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ModelSelection;
    use crate::test_support::{runner, wait_terminal};
    use actix_web::{test, App};
    use serde_json::json;
    use std::time::Duration;

    #[actix_web::test]
    async fn health_reports_tracked_jobs() {
        let runner = runner(Duration::from_secs(5));
        let job_id = runner.submit(b"Word\ncat\n".to_vec(), ModelSelection::default()).await;
        wait_terminal(runner.store(), job_id).await;
        runner.drain(Duration::from_secs(5)).await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new("spelling-decks", runner)))
                .configure(health_config),
        )
        .await;

        let health: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(health, json!({"status": "healthy", "jobs_tracked": 1, "active_batches": 0}));

        let live: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/live").to_request()).await;
        assert_eq!(live, json!({"status": "alive"}));

        let root_body: serde_json::Value =
            test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(root_body["message"], "spelling-decks is running");
    }
}
