pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::export::handlers as export;
use crate::projects::handlers as projects;
use crate::prompts::handlers as prompts;
use crate::report::handlers as report;
use crate::state::AppState;
use crate::uploads::handlers as uploads;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // Projects
        .route(
            "/api/projects",
            get(projects::handle_list_projects).post(projects::handle_create_project),
        )
        .route(
            "/api/projects/:id",
            get(projects::handle_get_project)
                .put(projects::handle_rename_project)
                .delete(projects::handle_delete_project),
        )
        .route(
            "/api/projects/:id/chapters",
            get(projects::handle_get_chapters).put(projects::handle_save_chapters),
        )
        .route(
            "/api/projects/:id/chapters/:chapter_id/data",
            get(projects::handle_get_chapter_data).post(projects::handle_save_chapter_data),
        )
        .route(
            "/api/projects/:id/clear-generated",
            post(projects::handle_clear_generated),
        )
        .route("/api/projects/:id/seed", post(projects::handle_seed_project))
        // Uploads
        .route("/api/upload/data", post(uploads::handle_upload_data))
        .route("/api/upload/example", post(uploads::handle_upload_example))
        .route("/api/upload/examples", get(uploads::handle_list_examples))
        .route(
            "/api/upload/example/:file_id",
            delete(uploads::handle_delete_example),
        )
        // Prompt templates
        .route(
            "/api/prompts/templates",
            get(prompts::handle_list_templates).post(prompts::handle_create_template),
        )
        .route(
            "/api/prompts/templates/chapter/:chapter",
            get(prompts::handle_chapter_templates),
        )
        .route(
            "/api/prompts/templates/:id",
            get(prompts::handle_get_template)
                .put(prompts::handle_update_template)
                .delete(prompts::handle_delete_template),
        )
        .route("/api/prompts/generate", post(prompts::handle_generate_prompt))
        // Report
        .route("/api/report/generate", post(report::handle_generate))
        .route(
            "/api/report/generate-with-text",
            post(report::handle_generate_with_text),
        )
        .route("/api/report/export", post(export::handle_export))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::llm_client::test_support::StubModel;
    use crate::storage::test_support::temp_store;

    const BOUNDARY: &str = "eventreport-test-boundary";

    fn test_config() -> Config {
        Config {
            port: 0,
            rust_log: "info".into(),
            data_dir: "projects".into(),
            llm_api_key: None,
            llm_base_url: "http://127.0.0.1:9".into(),
            llm_model: "test-model".into(),
            llm_timeout_secs: 5,
            cors_origins: vec![],
            static_dir: None,
            max_upload_bytes: 1024 * 1024,
        }
    }

    async fn test_app(llm: Arc<StubModel>) -> (TempDir, Router) {
        let (dir, store) = temp_store().await;
        let state = AppState {
            store,
            llm,
            config: test_config(),
        };
        (dir, build_router(state))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn multipart_request(uri: &str, filename: &str, content: &str, project_id: Option<&str>) -> Request<Body> {
        let mut body = String::new();
        if let Some(id) = project_id {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"project_id\"\r\n\r\n{id}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
        ));

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let (_dir, app) = test_app(Arc::new(StubModel::failing())).await;

        let (status, body) = send(&app, empty_request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "eventreport");

        let (status, body) = send(&app, empty_request("GET", "/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_project_crud_round_trip() {
        let (_dir, app) = test_app(Arc::new(StubModel::failing())).await;

        let (status, created) =
            send(&app, json_request("POST", "/api/projects", json!({"name": "十月月报"}))).await;
        assert_eq!(status, StatusCode::OK);
        let id = created["id"].as_str().unwrap().to_string();

        let (_, listed) = send(&app, empty_request("GET", "/api/projects")).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);

        let uri = format!("/api/projects/{id}");
        let (status, renamed) =
            send(&app, json_request("PUT", &uri, json!({"name": "十一月月报"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(renamed["name"], "十一月月报");

        let (status, deleted) = send(&app, empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted, json!({"success": true, "id": id}));

        let (status, body) = send(&app, empty_request("GET", &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_project_validation_errors() {
        let (_dir, app) = test_app(Arc::new(StubModel::failing())).await;

        let (status, _) =
            send(&app, json_request("POST", "/api/projects", json!({"name": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, empty_request("DELETE", "/api/projects/default")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chapter_data_save_and_clear() {
        let (_dir, app) = test_app(Arc::new(StubModel::failing())).await;
        let uri = "/api/projects/default/chapters/chapter_1/data";

        let (status, saved) = send(
            &app,
            json_request("POST", uri, json!({"input_data": "a,b", "generated_content": "## 正文"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(saved["generated_content"], "## 正文");

        let (status, cleared) =
            send(&app, empty_request("POST", "/api/projects/default/clear-generated")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared["cleared_chapters"], json!(["chapter_1"]));

        let (_, data) = send(&app, empty_request("GET", uri)).await;
        assert_eq!(data["input_data"], "a,b");
        assert_eq!(data["generated_content"], "");
    }

    #[tokio::test]
    async fn test_upload_rejects_wrong_extension() {
        let (_dir, app) = test_app(Arc::new(StubModel::failing())).await;

        let (status, body) =
            send(&app, multipart_request("/api/upload/data", "data.txt", "a,b", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) =
            send(&app, multipart_request("/api/upload/example", "report.pdf", "x", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_uploaded_csv_drives_report_generation() {
        let llm = Arc::new(StubModel::replying("## （一）总体概况\n本月投诉30件。"));
        let (_dir, app) = test_app(llm.clone()).await;

        let (status, uploaded) = send(
            &app,
            multipart_request("/api/upload/data", "data.csv", "类型,数量\n投诉,30\n", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let file_id = uploaded["file_id"].as_str().unwrap();

        let (status, report) = send(
            &app,
            json_request(
                "POST",
                "/api/report/generate",
                json!({"chapter": "chapter_1", "data_file_id": file_id, "example_files": []}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["success"], true);
        assert_eq!(report["template_id"], "default_chapter_1");
        assert_eq!(report["content"], "## （一）总体概况\n本月投诉30件。");
        assert!(llm.calls()[0].user.contains("投诉"));
    }

    #[tokio::test]
    async fn test_generate_with_text_requires_data() {
        let (_dir, app) = test_app(Arc::new(StubModel::replying("正文"))).await;
        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/report/generate-with-text",
                json!({"chapter": "chapter_1", "data_text": "  "}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_llm_failure_is_a_500_without_vendor_detail() {
        let (_dir, app) = test_app(Arc::new(StubModel::failing())).await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/report/generate-with-text",
                json!({"chapter": "chapter_1", "data_text": "a,b\n1,2"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "LLM_ERROR");
        assert!(!body.to_string().contains("stub failure"));
    }

    #[tokio::test]
    async fn test_example_upload_seeds_empty_project() {
        let reply = r#"{"system_prompt": "你是分析师", "user_prompt_template": "{data_summary}{examples_text}"}"#;
        let (_dir, app) = test_app(Arc::new(StubModel::replying(reply))).await;

        let (_, project) =
            send(&app, json_request("POST", "/api/projects", json!({"name": "新项目"}))).await;
        let id = project["id"].as_str().unwrap().to_string();

        let report = "一、基本情况\n受理事件800件。\n二、问题研判\n噪音投诉较多。";
        let (status, uploaded) = send(
            &app,
            multipart_request("/api/upload/example", "october.md", report, Some(&id)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, chapters) = send(&app, empty_request("GET", &format!("/api/projects/{id}/chapters"))).await;
        assert_eq!(chapters.as_array().unwrap().len(), 2);
        assert_eq!(chapters[1]["title"], "二、问题研判");

        let (_, examples) = send(
            &app,
            empty_request("GET", &format!("/api/upload/examples?project_id={id}")),
        )
        .await;
        assert_eq!(examples[0]["id"], uploaded["file_id"]);
    }

    #[tokio::test]
    async fn test_template_lifecycle() {
        let (_dir, app) = test_app(Arc::new(StubModel::failing())).await;

        let (status, _) = send(
            &app,
            empty_request("DELETE", "/api/prompts/templates/default_chapter_1"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, created) = send(
            &app,
            json_request(
                "POST",
                "/api/prompts/templates",
                json!({
                    "chapter": "chapter_1",
                    "name": "简版",
                    "system_prompt": "sys",
                    "user_prompt_template": "{data_summary}",
                    "is_default": true
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let id = created["id"].as_str().unwrap().to_string();

        let (_, chapter) = send(
            &app,
            empty_request("GET", "/api/prompts/templates/chapter/chapter_1"),
        )
        .await;
        let defaults: Vec<&Value> = chapter
            .as_array()
            .unwrap()
            .iter()
            .filter(|t| t["is_default"] == true)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0]["id"], id.as_str());

        let uri = format!("/api/prompts/templates/{id}");
        let (status, updated) =
            send(&app, json_request("PUT", &uri, json!({"name": "简版二"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "简版二");

        let (status, deleted) = send(&app, empty_request("DELETE", &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["success"], true);

        let (status, _) = send(&app, empty_request("GET", &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_returns_docx_attachment() {
        let (_dir, app) = test_app(Arc::new(StubModel::failing())).await;
        let response = app
            .oneshot(json_request(
                "POST",
                "/api/report/export",
                json!({"content": "# 标题\n\n正文", "filename": "月报"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            export::DOCX_CONTENT_TYPE
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment;"));
        assert!(disposition.contains("filename*=UTF-8''%E6%9C%88%E6%8A%A5.docx"));
    }
}
