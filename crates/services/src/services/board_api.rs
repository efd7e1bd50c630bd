//! REST client for the athlete/program/assignment backend.

use std::{collections::HashSet, time::Duration};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use models::{Assignment, Athlete, CreateAssignment, EntityId, Program};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use super::config::BoardConfig;

#[cfg(any(test, feature = "test-support"))]
pub mod in_memory;

const MIN_RETRY_DELAY: Duration = Duration::from_millis(250);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Error)]
pub enum BoardApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("pagination loops back to {0}")]
    PageLoop(String),
}

impl BoardApiError {
    /// Returns true if the error is transient and the read should be retried.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Http { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }
}

/// The six backend calls the board depends on.
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn list_programs(&self) -> Result<Vec<Program>, BoardApiError>;

    async fn list_athletes(&self) -> Result<Vec<Athlete>, BoardApiError>;

    async fn list_assignments(&self) -> Result<Vec<Assignment>, BoardApiError>;

    async fn create_assignment(&self, payload: &CreateAssignment) -> Result<(), BoardApiError>;

    /// Full-object replace of an existing assignment.
    async fn update_assignment(&self, assignment: &Assignment) -> Result<(), BoardApiError>;

    async fn delete_assignment(&self, id: &EntityId) -> Result<(), BoardApiError>;
}

/// List endpoints answer with a bare array or with a paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListPage<T> {
    Plain(Vec<T>),
    Paginated {
        results: Vec<T>,
        #[serde(default)]
        next: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct HttpBoardApi {
    http: Client,
    base_url: Url,
    token: Option<String>,
    programs_path: String,
    athletes_path: String,
    assignments_path: String,
    max_read_retries: usize,
}

impl HttpBoardApi {
    pub fn new(config: &BoardConfig) -> Result<Self, BoardApiError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("assignment-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BoardApiError::Transport(e.to_string()))?;

        // Url::join drops the last segment of a base without a trailing slash.
        let mut base_url = config.api_base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http,
            base_url,
            token: config.api_token.clone(),
            programs_path: config.programs_path.clone(),
            athletes_path: config.athletes_path.clone(),
            assignments_path: config.assignments_path.clone(),
            max_read_retries: config.max_read_retries,
        })
    }

    fn collection_url(&self, path: &str) -> Result<Url, BoardApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| BoardApiError::Url(e.to_string()))
    }

    /// `{collection}/{id}`, keeping the collection's trailing-slash style.
    fn item_url(&self, path: &str, id: &EntityId) -> Result<Url, BoardApiError> {
        let trailing = if path.ends_with('/') { "/" } else { "" };
        let item = format!("{}/{}{}", path.trim_end_matches('/'), id, trailing);
        self.collection_url(&item)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, BoardApiError> {
        let url = self.collection_url(path)?;

        (|| async { self.fetch_all_pages(url.clone()).await })
            .retry(
                ExponentialBuilder::default()
                    .with_min_delay(MIN_RETRY_DELAY)
                    .with_max_delay(MAX_RETRY_DELAY)
                    .with_max_times(self.max_read_retries)
                    .with_jitter(),
            )
            .when(|e: &BoardApiError| e.should_retry())
            .notify(|e, dur| {
                warn!(
                    "Board API read failed, retrying after {:.2}s: {}",
                    dur.as_secs_f64(),
                    e
                )
            })
            .await
    }

    async fn fetch_all_pages<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, BoardApiError> {
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(url);

        while let Some(url) = next.take() {
            visited.insert(url.clone());
            let res = self
                .request(Method::GET, url)
                .send()
                .await
                .map_err(map_reqwest_error)?;
            let page = check_status(res)
                .await?
                .json::<ListPage<T>>()
                .await
                .map_err(|e| BoardApiError::Serde(e.to_string()))?;

            match page {
                ListPage::Plain(mut page_items) => items.append(&mut page_items),
                ListPage::Paginated {
                    results: mut page_items,
                    next: next_url,
                } => {
                    items.append(&mut page_items);
                    if let Some(raw) = next_url {
                        let next_url = self
                            .base_url
                            .join(&raw)
                            .map_err(|e| BoardApiError::Url(e.to_string()))?;
                        if visited.contains(&next_url) {
                            return Err(BoardApiError::PageLoop(next_url.to_string()));
                        }
                        debug!(next = %next_url, "Board API following next page");
                        next = Some(next_url);
                    }
                }
            }
        }

        Ok(items)
    }

    async fn send_mutation(&self, builder: RequestBuilder) -> Result<(), BoardApiError> {
        let res = builder.send().await.map_err(map_reqwest_error)?;
        check_status(res).await.map(|_| ())
    }
}

#[async_trait]
impl BoardApi for HttpBoardApi {
    async fn list_programs(&self) -> Result<Vec<Program>, BoardApiError> {
        self.list(&self.programs_path).await
    }

    async fn list_athletes(&self) -> Result<Vec<Athlete>, BoardApiError> {
        self.list(&self.athletes_path).await
    }

    async fn list_assignments(&self) -> Result<Vec<Assignment>, BoardApiError> {
        self.list(&self.assignments_path).await
    }

    async fn create_assignment(&self, payload: &CreateAssignment) -> Result<(), BoardApiError> {
        let url = self.collection_url(&self.assignments_path)?;
        self.send_mutation(self.request(Method::POST, url).json(payload))
            .await
    }

    async fn update_assignment(&self, assignment: &Assignment) -> Result<(), BoardApiError> {
        let url = self.item_url(&self.assignments_path, &assignment.id)?;
        self.send_mutation(self.request(Method::PUT, url).json(assignment))
            .await
    }

    async fn delete_assignment(&self, id: &EntityId) -> Result<(), BoardApiError> {
        let url = self.item_url(&self.assignments_path, id)?;
        self.send_mutation(self.request(Method::DELETE, url)).await
    }
}

async fn check_status(res: Response) -> Result<Response, BoardApiError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(BoardApiError::Http {
        status: status.as_u16(),
        body,
    })
}

fn map_reqwest_error(e: reqwest::Error) -> BoardApiError {
    if e.is_timeout() {
        BoardApiError::Timeout
    } else {
        BoardApiError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex, OnceLock,
        atomic::{AtomicUsize, Ordering},
    };

    use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        routing::{get, put},
    };
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;

    #[derive(Clone, Default)]
    struct Backend {
        base: Arc<OnceLock<String>>,
        assignments: Arc<Mutex<Vec<Value>>>,
        writes: Arc<Mutex<Vec<(String, Value)>>>,
        auth_headers: Arc<Mutex<Vec<String>>>,
        program_failures: Arc<AtomicUsize>,
    }

    async fn programs(
        State(backend): State<Backend>,
        headers: HeaderMap,
    ) -> Result<Json<Value>, StatusCode> {
        if let Some(auth) = headers.get("authorization") {
            backend
                .auth_headers
                .lock()
                .unwrap()
                .push(auth.to_str().unwrap().to_string());
        }
        if backend.program_failures.load(Ordering::SeqCst) > 0 {
            backend.program_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
        Ok(Json(json!([{ "id": 1, "nombre": "Fuerza" }])))
    }

    #[derive(serde::Deserialize)]
    struct PageQuery {
        page: Option<u32>,
    }

    async fn athletes(State(backend): State<Backend>, Query(q): Query<PageQuery>) -> Json<Value> {
        let base = backend.base.get().cloned().unwrap_or_default();
        match q.page {
            Some(3) => Json(json!({
                "next": format!("{base}atletas?page=4"),
                "results": [{ "id": 12, "nombre": "Carla", "apPaterno": "Diaz", "apMaterno": "Mora" }]
            })),
            Some(4) => Json(json!({
                "next": format!("{base}atletas?page=3"),
                "results": []
            })),
            Some(2) => Json(json!({
                "count": 2,
                "next": null,
                "results": [{ "id": 11, "nombre": "Beto", "apPaterno": "Ruiz", "apMaterno": "Paz" }]
            })),
            _ => Json(json!({
                "count": 2,
                "next": format!("{base}atletas?page=2"),
                "results": [{ "id": 10, "nombre": "Ana", "apPaterno": "Lopez", "apMaterno": "Diaz" }]
            })),
        }
    }

    async fn list_assignments(State(backend): State<Backend>) -> Json<Value> {
        Json(Value::Array(backend.assignments.lock().unwrap().clone()))
    }

    async fn create_assignment(
        State(backend): State<Backend>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        backend
            .writes
            .lock()
            .unwrap()
            .push(("POST".to_string(), body.clone()));
        let mut assignments = backend.assignments.lock().unwrap();
        let mut created = body;
        created["id"] = json!(assignments.len() as i64 + 100);
        assignments.push(created.clone());
        (StatusCode::CREATED, Json(created))
    }

    async fn update_assignment(
        State(backend): State<Backend>,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        backend
            .writes
            .lock()
            .unwrap()
            .push((format!("PUT {id}"), body));
        StatusCode::OK
    }

    async fn delete_assignment(State(backend): State<Backend>, Path(id): Path<String>) -> StatusCode {
        backend
            .writes
            .lock()
            .unwrap()
            .push((format!("DELETE {id}"), Value::Null));
        StatusCode::NO_CONTENT
    }

    async fn serve(backend: Backend) -> Url {
        let router = Router::new()
            .route("/api/programas", get(programs))
            .route("/api/atletas", get(athletes))
            .route(
                "/api/asignaciones",
                get(list_assignments).post(create_assignment),
            )
            .route(
                "/api/asignaciones/{id}",
                put(update_assignment).delete(delete_assignment),
            )
            .with_state(backend.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let base = format!("http://{addr}/api/");
        backend.base.set(base.clone()).unwrap();
        Url::parse(&format!("http://{addr}/api")).unwrap()
    }

    fn client(base: Url) -> HttpBoardApi {
        let mut config = BoardConfig::new(base);
        config.api_token = Some("secret".to_string());
        config.max_read_retries = 2;
        HttpBoardApi::new(&config).unwrap()
    }

    #[test]
    fn test_should_retry_only_transient_errors() {
        assert!(BoardApiError::Timeout.should_retry());
        assert!(
            BoardApiError::Http {
                status: 503,
                body: String::new()
            }
            .should_retry()
        );
        assert!(
            BoardApiError::Http {
                status: 429,
                body: String::new()
            }
            .should_retry()
        );
        assert!(
            !BoardApiError::Http {
                status: 404,
                body: String::new()
            }
            .should_retry()
        );
        assert!(!BoardApiError::Serde("bad".to_string()).should_retry());
    }

    #[test]
    fn test_item_url_keeps_trailing_slash_style() {
        let mut config = BoardConfig::new(Url::parse("http://api.local/v1").unwrap());
        config.assignments_path = "asignaciones/".to_string();
        let api = HttpBoardApi::new(&config).unwrap();

        let url = api
            .item_url(&config.assignments_path, &EntityId::from(5))
            .unwrap();
        assert_eq!(url.as_str(), "http://api.local/v1/asignaciones/5/");

        let url = api.item_url("asignaciones", &EntityId::from(5)).unwrap();
        assert_eq!(url.as_str(), "http://api.local/v1/asignaciones/5");
    }

    #[tokio::test]
    async fn test_lists_follow_pagination_and_send_token() {
        let backend = Backend::default();
        let api = client(serve(backend.clone()).await);

        let programs = api.list_programs().await.unwrap();
        assert_eq!(programs, vec![Program::new(1, "Fuerza")]);

        let athletes = api.list_athletes().await.unwrap();
        let ids: Vec<EntityId> = athletes.into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![EntityId::from(10), EntityId::from(11)]);

        assert_eq!(
            backend.auth_headers.lock().unwrap().as_slice(),
            ["Bearer secret".to_string()]
        );
    }

    #[tokio::test]
    async fn test_pagination_cycle_is_an_error() {
        let backend = Backend::default();
        let api = client(serve(backend.clone()).await);
        let start = Url::parse(&format!("{}atletas?page=3", backend.base.get().unwrap())).unwrap();

        let err = api.fetch_all_pages::<Athlete>(start).await.unwrap_err();

        assert!(matches!(err, BoardApiError::PageLoop(ref url) if url.ends_with("atletas?page=3")));
        assert!(!err.should_retry());
    }

    #[tokio::test]
    async fn test_transient_read_failure_is_retried() {
        let backend = Backend::default();
        backend.program_failures.store(1, Ordering::SeqCst);
        let api = client(serve(backend.clone()).await);

        let programs = api.list_programs().await.unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(backend.program_failures.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mutations_hit_assignment_endpoints() {
        let backend = Backend::default();
        let api = client(serve(backend.clone()).await);

        api.create_assignment(&CreateAssignment::active(
            EntityId::from(10),
            EntityId::from("1"),
        ))
        .await
        .unwrap();

        let listed = api.list_assignments().await.unwrap();
        assert_eq!(listed.len(), 1);
        let moved = listed[0].moved_to(EntityId::from("2"));
        api.update_assignment(&moved).await.unwrap();
        api.delete_assignment(&moved.id).await.unwrap();

        let writes = backend.writes.lock().unwrap().clone();
        assert_eq!(
            writes,
            vec![
                (
                    "POST".to_string(),
                    json!({ "atleta": 10, "programa": "1", "estado": "activo" })
                ),
                (
                    "PUT 100".to_string(),
                    json!({ "id": 100, "atleta": 10, "programa": "2", "estado": "activo" })
                ),
                ("DELETE 100".to_string(), Value::Null),
            ]
        );
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let backend = Backend::default();
        let api = client(serve(backend).await);

        let err = api
            .delete_assignment(&EntityId::from("missing/extra"))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardApiError::Http { status: 404, .. }));
    }
}
