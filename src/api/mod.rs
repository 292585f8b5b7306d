pub mod auth;
pub mod endpoints;
pub mod error;

pub use error::ApiError;

use crate::models::{Chapter, Comment, NewChapter, NewStory, Story, Tag, TokenPair};
use auth::{RefreshGate, Session, Ticket};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

/// A request as seen by the transport and the middleware pipeline.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
    /// One retry per original request; set before the refresh protocol runs.
    pub retried: bool,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Seam between the client and the wire so the token lifecycle is testable
/// against a scripted double.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        req: &ApiRequest,
    ) -> impl std::future::Future<Output = Result<ApiResponse, ApiError>> + Send;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut builder = self.client.request(req.method.clone(), &req.url);
        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(ApiResponse { status, body })
    }
}

/// Ordered request transforms applied before a request hits the transport.
pub trait Middleware: Send + Sync {
    fn apply(&self, req: &mut ApiRequest);
}

/// Sets the bearer header when an access token exists; no-op otherwise.
pub struct AttachAuth {
    session: Session,
}

impl Middleware for AttachAuth {
    fn apply(&self, req: &mut ApiRequest) {
        if let Some(token) = self.session.access_token() {
            req.bearer = Some(token);
        }
    }
}

/// Server convention: no leading slash (the base path is respected) and a
/// trailing slash unless the path carries a query string.
pub fn normalize_path(path: &str) -> String {
    let p = path.trim_start_matches('/');
    if p.is_empty() || p.contains('?') || p.ends_with('/') {
        p.to_string()
    } else {
        format!("{}/", p)
    }
}

/// List payloads come back as either a bare array or `{results: [...]}`.
pub fn unwrap_list(v: &Value) -> Vec<Value> {
    match v {
        Value::Array(items) => items.clone(),
        Value::Object(obj) => match obj.get("results") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn decode<T: DeserializeOwned>(v: Value) -> Result<T, ApiError> {
    serde_json::from_value(v)
        .map_err(|e| ApiError::Http(200, format!("unexpected response shape: {}", e)))
}

fn decode_list<T: DeserializeOwned>(v: &Value) -> Result<Vec<T>, ApiError> {
    unwrap_list(v).into_iter().map(decode).collect()
}

pub struct ApiClient<T: Transport> {
    base: String,
    transport: T,
    session: Session,
    gate: RefreshGate,
    middleware: Vec<Box<dyn Middleware>>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(base: String, transport: T, session: Session) -> Self {
        let gate = RefreshGate::new(session.clone());
        let middleware: Vec<Box<dyn Middleware>> = vec![Box::new(AttachAuth {
            session: session.clone(),
        })];
        Self {
            base: base.trim_end_matches('/').to_string(),
            transport,
            session,
            gate,
            middleware,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn build(&self, method: Method, path: &str, body: Option<Value>) -> ApiRequest {
        ApiRequest {
            method,
            url: format!("{}/{}", self.base, normalize_path(path)),
            body,
            bearer: None,
            retried: false,
        }
    }

    /// Issue one request through the middleware pipeline, transparently
    /// recovering from a 401 via the single-flight refresh protocol.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut req = self.build(method, path, body);
        for mw in &self.middleware {
            mw.apply(&mut req);
        }
        let resp = self.transport.execute(&req).await?;
        if resp.status == 401 && !req.retried {
            return self.recover_unauthorized(req, resp).await;
        }
        Self::finish(resp)
    }

    fn finish(resp: ApiResponse) -> Result<Value, ApiError> {
        if resp.ok() {
            Ok(resp.body)
        } else {
            Err(ApiError::from_status(resp.status, &resp.body))
        }
    }

    async fn recover_unauthorized(
        &self,
        mut req: ApiRequest,
        resp: ApiResponse,
    ) -> Result<Value, ApiError> {
        if self.session.refresh_token().is_none() {
            // No refresh capability: the session is dead, force a re-login
            // and surface the original failure.
            self.session.clear();
            return Self::finish(resp);
        }
        req.retried = true;

        let access = match self.gate.join().await {
            Ticket::Wait(rx) => rx
                .await
                .map_err(|_| ApiError::Network("refresh abandoned".to_string()))??,
            Ticket::Lead => {
                let outcome = self.run_refresh().await;
                self.gate.settle(&outcome).await;
                outcome?
            }
        };

        req.bearer = Some(access);
        let retried = self.transport.execute(&req).await?;
        Self::finish(retried)
    }

    /// The refresh protocol: POST the refresh token to each candidate
    /// endpoint in turn (404 means "wrong backend flavor, try the next").
    async fn run_refresh(&self) -> Result<String, ApiError> {
        let refresh = self
            .session
            .refresh_token()
            .ok_or(ApiError::Unauthorized)?;
        let body = json!({ "refresh": refresh });
        let mut last = ApiError::NotFound;
        for path in endpoints::REFRESH_CANDIDATES {
            let req = self.build(Method::POST, path, Some(body.clone()));
            let resp = self.transport.execute(&req).await?;
            if resp.ok() {
                return match resp.body.get("access").and_then(Value::as_str) {
                    Some(access) => {
                        log::debug!("access token refreshed via {}", path);
                        Ok(access.to_string())
                    }
                    None => Err(ApiError::Http(
                        resp.status,
                        "no access token in refresh response".to_string(),
                    )),
                };
            }
            if resp.status == 404 {
                last = ApiError::NotFound;
                continue;
            }
            return Err(ApiError::from_status(resp.status, &resp.body));
        }
        Err(last)
    }

    /// Candidate chain executor: first success wins, a 404 moves to the
    /// next entry, anything else (and the final 404) propagates.
    pub async fn send_with_fallback(
        &self,
        method: Method,
        candidates: &[impl AsRef<str>],
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let mut last = ApiError::NotFound;
        for (i, path) in candidates.iter().enumerate() {
            match self.send(method.clone(), path.as_ref(), body.clone()).await {
                Ok(v) => return Ok(v),
                Err(ApiError::NotFound) if i + 1 < candidates.len() => {
                    log::debug!("{} not found, trying fallback route", path.as_ref());
                    last = ApiError::NotFound;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last)
    }

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.send(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send(Method::POST, path, Some(body)).await
    }

    // ---- auth flows ----

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let creds = json!({ "username": username, "password": password });
        let data = self
            .send_with_fallback(Method::POST, endpoints::LOGIN_CANDIDATES, Some(creds))
            .await?;
        let pair: TokenPair = decode(data)?;
        let access = pair.access.ok_or_else(|| {
            ApiError::Http(200, "no access token in login response".to_string())
        })?;
        self.session
            .store_tokens(Some(&access), pair.refresh.as_deref());
        Ok(())
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let body = json!({ "username": username, "email": email, "password": password });
        let data = self.post(endpoints::REGISTER_PATH, body).await?;
        // Some backends hand tokens straight back; store them when present.
        if let Ok(pair) = decode::<TokenPair>(data) {
            self.session
                .store_tokens(pair.access.as_deref(), pair.refresh.as_deref());
        }
        Ok(())
    }

    pub fn logout(&self) {
        self.session.clear();
    }

    /// Probe the identity endpoints in order until one yields a usable
    /// name. Individual failures are swallowed; `None` means they all lost.
    pub async fn whoami(&self) -> Option<String> {
        for path in endpoints::WHOAMI_CANDIDATES {
            if let Ok(data) = self.get(path).await {
                for key in ["username", "user", "name", "email"] {
                    if let Some(name) = data.get(key).and_then(Value::as_str) {
                        if !name.is_empty() {
                            return Some(name.to_string());
                        }
                    }
                }
            }
        }
        None
    }

    // ---- stories ----

    pub async fn stories(&self) -> Result<Vec<Story>, ApiError> {
        decode_list(&self.get(&endpoints::stories()).await?)
    }

    pub async fn my_stories(&self) -> Result<Vec<Story>, ApiError> {
        decode_list(&self.get(&endpoints::my_stories()).await?)
    }

    pub async fn story(&self, id: i64) -> Result<Story, ApiError> {
        decode(self.get(&endpoints::story(id)).await?)
    }

    pub async fn create_story(&self, story: &NewStory) -> Result<Story, ApiError> {
        let body = serde_json::to_value(story)
            .map_err(|e| ApiError::Network(e.to_string()))?;
        decode(self.post(&endpoints::stories(), body).await?)
    }

    pub async fn update_story(&self, id: i64, patch: Value) -> Result<Story, ApiError> {
        decode(
            self.send(Method::PATCH, &endpoints::story(id), Some(patch))
                .await?,
        )
    }

    pub async fn delete_story(&self, id: i64) -> Result<(), ApiError> {
        self.send(Method::DELETE, &endpoints::story(id), None).await?;
        Ok(())
    }

    // ---- chapters (nested route preferred, flat fallback) ----

    pub async fn chapters(&self, story_id: i64) -> Result<Vec<Chapter>, ApiError> {
        let data = self
            .send_with_fallback(Method::GET, &endpoints::chapter_list(story_id), None)
            .await?;
        let mut chapters: Vec<Chapter> = decode_list(&data)?;
        chapters.sort_by_key(|c| c.position.unwrap_or(i64::MAX));
        Ok(chapters)
    }

    pub async fn chapter(&self, story_id: i64, chapter_id: i64) -> Result<Chapter, ApiError> {
        decode(
            self.send_with_fallback(Method::GET, &endpoints::chapter(story_id, chapter_id), None)
                .await?,
        )
    }

    pub async fn create_chapter(&self, chapter: &NewChapter) -> Result<Chapter, ApiError> {
        let body = serde_json::to_value(chapter)
            .map_err(|e| ApiError::Network(e.to_string()))?;
        decode(
            self.send_with_fallback(
                Method::POST,
                &endpoints::chapter_create(chapter.story),
                Some(body),
            )
            .await?,
        )
    }

    // ---- comments ----

    pub async fn comments(
        &self,
        story_id: i64,
        chapter_id: i64,
    ) -> Result<Vec<Comment>, ApiError> {
        let data = self
            .send_with_fallback(Method::GET, &endpoints::comment_list(story_id, chapter_id), None)
            .await?;
        decode_list(&data)
    }

    pub async fn create_comment(
        &self,
        story_id: i64,
        chapter_id: i64,
        content: &str,
    ) -> Result<Comment, ApiError> {
        let body = json!({ "chapter": chapter_id, "content": content });
        decode(
            self.send_with_fallback(
                Method::POST,
                &endpoints::comment_create(story_id, chapter_id),
                Some(body),
            )
            .await?,
        )
    }

    // ---- tags ----

    pub async fn tags(&self) -> Result<Vec<Tag>, ApiError> {
        decode_list(&self.get(&endpoints::tags()).await?)
    }

    pub async fn create_tag(&self, name: &str) -> Result<Tag, ApiError> {
        decode(self.post(&endpoints::tags(), json!({ "name": name })).await?)
    }

    /// Resolve tag names to ids, creating the ones that don't exist yet.
    /// A failed create (e.g. a concurrent duplicate) falls back to
    /// re-fetching the list and matching case-insensitively.
    pub async fn ensure_tag_ids(&self, names: &[String]) -> Result<Vec<i64>, ApiError> {
        let mut known = self.tags().await.unwrap_or_default();
        let mut ids = Vec::new();
        for raw in names {
            let key = raw.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            if let Some(t) = known.iter().find(|t| t.name.to_lowercase() == key) {
                ids.push(t.id);
                continue;
            }
            match self.create_tag(raw.trim()).await {
                Ok(tag) => {
                    ids.push(tag.id);
                    known.push(tag);
                }
                Err(_) => {
                    let refreshed = self.tags().await?;
                    if let Some(t) = refreshed.iter().find(|t| t.name.to_lowercase() == key) {
                        ids.push(t.id);
                    }
                    known = refreshed;
                }
            }
        }
        Ok(ids)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Scripted transport: knows which bearer is currently valid, whether a
    /// refresh succeeds, and yields between steps so interleaved callers can
    /// actually observe an in-flight refresh.
    pub struct MockTransport {
        pub inner: Mutex<MockInner>,
        pub refresh_delay_yields: usize,
    }

    pub struct MockInner {
        pub valid_access: String,
        pub refreshed_access: Option<String>,
        pub login_pair: Option<(String, String)>,
        pub always_unauthorized: bool,
        pub refresh_calls: usize,
        pub api_calls: usize,
        pub urls: Vec<String>,
    }

    impl MockTransport {
        pub fn new(valid_access: &str, refreshed_access: Option<&str>) -> Self {
            Self {
                inner: Mutex::new(MockInner {
                    valid_access: valid_access.to_string(),
                    refreshed_access: refreshed_access.map(str::to_string),
                    login_pair: None,
                    always_unauthorized: false,
                    refresh_calls: 0,
                    api_calls: 0,
                    urls: Vec::new(),
                }),
                refresh_delay_yields: 2,
            }
        }
    }

    impl Transport for MockTransport {
        async fn execute(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
            tokio::task::yield_now().await;
            self.inner.lock().unwrap().urls.push(req.url.clone());

            if req.url.ends_with("/token/refresh/") || req.url.ends_with("/auth/jwt/refresh/") {
                self.inner.lock().unwrap().refresh_calls += 1;
                for _ in 0..self.refresh_delay_yields {
                    tokio::task::yield_now().await;
                }
                let mut g = self.inner.lock().unwrap();
                return match g.refreshed_access.clone() {
                    Some(tok) => {
                        g.valid_access = tok.clone();
                        Ok(ApiResponse {
                            status: 200,
                            body: json!({ "access": tok }),
                        })
                    }
                    None => Ok(ApiResponse {
                        status: 401,
                        body: json!({ "detail": "refresh token expired" }),
                    }),
                };
            }

            if req.url.ends_with("/token/") {
                let g = self.inner.lock().unwrap();
                return match &g.login_pair {
                    Some((a, r)) => Ok(ApiResponse {
                        status: 200,
                        body: json!({ "access": a, "refresh": r }),
                    }),
                    None => Ok(ApiResponse {
                        status: 401,
                        body: json!({ "detail": "bad credentials" }),
                    }),
                };
            }

            let mut g = self.inner.lock().unwrap();
            g.api_calls += 1;
            let authorized =
                !g.always_unauthorized && req.bearer.as_deref() == Some(g.valid_access.as_str());
            if authorized {
                Ok(ApiResponse {
                    status: 200,
                    body: json!({ "ok": true }),
                })
            } else {
                Ok(ApiResponse {
                    status: 401,
                    body: json!({ "detail": "token expired" }),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockTransport;
    use super::*;
    use crate::store::{KvStore, MemStore};
    use std::sync::Arc;

    fn client_with(
        mock: MockTransport,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> (ApiClient<MockTransport>, Arc<MemStore>) {
        let store = Arc::new(MemStore::new());
        if let Some(a) = access {
            store.set(crate::store::KEY_ACCESS, a);
        }
        if let Some(r) = refresh {
            store.set(crate::store::KEY_REFRESH, r);
        }
        let session = Session::new(store.clone());
        (
            ApiClient::new("http://api.test/api".to_string(), mock, session),
            store,
        )
    }

    #[test]
    fn normalize_path_rules() {
        assert_eq!(normalize_path("stories"), "stories/");
        assert_eq!(normalize_path("/stories/"), "stories/");
        assert_eq!(normalize_path("chapters/?story=3"), "chapters/?story=3");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn unwrap_list_rules() {
        assert_eq!(unwrap_list(&json!([1, 2, 3])), vec![json!(1), json!(2), json!(3)]);
        assert_eq!(unwrap_list(&json!({"results": [1, 2]})), vec![json!(1), json!(2)]);
        assert_eq!(unwrap_list(&json!({})), Vec::<Value>::new());
        assert_eq!(unwrap_list(&Value::Null), Vec::<Value>::new());
    }

    #[tokio::test]
    async fn concurrent_401s_share_a_single_refresh() {
        let mock = MockTransport::new("fresh", Some("fresh"));
        let (client, store) = client_with(mock, Some("stale"), Some("r1"));

        let (a, b, c) = tokio::join!(
            client.get("stories/"),
            client.get("tags/"),
            client.get("stories/mine/"),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        let g = client.transport.inner.lock().unwrap();
        assert_eq!(g.refresh_calls, 1, "refresh must be single-flight");
        drop(g);
        assert_eq!(store.get(crate::store::KEY_ACCESS).as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn refresh_failure_rejects_everyone_and_clears_tokens() {
        let mock = MockTransport::new("fresh", None);
        let (client, store) = client_with(mock, Some("stale"), Some("r1"));

        let (a, b) = tokio::join!(client.get("stories/"), client.get("tags/"));
        assert_eq!(a, Err(ApiError::Unauthorized));
        assert_eq!(b, Err(ApiError::Unauthorized));

        assert_eq!(client.transport.inner.lock().unwrap().refresh_calls, 1);
        assert_eq!(store.get(crate::store::KEY_ACCESS), None);
        assert_eq!(store.get(crate::store::KEY_REFRESH), None);
    }

    #[tokio::test]
    async fn no_refresh_token_means_no_retry() {
        let mock = MockTransport::new("fresh", Some("fresh"));
        let (client, _store) = client_with(mock, Some("stale"), None);

        let res = client.get("stories/").await;
        assert_eq!(res, Err(ApiError::Unauthorized));
        let g = client.transport.inner.lock().unwrap();
        assert_eq!(g.refresh_calls, 0);
        assert_eq!(g.api_calls, 1);
    }

    #[tokio::test]
    async fn retried_request_is_not_retried_twice() {
        let mock = MockTransport::new("fresh", Some("fresh"));
        mock.inner.lock().unwrap().always_unauthorized = true;
        let (client, _store) = client_with(mock, Some("stale"), Some("r1"));

        let res = client.get("stories/").await;
        assert_eq!(res, Err(ApiError::Unauthorized));
        let g = client.transport.inner.lock().unwrap();
        assert_eq!(g.refresh_calls, 1);
        assert_eq!(g.api_calls, 2, "original call plus exactly one retry");
    }

    #[tokio::test]
    async fn login_then_expiry_then_transparent_refresh() {
        let mock = MockTransport::new("a1", Some("a2"));
        mock.inner.lock().unwrap().login_pair = Some(("a1".to_string(), "r1".to_string()));
        let (client, store) = client_with(mock, None, None);

        client.login("alice", "pw").await.unwrap();
        assert_eq!(store.get(crate::store::KEY_ACCESS).as_deref(), Some("a1"));
        assert_eq!(store.get(crate::store::KEY_REFRESH).as_deref(), Some("r1"));

        // Authenticated call straight after login succeeds.
        client.get("stories/").await.unwrap();

        // Force expiry: stored access token goes stale, refresh yields a2.
        store.set(crate::store::KEY_ACCESS, "expired");
        client.get("stories/").await.unwrap();
        assert_eq!(store.get(crate::store::KEY_ACCESS).as_deref(), Some("a2"));

        // Without a refresh token the next expiry is terminal and the
        // session is wiped.
        store.set(crate::store::KEY_ACCESS, "expired");
        store.remove(crate::store::KEY_REFRESH);
        assert_eq!(client.get("stories/").await, Err(ApiError::Unauthorized));
        assert_eq!(store.get(crate::store::KEY_ACCESS), None);
    }

    #[tokio::test]
    async fn fallback_chain_stops_at_first_success() {
        struct FlatOnly;
        impl Transport for FlatOnly {
            async fn execute(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
                if req.url.contains("/stories/7/chapters/") {
                    Ok(ApiResponse {
                        status: 404,
                        body: Value::Null,
                    })
                } else {
                    Ok(ApiResponse {
                        status: 200,
                        body: json!([{ "id": 1, "title": "One", "position": 1 }]),
                    })
                }
            }
        }
        let store = Arc::new(MemStore::new());
        let client = ApiClient::new(
            "http://api.test/api".to_string(),
            FlatOnly,
            Session::new(store),
        );
        let chapters = client.chapters(7).await.unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "One");
    }

    #[tokio::test]
    async fn fallback_chain_propagates_non_404_immediately() {
        struct AlwaysForbidden;
        impl Transport for AlwaysForbidden {
            async fn execute(&self, _req: &ApiRequest) -> Result<ApiResponse, ApiError> {
                Ok(ApiResponse {
                    status: 403,
                    body: Value::Null,
                })
            }
        }
        let store = Arc::new(MemStore::new());
        let client = ApiClient::new(
            "http://api.test/api".to_string(),
            AlwaysForbidden,
            Session::new(store),
        );
        assert_eq!(client.chapters(7).await.unwrap_err(), ApiError::Forbidden);
    }
}
