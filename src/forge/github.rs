//! forge::github
//!
//! GitHub forge implementation over the REST API.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |---|---|
//! | create | `POST /repos/{o}/{r}/pulls` |
//! | list | `GET /repos/{o}/{r}/pulls?state=open`, then `GET .../pulls/{n}` each |
//! | get | `GET /repos/{o}/{r}/pulls/{n}` |
//! | merge | `PUT /repos/{o}/{r}/pulls/{n}/merge` |
//! | close | `PATCH /repos/{o}/{r}/pulls/{n}` with `{"state":"closed"}` |
//! | visibility | `GET /repos/{o}/{r}` |
//!
//! # Authentication
//!
//! A static token sent as `Authorization: Bearer <token>`. Every call except
//! the visibility query fails with [`ForgeError::AuthRequired`] before any
//! request is made when no token is configured.
//!
//! # Errors
//!
//! Non-2xx responses surface GitHub's `message` field verbatim, joined with
//! any per-field `errors[].message` entries (that is where 422 responses put
//! the useful part, e.g. "A pull request already exists").

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::traits::{
    CreatePrRequest, Forge, ForgeError, Mergeable, MergeMethod, PullRequest, Visibility,
};
use crate::core::remote::RepoId;

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("vaultgate/", env!("CARGO_PKG_VERSION"));

/// REST API version pinned in every request.
const API_VERSION: &str = "2022-11-28";

/// Page size for the open-PR listing (GitHub's maximum).
const PER_PAGE: usize = 100;

/// GitHub forge implementation.
pub struct GitHubForge {
    client: Client,
    token: Option<String>,
    owner: String,
    repo: String,
    /// API base URL (configurable for GitHub Enterprise and tests)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("has_token", &self.token.is_some())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubForge {
    /// Forge for `id` at its host's default API base.
    pub fn new(id: &RepoId, token: Option<String>) -> Self {
        Self::with_api_base(id, token, id.api_base())
    }

    /// Forge for `id` at an explicit API base (GitHub Enterprise, tests).
    pub fn with_api_base(id: &RepoId, token: Option<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.filter(|t| !t.is_empty()),
            owner: id.owner.clone(),
            repo: id.repo.clone(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Whether a token is configured.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Build common headers; `Authorization` only when a token is present.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    fn require_token(&self) -> Result<(), ForgeError> {
        if self.token.is_some() {
            Ok(())
        } else {
            Err(ForgeError::AuthRequired)
        }
    }

    /// Build URL for a repository endpoint; `""` is the repository itself.
    fn repo_url(&self, path: &str) -> String {
        let base = format!("{}/repos/{}/{}", self.api_base, self.owner, self.repo);
        if path.is_empty() {
            base
        } else {
            format!("{}/{}", base, path)
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ForgeError> {
        request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))
    }

    /// Decode a success body, or map the error response.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();
        debug!(status = status.as_u16(), "github response");

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(Self::error_from_response(response, status).await)
        }
    }

    /// Accept any 2xx without reading the body.
    async fn handle_empty_response(&self, response: Response) -> Result<(), ForgeError> {
        let status = response.status();
        debug!(status = status.as_u16(), "github response");

        if status.is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(response, status).await)
        }
    }

    async fn error_from_response(response: Response, status: StatusCode) -> ForgeError {
        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.full_message(),
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed(message),
            StatusCode::FORBIDDEN if rate_limited => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    #[instrument(skip(self, request), fields(head = %request.head, base = %request.base))]
    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        self.require_token()?;
        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: request.body.as_deref(),
        };

        let response = self
            .send(self.client.post(self.repo_url("pulls")).json(&body))
            .await?;
        let pr: GitHubPullRequest = self.handle_response(response).await?;
        Ok(pr.into())
    }

    #[instrument(skip(self))]
    async fn list_open_prs(&self) -> Result<Vec<PullRequest>, ForgeError> {
        self.require_token()?;
        let mut prs = Vec::new();
        let mut page = 1;

        loop {
            let url = self.repo_url(&format!(
                "pulls?state=open&sort=created&direction=desc&per_page={}&page={}",
                PER_PAGE, page
            ));
            let response = self.send(self.client.get(url)).await?;
            let batch: Vec<GitHubPullRequest> = self.handle_response(response).await?;
            let last_page = batch.len() < PER_PAGE;
            prs.extend(batch.into_iter().map(PullRequest::from));

            if last_page {
                break;
            }
            page += 1;
        }

        debug!(count = prs.len(), "listed open pull requests");
        Ok(prs)
    }

    #[instrument(skip(self))]
    async fn get_pr(&self, number: u64) -> Result<PullRequest, ForgeError> {
        self.require_token()?;
        let response = self
            .send(self.client.get(self.repo_url(&format!("pulls/{}", number))))
            .await?;
        let pr: GitHubPullRequest = self.handle_response(response).await?;
        Ok(pr.into())
    }

    #[instrument(skip(self))]
    async fn merge_pr(&self, number: u64, method: MergeMethod) -> Result<(), ForgeError> {
        self.require_token()?;
        let body = MergePrBody {
            merge_method: method.as_str(),
        };
        let response = self
            .send(
                self.client
                    .put(self.repo_url(&format!("pulls/{}/merge", number)))
                    .json(&body),
            )
            .await?;
        self.handle_empty_response(response).await
    }

    #[instrument(skip(self))]
    async fn close_pr(&self, number: u64) -> Result<(), ForgeError> {
        self.require_token()?;
        let body = UpdateStateBody { state: "closed" };
        let response = self
            .send(
                self.client
                    .patch(self.repo_url(&format!("pulls/{}", number)))
                    .json(&body),
            )
            .await?;
        self.handle_empty_response(response).await
    }

    #[instrument(skip(self))]
    async fn repository_visibility(&self) -> Result<Visibility, ForgeError> {
        let response = self.send(self.client.get(self.repo_url(""))).await?;
        match self.handle_response::<GitHubRepository>(response).await {
            Ok(repo) if repo.private => Ok(Visibility::Private),
            Ok(_) => Ok(Visibility::Public),
            // Anonymous requests cannot see private repositories at all
            Err(ForgeError::NotFound(_)) if self.token.is_none() => Ok(Visibility::Private),
            Err(e) => Err(e),
        }
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
}

#[derive(Serialize)]
struct MergePrBody<'a> {
    merge_method: &'a str,
}

#[derive(Serialize)]
struct UpdateStateBody<'a> {
    state: &'a str,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
    #[serde(default)]
    errors: Vec<GitHubErrorDetail>,
}

#[derive(Deserialize)]
struct GitHubErrorDetail {
    message: Option<String>,
}

impl GitHubErrorResponse {
    fn full_message(self) -> String {
        let details: Vec<String> = self.errors.into_iter().filter_map(|e| e.message).collect();
        if details.is_empty() {
            self.message
        } else {
            format!("{}: {}", self.message, details.join("; "))
        }
    }
}

/// GitHub PR format, shared by the list and single-PR endpoints.
///
/// `mergeable` is only present on the single-PR endpoint.
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    title: String,
    body: Option<String>,
    head: GitHubRef,
    base: GitHubRef,
    user: Option<GitHubUser>,
    #[serde(default)]
    mergeable: Option<bool>,
}

#[derive(Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Deserialize)]
struct GitHubRepository {
    private: bool,
}

impl From<GitHubPullRequest> for PullRequest {
    fn from(pr: GitHubPullRequest) -> Self {
        PullRequest {
            number: pr.number,
            title: pr.title,
            body: pr.body,
            head: pr.head.ref_name,
            base: pr.base.ref_name,
            author: pr.user.map(|u| u.login).unwrap_or_default(),
            mergeable: Mergeable::from(pr.mergeable),
            html_url: pr.html_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repo_id() -> RepoId {
        RepoId::parse("https://github.com/owner/vault.git").unwrap()
    }

    fn forge_at(server: &MockServer, token: Option<&str>) -> GitHubForge {
        GitHubForge::with_api_base(&repo_id(), token.map(str::to_string), server.uri())
    }

    fn pr_json(number: u64, head: &str, mergeable: serde_json::Value) -> serde_json::Value {
        json!({
            "number": number,
            "html_url": format!("https://github.com/owner/vault/pull/{}", number),
            "title": format!("PR {}", number),
            "body": null,
            "head": { "ref": head },
            "base": { "ref": "main" },
            "user": { "login": "ada" },
            "mergeable": mergeable,
        })
    }

    #[test]
    fn repo_url_format() {
        let forge = GitHubForge::new(&repo_id(), Some("t".into()));
        assert_eq!(
            forge.repo_url("pulls/7"),
            "https://api.github.com/repos/owner/vault/pulls/7"
        );
        assert_eq!(forge.repo_url(""), "https://api.github.com/repos/owner/vault");
    }

    #[test]
    fn enterprise_host_uses_api_v3() {
        let id = RepoId::parse("git@ghe.corp.net:team/notes.git").unwrap();
        let forge = GitHubForge::new(&id, None);
        assert_eq!(
            forge.repo_url("pulls"),
            "https://ghe.corp.net/api/v3/repos/team/notes/pulls"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let forge = GitHubForge::new(&repo_id(), Some("secret_token_abc123".into()));
        let output = format!("{:?}", forge);
        assert!(!output.contains("secret_token_abc123"));
        assert!(output.contains("has_token"));
    }

    #[tokio::test]
    async fn create_pr_posts_head_and_base() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/vault/pulls"))
            .and(header("authorization", "Bearer tok"))
            .and(header("x-github-api-version", API_VERSION))
            .and(body_json(json!({
                "head": "notes/x",
                "base": "main",
                "title": "Notes",
                "body": "why",
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(pr_json(42, "notes/x", json!(null))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let pr = forge_at(&server, Some("tok"))
            .create_pr(CreatePrRequest {
                head: "notes/x".into(),
                base: "main".into(),
                title: "Notes".into(),
                body: Some("why".into()),
            })
            .await
            .unwrap();

        assert_eq!(pr.number, 42);
        assert_eq!(pr.author, "ada");
        assert_eq!(pr.html_url, "https://github.com/owner/vault/pull/42");
    }

    #[tokio::test]
    async fn create_pr_without_token_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = forge_at(&server, None)
            .create_pr(CreatePrRequest {
                head: "x".into(),
                base: "main".into(),
                title: "t".into(),
                body: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, ForgeError::AuthRequired);
    }

    #[tokio::test]
    async fn validation_error_surfaces_remote_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/owner/vault/pulls"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "errors": [{ "message": "A pull request already exists for owner:notes/x." }],
            })))
            .mount(&server)
            .await;

        let err = forge_at(&server, Some("tok"))
            .create_pr(CreatePrRequest {
                head: "notes/x".into(),
                base: "main".into(),
                title: "t".into(),
                body: None,
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ForgeError::ApiError {
                status: 422,
                message: "Validation Failed: A pull request already exists for owner:notes/x."
                    .into(),
            }
        );
    }

    #[tokio::test]
    async fn list_open_prs_reads_state_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/vault/pulls"))
            .and(query_param("state", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                pr_json(2, "b", json!(null)),
                pr_json(1, "a", json!(null)),
            ])))
            .mount(&server)
            .await;

        let prs = forge_at(&server, Some("tok")).list_open_prs().await.unwrap();
        assert_eq!(prs.len(), 2);
        assert_eq!(prs[0].number, 2);
        assert_eq!(prs[0].mergeable, Mergeable::Unknown);
    }

    #[tokio::test]
    async fn get_pr_reads_mergeable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/vault/pulls/5"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(pr_json(5, "c", json!(false))),
            )
            .mount(&server)
            .await;

        let pr = forge_at(&server, Some("tok")).get_pr(5).await.unwrap();
        assert_eq!(pr.mergeable, Mergeable::Conflicting);
    }

    #[tokio::test]
    async fn merge_sends_method() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/owner/vault/pulls/42/merge"))
            .and(body_json(json!({ "merge_method": "squash" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "merged": true,
                "message": "Pull Request successfully merged",
            })))
            .expect(1)
            .mount(&server)
            .await;

        forge_at(&server, Some("tok"))
            .merge_pr(42, MergeMethod::Squash)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn merge_not_mergeable_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/owner/vault/pulls/9/merge"))
            .respond_with(ResponseTemplate::new(405).set_body_json(json!({
                "message": "Pull Request is not mergeable",
            })))
            .mount(&server)
            .await;

        let err = forge_at(&server, Some("tok"))
            .merge_pr(9, MergeMethod::Merge)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Pull Request is not mergeable (HTTP 405)");
    }

    #[tokio::test]
    async fn close_patches_state() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/repos/owner/vault/pulls/3"))
            .and(body_json(json!({ "state": "closed" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(pr_json(3, "x", json!(null))))
            .expect(1)
            .mount(&server)
            .await;

        forge_at(&server, Some("tok")).close_pr(3).await.unwrap();
    }

    #[tokio::test]
    async fn unauthorized_is_auth_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/vault/pulls/1"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
            )
            .mount(&server)
            .await;

        let err = forge_at(&server, Some("bad")).get_pr(1).await.unwrap_err();
        assert_eq!(err, ForgeError::AuthFailed("Bad credentials".into()));
    }

    #[tokio::test]
    async fn visibility_public_without_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/vault"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "private": false })))
            .mount(&server)
            .await;

        let vis = forge_at(&server, None).repository_visibility().await.unwrap();
        assert_eq!(vis, Visibility::Public);
    }

    #[tokio::test]
    async fn visibility_anonymous_404_is_private() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/vault"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
            .mount(&server)
            .await;

        assert_eq!(
            forge_at(&server, None).repository_visibility().await.unwrap(),
            Visibility::Private
        );
        assert!(matches!(
            forge_at(&server, Some("tok")).repository_visibility().await,
            Err(ForgeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn visibility_private_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/vault"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "private": true })))
            .mount(&server)
            .await;

        assert_eq!(
            forge_at(&server, Some("tok"))
                .repository_visibility()
                .await
                .unwrap(),
            Visibility::Private
        );
    }
}
