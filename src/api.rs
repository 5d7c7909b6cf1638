use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::model::{Datastore, InputDescriptor, StateRecord, TaskDefinition, TaskUpdate};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not authorized; log in again")]
    Unauthorized,
    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid authorization token")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
    #[error("invalid backend url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug)]
pub enum Endpoint<'a> {
    Tasks,
    Task(&'a str),
    States,
    Run(&'a str),
    Datastore,
    Inputs,
}

impl<'a> Endpoint<'a> {
    /// Path segments below the base URL, unencoded.
    pub fn segments(&self, workflow: &'a str) -> Vec<&'a str> {
        let (resource, task) = match *self {
            Self::Tasks => ("task", None),
            Self::Task(task) => ("task", Some(task)),
            Self::States => ("state", None),
            Self::Run(task) => ("run", Some(task)),
            Self::Datastore => ("datastore", None),
            Self::Inputs => ("input", None),
        };
        let mut segments = vec!["api", "v1", resource, workflow];
        segments.extend(task);
        segments
    }

    /// Full URL under `base`, each segment percent-encoded.
    pub fn url(&self, base: &Url, workflow: &'a str) -> Url {
        let mut url = base.clone();
        // `base` is checked to be a hierarchical URL when the client is built.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(self.segments(workflow));
        }
        url
    }
}

/// Client for the workflow backend's REST API, bound to one workflow.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
    workflow: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let invalid = |reason: String| ApiError::InvalidUrl {
            url: config.base_url.clone(),
            reason,
        };
        let base = Url::parse(&config.base_url).map_err(|err| invalid(err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a hierarchical url".to_string()));
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("{} {}", config.auth_scheme, token))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base,
            workflow: config.workflow.clone(),
        })
    }

    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    fn request(&self, method: Method, endpoint: Endpoint<'_>) -> RequestBuilder {
        self.client
            .request(method, endpoint.url(&self.base, &self.workflow))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint<'_>) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, endpoint)).await?;
        Ok(response.json().await?)
    }

    pub async fn tasks(&self) -> Result<Vec<TaskDefinition>, ApiError> {
        self.get_json(Endpoint::Tasks).await
    }

    pub async fn states(&self) -> Result<Vec<StateRecord>, ApiError> {
        self.get_json(Endpoint::States).await
    }

    pub async fn datastore(&self) -> Result<Datastore, ApiError> {
        self.get_json(Endpoint::Datastore).await
    }

    pub async fn inputs(&self) -> Result<Vec<InputDescriptor>, ApiError> {
        self.get_json(Endpoint::Inputs).await
    }

    pub async fn update_task(&self, task: &str, update: &TaskUpdate) -> Result<(), ApiError> {
        self.send(self.request(Method::PUT, Endpoint::Task(task)).json(update))
            .await?;
        Ok(())
    }

    pub async fn update_datastore(&self, datastore: &Datastore) -> Result<(), ApiError> {
        self.send(self.request(Method::PUT, Endpoint::Datastore).json(datastore))
            .await?;
        Ok(())
    }

    pub async fn run_task(&self, task: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::POST, Endpoint::Run(task)))
            .await?;
        Ok(())
    }

    pub async fn kill_task(&self, task: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, Endpoint::Run(task)))
            .await?;
        Ok(())
    }
}
