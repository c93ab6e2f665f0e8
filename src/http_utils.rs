use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fmt;

use crate::cli_utils;

/// A non-success response from the garden API.
#[derive(Debug)]
pub struct HttpError {
    /// HTTP status code.
    pub status: u16,
    /// Response body, or a placeholder when it was empty.
    pub message: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl Error for HttpError {}

/// Client for the garden REST API.
pub struct GardenClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl GardenClient {
    /// Creates a client for the server at `base_url`, authenticating with `token` if given.
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|token| !token.is_empty()),
        }
    }

    /// Constructs a full API URL from a path
    pub fn api_url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/api/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("Token {}", token)),
            None => request,
        }
    }

    /// Makes a GET request and handles the response
    pub async fn get<T>(&self, path: &str) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        let request = self.client.get(self.api_url(path));
        let response = self.authorized(request).send().await?;
        self.handle_response(response).await
    }

    /// Makes a POST request with JSON body and handles the response
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, Box<dyn Error>>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.api_url(path)).json(body);
        let response = self.authorized(request).send().await?;
        self.handle_response(response).await
    }

    /// Makes a PUT request with JSON body and handles the response
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, Box<dyn Error>>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        let request = self.client.put(self.api_url(path)).json(body);
        let response = self.authorized(request).send().await?;
        self.handle_response(response).await
    }

    /// Makes a PATCH request with JSON body and handles the response
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, Box<dyn Error>>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        let request = self.client.patch(self.api_url(path)).json(body);
        let response = self.authorized(request).send().await?;
        self.handle_response(response).await
    }

    /// Makes a PUT request with a raw body and handles the response
    pub async fn put_bytes<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        let request = self
            .client
            .put(self.api_url(path))
            .query(query)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body);
        let response = self.authorized(request).send().await?;
        self.handle_response(response).await
    }

    /// Makes a DELETE request and handles the response (no body expected)
    pub async fn delete(&self, path: &str) -> Result<(), Box<dyn Error>> {
        let request = self.client.delete(self.api_url(path));
        let response = self.authorized(request).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Box::new(Self::error_from(response).await))
        }
    }

    /// Handles HTTP response, deserializing success or returning error
    async fn handle_response<T>(&self, response: Response) -> Result<T, Box<dyn Error>>
    where
        T: DeserializeOwned,
    {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Box::new(Self::error_from(response).await))
        }
    }

    async fn error_from(response: Response) -> HttpError {
        let status = response.status().as_u16();
        let error = response.text().await.unwrap_or_default();
        let message = if error.is_empty() {
            "No error details".to_string()
        } else {
            error
        };
        HttpError { status, message }
    }
}

/// Execute an HTTP operation and exit on error with formatted message
pub async fn execute_or_exit<T, F, Fut>(operation: F, context: &str) -> T
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, Box<dyn Error>>>,
{
    match operation().await {
        Ok(result) => result,
        Err(e) => match e.downcast_ref::<HttpError>() {
            Some(http) => {
                let user_error = crate::commands::errors::HttpOperationError::from(http)
                    .into_user_error(context);
                match user_error.usage_hint {
                    Some(hint) => cli_utils::exit_with_usage_error(&user_error.message, &hint),
                    None => cli_utils::exit_with_error(&user_error.message),
                }
            }
            None => cli_utils::exit_with_error(&format!("{}: {}", context, e)),
        },
    }
}
