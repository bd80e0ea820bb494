use super::multipart::{self, MultipartForm};
use super::{encode_form, parse_url, ClientOptions, Headers, HttpResponse, RequestProfile};
use crate::core::error::HttpError;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Non-blocking HTTP client. Cheap to clone; clones share the connection
/// pool, the cookie jar and the multipart boundary.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    profile: Arc<RequestProfile>,
    boundary: Arc<str>,
}

impl HttpClient {
    pub fn new(options: &ClientOptions) -> Result<Self, HttpError> {
        let mut builder = reqwest::Client::builder()
            .timeout(options.timeout)
            .cookie_store(options.cookies);

        if options.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(HttpError::Client)?;

        Ok(Self {
            client,
            profile: Arc::new(RequestProfile::new(options)),
            boundary: multipart::new_boundary().into(),
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub async fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, HttpError> {
        let target = parse_url(url)?;
        let builder = self
            .client
            .get(target.clone())
            .headers(self.profile.headers(headers)?);
        self.execute(&target, builder).await
    }

    /// Issues a GET and reports only the status; the body is discarded.
    pub async fn get_status(&self, url: &str, headers: &Headers) -> Result<StatusCode, HttpError> {
        let target = parse_url(url)?;
        let builder = self
            .client
            .get(target.clone())
            .headers(self.profile.headers(headers)?);

        let response = builder.send().await.map_err(|source| HttpError::Network {
            url: target.to_string(),
            source,
        })?;
        let status = response.status();
        debug!(url = %target, %status, "received HTTP response");
        Ok(status)
    }

    pub async fn get_text(&self, url: &str, headers: &Headers) -> Result<String, HttpError> {
        self.get(url, headers).await?.into_text()
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &Headers,
    ) -> Result<T, HttpError> {
        self.get(url, headers).await?.json()
    }

    pub async fn post(
        &self,
        url: &str,
        body: impl Into<Vec<u8>>,
        content_type: &str,
        headers: &Headers,
    ) -> Result<HttpResponse, HttpError> {
        let target = parse_url(url)?;
        let builder = self
            .client
            .post(target.clone())
            .header(CONTENT_TYPE, content_type)
            .headers(self.profile.headers(headers)?)
            .body(body.into());
        self.execute(&target, builder).await
    }

    /// Posts `fields` using the client's form content type.
    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
        headers: &Headers,
    ) -> Result<HttpResponse, HttpError> {
        let content_type = self.profile.form_content_type.clone();
        self.post(url, encode_form(fields), &content_type, headers)
            .await
    }

    /// Posts form fields and decodes the JSON response into `T`.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        fields: &[(&str, &str)],
        headers: &Headers,
    ) -> Result<T, HttpError> {
        self.post_form(url, fields, headers).await?.json()
    }

    /// Streams `form` part by part under this client's boundary.
    pub async fn post_multipart(
        &self,
        url: &str,
        form: &MultipartForm,
        headers: &Headers,
    ) -> Result<HttpResponse, HttpError> {
        let target = parse_url(url)?;
        let length = form.content_length(&self.boundary);
        let chunks = form.encode(&self.boundary);
        let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));

        let builder = self
            .client
            .post(target.clone())
            .header(CONTENT_TYPE, multipart::content_type(&self.boundary))
            .header(CONTENT_LENGTH, length)
            .headers(self.profile.headers(headers)?)
            .body(Body::wrap_stream(stream));
        self.execute(&target, builder).await
    }

    async fn execute(&self, url: &Url, builder: RequestBuilder) -> Result<HttpResponse, HttpError> {
        debug!(%url, "sending HTTP request");
        let response = builder.send().await.map_err(|source| HttpError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        // Reading the body to completion hands the connection back to the pool.
        let body = response
            .text_with_charset(&self.profile.encoding)
            .await
            .map_err(|source| HttpError::Network {
                url: url.to_string(),
                source,
            })?;
        debug!(%url, %status, bytes = body.len(), "received HTTP response");

        Ok(HttpResponse {
            url: url.to_string(),
            status,
            headers,
            body,
        })
    }
}
