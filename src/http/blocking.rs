//! Blocking counterpart of [`HttpClient`](super::HttpClient).
//!
//! Same request profile and error contract; every call parks the calling
//! thread until the response body has been read. Must not be constructed or
//! used from inside the tokio runtime.

use super::multipart::{self, MultipartForm};
use super::{encode_form, parse_url, ClientOptions, Headers, HttpResponse, RequestProfile};
use crate::core::error::HttpError;
use reqwest::blocking::RequestBuilder;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use url::Url;

pub struct BlockingHttpClient {
    client: reqwest::blocking::Client,
    profile: RequestProfile,
    boundary: String,
}

impl BlockingHttpClient {
    pub fn new(options: &ClientOptions) -> Result<Self, HttpError> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .cookie_store(options.cookies);

        if options.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build().map_err(HttpError::Client)?,
            profile: RequestProfile::new(options),
            boundary: multipart::new_boundary(),
        })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse, HttpError> {
        let target = parse_url(url)?;
        let builder = self
            .client
            .get(target.clone())
            .headers(self.profile.headers(headers)?);
        self.execute(&target, builder)
    }

    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &Headers,
    ) -> Result<T, HttpError> {
        self.get(url, headers)?.json()
    }

    pub fn post(
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
        self.execute(&target, builder)
    }

    pub fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
        headers: &Headers,
    ) -> Result<HttpResponse, HttpError> {
        let content_type = self.profile.form_content_type.clone();
        self.post(url, encode_form(fields), &content_type, headers)
    }

    pub fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        fields: &[(&str, &str)],
        headers: &Headers,
    ) -> Result<T, HttpError> {
        self.post_form(url, fields, headers)?.json()
    }

    pub fn post_multipart(
        &self,
        url: &str,
        form: &MultipartForm,
        headers: &Headers,
    ) -> Result<HttpResponse, HttpError> {
        let content_type = multipart::content_type(&self.boundary);
        self.post(url, form.to_bytes(&self.boundary), &content_type, headers)
    }

    fn execute(&self, url: &Url, builder: RequestBuilder) -> Result<HttpResponse, HttpError> {
        tracing::debug!(%url, "sending HTTP request");
        let response = builder.send().map_err(|source| HttpError::Network {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text_with_charset(&self.profile.encoding)
            .map_err(|source| HttpError::Network {
                url: url.to_string(),
                source,
            })?;

        Ok(HttpResponse {
            url: url.to_string(),
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use reqwest::StatusCode;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // The mock server runs on its own runtime; the blocking client is used
    // from the plain test thread.
    fn start_server(rt: &tokio::runtime::Runtime) -> MockServer {
        rt.block_on(MockServer::start())
    }

    #[test]
    fn test_blocking_get_and_post_json() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mock_server = start_server(&rt);

        rt.block_on(async {
            Mock::given(method("GET"))
                .and(path("/ping"))
                .and(header("authorization", "Bearer t"))
                .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
                .mount(&mock_server)
                .await;
            Mock::given(method("POST"))
                .and(path("/token"))
                .and(body_string("a=1&b=two+words"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "access_token": "x" })),
                )
                .mount(&mock_server)
                .await;
        });

        let client = BlockingHttpClient::new(&ClientOptions::default()).unwrap();
        let mut headers = Headers::new();
        headers.insert("Authorization".to_string(), "Bearer t".to_string());

        let response = client
            .get(&format!("{}/ping", mock_server.uri()), &headers)
            .unwrap();
        assert!(response.is_ok());
        assert_eq!(response.into_text().unwrap(), "pong");

        let value: serde_json::Value = client
            .post_json(
                &format!("{}/token", mock_server.uri()),
                &[("a", "1"), ("b", "two words")],
                &Headers::new(),
            )
            .unwrap();
        assert_eq!(value["access_token"], "x");
    }

    #[test]
    fn test_blocking_multipart_body() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mock_server = start_server(&rt);
        rt.block_on(
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200))
                .mount(&mock_server),
        );

        let client = BlockingHttpClient::new(&ClientOptions::default()).unwrap();
        let form = MultipartForm::new().text("a", "1");
        let status = client
            .post_multipart(&mock_server.uri(), &form, &Headers::new())
            .unwrap()
            .status;
        assert_eq!(status, StatusCode::OK);

        let requests = rt.block_on(mock_server.received_requests()).unwrap();
        assert_eq!(requests[0].body, form.to_bytes(client.boundary()));
    }

    #[test]
    fn test_blocking_rejects_blank_url() {
        let client = BlockingHttpClient::new(&ClientOptions::default()).unwrap();
        let err = client.get("", &Headers::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }
}
