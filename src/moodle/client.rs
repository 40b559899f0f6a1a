//! Moodle REST web-service client
//!
//! Nothing here is tied to a particular Moodle deployment. The
//! [`MoodleConnector`] holds the shared connection pool and timeouts and
//! talks to whatever instance URL it is handed; [`MoodleClient`] is built
//! per request from a session's host and token.

use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};

use crate::config::Timeouts;

use super::error::{AuthFailure, ErrorCode, RemoteCallResult, RemoteError};
use super::urls::{self, TOKEN_PATH, WEBSERVICE_PATH};

/// Web service that issues mobile-app tokens
pub const MOBILE_SERVICE: &str = "moodle_mobile_app";

/// Successful token issuance
#[derive(Debug, Clone, PartialEq)]
pub struct Authenticated {
    pub token: String,
    /// `userid`, `username` and `moodle_url`
    pub user_info: Map<String, Value>,
}

/// Bytes of a downloaded file
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Entry point for unauthenticated calls against any instance
#[derive(Debug, Clone)]
pub struct MoodleConnector {
    http: Client,
    timeouts: Timeouts,
}

impl MoodleConnector {
    pub fn new(timeouts: Timeouts) -> Self {
        let http = Client::builder()
            .user_agent(concat!("moodle-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { http, timeouts }
    }

    /// Best-effort check that `moodle_url` hosts a Moodle site.
    ///
    /// The token endpoint answering 200 is enough. Otherwise the front page
    /// must mention Moodle. Transport failures count as "not Moodle".
    pub async fn validate_instance(&self, moodle_url: &str) -> bool {
        match self.probe(moodle_url).await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!("Failed to validate Moodle instance {}: {}", moodle_url, e);
                false
            }
        }
    }

    async fn probe(&self, moodle_url: &str) -> Result<bool, reqwest::Error> {
        let response = self
            .http
            .get(urls::endpoint(moodle_url, TOKEN_PATH))
            .timeout(self.timeouts.validate())
            .send()
            .await?;

        if response.status() == StatusCode::OK {
            return Ok(true);
        }

        let body = self
            .http
            .get(moodle_url)
            .timeout(self.timeouts.validate())
            .send()
            .await?
            .text()
            .await?;

        Ok(body.to_lowercase().contains("moodle"))
    }

    /// Exchange a username and password for a web-service token
    pub async fn authenticate(
        &self,
        moodle_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Authenticated, AuthFailure> {
        let form = [
            ("username", username),
            ("password", password),
            ("service", MOBILE_SERVICE),
        ];

        let response = self
            .http
            .post(urls::endpoint(moodle_url, TOKEN_PATH))
            .form(&form[..])
            .timeout(self.timeouts.request())
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Authentication request to {} failed: {}", moodle_url, e);
                AuthFailure::from(RemoteError::from(e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthFailure::from(RemoteError::from(e)))?;

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(result)) => {
                if let Some(token) = result.get("token").and_then(Value::as_str) {
                    let mut user_info = Map::new();
                    user_info.insert(
                        "userid".into(),
                        result.get("userid").cloned().unwrap_or(Value::Null),
                    );
                    user_info.insert("username".into(), json!(username));
                    user_info.insert("moodle_url".into(), json!(moodle_url));
                    return Ok(Authenticated {
                        token: token.to_string(),
                        user_info,
                    });
                }

                if let Some(error) = result.get("error").and_then(Value::as_str) {
                    return Err(AuthFailure {
                        message: error.to_string(),
                        errorcode: result
                            .get("errorcode")
                            .and_then(Value::as_str)
                            .unwrap_or("unknown")
                            .to_string(),
                    });
                }

                if !status.is_success() {
                    return Err(http_failure(status).into());
                }
                Err(AuthFailure {
                    message: "Authentication failed".into(),
                    errorcode: ErrorCode::Unknown.as_str().into(),
                })
            }
            _ if !status.is_success() => Err(http_failure(status).into()),
            _ => Err(RemoteError::new(ErrorCode::Unknown, "Invalid response from Moodle").into()),
        }
    }

    /// Client for authenticated calls on behalf of one session
    pub fn client(&self, moodle_url: impl Into<String>, token: impl Into<String>) -> MoodleClient {
        MoodleClient {
            http: self.http.clone(),
            timeouts: self.timeouts,
            base_url: moodle_url.into(),
            token: token.into(),
        }
    }
}

fn http_failure(status: StatusCode) -> RemoteError {
    RemoteError::new(ErrorCode::HttpError, format!("HTTP error {}", status.as_u16()))
}

/// Authenticated client bound to one instance and token
#[derive(Debug, Clone)]
pub struct MoodleClient {
    http: Client,
    timeouts: Timeouts,
    base_url: String,
    token: String,
}

impl MoodleClient {
    /// Invoke a web-service function. Every authenticated call goes through
    /// here.
    pub async fn call(&self, function: &str, params: &[(&str, String)]) -> RemoteCallResult {
        let result = self.send_call(function, params).await;
        if let Err(e) = &result {
            tracing::error!("Moodle API request {} failed: {}", function, e);
        }
        result
    }

    async fn send_call(&self, function: &str, params: &[(&str, String)]) -> RemoteCallResult {
        let mut form: Vec<(&str, &str)> = vec![
            ("wstoken", self.token.as_str()),
            ("wsfunction", function),
            ("moodlewsrestformat", "json"),
        ];
        form.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        let response = self
            .http
            .post(urls::endpoint(&self.base_url, WEBSERVICE_PATH))
            .form(&form[..])
            .timeout(self.timeouts.request())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(http_failure(response.status()));
        }

        let result: Value = response.json().await?;

        if let Some(exception) = result.as_object().filter(|o| o.contains_key("exception")) {
            let message = exception
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            return Err(RemoteError::remote(message));
        }

        Ok(result)
    }

    /// `core_webservice_get_site_info`: site and current-user details
    pub async fn site_info(&self) -> RemoteCallResult {
        self.call("core_webservice_get_site_info", &[]).await
    }

    /// Courses the current user is enrolled in.
    ///
    /// Resolves the user id through [`site_info`](Self::site_info) first. A
    /// failure in either step, an unusable id or a non-list answer yields an
    /// empty list.
    pub async fn user_courses(&self) -> RemoteCallResult<Vec<Value>> {
        let site_info = match self.site_info().await {
            Ok(site_info) => site_info,
            Err(e) => {
                tracing::warn!("Could not resolve user on {}: {}", self.base_url, e);
                return Ok(Vec::new());
            }
        };
        let Some(userid) = site_info
            .get("userid")
            .and_then(Value::as_i64)
            .filter(|id| *id > 0)
        else {
            tracing::warn!("Site info from {} carried no user id", self.base_url);
            return Ok(Vec::new());
        };

        match self
            .call("core_enrol_get_users_courses", &[("userid", userid.to_string())])
            .await
        {
            Ok(result) => Ok(into_list(result)),
            Err(e) => {
                tracing::warn!("Could not list courses for user {}: {}", userid, e);
                Ok(Vec::new())
            }
        }
    }

    /// Section tree of one course
    pub async fn course_contents(&self, course_id: i64) -> RemoteCallResult<Vec<Value>> {
        let result = self
            .call("core_course_get_contents", &[("courseid", course_id.to_string())])
            .await?;
        Ok(into_list(result))
    }

    /// Course records matching `field = value`
    pub async fn courses_by_field(&self, field: &str, value: &str) -> RemoteCallResult<Vec<Value>> {
        let result = self
            .call(
                "core_course_get_courses_by_field",
                &[("field", field.to_string()), ("value", value.to_string())],
            )
            .await?;

        match result {
            Value::Object(mut map) => Ok(map.remove("courses").map(into_list).unwrap_or_default()),
            other => Ok(into_list(other)),
        }
    }

    /// Fetch a file served by this instance, authenticating with the token
    pub async fn download_file(&self, file_url: &str) -> RemoteCallResult<FileDownload> {
        let result = self.send_download(file_url).await;
        if let Err(e) = &result {
            tracing::error!("Failed to download file {}: {}", file_url, e);
        }
        result
    }

    async fn send_download(&self, file_url: &str) -> RemoteCallResult<FileDownload> {
        let response = self
            .http
            .get(urls::with_token(file_url, &self.token))
            .timeout(self.timeouts.file())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(http_failure(response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(FileDownload {
            bytes,
            content_type,
        })
    }
}

fn into_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}
