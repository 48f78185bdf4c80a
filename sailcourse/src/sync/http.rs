//! Course service HTTP interface.
//!
//! The [`CourseApi`] trait is the seam between the sync layer and the
//! remote course service, allowing mock implementations in tests. The
//! service reports application errors as `{error, reason}` bodies on a 2xx
//! transport status; those surface as [`ApiError::Server`].

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::model::{Course, ErrorResponse};

/// Default request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the course service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connect, timeout, decode).
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("unexpected http status {0}")]
    Status(reqwest::StatusCode),

    /// Application error reported by the service on a 2xx response.
    #[error("server rejected request: {0}")]
    Server(String),
}

/// Asynchronous course service operations.
///
/// Futures are `Send` so callers can dispatch writes as fire-and-forget
/// tasks.
pub trait CourseApi: Send + Sync + 'static {
    /// `GET /clubs/{id}/courses`.
    fn courses_for_club(
        &self,
        club_id: String,
    ) -> impl Future<Output = Result<Vec<Course>, ApiError>> + Send;

    /// `PUT /courses/{id}` with the full course body.
    fn put_course(&self, course: Course) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `POST /courses`, returning the created course.
    fn post_course(
        &self,
        course: Course,
    ) -> impl Future<Output = Result<Course, ApiError>> + Send;

    /// `DELETE /courses/{id}`, best effort; callers refresh the list
    /// afterwards.
    fn delete_course(&self, course_id: String)
        -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Real course service client backed by reqwest.
pub struct ReqwestCourseApi {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl ReqwestCourseApi {
    /// Creates a client for the given service endpoint. The opaque session
    /// id is attached to every mutating request as a `Session-ID` header.
    pub fn new(base_url: impl Into<String>, session_id: impl Into<String>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            session_id: session_id.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl CourseApi for ReqwestCourseApi {
    fn courses_for_club(
        &self,
        club_id: String,
    ) -> impl Future<Output = Result<Vec<Course>, ApiError>> + Send {
        async move {
            let response = self
                .client
                .get(self.url(&format!("/clubs/{}/courses", club_id)))
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(ApiError::Status(response.status()));
            }
            Ok(response.json::<Vec<Course>>().await?)
        }
    }

    fn put_course(&self, course: Course) -> impl Future<Output = Result<(), ApiError>> + Send {
        async move {
            let response = self
                .client
                .put(self.url(&format!("/courses/{}", course.id)))
                .header("Session-ID", &self.session_id)
                .json(&course)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(ApiError::Status(response.status()));
            }
            let body = response.json::<ErrorResponse>().await?;
            if body.error {
                return Err(ApiError::Server(body.reason));
            }
            Ok(())
        }
    }

    fn post_course(
        &self,
        course: Course,
    ) -> impl Future<Output = Result<Course, ApiError>> + Send {
        async move {
            let response = self
                .client
                .post(self.url("/courses"))
                .header("Session-ID", &self.session_id)
                .json(&course)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(ApiError::Status(response.status()));
            }
            Ok(response.json::<Course>().await?)
        }
    }

    fn delete_course(
        &self,
        course_id: String,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        async move {
            let response = self
                .client
                .delete(self.url(&format!("/courses/{}", course_id)))
                .header("Session-ID", &self.session_id)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(ApiError::Status(response.status()));
            }
            Ok(())
        }
    }
}
