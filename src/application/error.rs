use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::application::feed::FeedError;
use crate::application::follow::FollowError;
use crate::application::posts::PostError;
use crate::application::repos::RepoError;
use crate::config::LoadError;
use crate::infra::error::InfraError;

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

const SERVICE_ERROR_SOURCE: &str = "application::error::service_error_to_http";

pub fn repo_error_to_http(error: &RepoError) -> HttpError {
    match error {
        RepoError::NotFound => HttpError::from_error(
            SERVICE_ERROR_SOURCE,
            StatusCode::NOT_FOUND,
            "Resource not found",
            error,
        ),
        RepoError::Timeout => HttpError::from_error(
            SERVICE_ERROR_SOURCE,
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            error,
        ),
        _ => HttpError::from_error(
            SERVICE_ERROR_SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            error,
        ),
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        match error {
            FeedError::UnknownGroup(_) | FeedError::UnknownAuthor(_) => HttpError::from_error(
                SERVICE_ERROR_SOURCE,
                StatusCode::NOT_FOUND,
                "Resource not found",
                &error,
            ),
            FeedError::Render(err) => err.into(),
            FeedError::Repo(err) => repo_error_to_http(&err),
        }
    }
}

impl From<PostError> for HttpError {
    fn from(error: PostError) -> Self {
        match error {
            PostError::NotFound { .. } => HttpError::from_error(
                SERVICE_ERROR_SOURCE,
                StatusCode::NOT_FOUND,
                "Resource not found",
                &error,
            ),
            PostError::Invalid(errors) => HttpError::from_error(
                SERVICE_ERROR_SOURCE,
                StatusCode::UNPROCESSABLE_ENTITY,
                "Submission is invalid",
                &errors,
            ),
            PostError::Repo(err) => repo_error_to_http(&err),
        }
    }
}

impl From<FollowError> for HttpError {
    fn from(error: FollowError) -> Self {
        match error {
            FollowError::UnknownAuthor(_) | FollowError::NotFollowing { .. } => {
                HttpError::from_error(
                    SERVICE_ERROR_SOURCE,
                    StatusCode::NOT_FOUND,
                    "Resource not found",
                    &error,
                )
            }
            FollowError::Repo(err) => repo_error_to_http(&err),
        }
    }
}

/// Failures that abort a command of the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to seed groups: {0}")]
    Seed(#[from] RepoError),
}
