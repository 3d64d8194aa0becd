mod middleware;
mod public;
mod viewer;

pub use middleware::RequestContext;
pub use public::{HttpState, build_router};
pub use viewer::{CurrentUser, LOGIN_URL, ViewerState, login_redirect};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

/// Name of the header carrying the authenticated username when none is configured.
pub const DEFAULT_USER_HEADER: &str = "x-remote-user";

fn health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
