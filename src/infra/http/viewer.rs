use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{HeaderName, StatusCode, header::LOCATION, request::Parts},
    response::{IntoResponse, Response},
};

use crate::application::repos::UsersRepo;
use crate::application::viewer::Viewer;
use crate::domain::entities::UserRecord;

pub const LOGIN_URL: &str = "/auth/login/";

/// Where the viewer middleware reads the actor's identity from.
#[derive(Clone)]
pub struct ViewerState {
    pub users: Arc<dyn UsersRepo>,
    pub header: HeaderName,
    /// Create users the store has not seen yet.
    pub provision: bool,
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Viewer>().cloned().unwrap_or_default())
    }
}

/// An authenticated actor. Anonymous requests are redirected to the login page.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Viewer>() {
            Some(Viewer::User(user)) => Ok(CurrentUser(user.clone())),
            _ => Err(login_redirect(parts.uri.path())),
        }
    }
}

/// `302 Found` to the login page carrying the original path as `next`.
pub fn login_redirect(next: &str) -> Response {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    let location = format!("{LOGIN_URL}?{query}");
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirect_encodes_next_path() {
        let response = login_redirect("/new/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).expect("location header"),
            "/auth/login/?next=%2Fnew%2F"
        );
    }
}
