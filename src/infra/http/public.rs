use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use yatube_api_types::{CommentRequest, FieldErrorsBody, NewPostRequest};

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        feed::FeedService,
        follow::FollowService,
        pagination::parse_page_number,
        posts::{EditAccess, EditOutcome, PostError, PostService},
        repos::HealthRepo,
        viewer::Viewer,
    },
    domain::forms::{CommentForm, FormErrors, PostForm},
    presentation::views::{
        IndexPageTemplate, group_feed_view, post_detail_view, post_form_view, post_view,
        profile_view, render_template_response,
    },
};

use super::{
    health_response,
    middleware::{log_responses, resolve_viewer, set_request_context},
    viewer::{CurrentUser, ViewerState},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_router(state: HttpState, viewer: ViewerState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/_health", get(health))
        .route("/new/", get(new_post_form).post(new_post))
        .route("/follow/", get(follow_index))
        .route("/group/{slug}/", get(group_posts))
        .route("/{username}/", get(profile))
        .route(
            "/{username}/follow/",
            get(profile_follow).post(profile_follow),
        )
        .route(
            "/{username}/unfollow/",
            get(profile_unfollow).post(profile_unfollow),
        )
        .route("/{username}/{post_id}/", get(post_detail))
        .route(
            "/{username}/{post_id}/edit/",
            get(post_edit_form).post(post_edit),
        )
        .route("/{username}/{post_id}/comment/", post(add_comment))
        .with_state(state)
        .layer(middleware::from_fn_with_state(viewer, resolve_viewer))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    fn number(&self) -> i64 {
        parse_page_number(self.page.as_deref())
    }
}

fn post_url(username: &str, post_id: i64) -> String {
    format!("/{username}/{post_id}/")
}

fn profile_url(username: &str) -> String {
    format!("/{username}/")
}

/// Post ids that are not integers name no post.
fn parse_post_id(raw: &str) -> Result<i64, HttpError> {
    raw.parse::<i64>().map_err(|err| {
        HttpError::from_error(
            "infra::http::public::parse_post_id",
            StatusCode::NOT_FOUND,
            "Resource not found",
            &err,
        )
    })
}

fn invalid_submission(source: &'static str, errors: FormErrors) -> Response {
    let report = ErrorReport::from_error(source, StatusCode::UNPROCESSABLE_ENTITY, &errors);
    let body = FieldErrorsBody {
        errors: errors.into_map(),
    };
    let mut response = (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
    report.attach(&mut response);
    response
}

async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.index_fragment(query.number()).await {
        Ok(fragment) => render_template_response(
            IndexPageTemplate {
                username: viewer.user().map(|user| user.username.clone()),
                fragment,
            },
            StatusCode::OK,
        ),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn health(State(state): State<HttpState>) -> Response {
    health_response(state.health.health_check().await)
}

async fn group_posts(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let feed = state.feed.group(&slug, query.number()).await?;
    Ok(Json(group_feed_view(&feed)).into_response())
}

async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let feed = state
        .feed
        .profile(&viewer, &username, query.number())
        .await?;
    Ok(Json(profile_view(&feed)).into_response())
}

async fn post_detail(
    State(state): State<HttpState>,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<Response, HttpError> {
    let post_id = parse_post_id(&post_id)?;
    let detail = state.posts.post_view(&username, post_id).await?;
    Ok(Json(post_detail_view(&detail)).into_response())
}

async fn follow_index(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, HttpError> {
    let page = state.feed.following(&user, query.number()).await?;
    Ok(Json(page.to_view(post_view)).into_response())
}

async fn new_post_form(
    State(state): State<HttpState>,
    CurrentUser(_user): CurrentUser,
) -> Result<Response, HttpError> {
    let groups = state.posts.group_choices().await?;
    Ok(Json(post_form_view(None, &groups)).into_response())
}

async fn new_post(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<NewPostRequest>,
) -> Result<Response, HttpError> {
    let form = PostForm {
        text: request.text,
        group: request.group,
        image: request.image,
    };

    match state.posts.new_post(&user, form).await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(PostError::Invalid(errors)) => Ok(invalid_submission(
            "infra::http::public::new_post",
            errors,
        )),
        Err(err) => Err(err.into()),
    }
}

async fn post_edit_form(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path((username, post_id)): Path<(String, String)>,
) -> Result<Response, HttpError> {
    let post_id = parse_post_id(&post_id)?;
    let access = state
        .posts
        .edit_access(&Viewer::User(user), &username, post_id)
        .await?;

    match access {
        EditAccess::Authorized(post) => {
            let groups = state.posts.group_choices().await?;
            Ok(Json(post_form_view(Some(&post), &groups)).into_response())
        }
        EditAccess::Forbidden => Ok(Redirect::to(&post_url(&username, post_id)).into_response()),
    }
}

async fn post_edit(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path((username, post_id)): Path<(String, String)>,
    body: Result<Json<NewPostRequest>, JsonRejection>,
) -> Result<Response, HttpError> {
    let post_id = parse_post_id(&post_id)?;
    let back = post_url(&username, post_id);

    // A non-author is sent back to the post whatever the body holds.
    let access = state
        .posts
        .edit_access(&Viewer::User(user.clone()), &username, post_id)
        .await?;
    if matches!(access, EditAccess::Forbidden) {
        return Ok(Redirect::to(&back).into_response());
    }

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    let form = PostForm {
        text: request.text,
        group: request.group,
        image: request.image,
    };

    match state.posts.post_edit(&user, &username, post_id, form).await? {
        EditOutcome::Saved(_) | EditOutcome::Forbidden => Ok(Redirect::to(&back).into_response()),
        EditOutcome::Invalid(errors) => Ok(invalid_submission(
            "infra::http::public::post_edit",
            errors,
        )),
    }
}

async fn add_comment(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path((username, post_id)): Path<(String, String)>,
    Json(request): Json<CommentRequest>,
) -> Result<Response, HttpError> {
    let post_id = parse_post_id(&post_id)?;
    let form = CommentForm { text: request.text };

    match state.posts.add_comment(&user, &username, post_id, form).await {
        Ok(_) => Ok(Redirect::to(&post_url(&username, post_id)).into_response()),
        Err(PostError::Invalid(errors)) => Ok(invalid_submission(
            "infra::http::public::add_comment",
            errors,
        )),
        Err(err) => Err(err.into()),
    }
}

async fn profile_follow(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Response, HttpError> {
    state.follows.profile_follow(&user, &username).await?;
    Ok(Redirect::to(&profile_url(&username)).into_response())
}

async fn profile_unfollow(
    State(state): State<HttpState>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
) -> Result<Response, HttpError> {
    state.follows.profile_unfollow(&user, &username).await?;
    Ok(Redirect::to(&profile_url(&username)).into_response())
}
