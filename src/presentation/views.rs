use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use yatube_api_types::{
    CommentView, GroupFeedView, GroupView, PostDetailView, PostFormView, PostView, ProfileView,
    UserView,
};

use crate::application::error::HttpError;
use crate::application::feed::{GroupFeed, ProfileFeed};
use crate::application::pagination::Page;
use crate::application::posts::PostDetail;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// A post as shown in the rendered global feed.
#[derive(Debug, Clone)]
pub struct PostCard {
    pub id: i64,
    pub author: String,
    pub text: String,
    pub group: Option<String>,
    pub image: Option<String>,
    pub published_iso: String,
    pub published_display: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        let display = format_description!("[day] [month repr:short] [year] [hour]:[minute]");
        Self {
            id: post.id,
            author: post.author_username.clone(),
            text: post.text.clone(),
            group: post.group_slug.clone(),
            image: post.image.clone(),
            published_iso: post.pub_date.format(&Rfc3339).unwrap_or_default(),
            published_display: post.pub_date.format(display).unwrap_or_default(),
        }
    }
}

/// The cacheable body of the index page: one page of the global feed.
#[derive(Template)]
#[template(path = "index_fragment.html")]
pub struct IndexFragmentTemplate {
    pub cards: Vec<PostCard>,
    pub number: u32,
    pub num_pages: u32,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

impl From<&Page<PostRecord>> for IndexFragmentTemplate {
    fn from(page: &Page<PostRecord>) -> Self {
        Self {
            cards: page.items.iter().map(PostCard::from).collect(),
            number: page.number,
            num_pages: page.num_pages,
            previous: page.previous_page_number(),
            next: page.next_page_number(),
        }
    }
}

pub fn render_index_fragment(page: &Page<PostRecord>) -> Result<String, TemplateRenderError> {
    IndexFragmentTemplate::from(page).render().map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_index_fragment",
            "Feed rendering failed",
            err,
        )
    })
}

/// Full index page around an already rendered (possibly cached) fragment.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPageTemplate {
    pub username: Option<String>,
    pub fragment: String,
}

pub fn user_view(user: &UserRecord) -> UserView {
    UserView {
        id: user.id,
        username: user.username.clone(),
        full_name: user.full_name.clone(),
    }
}

pub fn group_view(group: &GroupRecord) -> GroupView {
    GroupView {
        id: group.id,
        title: group.title.clone(),
        slug: group.slug.clone(),
        description: group.description.clone(),
    }
}

pub fn post_view(post: &PostRecord) -> PostView {
    PostView {
        id: post.id,
        text: post.text.clone(),
        pub_date: post.pub_date,
        author: post.author_username.clone(),
        group: post.group_slug.clone(),
        image: post.image.clone(),
    }
}

pub fn comment_view(comment: &CommentRecord) -> CommentView {
    CommentView {
        id: comment.id,
        author: comment.author_username.clone(),
        text: comment.text.clone(),
        created: comment.created,
    }
}

pub fn group_feed_view(feed: &GroupFeed) -> GroupFeedView {
    GroupFeedView {
        group: group_view(&feed.group),
        page: feed.page.to_view(post_view),
    }
}

pub fn profile_view(feed: &ProfileFeed) -> ProfileView {
    ProfileView {
        author: user_view(&feed.author),
        following: feed.following,
        posts_count: feed.posts_count,
        followers_count: feed.followers_count,
        following_count: feed.following_count,
        page: feed.page.to_view(post_view),
    }
}

pub fn post_detail_view(detail: &PostDetail) -> PostDetailView {
    PostDetailView {
        post: post_view(&detail.post),
        author: user_view(&detail.author),
        posts_count: detail.posts_count,
        comments: detail.comments.iter().map(comment_view).collect(),
    }
}

pub fn post_form_view(post: Option<&PostRecord>, groups: &[GroupRecord]) -> PostFormView {
    PostFormView {
        post: post.map(post_view),
        groups: groups.iter().map(group_view).collect(),
    }
}
