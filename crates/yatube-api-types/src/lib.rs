//! Request and response types exchanged over the yatube HTTP surface.
//!
//! The server renders these from its domain records; clients and tests
//! deserialize them back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub pub_date: OffsetDateTime,
    /// Username of the author.
    pub author: String,
    /// Slug of the group, if the post belongs to one.
    pub group: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: i64,
    pub author: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

/// One page of an ordered listing plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u32>,
    pub previous_page_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFeedView {
    pub group: GroupView,
    pub page: PageView<PostView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    pub author: UserView,
    /// Whether the current viewer follows `author`. Always false for
    /// anonymous viewers and for the author looking at their own profile.
    pub following: bool,
    pub posts_count: u64,
    pub followers_count: u64,
    pub following_count: u64,
    pub page: PageView<PostView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetailView {
    pub post: PostView,
    pub author: UserView,
    pub posts_count: u64,
    pub comments: Vec<CommentView>,
}

/// Data for the post form: the post being edited, if any, and the groups
/// it can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFormView {
    pub post: Option<PostView>,
    pub groups: Vec<GroupView>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewPostRequest {
    pub text: String,
    /// Identifier of the group to file the post under.
    pub group: Option<i64>,
    /// Opaque reference to an already stored image.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentRequest {
    pub text: String,
}

/// Body returned with `422 Unprocessable Entity` when a submission fails validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrorsBody {
    pub errors: BTreeMap<String, Vec<String>>,
}
