//! Post publication, editing and commenting.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostQueryFilter, PostsRepo,
    PostsWriteRepo, RepoError, UpdatePostParams, UsersRepo,
};
use crate::application::viewer::Viewer;
use crate::cache::{self, FragmentCache};
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::forms::{CleanPost, CommentForm, FormErrors, PostForm, UNKNOWN_GROUP_MESSAGE};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("post {post_id} by `{username}` not found")]
    NotFound { username: String, post_id: i64 },
    #[error(transparent)]
    Invalid(#[from] FormErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl PostError {
    fn not_found(username: &str, post_id: i64) -> Self {
        Self::NotFound {
            username: username.to_string(),
            post_id,
        }
    }
}

/// Whether the viewer may edit a post. A forbidden edit is not an error:
/// the caller shows the read-only post instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAccess {
    Authorized(PostRecord),
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The actor is not the author; nothing was saved.
    Forbidden,
    Saved(PostRecord),
    /// The submission failed validation; nothing was saved.
    Invalid(FormErrors),
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRecord,
    pub author: UserRecord,
    /// Number of posts the author has published.
    pub posts_count: u64,
    /// Oldest first.
    pub comments: Vec<CommentRecord>,
}

/// Only the author may edit a post.
pub fn guard_edit(viewer: &Viewer, post: PostRecord) -> EditAccess {
    if viewer.is(post.author_id) {
        EditAccess::Authorized(post)
    } else {
        EditAccess::Forbidden
    }
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    comments: Arc<dyn CommentsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    fragments: Arc<dyn FragmentCache>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        comments: Arc<dyn CommentsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        fragments: Arc<dyn FragmentCache>,
    ) -> Self {
        Self {
            posts,
            writer,
            comments,
            groups,
            users,
            fragments,
        }
    }

    /// Publish a post by `author`. The fragment cache is cleared afterwards so
    /// the next global feed read shows the post.
    pub async fn new_post(&self, author: &UserRecord, form: PostForm) -> Result<PostRecord, PostError> {
        let clean = self.validate(form).await?.map_err(PostError::Invalid)?;

        let post = self
            .writer
            .create_post(CreatePostParams {
                author_id: author.id,
                text: clean.text,
                group_id: clean.group,
                image: clean.image,
            })
            .await?;

        info!(
            target = "yatube::posts",
            post_id = post.id,
            author = %author.username,
            "post published"
        );
        cache::clear_after_write(self.fragments.as_ref(), "post_created");
        Ok(post)
    }

    pub async fn post_view(&self, username: &str, post_id: i64) -> Result<PostDetail, PostError> {
        let post = self.find_post(username, post_id).await?;
        let author = self
            .users
            .find_by_id(post.author_id)
            .await?
            .ok_or_else(|| PostError::not_found(username, post_id))?;
        let posts_count = self
            .posts
            .count_posts(&PostQueryFilter::by_author(author.id))
            .await?;
        let comments = self.comments.list_for_post(post.id).await?;

        Ok(PostDetail {
            post,
            author,
            posts_count,
            comments,
        })
    }

    /// Load a post for its edit form.
    pub async fn edit_access(
        &self,
        viewer: &Viewer,
        username: &str,
        post_id: i64,
    ) -> Result<EditAccess, PostError> {
        let post = self.find_post(username, post_id).await?;
        Ok(guard_edit(viewer, post))
    }

    pub async fn post_edit(
        &self,
        actor: &UserRecord,
        username: &str,
        post_id: i64,
        form: PostForm,
    ) -> Result<EditOutcome, PostError> {
        let post = self.find_post(username, post_id).await?;
        let post = match guard_edit(&Viewer::User(actor.clone()), post) {
            EditAccess::Authorized(post) => post,
            EditAccess::Forbidden => {
                warn!(
                    target = "yatube::posts",
                    post_id,
                    actor = %actor.username,
                    "edit refused for non-author"
                );
                return Ok(EditOutcome::Forbidden);
            }
        };

        let clean = match self.validate(form).await? {
            Ok(clean) => clean,
            Err(errors) => return Ok(EditOutcome::Invalid(errors)),
        };

        let saved = self
            .writer
            .update_post(UpdatePostParams {
                id: post.id,
                text: clean.text,
                group_id: clean.group,
                image: clean.image,
            })
            .await?;

        info!(target = "yatube::posts", post_id = saved.id, "post edited");
        cache::clear_after_write(self.fragments.as_ref(), "post_edited");
        Ok(EditOutcome::Saved(saved))
    }

    pub async fn add_comment(
        &self,
        actor: &UserRecord,
        username: &str,
        post_id: i64,
        form: CommentForm,
    ) -> Result<CommentRecord, PostError> {
        let post = self.find_post(username, post_id).await?;
        let text = form.clean()?;

        let comment = self
            .comments
            .create_comment(CreateCommentParams {
                post_id: post.id,
                author_id: actor.id,
                text,
            })
            .await?;

        info!(
            target = "yatube::posts",
            comment_id = comment.id,
            post_id = post.id,
            author = %actor.username,
            "comment added"
        );
        Ok(comment)
    }

    /// Groups a post can be filed under, ordered by title.
    pub async fn group_choices(&self) -> Result<Vec<GroupRecord>, PostError> {
        Ok(self.groups.list_groups().await?)
    }

    async fn find_post(&self, username: &str, post_id: i64) -> Result<PostRecord, PostError> {
        self.posts
            .find_post(username, post_id)
            .await?
            .ok_or_else(|| PostError::not_found(username, post_id))
    }

    /// Field checks plus the group lookup. The outer error is a store failure,
    /// the inner one the field messages to show the actor.
    async fn validate(&self, form: PostForm) -> Result<Result<CleanPost, FormErrors>, RepoError> {
        let group_known = match form.group {
            Some(group_id) => self.groups.find_by_id(group_id).await?.is_some(),
            None => true,
        };

        Ok(match (form.clean(), group_known) {
            (Ok(clean), true) => Ok(clean),
            (Ok(_), false) => {
                let mut errors = FormErrors::new();
                errors.add("group", UNKNOWN_GROUP_MESSAGE);
                Err(errors)
            }
            (Err(mut errors), known) => {
                if !known {
                    errors.add("group", UNKNOWN_GROUP_MESSAGE);
                }
                Err(errors)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn user(id: i64, username: &str) -> UserRecord {
        UserRecord {
            id,
            username: username.to_string(),
            full_name: String::new(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn post_by(author: &UserRecord) -> PostRecord {
        PostRecord {
            id: 10,
            text: "original".to_string(),
            pub_date: OffsetDateTime::UNIX_EPOCH,
            author_id: author.id,
            author_username: author.username.clone(),
            group_id: None,
            group_slug: None,
            image: None,
        }
    }

    #[test]
    fn author_is_authorized() {
        let author = user(1, "leo");
        let post = post_by(&author);
        assert_eq!(
            guard_edit(&Viewer::User(author), post.clone()),
            EditAccess::Authorized(post)
        );
    }

    #[test]
    fn other_users_and_anonymous_are_forbidden() {
        let author = user(1, "leo");
        let post = post_by(&author);
        assert_eq!(
            guard_edit(&Viewer::User(user(2, "mia")), post.clone()),
            EditAccess::Forbidden
        );
        assert_eq!(guard_edit(&Viewer::Anonymous, post), EditAccess::Forbidden);
    }
}
