//! Directed follow edges between users.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error("user {user_id} does not follow author {author_id}")]
    NotFollowing { user_id: i64, author_id: i64 },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Result of a follow request. Only `Created` changes the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollow,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    /// Create the edge `user_id → author_id` unless it exists or would be a self-follow.
    pub async fn follow(&self, user_id: i64, author_id: i64) -> Result<FollowOutcome, FollowError> {
        if user_id == author_id {
            return Ok(FollowOutcome::SelfFollow);
        }
        if self.follows.find_follow(user_id, author_id).await?.is_some() {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        match self.follows.create_follow(user_id, author_id).await {
            Ok(edge) => {
                info!(
                    target = "yatube::follow",
                    follow_id = edge.id,
                    user_id,
                    author_id,
                    "follow edge created"
                );
                Ok(FollowOutcome::Created)
            }
            // A concurrent request inserted the same edge first.
            Err(RepoError::Duplicate { .. }) => Ok(FollowOutcome::AlreadyFollowing),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn unfollow(&self, user_id: i64, author_id: i64) -> Result<(), FollowError> {
        match self.follows.delete_follow(user_id, author_id).await {
            Ok(()) => {
                info!(
                    target = "yatube::follow",
                    user_id,
                    author_id,
                    "follow edge removed"
                );
                Ok(())
            }
            Err(RepoError::NotFound) => Err(FollowError::NotFollowing { user_id, author_id }),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool, FollowError> {
        Ok(self.follows.find_follow(user_id, author_id).await?.is_some())
    }

    pub async fn followers_count(&self, author_id: i64) -> Result<u64, FollowError> {
        Ok(self.follows.count_followers(author_id).await?)
    }

    pub async fn following_count(&self, user_id: i64) -> Result<u64, FollowError> {
        Ok(self.follows.count_following(user_id).await?)
    }

    pub async fn profile_follow(
        &self,
        user: &UserRecord,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let author = self.resolve_author(username).await?;
        self.follow(user.id, author.id).await
    }

    pub async fn profile_unfollow(&self, user: &UserRecord, username: &str) -> Result<(), FollowError> {
        let author = self.resolve_author(username).await?;
        self.unfollow(user.id, author.id).await
    }

    async fn resolve_author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FollowError::UnknownAuthor(username.to_string()))
    }
}
