//! In-process store used when no database is configured.
//!
//! Rows live in ordered maps behind one `RwLock`, so every repository call is
//! atomic. Deletions walk the declared relations in
//! [`crate::domain::integrity`] to cascade or clear references.

use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::pagination::PageWindow;
use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreateGroupParams, CreatePostParams, CreateUserParams,
    FollowsRepo, GroupsRepo, HealthRepo, PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError,
    UpdatePostParams, UsersRepo,
};
use crate::domain::entities::{CommentRecord, FollowRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::integrity::{EntityKind, OnDelete, Relation, relations_to};
use crate::domain::slug::resolve_slug;

#[derive(Debug, Clone)]
struct StoredPost {
    id: i64,
    text: String,
    pub_date: OffsetDateTime,
    author_id: i64,
    group_id: Option<i64>,
    image: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: i64,
    post_id: i64,
    author_id: i64,
    text: String,
    created: OffsetDateTime,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, UserRecord>,
    groups: BTreeMap<i64, GroupRecord>,
    posts: BTreeMap<i64, StoredPost>,
    comments: BTreeMap<i64, StoredComment>,
    follows: BTreeMap<i64, FollowRecord>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn user_by_name(&self, username: &str) -> Option<&UserRecord> {
        self.users.values().find(|user| user.username == username)
    }

    fn require_user(&self, id: i64) -> Result<&UserRecord, RepoError> {
        self.users.get(&id).ok_or_else(|| RepoError::Integrity {
            message: format!("user {id} does not exist"),
        })
    }

    fn require_group(&self, id: Option<i64>) -> Result<(), RepoError> {
        match id {
            Some(id) if !self.groups.contains_key(&id) => Err(RepoError::Integrity {
                message: format!("group {id} does not exist"),
            }),
            _ => Ok(()),
        }
    }

    fn post_record(&self, post: &StoredPost) -> PostRecord {
        PostRecord {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author_id: post.author_id,
            author_username: self
                .users
                .get(&post.author_id)
                .map(|user| user.username.clone())
                .unwrap_or_default(),
            group_id: post.group_id,
            group_slug: post
                .group_id
                .and_then(|id| self.groups.get(&id))
                .map(|group| group.slug.clone()),
            image: post.image.clone(),
        }
    }

    fn comment_record(&self, comment: &StoredComment) -> CommentRecord {
        CommentRecord {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            author_username: self
                .users
                .get(&comment.author_id)
                .map(|user| user.username.clone())
                .unwrap_or_default(),
            text: comment.text.clone(),
            created: comment.created,
        }
    }

    fn follows_edge(&self, user_id: i64, author_id: i64) -> Option<&FollowRecord> {
        self.follows
            .values()
            .find(|edge| edge.user_id == user_id && edge.author_id == author_id)
    }

    fn matches(&self, post: &StoredPost, filter: &PostQueryFilter) -> bool {
        filter.author_id.is_none_or(|id| post.author_id == id)
            && filter.group_id.is_none_or(|id| post.group_id == Some(id))
            && filter
                .followed_by
                .is_none_or(|user_id| self.follows_edge(user_id, post.author_id).is_some())
    }

    /// Matching posts, newest first with ties broken by id descending.
    fn select_posts(&self, filter: &PostQueryFilter) -> Vec<&StoredPost> {
        let mut posts: Vec<&StoredPost> = self
            .posts
            .values()
            .filter(|post| self.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }

    fn exists(&self, kind: EntityKind, id: i64) -> bool {
        match kind {
            EntityKind::User => self.users.contains_key(&id),
            EntityKind::Group => self.groups.contains_key(&id),
            EntityKind::Post => self.posts.contains_key(&id),
            EntityKind::Comment => self.comments.contains_key(&id),
            EntityKind::Follow => self.follows.contains_key(&id),
        }
    }

    /// Ids of `relation.child` rows pointing at `parent_id`.
    fn referencing(&self, relation: &Relation, parent_id: i64) -> Vec<i64> {
        match (relation.child, relation.field) {
            (EntityKind::Post, "author") => self
                .posts
                .values()
                .filter(|post| post.author_id == parent_id)
                .map(|post| post.id)
                .collect(),
            (EntityKind::Post, "group") => self
                .posts
                .values()
                .filter(|post| post.group_id == Some(parent_id))
                .map(|post| post.id)
                .collect(),
            (EntityKind::Comment, "post") => self
                .comments
                .values()
                .filter(|comment| comment.post_id == parent_id)
                .map(|comment| comment.id)
                .collect(),
            (EntityKind::Comment, "author") => self
                .comments
                .values()
                .filter(|comment| comment.author_id == parent_id)
                .map(|comment| comment.id)
                .collect(),
            (EntityKind::Follow, "user") => self
                .follows
                .values()
                .filter(|edge| edge.user_id == parent_id)
                .map(|edge| edge.id)
                .collect(),
            (EntityKind::Follow, "author") => self
                .follows
                .values()
                .filter(|edge| edge.author_id == parent_id)
                .map(|edge| edge.id)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn clear_reference(&mut self, relation: &Relation, child_id: i64) {
        if (relation.child, relation.field) != (EntityKind::Post, "group") {
            return;
        }
        if let Some(post) = self.posts.get_mut(&child_id) {
            post.group_id = None;
        }
    }

    /// Remove a row after applying the delete policy of every relation that
    /// points at it.
    fn delete(&mut self, kind: EntityKind, id: i64) -> Result<(), RepoError> {
        if !self.exists(kind, id) {
            return Err(RepoError::NotFound);
        }

        for relation in relations_to(kind) {
            for child_id in self.referencing(relation, id) {
                match relation.on_delete {
                    OnDelete::Cascade => {
                        // May already be gone through another cascade path.
                        if self.exists(relation.child, child_id) {
                            self.delete(relation.child, child_id)?;
                        }
                    }
                    OnDelete::SetNull => self.clear_reference(relation, child_id),
                }
            }
        }

        match kind {
            EntityKind::User => {
                self.users.remove(&id);
            }
            EntityKind::Group => {
                self.groups.remove(&id);
            }
            EntityKind::Post => {
                self.posts.remove(&id);
            }
            EntityKind::Comment => {
                self.comments.remove(&id);
            }
            EntityKind::Follow => {
                self.follows.remove(&id);
            }
        }
        Ok(())
    }
}

/// Every repository trait over one shared in-memory table set.
#[derive(Debug, Default)]
pub struct MemoryRepositories {
    tables: RwLock<Tables>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.tables.read().await.user_by_name(username).cloned())
    }

    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        if params.username.trim().is_empty() {
            return Err(RepoError::InvalidInput {
                message: "username must not be empty".to_string(),
            });
        }

        let mut tables = self.tables.write().await;
        if tables.user_by_name(&params.username).is_some() {
            return Err(RepoError::duplicate("users_username_key"));
        }

        let user = UserRecord {
            id: tables.next_id(),
            username: params.username,
            full_name: params.full_name,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> Result<(), RepoError> {
        self.tables.write().await.delete(EntityKind::User, id)
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepositories {
    async fn find_by_id(&self, id: i64) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .groups
            .values()
            .find(|group| group.slug == slug)
            .cloned())
    }

    async fn list_groups(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let mut groups: Vec<GroupRecord> =
            self.tables.read().await.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }

    async fn create_group(&self, params: CreateGroupParams) -> Result<GroupRecord, RepoError> {
        let slug =
            resolve_slug(params.slug, &params.title).map_err(|err| RepoError::InvalidInput {
                message: err.to_string(),
            })?;

        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|group| group.slug == slug) {
            return Err(RepoError::duplicate("groups_slug_key"));
        }

        let group = GroupRecord {
            id: tables.next_id(),
            title: params.title,
            slug,
            description: params.description,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn delete_group(&self, id: i64) -> Result<(), RepoError> {
        self.tables.write().await.delete(EntityKind::Group, id)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        Ok(self.tables.read().await.select_posts(filter).len() as u64)
    }

    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let tables = self.tables.read().await;
        let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
        Ok(tables
            .select_posts(filter)
            .into_iter()
            .skip(offset)
            .take(window.limit as usize)
            .map(|post| tables.post_record(post))
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).map(|post| tables.post_record(post)))
    }

    async fn find_post(&self, username: &str, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let tables = self.tables.read().await;
        let Some(author) = tables.user_by_name(username) else {
            return Ok(None);
        };
        Ok(tables
            .posts
            .get(&id)
            .filter(|post| post.author_id == author.id)
            .map(|post| tables.post_record(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_user(params.author_id)?;
        tables.require_group(params.group_id)?;

        let post = StoredPost {
            id: tables.next_id(),
            text: params.text,
            pub_date: OffsetDateTime::now_utc(),
            author_id: params.author_id,
            group_id: params.group_id,
            image: params.image,
        };
        let record = tables.post_record(&post);
        tables.posts.insert(post.id, post);
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_group(params.group_id)?;

        let post = tables.posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        post.image = params.image;
        let post = post.clone();
        Ok(tables.post_record(&post))
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        self.tables.write().await.delete(EntityKind::Post, id)
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentRecord>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<&StoredComment> = tables
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(comments
            .into_iter()
            .map(|comment| tables.comment_record(comment))
            .collect())
    }

    async fn count_for_post(&self, post_id: i64) -> Result<u64, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .count() as u64)
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_user(params.author_id)?;
        if !tables.posts.contains_key(&params.post_id) {
            return Err(RepoError::Integrity {
                message: format!("post {} does not exist", params.post_id),
            });
        }

        let comment = StoredComment {
            id: tables.next_id(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created: OffsetDateTime::now_utc(),
        };
        let record = tables.comment_record(&comment);
        tables.comments.insert(comment.id, comment);
        Ok(record)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepositories {
    async fn find_follow(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> Result<Option<FollowRecord>, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .follows_edge(user_id, author_id)
            .copied())
    }

    async fn create_follow(
        &self,
        user_id: i64,
        author_id: i64,
    ) -> Result<FollowRecord, RepoError> {
        let mut tables = self.tables.write().await;
        tables.require_user(user_id)?;
        tables.require_user(author_id)?;
        if tables.follows_edge(user_id, author_id).is_some() {
            return Err(RepoError::duplicate("follows_user_id_author_id_key"));
        }

        let edge = FollowRecord {
            id: tables.next_id(),
            user_id,
            author_id,
        };
        tables.follows.insert(edge.id, edge);
        Ok(edge)
    }

    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let id = tables
            .follows_edge(user_id, author_id)
            .map(|edge| edge.id)
            .ok_or(RepoError::NotFound)?;
        tables.delete(EntityKind::Follow, id)
    }

    async fn count_followers(&self, author_id: i64) -> Result<u64, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .follows
            .values()
            .filter(|edge| edge.author_id == author_id)
            .count() as u64)
    }

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError> {
        Ok(self
            .tables
            .read()
            .await
            .follows
            .values()
            .filter(|edge| edge.user_id == user_id)
            .count() as u64)
    }
}

#[async_trait]
impl HealthRepo for MemoryRepositories {
    async fn health_check(&self) -> Result<(), RepoError> {
        let _tables = self.tables.read().await;
        Ok(())
    }
}
