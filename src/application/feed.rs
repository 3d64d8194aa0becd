use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::application::pagination::{DEFAULT_PAGE_SIZE, Page, Paginator};
use crate::application::repos::{
    FollowsRepo, GroupsRepo, PostQueryFilter, PostsRepo, RepoError, UsersRepo,
};
use crate::application::viewer::Viewer;
use crate::cache::{self, CacheConfig, FragmentCache, FragmentKey};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};
use crate::presentation::views::{TemplateRenderError, render_index_fragment};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("unknown author `{0}`")]
    UnknownAuthor(String),
    #[error(transparent)]
    Render(#[from] TemplateRenderError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Clone)]
pub struct ProfileFeed {
    pub author: UserRecord,
    /// Whether the viewer follows `author`; false for anonymous viewers and self-views.
    pub following: bool,
    pub posts_count: u64,
    pub followers_count: u64,
    pub following_count: u64,
    pub page: Page<PostRecord>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    fragments: Arc<dyn FragmentCache>,
    page_size: NonZeroU32,
    index_ttl: Duration,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        fragments: Arc<dyn FragmentCache>,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            fragments,
            page_size: DEFAULT_PAGE_SIZE,
            index_ttl: CacheConfig::default().index_ttl(),
        }
    }

    pub fn with_page_size(mut self, page_size: NonZeroU32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_index_ttl(mut self, ttl: Duration) -> Self {
        self.index_ttl = ttl;
        self
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    async fn load_page(
        &self,
        filter: PostQueryFilter,
        requested: i64,
    ) -> Result<Page<PostRecord>, RepoError> {
        let total = self.posts.count_posts(&filter).await?;
        let paginator = Paginator::new(total, self.page_size);
        let number = paginator.clamp(requested);
        let items = self
            .posts
            .list_posts(&filter, paginator.window(number))
            .await?;
        Ok(paginator.page(number, items))
    }

    /// All posts, newest first.
    pub async fn global(&self, requested: i64) -> Result<Page<PostRecord>, FeedError> {
        Ok(self.load_page(PostQueryFilter::all(), requested).await?)
    }

    pub async fn group(&self, slug: &str, requested: i64) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| FeedError::UnknownGroup(slug.to_string()))?;
        let page = self
            .load_page(PostQueryFilter::in_group(group.id), requested)
            .await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        viewer: &Viewer,
        username: &str,
        requested: i64,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| FeedError::UnknownAuthor(username.to_string()))?;

        let following = match viewer.user() {
            Some(user) if user.id != author.id => self
                .follows
                .find_follow(user.id, author.id)
                .await?
                .is_some(),
            _ => false,
        };

        let page = self
            .load_page(PostQueryFilter::by_author(author.id), requested)
            .await?;
        let followers_count = self.follows.count_followers(author.id).await?;
        let following_count = self.follows.count_following(author.id).await?;

        Ok(ProfileFeed {
            posts_count: page.total,
            author,
            following,
            followers_count,
            following_count,
            page,
        })
    }

    /// Posts written by the authors `user` follows.
    pub async fn following(
        &self,
        user: &UserRecord,
        requested: i64,
    ) -> Result<Page<PostRecord>, FeedError> {
        Ok(self
            .load_page(PostQueryFilter::followed_by(user.id), requested)
            .await?)
    }

    /// Rendered global feed page, served from the fragment cache while fresh.
    ///
    /// A cache failure never fails the request: the page is rendered from
    /// the store instead. Fragments are stored under the clamped page number,
    /// and a fragment rendered across a clear is not stored at all.
    pub async fn index_fragment(&self, requested: i64) -> Result<String, FeedError> {
        let lookup = FragmentKey::index_page(u32::try_from(requested.max(1)).unwrap_or(u32::MAX));

        match self.fragments.get(&lookup) {
            Ok(Some(fragment)) => {
                debug!(key = %lookup.storage_key(), "index fragment served from cache");
                return Ok(fragment);
            }
            Ok(None) => {}
            Err(err) => cache::record_failure("get", Some(&lookup), &err),
        }

        let generation = match self.fragments.generation() {
            Ok(generation) => Some(generation),
            Err(err) => {
                cache::record_failure("generation", Some(&lookup), &err);
                None
            }
        };

        let page = self.global(requested).await?;
        let fragment = render_index_fragment(&page)?;

        let Some(generation) = generation else {
            return Ok(fragment);
        };
        let key = FragmentKey::index_page(page.number);
        match self
            .fragments
            .fill(key.clone(), fragment.clone(), self.index_ttl, generation)
        {
            Ok(true) => {}
            Ok(false) => debug!(
                key = %key.storage_key(),
                "index fragment not stored"
            ),
            Err(err) => cache::record_failure("fill", Some(&key), &err),
        }

        Ok(fragment)
    }
}
