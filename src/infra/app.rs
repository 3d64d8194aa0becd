//! Wiring of repositories, services and HTTP state.

use std::num::NonZeroU32;
use std::sync::Arc;

use axum::Router;
use axum::http::HeaderName;
use tracing::info;

use crate::application::feed::FeedService;
use crate::application::follow::FollowService;
use crate::application::pagination::DEFAULT_PAGE_SIZE;
use crate::application::posts::PostService;
use crate::application::repos::{
    CommentsRepo, CreateGroupParams, FollowsRepo, GroupsRepo, HealthRepo, PostsRepo,
    PostsWriteRepo, RepoError, UsersRepo,
};
use crate::cache::{CacheConfig, FragmentCache, build_fragment_cache};
use crate::config::{GroupSeed, Settings};
use crate::infra::http::{self, DEFAULT_USER_HEADER, HttpState, ViewerState};

/// One handle per repository port.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UsersRepo>,
    pub groups: Arc<dyn GroupsRepo>,
    pub posts: Arc<dyn PostsRepo>,
    pub posts_write: Arc<dyn PostsWriteRepo>,
    pub comments: Arc<dyn CommentsRepo>,
    pub follows: Arc<dyn FollowsRepo>,
    pub health: Arc<dyn HealthRepo>,
}

impl Repositories {
    /// Use a single adapter that implements every port.
    pub fn shared<R>(store: Arc<R>) -> Self
    where
        R: UsersRepo
            + GroupsRepo
            + PostsRepo
            + PostsWriteRepo
            + CommentsRepo
            + FollowsRepo
            + HealthRepo
            + 'static,
    {
        Self {
            users: store.clone(),
            groups: store.clone(),
            posts: store.clone(),
            posts_write: store.clone(),
            comments: store.clone(),
            follows: store.clone(),
            health: store,
        }
    }
}

/// Runtime knobs the services need, independent of how they were loaded.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub cache: CacheConfig,
    pub page_size: NonZeroU32,
    pub user_header: HeaderName,
    pub provision_users: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            user_header: HeaderName::from_static(DEFAULT_USER_HEADER),
            provision_users: true,
        }
    }
}

impl From<&Settings> for AppOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            cache: CacheConfig::from(&settings.cache),
            page_size: settings.feed.page_size,
            user_header: settings.auth.user_header.clone(),
            provision_users: settings.auth.provision_users,
        }
    }
}

#[derive(Clone)]
pub struct ApplicationContext {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub follows: Arc<FollowService>,
    pub fragments: Arc<dyn FragmentCache>,
    repositories: Repositories,
    user_header: HeaderName,
    provision_users: bool,
}

impl ApplicationContext {
    pub fn new(repositories: Repositories, options: &AppOptions) -> Self {
        let fragments = build_fragment_cache(&options.cache);
        Self::with_fragments(repositories, options, fragments)
    }

    /// Build with an explicit fragment store in place of the configured one.
    pub fn with_fragments(
        repositories: Repositories,
        options: &AppOptions,
        fragments: Arc<dyn FragmentCache>,
    ) -> Self {
        let feed = FeedService::new(
            repositories.posts.clone(),
            repositories.groups.clone(),
            repositories.users.clone(),
            repositories.follows.clone(),
            fragments.clone(),
        )
        .with_page_size(options.page_size)
        .with_index_ttl(options.cache.index_ttl());

        let posts = PostService::new(
            repositories.posts.clone(),
            repositories.posts_write.clone(),
            repositories.comments.clone(),
            repositories.groups.clone(),
            repositories.users.clone(),
            fragments.clone(),
        );

        let follows = FollowService::new(repositories.users.clone(), repositories.follows.clone());

        Self {
            feed: Arc::new(feed),
            posts: Arc::new(posts),
            follows: Arc::new(follows),
            fragments,
            repositories,
            user_header: options.user_header.clone(),
            provision_users: options.provision_users,
        }
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    /// Create the configured groups whose slug is still free. Returns how
    /// many were created.
    pub async fn seed_groups(&self, seeds: &[GroupSeed]) -> Result<usize, RepoError> {
        let groups = &self.repositories.groups;
        let mut created = 0;
        for seed in seeds {
            if groups.find_by_slug(&seed.slug).await?.is_some() {
                continue;
            }
            let params = CreateGroupParams {
                title: seed.title.clone(),
                slug: Some(seed.slug.clone()),
                description: seed.description.clone(),
            };
            match groups.create_group(params).await {
                Ok(group) => {
                    info!(
                        target = "yatube::startup",
                        group_id = group.id,
                        slug = %group.slug,
                        "group seeded"
                    );
                    created += 1;
                }
                // Seeded concurrently by another instance.
                Err(RepoError::Duplicate { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(created)
    }

    pub fn router(&self) -> Router {
        let state = HttpState {
            feed: self.feed.clone(),
            posts: self.posts.clone(),
            follows: self.follows.clone(),
            health: self.repositories.health.clone(),
        };
        let viewer = ViewerState {
            users: self.repositories.users.clone(),
            header: self.user_header.clone(),
            provision: self.provision_users,
        };
        http::build_router(state, viewer)
    }
}
