#![allow(dead_code)]

use std::sync::Arc;

use yatube::application::repos::{CreateGroupParams, CreateUserParams};
use yatube::domain::entities::{GroupRecord, PostRecord, UserRecord};
use yatube::domain::forms::PostForm;
use yatube::infra::app::{AppOptions, ApplicationContext, Repositories};
use yatube::infra::memory::MemoryRepositories;

pub fn app() -> ApplicationContext {
    app_with(&AppOptions::default())
}

pub fn app_with(options: &AppOptions) -> ApplicationContext {
    ApplicationContext::new(
        Repositories::shared(Arc::new(MemoryRepositories::new())),
        options,
    )
}

pub async fn user(app: &ApplicationContext, username: &str) -> UserRecord {
    app.repositories()
        .users
        .create_user(CreateUserParams {
            username: username.to_string(),
            full_name: format!("{username} tester"),
        })
        .await
        .expect("create user")
}

pub async fn group(app: &ApplicationContext, title: &str, slug: &str) -> GroupRecord {
    app.repositories()
        .groups
        .create_group(CreateGroupParams {
            title: title.to_string(),
            slug: Some(slug.to_string()),
            description: format!("All about {title}"),
        })
        .await
        .expect("create group")
}

pub fn form(text: &str, group: Option<i64>) -> PostForm {
    PostForm {
        text: text.to_string(),
        group,
        image: None,
    }
}

pub async fn publish(
    app: &ApplicationContext,
    author: &UserRecord,
    text: &str,
    group: Option<i64>,
) -> PostRecord {
    app.posts
        .new_post(author, form(text, group))
        .await
        .expect("publish post")
}
