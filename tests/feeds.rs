mod support;

use yatube::application::feed::FeedError;
use yatube::application::viewer::Viewer;

use support::{app, group, publish, user};

#[tokio::test]
async fn new_post_leads_the_global_feed_with_its_author() {
    let app = app();
    let leo = user(&app, "leo").await;
    let mia = user(&app, "mia").await;

    publish(&app, &leo, "older", None).await;
    let post = publish(&app, &mia, "newest", None).await;

    assert_eq!(post.author_id, mia.id);
    assert_eq!(post.author_username, "mia");

    let page = app.feed.global(1).await.expect("global feed");
    assert_eq!(page.items.first().map(|p| p.id), Some(post.id));
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn twenty_five_posts_split_into_three_pages() {
    let app = app();
    let leo = user(&app, "leo").await;
    for n in 0..25 {
        publish(&app, &leo, &format!("post {n}"), None).await;
    }

    let first = app.feed.global(1).await.expect("page 1");
    let second = app.feed.global(2).await.expect("page 2");
    let third = app.feed.global(3).await.expect("page 3");

    assert_eq!(first.num_pages, 3);
    assert_eq!(first.items.len(), 10);
    assert_eq!(second.items.len(), 10);
    assert_eq!(third.items.len(), 5);
    assert_eq!(first.items[0].text, "post 24");
    assert_eq!(third.items[4].text, "post 0");
}

#[tokio::test]
async fn out_of_range_pages_clamp() {
    let app = app();
    let leo = user(&app, "leo").await;
    for n in 0..25 {
        publish(&app, &leo, &format!("post {n}"), None).await;
    }

    let below = app.feed.global(0).await.expect("page 0");
    let beyond = app.feed.global(99).await.expect("page 99");

    assert_eq!(below.number, 1);
    assert_eq!(beyond.number, 3);
    assert_eq!(beyond.items.len(), 5);
}

#[tokio::test]
async fn empty_feed_is_a_valid_first_page() {
    let app = app();
    let page = app.feed.global(7).await.expect("empty feed");

    assert_eq!(page.number, 1);
    assert_eq!(page.num_pages, 1);
    assert!(page.items.is_empty());
    assert!(!page.has_next());
}

#[tokio::test]
async fn group_feed_only_lists_group_posts() {
    let app = app();
    let leo = user(&app, "leo").await;
    let cats = group(&app, "Cats", "cats").await;
    let dogs = group(&app, "Dogs", "dogs").await;

    publish(&app, &leo, "meow", Some(cats.id)).await;
    publish(&app, &leo, "woof", Some(dogs.id)).await;
    publish(&app, &leo, "no group", None).await;

    let feed = app.feed.group("cats", 1).await.expect("group feed");
    assert_eq!(feed.group.id, cats.id);
    let texts: Vec<_> = feed.page.items.iter().map(|p| p.text.as_str()).collect();
    assert_eq!(texts, vec!["meow"]);
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let app = app();
    let err = app.feed.group("nope", 1).await.expect_err("missing group");
    assert!(matches!(err, FeedError::UnknownGroup(slug) if slug == "nope"));
}

#[tokio::test]
async fn deleting_a_group_keeps_its_posts() {
    let app = app();
    let leo = user(&app, "leo").await;
    let cats = group(&app, "Cats", "cats").await;
    let post = publish(&app, &leo, "meow", Some(cats.id)).await;

    app.repositories()
        .groups
        .delete_group(cats.id)
        .await
        .expect("delete group");

    let stored = app
        .repositories()
        .posts
        .find_by_id(post.id)
        .await
        .expect("lookup")
        .expect("post survives");
    assert_eq!(stored.group_id, None);
    assert_eq!(stored.group_slug, None);
    assert_eq!(stored.text, "meow");
}

#[tokio::test]
async fn profile_reports_counters_and_following_flag() {
    let app = app();
    let leo = user(&app, "leo").await;
    let mia = user(&app, "mia").await;
    publish(&app, &leo, "one", None).await;
    publish(&app, &leo, "two", None).await;
    publish(&app, &mia, "other", None).await;

    app.follows.follow(mia.id, leo.id).await.expect("follow");

    let as_mia = app
        .feed
        .profile(&Viewer::User(mia.clone()), "leo", 1)
        .await
        .expect("profile");
    assert!(as_mia.following);
    assert_eq!(as_mia.posts_count, 2);
    assert_eq!(as_mia.followers_count, 1);
    assert_eq!(as_mia.following_count, 0);
    assert!(as_mia.page.items.iter().all(|p| p.author_id == leo.id));

    let as_self = app
        .feed
        .profile(&Viewer::User(leo.clone()), "leo", 1)
        .await
        .expect("own profile");
    assert!(!as_self.following);

    let anonymous = app
        .feed
        .profile(&Viewer::Anonymous, "leo", 1)
        .await
        .expect("anonymous profile");
    assert!(!anonymous.following);
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let app = app();
    let err = app
        .feed
        .profile(&Viewer::Anonymous, "ghost", 1)
        .await
        .expect_err("missing author");
    assert!(matches!(err, FeedError::UnknownAuthor(_)));
}
