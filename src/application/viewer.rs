use tracing::{debug, info, warn};

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::forms::is_valid_username;

/// The actor behind a request, as resolved from the upstream identity header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(UserRecord),
}

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        match self {
            Viewer::User(user) => Some(user),
            Viewer::Anonymous => None,
        }
    }

    /// True when the viewer is the user with `user_id`.
    pub fn is(&self, user_id: i64) -> bool {
        self.user().is_some_and(|user| user.id == user_id)
    }
}

/// Resolve a username vouched for by the upstream authenticator.
///
/// With `provision` set, a valid name the store has not seen yet gets a user
/// record on first sight. Otherwise unknown names stay anonymous.
pub async fn identify(
    users: &dyn UsersRepo,
    username: &str,
    provision: bool,
) -> Result<Viewer, RepoError> {
    if let Some(user) = users.find_by_username(username).await? {
        return Ok(Viewer::User(user));
    }

    if !provision {
        debug!(
            target = "yatube::viewer",
            username,
            "identity header names an unknown user"
        );
        return Ok(Viewer::Anonymous);
    }

    if !is_valid_username(username) {
        warn!(
            target = "yatube::viewer",
            username,
            "identity header carries an unusable username"
        );
        return Ok(Viewer::Anonymous);
    }

    let created = users
        .create_user(CreateUserParams {
            username: username.to_string(),
            full_name: String::new(),
        })
        .await;

    match created {
        Ok(user) => {
            info!(
                target = "yatube::viewer",
                user_id = user.id,
                username,
                "user provisioned from identity header"
            );
            Ok(Viewer::User(user))
        }
        // Another request provisioned the same name first.
        Err(RepoError::Duplicate { .. }) => Ok(users
            .find_by_username(username)
            .await?
            .map_or(Viewer::Anonymous, Viewer::User)),
        Err(err) => Err(err),
    }
}
