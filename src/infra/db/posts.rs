use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, query_as, query_scalar};
use time::OffsetDateTime;

use crate::application::pagination::PageWindow;
use crate::application::repos::{
    CreatePostParams, PostQueryFilter, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::{PostgresRepositories, map_sqlx_error};

const POST_COLUMNS: &str = "p.id, p.text, p.pub_date, p.author_id, u.username AS author_username, \
     p.group_id, g.slug AS group_slug, p.image";

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: OffsetDateTime,
    author_id: i64,
    author_username: String,
    group_id: Option<i64>,
    group_slug: Option<String>,
    image: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            author_id: row.author_id,
            author_username: row.author_username,
            group_id: row.group_id,
            group_slug: row.group_slug,
            image: row.image,
        }
    }
}

impl PostgresRepositories {
    fn apply_post_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostQueryFilter) {
        if let Some(author_id) = filter.author_id {
            qb.push(" AND p.author_id = ");
            qb.push_bind(author_id);
        }
        if let Some(group_id) = filter.group_id {
            qb.push(" AND p.group_id = ");
            qb.push_bind(group_id);
        }
        if let Some(user_id) = filter.followed_by {
            qb.push(
                " AND EXISTS (SELECT 1 FROM follows f WHERE f.author_id = p.author_id AND f.user_id = ",
            );
            qb.push_bind(user_id);
            qb.push(")");
        }
    }

    fn joined_select(source: &str) -> String {
        format!(
            "SELECT {POST_COLUMNS} FROM {source} p \
             INNER JOIN users u ON u.id = p.author_id \
             LEFT JOIN groups g ON g.id = p.group_id"
        )
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn count_posts(&self, filter: &PostQueryFilter) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1 ");
        Self::apply_post_filter(&mut qb, filter);

        let count: i64 = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn list_posts(
        &self,
        filter: &PostQueryFilter,
        window: PageWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let offset = i64::try_from(window.offset)
            .map_err(|_| RepoError::InvalidInput {
                message: format!("page offset {} is out of range", window.offset),
            })?;

        let mut qb = QueryBuilder::new(Self::joined_select("posts"));
        qb.push(" WHERE 1=1 ");
        Self::apply_post_filter(&mut qb, filter);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(i64::from(window.limit));
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("{} WHERE p.id = $1", Self::joined_select("posts"));
        let row = query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn find_post(&self, username: &str, id: i64) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!(
            "{} WHERE p.id = $1 AND u.username = $2",
            Self::joined_select("posts")
        );
        let row = query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(username)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "WITH inserted AS ( \
                INSERT INTO posts (text, author_id, group_id, image) \
                VALUES ($1, $2, $3, $4) \
                RETURNING * \
             ) {}",
            Self::joined_select("inserted")
        );

        let row = query_as::<_, PostRow>(&sql)
            .bind(&params.text)
            .bind(params.author_id)
            .bind(params.group_id)
            .bind(&params.image)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let sql = format!(
            "WITH updated AS ( \
                UPDATE posts SET text = $2, group_id = $3, image = $4 \
                WHERE id = $1 \
                RETURNING * \
             ) {}",
            Self::joined_select("updated")
        );

        let row = query_as::<_, PostRow>(&sql)
            .bind(params.id)
            .bind(&params.text)
            .bind(params.group_id)
            .bind(&params.image)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PostRecord::from).ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let deleted: Option<i64> = query_scalar("DELETE FROM posts WHERE id = $1 RETURNING id")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        deleted.map(|_| ()).ok_or(RepoError::NotFound)
    }
}
