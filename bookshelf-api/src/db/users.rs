use sqlx::PgExecutor;

use crate::store::{User, UserRecord};

pub async fn list_users<'c, E>(executor: E) -> Result<Vec<User>, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    sqlx::query_as::<_, User>(
        r#"
        select id, name, login, password_hash
        from app.users
        order by id
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn read_user<'c, E>(executor: E, user_id: i64) -> Result<Option<User>, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    sqlx::query_as::<_, User>(
        r#"
        select id, name, login, password_hash
        from app.users
        where id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

pub async fn read_user_by_login<'c, E>(executor: E, login: &str) -> Result<Option<User>, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    sqlx::query_as::<_, User>(
        r#"
        select id, name, login, password_hash
        from app.users
        where login = $1
        "#,
    )
    .bind(login)
    .fetch_optional(executor)
    .await
}

pub async fn create_user<'c, E>(executor: E, user: &UserRecord) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        insert into app.users (name, login, password_hash)
        values ($1, $2, $3)
        returning id
        "#,
    )
    .bind(&user.name)
    .bind(&user.login)
    .bind(&user.password_hash)
    .fetch_one(executor)
    .await
}

pub async fn update_user<'c, E>(
    executor: E,
    user_id: i64,
    user: &UserRecord,
) -> Result<Option<i64>, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        update app.users
        set name = $1, login = $2, password_hash = $3, updated_at = now()
        where id = $4
        returning id
        "#,
    )
    .bind(&user.name)
    .bind(&user.login)
    .bind(&user.password_hash)
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Deletes the given users, their books go with them through the foreign key.
pub async fn delete_users<'c, E>(executor: E, user_ids: &[i64]) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    let result = sqlx::query(
        r#"
        delete from app.users
        where id = any($1)
        "#,
    )
    .bind(user_ids)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
