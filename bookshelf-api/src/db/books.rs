use sqlx::PgExecutor;

use crate::store::Book;

pub async fn list_books<'c, E>(executor: E) -> Result<Vec<Book>, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    sqlx::query_as::<_, Book>(
        r#"
        select id, title, author, owner_id
        from app.books
        order by id
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn list_books_by_owner<'c, E>(executor: E, owner_id: i64) -> Result<Vec<Book>, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    sqlx::query_as::<_, Book>(
        r#"
        select id, title, author, owner_id
        from app.books
        where owner_id = $1
        order by id
        "#,
    )
    .bind(owner_id)
    .fetch_all(executor)
    .await
}

pub async fn read_book<'c, E>(executor: E, book_id: i64) -> Result<Option<Book>, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    sqlx::query_as::<_, Book>(
        r#"
        select id, title, author, owner_id
        from app.books
        where id = $1
        "#,
    )
    .bind(book_id)
    .fetch_optional(executor)
    .await
}

pub async fn create_book<'c, E>(
    executor: E,
    owner_id: i64,
    title: &str,
    author: &str,
) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        insert into app.books (title, author, owner_id)
        values ($1, $2, $3)
        returning id
        "#,
    )
    .bind(title)
    .bind(author)
    .bind(owner_id)
    .fetch_one(executor)
    .await
}

pub async fn delete_books<'c, E>(executor: E, book_ids: &[i64]) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'c>,
{
    let result = sqlx::query(
        r#"
        delete from app.books
        where id = any($1)
        "#,
    )
    .bind(book_ids)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
