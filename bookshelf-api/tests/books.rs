use bookshelf_api::routes::books::{
    CreateBookRequest, CreateBookResponse, CreateBooksRequest, CreateBooksResponse,
    ReadBooksResponse,
};
use bookshelf_telemetry::tracing::init_test_tracing;
use reqwest::StatusCode;

mod support;

use crate::support::test_app::{book, register_user, spawn_test_app};

#[tokio::test(flavor = "multi_thread")]
async fn saved_book_belongs_to_the_caller() {
    init_test_tracing();
    let app = spawn_test_app().await;
    let (ada, ada_token) = register_user(&app, "ada").await;
    let (_, grace_token) = register_user(&app, "grace").await;

    let response = app.create_book(&book("Notes"), &ada_token).await;
    assert!(response.status().is_success());
    let created: CreateBookResponse = response
        .json()
        .await
        .expect("failed to deserialize response");

    let response = app.read_my_books(&ada_token).await;
    let mine: ReadBooksResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(mine.books.len(), 1);
    assert_eq!(mine.books[0].id, created.id);
    assert_eq!(mine.books[0].owner_id, ada);
    assert_eq!(mine.books[0].title, "Notes");

    let response = app.read_my_books(&grace_token).await;
    let theirs: ReadBooksResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert!(theirs.books.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn books_of_every_user_are_listed() {
    init_test_tracing();
    let app = spawn_test_app().await;
    let (_, ada_token) = register_user(&app, "ada").await;
    let (_, grace_token) = register_user(&app, "grace").await;
    app.create_book(&book("Notes"), &ada_token).await;
    app.create_book(&book("Compilers"), &grace_token).await;

    let response = app.read_all_books(&ada_token).await;

    assert!(response.status().is_success());
    let body: ReadBooksResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    let titles: Vec<&str> = body.books.iter().map(|book| book.title.as_str()).collect();
    assert_eq!(titles, vec!["Notes", "Compilers"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn several_books_are_saved_together() {
    init_test_tracing();
    let app = spawn_test_app().await;
    let (_, token) = register_user(&app, "ada").await;

    let response = app
        .create_books(
            &CreateBooksRequest {
                books: vec![book("One"), book("Two"), book("Three")],
            },
            &token,
        )
        .await;

    assert!(response.status().is_success());
    let body: CreateBooksResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(body.ids.len(), 3);

    let response = app.read_my_books(&token).await;
    let mine: ReadBooksResponse = response.json().await.unwrap();
    let ids: Vec<i64> = mine.books.iter().map(|book| book.id).collect();
    assert_eq!(ids, body.ids);
}

#[tokio::test(flavor = "multi_thread")]
async fn one_invalid_book_saves_none() {
    init_test_tracing();
    let app = spawn_test_app().await;
    let (_, token) = register_user(&app, "ada").await;

    let response = app
        .create_books(
            &CreateBooksRequest {
                books: vec![
                    book("One"),
                    CreateBookRequest {
                        title: " ".to_string(),
                        author: "Nobody".to_string(),
                    },
                ],
            },
            &token,
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let response = app.read_all_books(&token).await;
    let body: ReadBooksResponse = response.json().await.unwrap();
    assert!(body.books.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_batch_is_rejected() {
    init_test_tracing();
    let app = spawn_test_app().await;
    let (_, token) = register_user(&app, "ada").await;

    let response = app
        .create_books(&CreateBooksRequest { books: vec![] }, &token)
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_an_unknown_book_is_not_found() {
    init_test_tracing();
    let app = spawn_test_app().await;
    let (_, token) = register_user(&app, "ada").await;

    let response = app.delete_book(4242, &token).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
