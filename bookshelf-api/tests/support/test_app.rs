use std::net::TcpListener;
use std::sync::Arc;

use bookshelf_api::config::{AuthConfig, DeletionConfig};
use bookshelf_api::routes::auth::{LoginRequest, RegisterRequest, RegisterResponse};
use bookshelf_api::routes::books::{CreateBookRequest, CreateBooksRequest};
use bookshelf_api::routes::users::UpdateUserRequest;
use bookshelf_api::startup::Application;
use bookshelf_api::store::memory::MemoryStore;
use bookshelf_config::Environment;
use reqwest::{IntoUrl, RequestBuilder};
use tokio::task::JoinHandle;

pub const TEST_SIGNING_KEY: &str = "bookshelf-test-signing-key-0123456789";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    /// Storage behind the server, for asserting on state the API does not expose.
    pub store: MemoryStore,
    app_handle: JoinHandle<anyhow::Result<()>>,
}

impl TestApp {
    fn get_authenticated<U: IntoUrl>(&self, url: U, token: &str) -> RequestBuilder {
        self.api_client.get(url).bearer_auth(token)
    }

    fn post_authenticated<U: IntoUrl>(&self, url: U, token: &str) -> RequestBuilder {
        self.api_client.post(url).bearer_auth(token)
    }

    fn put_authenticated<U: IntoUrl>(&self, url: U, token: &str) -> RequestBuilder {
        self.api_client.put(url).bearer_auth(token)
    }

    fn delete_authenticated<U: IntoUrl>(&self, url: U, token: &str) -> RequestBuilder {
        self.api_client.delete(url).bearer_auth(token)
    }

    pub async fn register(&self, request: &RegisterRequest) -> reqwest::Response {
        self.api_client
            .post(format!("{}/v1/auth/register", &self.address))
            .json(request)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn login(&self, request: &LoginRequest) -> reqwest::Response {
        self.api_client
            .post(format!("{}/v1/auth/login", &self.address))
            .json(request)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn read_all_users(&self, token: &str) -> reqwest::Response {
        self.get_authenticated(format!("{}/v1/users", &self.address), token)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn read_user(&self, user_id: i64, token: &str) -> reqwest::Response {
        self.get_authenticated(format!("{}/v1/users/{user_id}", &self.address), token)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn update_user(
        &self,
        user_id: i64,
        user: &UpdateUserRequest,
        token: &str,
    ) -> reqwest::Response {
        self.put_authenticated(format!("{}/v1/users/{user_id}", &self.address), token)
            .json(user)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn delete_user(&self, user_id: i64, token: &str) -> reqwest::Response {
        self.delete_authenticated(format!("{}/v1/users/{user_id}", &self.address), token)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn read_all_books(&self, token: &str) -> reqwest::Response {
        self.get_authenticated(format!("{}/v1/books", &self.address), token)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn read_my_books(&self, token: &str) -> reqwest::Response {
        self.get_authenticated(format!("{}/v1/books/mine", &self.address), token)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn create_book(&self, book: &CreateBookRequest, token: &str) -> reqwest::Response {
        self.post_authenticated(format!("{}/v1/books", &self.address), token)
            .json(book)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn create_books(&self, books: &CreateBooksRequest, token: &str) -> reqwest::Response {
        self.post_authenticated(format!("{}/v1/books/batch", &self.address), token)
            .json(books)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn delete_book(&self, book_id: i64, token: &str) -> reqwest::Response {
        self.delete_authenticated(format!("{}/v1/books/{book_id}", &self.address), token)
            .send()
            .await
            .expect("failed to execute request")
    }

    /// Waits for the application to stop and returns how it ended.
    pub async fn stopped(&mut self) -> anyhow::Result<()> {
        (&mut self.app_handle)
            .await
            .expect("application task panicked")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.app_handle.abort();
    }
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        signing_key: TEST_SIGNING_KEY.into(),
        token_ttl_secs: AuthConfig::DEFAULT_TOKEN_TTL_SECS,
        // Lowest cost bcrypt accepts, keeps tests fast.
        password_hash_cost: 4,
    }
}

pub fn test_deletion_config() -> DeletionConfig {
    DeletionConfig {
        batch_size: 5,
        max_flush_attempts: 3,
        initial_backoff_ms: 5,
        max_backoff_ms: 20,
        jitter_percent: 0,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_test_app_with(test_auth_config(), test_deletion_config()).await
}

pub async fn spawn_test_app_with(auth: AuthConfig, deletion: DeletionConfig) -> TestApp {
    Environment::Dev.set();

    let base_address = "127.0.0.1";
    let listener =
        TcpListener::bind(format!("{base_address}:0")).expect("failed to bind random port");

    let store = MemoryStore::new();
    let application = Application::start(listener, Arc::new(store.clone()), &auth, deletion)
        .await
        .expect("failed to start application");
    let port = application.port();

    let app_handle = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://{base_address}:{port}"),
        api_client: reqwest::Client::new(),
        store,
        app_handle,
    }
}

pub fn register_request(login: &str) -> RegisterRequest {
    RegisterRequest {
        name: format!("{login} name"),
        login: login.to_string(),
        password: TEST_PASSWORD.to_string(),
    }
}

/// Registers `login` and returns its id and token.
pub async fn register_user(app: &TestApp, login: &str) -> (i64, String) {
    let response = app.register(&register_request(login)).await;
    assert!(response.status().is_success(), "registration failed");
    let body: RegisterResponse = response
        .json()
        .await
        .expect("failed to deserialize response");

    (body.id, body.token)
}

pub fn book(title: &str) -> CreateBookRequest {
    CreateBookRequest {
        title: title.to_string(),
        author: "Test Author".to_string(),
    }
}
