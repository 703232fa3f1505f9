#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use movie_catalog_api::config;
use movie_catalog_api::database::models::{Role, UserDraft};
use movie_catalog_api::database::DatabaseManager;
use movie_catalog_api::server::{self, AppState};
use movie_catalog_api::services::MemoryMailer;

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub const PASSWORD: &str = "test1234";

/// The server binary, spawned once per test process
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_movie-catalog-api"));
        cmd.env("PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

fn database_configured() -> bool {
    let _ = dotenvy::dotenv();
    std::env::var("DATABASE_URL").is_ok()
}

/// The spawned binary refuses to start without a database, so these
/// tests are skipped when `DATABASE_URL` is unset.
pub async fn ensure_server() -> Result<Option<&'static TestServer>> {
    if !database_configured() {
        eprintln!("DATABASE_URL not set; skipping server binary test");
        return Ok(None);
    }
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(Some(server))
}

/// In-process server with a recording mailer
pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
}

pub async fn test_app() -> Result<Option<TestApp>> {
    if !database_configured() {
        eprintln!("DATABASE_URL not set; skipping database test");
        return Ok(None);
    }

    let pool = DatabaseManager::connect(&config::config().database).await?;
    DatabaseManager::migrate(&pool).await?;

    let mailer = Arc::new(MemoryMailer::new());
    let state = AppState::new(pool, mailer.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let app = server::app(state.clone()).into_make_service_with_connect_info::<std::net::SocketAddr>();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(Some(TestApp { base_url, client: reqwest::Client::new(), state, mailer }))
}

pub fn unique(prefix: &str) -> String {
    format!("{} {}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// A release year no other test run will have used
pub fn unique_year() -> i32 {
    10_000 + (Uuid::new_v4().as_u128() % 1_000_000_000) as i32
}

pub fn unique_email() -> String {
    format!("user-{}@example.com", Uuid::new_v4().simple())
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<(StatusCode, Value)> {
        let res = request.send().await?;
        let status = res.status();
        let text = res.text().await?;
        let body = if text.is_empty() { Value::Null } else { serde_json::from_str(&text)? };
        Ok((status, body))
    }

    /// Sign up a regular user, returning `(email, token)`
    pub async fn signup_user(&self) -> Result<(String, String)> {
        let email = unique_email();
        let (status, body) = self
            .send(self.client.post(self.url("/api/v1/auth/signup")).json(&json!({
                "name": "Test User",
                "email": email,
                "password": PASSWORD,
                "confirmPassword": PASSWORD,
            })))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "signup failed: {} {}", status, body);
        let token = body["token"].as_str().context("token missing")?.to_string();
        Ok((email, token))
    }

    /// Create an admin directly through the repository and log in
    pub async fn admin_token(&self) -> Result<String> {
        let email = unique_email();
        self.state
            .users
            .create(UserDraft {
                name: Some("Test Admin".to_string()),
                email: Some(email.clone()),
                role: Some(Role::Admin),
                ..UserDraft::with_password(PASSWORD, PASSWORD)
            })
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        self.login(&email, PASSWORD).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let (status, body) = self
            .send(
                self.client
                    .post(self.url("/api/v1/auth/login"))
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
        Ok(body["token"].as_str().context("token missing")?.to_string())
    }

    /// A complete, valid movie document
    pub fn movie(&self, name: &str, genre: &str, price: f64, release_date: &str) -> Value {
        json!({
            "name": name,
            "description": "Integration test movie",
            "duration": 125,
            "ratings": 8.5,
            "totalRatings": 10,
            "releaseYear": 2001,
            "releaseDate": release_date,
            "genres": [genre],
            "directors": ["Test Director"],
            "coverImage": "cover.jpg",
            "actors": ["Actor One", "Actor Two"],
            "price": price,
        })
    }

    pub async fn create_movie(&self, admin: &str, movie: &Value) -> Result<Value> {
        let (status, body) = self
            .send(self.client.post(self.url("/api/v1/movies")).bearer_auth(admin).json(movie))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create failed: {} {}", status, body);
        Ok(body["data"]["movie"].clone())
    }
}
