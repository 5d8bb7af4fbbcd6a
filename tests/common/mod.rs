use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

// Weak so the server is shared while tests run but reaped once the last
// handle drops
static SERVER: Mutex<Weak<TestServer>> = Mutex::new(Weak::new());

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Reap the spawned server so test runs never leak a process
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        // Assumes debug profile; adjust if you run tests with --release
        let mut cmd = Command::new("target/debug/provlog-api");
        cmd.env("PROVLOG_API_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server sees DATABASE_URL and JWT_SECRET
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
                // Consider server ready on any non-404 response
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<Arc<TestServer>> {
    let server = {
        let mut slot = SERVER.lock().unwrap();
        match slot.upgrade() {
            Some(server) => server,
            None => {
                let server = Arc::new(TestServer::spawn()?);
                *slot = Arc::downgrade(&server);
                server
            }
        }
    };
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// End-to-end tests need a reachable Postgres; without one they skip rather
/// than fail.
pub fn db_available() -> bool {
    std::env::var("DATABASE_URL").is_ok()
}

/// Register a fresh account with a unique username and return
/// (bearer token, user json).
#[allow(dead_code)]
pub async fn register_account(
    server: &TestServer,
    role: &str,
    name: &str,
) -> Result<(String, Value)> {
    let client = reqwest::Client::new();
    let username = format!("{}-{}", name.to_lowercase(), uuid_suffix());

    let res = client
        .post(format!("{}/auth/register", server.base_url))
        .json(&json!({
            "username": username,
            "password": "correct-horse-battery",
            "name": name,
            "role": role,
        }))
        .send()
        .await?;

    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "registration failed with {}",
        res.status()
    );

    let body: Value = res.json().await?;
    let token = body["data"]["token"].as_str().context("missing token")?.to_string();
    Ok((token, body["data"]["user"].clone()))
}

#[allow(dead_code)]
fn uuid_suffix() -> String {
    // reqwest pulls in no uuid; derive a suffix from the system clock
    format!(
        "{:x}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    )
}
