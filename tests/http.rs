use once_cell::sync::Lazy;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct AppRemaining {
    app_name: String,
    used_minutes: u32,
    limit_minutes: u32,
    remaining_minutes: u32,
}

#[derive(Debug, Deserialize)]
struct TodayResponse {
    date: String,
    apps: Vec<AppRemaining>,
    total_remaining_minutes: u32,
    within_limit: bool,
}

#[derive(Debug, Deserialize)]
struct StreakResponse {
    streak: u32,
    label: String,
}

#[derive(Debug, Deserialize)]
struct TrendPoint {
    date: String,
    day_label: String,
    used_minutes: u32,
    limit_minutes: u32,
}

#[derive(Debug, Deserialize)]
struct TrendResponse {
    points: Vec<TrendPoint>,
}

#[derive(Debug, Deserialize)]
struct LeaderboardEntry {
    rank: usize,
    user_id: String,
    name: String,
    is_viewer: bool,
}

#[derive(Debug, Deserialize)]
struct Encouragement {
    message: String,
    sender: String,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("antidoom_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client
            .get(format!("{base_url}/api/today"))
            .header("x-user-id", "probe")
            .send()
            .await
        {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_antidoom"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("TREND_MISSING_LIMIT", "zero")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

fn get(client: &Client, server: &TestServer, user: &str, path: &str) -> RequestBuilder {
    client
        .get(format!("{}{path}", server.base_url))
        .header("x-user-id", user)
}

fn post(client: &Client, server: &TestServer, user: &str, path: &str) -> RequestBuilder {
    client
        .post(format!("{}{path}", server.base_url))
        .header("x-user-id", user)
}

fn put(client: &Client, server: &TestServer, user: &str, path: &str) -> RequestBuilder {
    client
        .put(format!("{}{path}", server.base_url))
        .header("x-user-id", user)
}

async fn onboard(client: &Client, server: &TestServer, user: &str) -> TodayResponse {
    let response = post(client, server, user, "/api/onboarding")
        .json(&json!({
            "limits": [
                { "app_name": "Instagram", "limit_minutes": 60 },
                { "app_name": "TikTok", "limit_minutes": 90 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

#[tokio::test]
async fn http_requires_session_header() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/api/streak", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_unknown_user_reads_as_empty() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let streak: StreakResponse = get(&client, &server, "nobody", "/api/streak")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(streak.streak, 0);

    let trend: TrendResponse = get(&client, &server, "nobody", "/api/trend")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(trend.points.len(), 7);
    assert!(trend.points.iter().all(|p| p.used_minutes == 0 && p.limit_minutes == 0));
    assert!(trend.points.iter().all(|p| p.day_label.chars().count() == 1));
}

#[tokio::test]
async fn http_onboarding_seeds_today_once() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let today = onboard(&client, &server, "onboard-user").await;
    assert_eq!(today.apps.len(), 2);
    assert!(today.apps.iter().all(|app| app.used_minutes == 0));
    assert_eq!(today.total_remaining_minutes, 150);
    assert!(today.within_limit);
    assert!(!today.date.is_empty());

    let again = post(&client, &server, "onboard-user", "/api/onboarding")
        .json(&json!({ "limits": [{ "app_name": "Reddit", "limit_minutes": 30 }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn http_usage_drives_streak_and_trend() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let user = "usage-user";
    onboard(&client, &server, user).await;

    let today: TodayResponse = post(&client, &server, user, "/api/usage")
        .json(&json!({ "app_name": "Instagram", "used_minutes": 20 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let instagram = today
        .apps
        .iter()
        .find(|app| app.app_name == "Instagram")
        .expect("missing app");
    assert_eq!(instagram.remaining_minutes, 40);
    assert_eq!(instagram.limit_minutes, 60);

    let streak: StreakResponse = get(&client, &server, user, "/api/streak")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(streak.streak, 1);
    assert!(streak.label.starts_with("1 "));

    let trend: TrendResponse = get(&client, &server, user, "/api/trend")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(trend.points.len(), 7);
    let last = trend.points.last().unwrap();
    assert_eq!(last.date, today.date);
    assert_eq!((last.used_minutes, last.limit_minutes), (20, 150));

    let over = post(&client, &server, user, "/api/usage")
        .json(&json!({ "app_name": "TikTok", "used_minutes": 120 }))
        .send()
        .await
        .unwrap();
    assert!(over.status().is_success());
    let streak: StreakResponse = get(&client, &server, user, "/api/streak")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(streak.streak, 0);

    let untracked = post(&client, &server, user, "/api/usage")
        .json(&json!({ "app_name": "Reddit", "used_minutes": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(untracked.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_leaderboard_marks_viewer() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let user = "leader-user";
    onboard(&client, &server, user).await;
    let response = put(&client, &server, user, "/api/account")
        .json(&json!({ "name": "James" }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let board: Vec<LeaderboardEntry> = get(&client, &server, user, "/api/leaderboard")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let me = board.iter().find(|e| e.user_id == user).expect("viewer missing");
    assert!(me.is_viewer);
    assert_eq!(me.name, "James");
    assert!(board.windows(2).all(|w| w[0].rank < w[1].rank));

    let top: Vec<LeaderboardEntry> = get(&client, &server, user, "/api/leaderboard?limit=1")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(top.len(), 1);

    let missing = get(&client, &server, user, "/api/leaderboard/no-such-user")
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_signup_and_goals_are_validated() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let user = "settings-user";

    let bad = post(&client, &server, user, "/api/signup")
        .json(&json!({ "name": "Eric", "email": "eric@", "password": "short", "agreed_to_terms": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let good = post(&client, &server, user, "/api/signup")
        .json(&json!({ "name": "Eric", "email": "eric@example.com", "password": "longenough", "agreed_to_terms": true }))
        .send()
        .await
        .unwrap();
    assert!(good.status().is_success());

    let empty_goal = put(&client, &server, user, "/api/settings/goals")
        .json(&json!({ "goal_type": "Reduce", "hours": 0, "minutes": 0, "date": "2030-01-01", "description": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty_goal.status(), StatusCode::BAD_REQUEST);

    let saved = put(&client, &server, user, "/api/settings/goals")
        .json(&json!({ "goal_type": "Maintain", "hours": 2, "minutes": 30, "date": "2030-01-01", "description": "Read more" }))
        .send()
        .await
        .unwrap();
    assert!(saved.status().is_success());

    let goals: serde_json::Value = get(&client, &server, user, "/api/settings/goals")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(goals["goal_type"], "Maintain");
    assert_eq!(goals["hours"], 2);
    assert_eq!(goals["description"], "Read more");

    let toggled = put(&client, &server, user, "/api/settings/notifications")
        .json(&json!({
            "every_10_minutes": false, "app_use_25": true, "app_use_50": false,
            "app_use_75": false, "app_use_95": false, "encouragements": true, "streaks": true
        }))
        .send()
        .await
        .unwrap();
    assert!(toggled.status().is_success());
    let notifications: serde_json::Value = get(&client, &server, user, "/api/settings/notifications")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(notifications["app_use_25"], true);
    assert_eq!(notifications["every_10_minutes"], false);
}

#[tokio::test]
async fn http_encouragements_newest_first() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let friend = "encouraged-user";
    onboard(&client, &server, friend).await;

    for message in ["Keep going", "Nice week"] {
        let response = post(&client, &server, "cheer-user", &format!("/api/encouragements/{friend}"))
            .json(&json!({ "message": message }))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    let messages: Vec<Encouragement> = get(&client, &server, friend, "/api/encouragements")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message, "Nice week");
    assert_eq!(messages[0].sender, "cheer-user");
}
