#![allow(dead_code)]

use axum::body::Body;
use axum::http::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use migration::MigratorTrait;
use sea_orm::{ActiveModelTrait, ActiveValue, Database, DatabaseConnection};
use std::sync::{Arc, Mutex};
use todo_list::clock::Clock;
use todo_list::entities::task;
use todo_list::task::{TaskState, TaskStatus};

/// Opens a fresh in-memory database with every migration applied.
pub async fn setup_db() -> anyhow::Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Clock that only moves when a test tells it to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// The instant every test starts at.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap()
}

pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub clock: Arc<ManualClock>,
}

impl TestContext {
    pub fn task_state(&self) -> Arc<TaskState> {
        Arc::new(TaskState {
            db: self.db.clone(),
            clock: self.clock.clone(),
        })
    }
}

pub async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let db = setup_db().await?;
    Ok(TestContext {
        db: Arc::new(db),
        clock: Arc::new(ManualClock::new(start_time())),
    })
}

/// Inserts a task row directly, bypassing the service.
pub async fn insert_task(
    db: &DatabaseConnection,
    title: &str,
    description: &str,
    due_date: DateTime<Utc>,
    status: TaskStatus,
) -> task::Model {
    let active_model = task::ActiveModel {
        title: ActiveValue::Set(title.to_string()),
        description: ActiveValue::Set(description.to_string()),
        due_date: ActiveValue::Set(due_date),
        status: ActiveValue::Set(status),
        created_at: ActiveValue::Set(start_time()),
        updated_at: ActiveValue::Set(start_time()),
        ..Default::default()
    };
    active_model
        .insert(db)
        .await
        .expect("Failed to insert task")
}

pub async fn body_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
