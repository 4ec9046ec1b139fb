#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use api::{router, AppState};
use chrono::{DateTime, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ActiveValue, ConnectOptions, DatabaseConnection, EntityTrait};
use serde_json::Value;
use shared::entity::{audit_logs, price_bars};
use shared::{connect_with_options, Config};
use tokio_util::sync::CancellationToken;

pub struct TestApp {
    pub base_url: String,
    pub db: Arc<DatabaseConnection>,
    pub client: reqwest::Client,
    pub state: AppState,
    pub shutdown: CancellationToken,
}

/// Fresh in-memory SQLite database with every migration applied.
pub async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // One connection keeps every query on the same in-memory database.
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = connect_with_options(options).await.expect("connect to sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_db().await, Duration::from_millis(50)).await
}

pub async fn spawn_app_with(db: DatabaseConnection, training_delay: Duration) -> TestApp {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: base_url.clone(),
        api_base_url: base_url.clone(),
        run_migrations: true,
        training_delay,
        history_bar_count: 1000,
    };
    let shutdown = CancellationToken::new();
    let (state, _tasks) = AppState::start(config, db, shutdown.clone())
        .await
        .expect("start app state");

    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });

    TestApp {
        base_url,
        db: state.db.clone(),
        client: reqwest::Client::new(),
        state,
        shutdown,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        read(response).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> (u16, Value) {
        let response = self.client.post(self.url(path)).json(body).send().await.unwrap();
        read(response).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> (u16, Value) {
        let response = self.client.put(self.url(path)).json(body).send().await.unwrap();
        read(response).await
    }

    pub async fn delete(&self, path: &str) -> (u16, Value) {
        let response = self.client.delete(self.url(path)).send().await.unwrap();
        read(response).await
    }

    pub async fn audit_actions(&self) -> Vec<String> {
        audit_logs::Entity::find()
            .all(self.db.as_ref())
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.action)
            .collect()
    }

    /// Waits until at least `count` audit rows exist, returning their actions in order.
    pub async fn wait_for_audit(&self, count: usize) -> Vec<String> {
        eventually(|| async move {
            let actions = self.audit_actions().await;
            (actions.len() >= count).then_some(actions)
        })
        .await
    }

    pub async fn seed_bars(&self, symbol: &str, timeframe: &str, start: DateTime<Utc>, count: i64) {
        for i in 0..count {
            let close = 2000.0 + i as f64;
            price_bars::ActiveModel {
                symbol: ActiveValue::Set(symbol.to_string()),
                timeframe: ActiveValue::Set(timeframe.to_string()),
                time: ActiveValue::Set(start + chrono::Duration::hours(i)),
                open: ActiveValue::Set(close - 0.5),
                high: ActiveValue::Set(close + 1.0),
                low: ActiveValue::Set(close - 1.0),
                close: ActiveValue::Set(close),
                tick_volume: ActiveValue::Set(100 + i),
                ..Default::default()
            }
            .insert(self.db.as_ref())
            .await
            .unwrap();
        }
    }
}

async fn read(response: reqwest::Response) -> (u16, Value) {
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

/// Polls `probe` until it yields a value or two seconds pass.
pub async fn eventually<F, Fut, T>(mut probe: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..100 {
        if let Some(value) = probe().await {
            return value;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met within 2s");
}
