#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use nivela_frontend::models::{Session, SessionChange, SessionEvent, SessionUser};
use nivela_frontend::services::{IdentityProvider, MetadataStore, ObjectStore, Query, SessionManager};
use nivela_frontend::startup::build_router;
use nivela_frontend::AppState;
use axum::Router;
use serde_json::Value;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

pub const TEST_USER_ID: &str = "test_user_123";
pub const TEST_PASSWORD: &str = "correct-horse";

pub fn session(user_id: &str) -> Session {
    let now = Utc::now();
    Session {
        access_token: format!("token-{}", user_id),
        refresh_token: format!("refresh-{}", user_id),
        expires_at: now + Duration::hours(1),
        issued_at: now,
        user: SessionUser {
            id: user_id.to_string(),
            email: Some(format!("{}@example.com", user_id)),
        },
    }
}

/// Identity provider holding one session in memory.
pub struct InMemoryIdentity {
    current: Mutex<Option<Session>>,
    lookup_error: Mutex<Option<String>>,
    changes: broadcast::Sender<SessionChange>,
}

impl InMemoryIdentity {
    pub fn new(current: Option<Session>) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            current: Mutex::new(current),
            lookup_error: Mutex::new(None),
            changes,
        }
    }

    /// Make the initial session lookup fail.
    pub fn failing(message: &str) -> Self {
        let identity = Self::new(None);
        *identity.lookup_error.lock().unwrap() = Some(message.to_string());
        identity
    }

    pub fn emit(&self, event: SessionEvent, session: Option<Session>) {
        *self.current.lock().unwrap() = session.clone();
        let _ = self.changes.send(SessionChange::new(event, session));
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn get_current_session(&self) -> Result<Option<Session>, AppError> {
        if let Some(message) = self.lookup_error.lock().unwrap().clone() {
            return Err(AppError::ProviderError(anyhow::anyhow!(message)));
        }
        Ok(self.current.lock().unwrap().clone())
    }

    fn on_session_change(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AppError> {
        if password != TEST_PASSWORD {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "invalid login credentials"
            )));
        }
        let mut signed_in = session(TEST_USER_ID);
        signed_in.user.email = Some(email.to_string());
        self.emit(SessionEvent::SignedIn, Some(signed_in.clone()));
        Ok(signed_in)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        self.emit(SessionEvent::SignedOut, None);
        Ok(())
    }
}

/// Object store keeping objects in a map, with switchable failures.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
    put_calls: AtomicUsize,
}

impl InMemoryObjectStore {
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), AppError> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::StorageWriteError(anyhow::anyhow!("bucket unavailable")));
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(path) {
            return Err(AppError::StorageWriteError(anyhow::anyhow!(
                "409 The resource already exists"
            )));
        }
        objects.insert(path.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::StorageDeleteError(anyhow::anyhow!("bucket unavailable")));
        }
        self.objects.lock().unwrap().remove(path);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://upload-photos/{}", path)
    }
}

/// Metadata store keeping rows per table, filling `id` and `created_at` like
/// the database defaults do.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    fail_inserts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryMetadataStore {
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn seed(&self, table: &str, row: Value) -> Value {
        let row = with_defaults(row);
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        row
    }
}

fn with_defaults(mut row: Value) -> Value {
    if let Some(object) = row.as_object_mut() {
        object
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        object
            .entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
    }
    row
}

fn column_text(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn matches(row: &Value, query: &Query) -> bool {
    query
        .filters
        .iter()
        .all(|(column, value)| column_text(row, column).as_deref() == Some(value.as_str()))
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, AppError> {
        let mut rows: Vec<Value> = self
            .rows(table)
            .into_iter()
            .filter(|row| matches(row, query))
            .collect();

        if let Some((column, ascending)) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = column_text(a, column).cmp(&column_text(b, column));
                if *ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, AppError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::MetadataWriteError(anyhow::anyhow!(
                "new row violates row-level security policy"
            )));
        }
        Ok(self.seed(table, row))
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> Result<Value, AppError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::MetadataWriteError(anyhow::anyhow!("upsert rejected")));
        }
        let key = column_text(&row, on_conflict);
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();

        if let Some(existing) = rows
            .iter_mut()
            .find(|existing| key.is_some() && column_text(existing, on_conflict) == key)
        {
            if let (Some(target), Some(source)) = (existing.as_object_mut(), row.as_object()) {
                for (column, value) in source {
                    target.insert(column.clone(), value.clone());
                }
            }
            return Ok(existing.clone());
        }

        let row = with_defaults(row);
        rows.push(row.clone());
        Ok(row)
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<usize, AppError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::MetadataDeleteError(anyhow::anyhow!("delete rejected")));
        }
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let before = rows.len();
        rows.retain(|row| !matches(row, query));
        Ok(before - rows.len())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub sessions: Arc<SessionManager>,
    pub identity: Arc<InMemoryIdentity>,
    pub objects: Arc<InMemoryObjectStore>,
    pub metadata: Arc<InMemoryMetadataStore>,
}

impl TestApp {
    /// App whose initial session lookup has completed.
    pub async fn spawn(current: Option<Session>) -> Self {
        Self::spawn_with(InMemoryIdentity::new(current)).await
    }

    pub async fn spawn_with(identity: InMemoryIdentity) -> Self {
        let app = Self::unresolved_with(identity);
        app.sessions.initialize().await;
        app
    }

    /// App still waiting for its initial session lookup.
    pub fn unresolved() -> Self {
        Self::unresolved_with(InMemoryIdentity::new(None))
    }

    fn unresolved_with(identity: InMemoryIdentity) -> Self {
        let identity = Arc::new(identity);
        let objects = Arc::new(InMemoryObjectStore::default());
        let metadata = Arc::new(InMemoryMetadataStore::default());

        let sessions = Arc::new(SessionManager::new(identity.clone()));
        sessions.subscribe();

        let state = AppState::new(
            sessions.clone(),
            identity.clone(),
            objects.clone(),
            metadata.clone(),
        );
        let router = build_router(state.clone());

        TestApp {
            router,
            state,
            sessions,
            identity,
            objects,
            metadata,
        }
    }
}
