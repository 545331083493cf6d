//! HTTP client for the Thunai backend API (users, moments) and the availability
//! API (office schedules).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use thunai_core::config::BackendConfig;
use thunai_core::{
    MomentRecord, NewMoment, NewUser, RecordStore, RecordStoreError, ScheduleStore,
    ScheduleSubmission, UserRecord,
};
use tracing::debug;

#[derive(Clone)]
pub struct HttpRecordStore {
    client: Client,
    base_url: String,
    availability_url: String,
    timeout_secs: u64,
}

impl HttpRecordStore {
    pub fn new(config: &BackendConfig) -> Result<Self, RecordStoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| RecordStoreError::Unavailable(error.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            availability_url: config.availability_url.trim_end_matches('/').to_owned(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, RecordStoreError> {
        let response = request.send().await.map_err(|error| self.transport_error(error))?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(RecordStoreError::Rejected { status: status.as_u16(), message })
    }

    /// `Ok(None)` when the backend answers 404.
    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, RecordStoreError> {
        let response = self.send(self.client.get(self.url(path))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        response.json::<T>().await.map(Some).map_err(decode_error)
    }

    async fn post<B, T>(&self, url: String, body: &B) -> Result<T, RecordStoreError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.send(self.client.post(url).json(body)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RecordStoreError::Rejected {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: "endpoint not found".to_owned(),
            });
        }
        response.json::<T>().await.map_err(decode_error)
    }

    async fn all_users(&self) -> Result<Vec<UserRecord>, RecordStoreError> {
        Ok(self.fetch::<Vec<UserRecord>>("/users/").await?.unwrap_or_default())
    }

    fn transport_error(&self, error: reqwest::Error) -> RecordStoreError {
        if error.is_timeout() {
            RecordStoreError::Timeout(self.timeout_secs)
        } else {
            RecordStoreError::Unavailable(error.to_string())
        }
    }
}

fn decode_error(error: reqwest::Error) -> RecordStoreError {
    RecordStoreError::Decode(error.to_string())
}

/// Path segments are user input; keep them from escaping the route.
fn segment(value: &str) -> String {
    value
        .bytes()
        .map(|byte| match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (byte as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect()
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn find_user_by_name(&self, name: &str) -> Result<Option<UserRecord>, RecordStoreError> {
        self.fetch(&format!("/users/name/{}", segment(name))).await
    }

    async fn find_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserRecord>, RecordStoreError> {
        self.fetch(&format!("/users/external-id/{}", segment(external_id))).await
    }

    async fn search_users(&self, fragment: &str) -> Result<Vec<UserRecord>, RecordStoreError> {
        let needle = fragment.trim().to_lowercase();
        let users = self.all_users().await?;
        Ok(users.into_iter().filter(|user| user.name.to_lowercase().contains(&needle)).collect())
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RecordStoreError> {
        debug!(event_name = "backend.user_create", name = %user.name, "creating user record");
        self.post(self.url("/users/"), &user).await
    }

    async fn create_moment(&self, moment: NewMoment) -> Result<MomentRecord, RecordStoreError> {
        debug!(
            event_name = "backend.moment_create",
            person_name = %moment.person_name,
            moment_type = %moment.moment_type,
            "creating moment record"
        );
        self.post(self.url("/moments/"), &moment).await
    }

    async fn find_moments_by_person(
        &self,
        person_name: &str,
    ) -> Result<Vec<MomentRecord>, RecordStoreError> {
        let response = self
            .send(self.client.get(self.url("/moments/")).query(&[("person_name", person_name)]))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        response.json().await.map_err(decode_error)
    }
}

#[async_trait]
impl ScheduleStore for HttpRecordStore {
    async fn save_schedule(&self, submission: ScheduleSubmission) -> Result<(), RecordStoreError> {
        let mut schedule = serde_json::Map::new();
        schedule.insert("week_start_date".to_owned(), json!(submission.week_start_date));
        for (day, status) in &submission.statuses {
            schedule.insert(format!("{}_status", day.as_str()), json!(status.as_str()));
        }
        schedule.insert("office_days_count".to_owned(), json!(submission.office_days_count));
        schedule.insert("is_compliant".to_owned(), json!(submission.is_compliant));
        schedule.insert(
            "collection_method".to_owned(),
            json!(submission.collection_method.as_str()),
        );
        let body = json!({
            "user_id": submission.user_id.as_str(),
            "submitted_at": submission.submitted_at.to_rfc3339(),
            "schedule_data": schedule,
        });

        let url = format!("{}/availability/save", self.availability_url);
        let _: serde_json::Value = self.post(url, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::{NaiveDate, TimeZone, Utc};
    use serde_json::Value;
    use thunai_core::config::BackendConfig;
    use thunai_core::{
        NewMoment, OfficeStatus, RecordStore, RecordStoreError, ScheduleScope, ScheduleStore,
        ScheduleSubmission, UserId, UserRecord, WorkDay,
    };
    use tokio::sync::Mutex;

    use super::{segment, HttpRecordStore};

    #[derive(Clone, Default)]
    struct Backend {
        saved: Arc<Mutex<Vec<Value>>>,
    }

    fn priya() -> UserRecord {
        UserRecord {
            id: 7,
            name: "Priya".to_owned(),
            external_id: Some("U-PRIYA".to_owned()),
            email: Some("priya@example.com".to_owned()),
            is_admin: false,
        }
    }

    async fn user_by_name(Path(name): Path<String>) -> Result<Json<UserRecord>, StatusCode> {
        if name == "Priya" {
            Ok(Json(priya()))
        } else {
            Err(StatusCode::NOT_FOUND)
        }
    }

    async fn moments(Query(query): Query<BTreeMap<String, String>>) -> Json<Value> {
        let name = query.get("person_name").cloned().unwrap_or_default();
        Json(serde_json::json!([{
            "id": 1,
            "person_name": name,
            "moment_type": "birthday",
            "moment_date": "2026-11-15"
        }]))
    }

    async fn create_moment(Json(moment): Json<NewMoment>) -> Json<Value> {
        Json(serde_json::json!({
            "id": 2,
            "person_name": moment.person_name,
            "moment_type": moment.moment_type,
            "moment_date": moment.moment_date,
            "created_by": moment.created_by
        }))
    }

    async fn save(State(backend): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
        backend.saved.lock().await.push(body);
        Json(serde_json::json!({"status": "saved"}))
    }

    async fn spawn_backend(backend: Backend) -> String {
        let app = Router::new()
            .route("/api/v1/users/", get(|| async { Json(vec![priya()]) }))
            .route("/api/v1/users/name/{name}", get(user_by_name))
            .route("/api/v1/moments/", get(moments).post(create_moment))
            .route("/api/v1/availability/save", post(save))
            .route("/broken/users/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .with_state(backend);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{address}")
    }

    fn store(root: &str, prefix: &str) -> HttpRecordStore {
        HttpRecordStore::new(&BackendConfig {
            base_url: format!("{root}/{prefix}"),
            availability_url: format!("{root}/api/v1"),
            timeout_secs: 5,
            email_domain: "example.com".to_owned(),
            dashboard_name: "Thunai Dashboard".to_owned(),
        })
        .expect("client builds")
    }

    #[tokio::test]
    async fn user_lookups_treat_not_found_as_absent() {
        let root = spawn_backend(Backend::default()).await;
        let store = store(&root, "api/v1");

        assert_eq!(store.find_user_by_name("Priya").await.expect("lookup"), Some(priya()));
        assert_eq!(store.find_user_by_name("Nobody").await.expect("lookup"), None);
        assert_eq!(store.search_users("pri").await.expect("search").len(), 1);
    }

    #[tokio::test]
    async fn moments_round_trip_through_the_api() {
        let root = spawn_backend(Backend::default()).await;
        let store = store(&root, "api/v1");
        let date = NaiveDate::from_ymd_opt(2026, 11, 15).expect("valid date");

        let created = store
            .create_moment(NewMoment {
                person_name: "Priya".to_owned(),
                moment_type: "birthday".to_owned(),
                moment_date: date,
                description: "Priya's birthday".to_owned(),
                created_by: 7,
            })
            .await
            .expect("created");
        assert_eq!(created.id, 2);
        assert_eq!(created.created_by, Some(7));

        let found = store.find_moments_by_person("Priya").await.expect("found");
        assert_eq!(found[0].person_name, "Priya");
        assert_eq!(found[0].moment_date, date);
    }

    #[tokio::test]
    async fn schedules_are_posted_with_per_day_statuses() {
        let backend = Backend::default();
        let root = spawn_backend(backend.clone()).await;
        let store = store(&root, "api/v1");
        let mut statuses = BTreeMap::new();
        statuses.insert(WorkDay::Monday, OfficeStatus::Office);
        statuses.insert(WorkDay::Tuesday, OfficeStatus::Home);

        store
            .save_schedule(ScheduleSubmission {
                user_id: UserId::new("U1"),
                week_start_date: NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date"),
                statuses,
                office_days_count: 1,
                is_compliant: false,
                collection_method: ScheduleScope::Weekly,
                submitted_at: Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).single().expect("ts"),
            })
            .await
            .expect("saved");

        let saved = backend.saved.lock().await;
        let schedule = &saved[0]["schedule_data"];
        assert_eq!(saved[0]["user_id"], "U1");
        assert_eq!(schedule["week_start_date"], "2026-10-19");
        assert_eq!(schedule["monday_status"], "office");
        assert_eq!(schedule["tuesday_status"], "home");
        assert_eq!(schedule["collection_method"], "weekly");
    }

    #[tokio::test]
    async fn server_errors_and_refused_connections_are_reported() {
        let root = spawn_backend(Backend::default()).await;
        let broken = store(&root, "broken");
        assert!(matches!(
            broken.search_users("a").await,
            Err(RecordStoreError::Rejected { status: 500, .. })
        ));

        let unreachable = store("http://127.0.0.1:9", "api/v1");
        assert!(matches!(
            unreachable.find_user_by_name("Priya").await,
            Err(RecordStoreError::Unavailable(_) | RecordStoreError::Timeout(_))
        ));
    }

    #[test]
    fn path_segments_are_escaped() {
        assert_eq!(segment("Mary Ann"), "Mary%20Ann");
        assert_eq!(segment("a/b"), "a%2Fb");
    }
}
