use incidents_api::app::{self, AppServices};
use reqwest::StatusCode;
use serde_json::{Value, json};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(services: AppServices) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = app::build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn in_memory() -> Self {
        Self::spawn(AppServices::in_memory()).await
    }

    async fn sqlite() -> Self {
        Self::spawn(AppServices::sqlite("sqlite::memory:").await.unwrap()).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        read(res).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        read(res).await
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        read(res).await
    }

    async fn delete(&self, path: &str) -> StatusCode {
        self.client.delete(self.url(path)).send().await.unwrap().status()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let text = res.text().await.unwrap();
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap()
    };
    (status, body)
}

async fn seed_references(srv: &TestServer) {
    for (path, body) in [
        ("/api/disease", json!({ "name": "Influenza", "description": "Seasonal flu" })),
        ("/api/location", json!({ "city": "Lagos", "country": "Nigeria" })),
        ("/api/symptom", json!({ "name": "Cough", "description": "Persistent" })),
        ("/api/symptom", json!({ "name": "Nausea", "description": "Queasy" })),
        (
            "/api/patient",
            json!({
                "nationalId": "NIN-001",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "dateOfBirth": "1990-01-01",
                "gender": "F",
                "contactInfo": "ada@example.com"
            }),
        ),
    ] {
        let (status, _) = srv.post(path, body).await;
        assert_eq!(status, StatusCode::CREATED, "seeding {path}");
    }
}

#[tokio::test]
async fn health_reports_the_backend() {
    let srv = TestServer::in_memory().await;
    let (status, body) = srv.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "in_memory");
}

#[tokio::test]
async fn disease_lifecycle_with_duplicate_rejection() {
    let srv = TestServer::in_memory().await;

    let (status, created) = srv
        .post("/api/disease", json!({ "name": "COVID-19", "description": "Coronavirus disease 2019" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["version"], 1);

    let (status, body) = srv
        .post("/api/disease", json!({ "name": "COVID-19", "description": "Another description" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_key");

    // Updating with its own name is not a duplicate.
    let (status, _) = srv
        .put("/api/disease/1", json!({ "name": "COVID-19", "description": "Updated" }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = srv.get("/api/disease/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Updated");
    assert_eq!(body["version"], 2);

    let (_, list) = srv.get("/api/disease").await;
    assert_eq!(list["items"].as_array().unwrap().len(), 1);

    assert_eq!(srv.delete("/api/disease/1").await, StatusCode::NO_CONTENT);
    let (status, body) = srv.get("/api/disease/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn blank_or_missing_fields_are_rejected() {
    let srv = TestServer::in_memory().await;

    let (status, body) = srv.post("/api/symptom", json!({ "description": "no name" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = srv
        .post("/api/patient", json!({ "nationalId": "NIN-9", "firstName": "A", "lastName": "B" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn malformed_ids_are_bad_requests() {
    let srv = TestServer::in_memory().await;
    let (status, body) = srv.get("/api/location/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, _) = srv.get("/api/incident/details/x1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

async fn incident_lifecycle(srv: &TestServer) {
    seed_references(srv).await;

    let (status, body) = srv.post("/api/incident/create", json!({ "symptomIds": [1] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_disease");

    let (status, body) = srv
        .post("/api/incident/create", json!({ "diseaseId": 1, "symptomIds": [1, 40, 41] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_reference");
    assert_eq!(body["message"], "symptoms do not exist: 40, 41");

    let (status, view) = srv
        .post(
            "/api/incident/create",
            json!({
                "diseaseId": 1,
                "patientId": 1,
                "locationId": 1,
                "dateReported": "2024-03-01T12:00:00Z",
                "symptomIds": [2, 1]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(view["diseaseName"], "Influenza");
    assert_eq!(view["patientName"], "Ada Lovelace");
    assert_eq!(view["location"], "Lagos, Nigeria");
    assert_eq!(view["symptoms"], json!(["Nausea", "Cough"]));
    let id = view["id"].as_i64().unwrap();

    // Whole-set replacement; absent fields keep their values.
    let (status, _) = srv
        .put(&format!("/api/incident/{id}"), json!({ "symptomIds": [1] }))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, view) = srv.get(&format!("/api/incident/{id}")).await;
    assert_eq!(view["symptoms"], json!(["Cough"]));
    assert_eq!(view["patientName"], "Ada Lovelace");

    let (status, body) = srv
        .put("/api/incident/999", json!({ "dateReported": "2024-04-01T00:00:00Z" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (_, details) = srv.get(&format!("/api/incident/details/{id}")).await;
    assert_eq!(details["diseaseDescription"], "Seasonal flu");
    assert_eq!(details["patientDateOfBirth"], "1990-01-01");

    let (_, summary) = srv.get("/api/incident/summary").await;
    assert_eq!(summary["items"][0]["totalCases"], 1);

    // Patient delete nulls the reference; disease delete removes the incident.
    assert_eq!(srv.delete("/api/patient/1").await, StatusCode::NO_CONTENT);
    let (_, listing) = srv.get("/api/incident/list").await;
    assert_eq!(listing["items"][0]["patientName"], Value::Null);

    assert_eq!(srv.delete("/api/disease/1").await, StatusCode::NO_CONTENT);
    let (status, _) = srv.get(&format!("/api/incident/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, all) = srv.get("/api/incident/all").await;
    assert!(all["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn incident_lifecycle_in_memory() {
    incident_lifecycle(&TestServer::in_memory().await).await;
}

#[tokio::test]
async fn incident_lifecycle_sqlite() {
    let srv = TestServer::sqlite().await;
    let (_, body) = srv.get("/health").await;
    assert_eq!(body["store"], "sqlite");
    incident_lifecycle(&srv).await;
}
