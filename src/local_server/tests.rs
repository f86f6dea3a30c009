//! HTTP server end-to-end tests

use std::time::Duration;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::local_server::{LocalServer, ServerConfig, ServerHandle};
    use crate::models::NewSensorReading;
    use crate::storage::Database;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use tempfile::{tempdir, TempDir};

    struct TestServer {
        _dir: TempDir,
        handle: ServerHandle,
        db: Arc<Mutex<Database>>,
        base: String,
    }

    impl TestServer {
        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base, path)
        }

        fn insert(&self, readings: &[NewSensorReading]) {
            self.db.lock().unwrap().insert_readings(readings).unwrap();
        }
    }

    async fn start_server(port: u16, config: ServerConfig) -> TestServer {
        let dir = tempdir().unwrap();
        let db = Database::new(&dir.path().join("emsys.db")).unwrap();
        let db = Arc::new(Mutex::new(db));

        let server = LocalServer::with_database(config, db.clone());
        let handle = server.start(Some(port)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        TestServer {
            _dir: dir,
            handle,
            db,
            base: format!("http://127.0.0.1:{}", port),
        }
    }

    fn at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0).unwrap()
    }

    fn two_readings() -> Vec<NewSensorReading> {
        vec![
            NewSensorReading::new(3000.0, 150.0, 40.0, 85.0, 8.0).with_timestamp(at(10, 0)),
            NewSensorReading::new(5000.0, 200.0, 60.0, 95.0, 10.0).with_timestamp(at(10, 5)),
        ]
    }

    #[tokio::test]
    async fn test_server_start_and_stop() {
        let server = start_server(39201, ServerConfig::default()).await;
        assert_eq!(server.handle.port(), 39201);

        server.handle.stop().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(LocalServer::check_port_available(39201).await);
    }

    #[tokio::test]
    async fn test_server_port_validation() {
        let db = Arc::new(Mutex::new(Database::new_in_memory().unwrap()));
        let server = LocalServer::with_database(ServerConfig::default(), db);

        let result = server.start(Some(80)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = start_server(39202, ServerConfig::default()).await;

        let response = reqwest::get(server.url("/api/health")).await.unwrap();
        assert_eq!(response.status(), 200);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_ingest_endpoint() {
        let server = start_server(39203, ServerConfig::default()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(server.url("/api/sensor-data"))
            .json(&json!({
                "timestamp": "2024-01-15T10:00:00Z",
                "rpm": "5200",
                "torque": 240.5,
                "maf": 52.1,
                "temperature": 97.3,
                "fuelConsumption": 12.4
            }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        assert!(body["id"].as_i64().unwrap() > 0);
        assert_eq!(body["rpm"], 5200.0);
        assert_eq!(body["alertStatus"], true);
        assert_eq!(body["timestamp"], "2024-01-15T10:00:00Z");
        assert!(body["customSensor"].is_null());

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_ingest_rejects_invalid_payloads() {
        let server = start_server(39204, ServerConfig::default()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(server.url("/api/sensor-data"))
            .json(&json!({ "rpm": 3000, "torque": "abc" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "INVALID_PAYLOAD");
        assert_eq!(
            body["message"],
            "Missing or invalid fields: torque, maf, temperature, fuelConsumption"
        );

        let response = client
            .post(server.url("/api/sensor-data"))
            .json(&json!({
                "timestamp": "yesterday",
                "rpm": 3000, "torque": 150, "maf": 40, "temperature": 85, "fuelConsumption": 8
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "Invalid timestamp value");

        let response = client
            .post(server.url("/api/sensor-data"))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        assert_eq!(server.db.lock().unwrap().count_readings(&Default::default()).unwrap(), 0);
        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_list_pagination() {
        let server = start_server(39205, ServerConfig::default()).await;
        let readings: Vec<NewSensorReading> = (0..5)
            .map(|i| {
                NewSensorReading::new(2000.0 + i as f64, 150.0, 40.0, 85.0, 8.0)
                    .with_timestamp(at(10, i * 5))
            })
            .collect();
        server.insert(&readings);

        // Repeated keys resolve to the first occurrence
        let body: Value = reqwest::get(server.url("/api/sensor-data?page=2&limit=2&page=9"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["pagination"], json!({"page": 2, "limit": 2, "total": 5, "totalPages": 3}));
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["rpm"], 2002.0);
        assert_eq!(data[1]["rpm"], 2001.0);

        let body: Value = reqwest::get(server.url("/api/sensor-data?page=0&limit=abc"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["pagination"]["page"], 1);
        assert_eq!(body["pagination"]["limit"], 50);

        // A page beyond any representable offset is empty
        let body: Value = reqwest::get(server.url("/api/sensor-data?page=9223372036854775807&limit=3"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(body["data"].as_array().unwrap().is_empty());
        assert_eq!(body["pagination"]["total"], 5);

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_latest_endpoint() {
        let server = start_server(39206, ServerConfig::default()).await;

        let response = reqwest::get(server.url("/api/sensor-data/latest")).await.unwrap();
        assert_eq!(response.status(), 404);

        server.insert(&two_readings());
        let body: Value = reqwest::get(server.url("/api/sensor-data/latest"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["rpm"], 5000.0);

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let server = start_server(39207, ServerConfig::default()).await;
        server.insert(&two_readings());

        let body: Value = reqwest::get(server.url(
            "/api/sensor-data/stats?start=2024-01-15T00:00:00Z&end=2024-01-16T00:00:00Z",
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

        assert_eq!(body["rpm"], json!({"min": 3000.0, "max": 5000.0, "avg": 4000.0}));
        assert_eq!(body["fuelConsumption"]["avg"], 9.0);
        assert_eq!(body["count"], 2);
        assert_eq!(body["timeRange"], "custom");
        assert_eq!(body["period"]["start"], "2024-01-15T00:00:00Z");

        // A past window from a relative preset is empty
        let body: Value = reqwest::get(server.url("/api/sensor-data/stats?range=1h"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["count"], 0);
        assert_eq!(body["timeRange"], "1h");
        assert_eq!(body["rpm"]["avg"], 0.0);

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_series_endpoint() {
        let server = start_server(39208, ServerConfig::default()).await;
        server.insert(&two_readings());

        let body: Value = reqwest::get(server.url("/api/sensor-data/series?limit=1"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["rpm"], 3000.0);

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_export_endpoint() {
        let server = start_server(39209, ServerConfig::default()).await;

        let response = reqwest::get(server.url("/api/sensor-data/export")).await.unwrap();
        assert_eq!(response.status(), 404);

        server.insert(&two_readings());

        let response = reqwest::get(server.url("/api/sensor-data/export")).await.unwrap();
        assert_eq!(response.status(), 200);
        let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
        assert!(disposition.starts_with("attachment; filename=\"EMSysData_"));
        assert!(disposition.ends_with(".csv\""));
        let text = response.text().await.unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("Timestamp,"));

        let text = reqwest::get(server.url("/api/sensor-data/export?sheet=summary"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(text.contains("Total Records,2"));

        let text = reqwest::get(server.url("/api/sensor-data/export?sheet=charts"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(text.starts_with("Index,"));
        assert!(text.lines().nth(2).unwrap().starts_with("2,"));

        let response = reqwest::get(server.url("/api/sensor-data/export?sheet=pivot"))
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_delete_endpoint() {
        let server = start_server(39210, ServerConfig::default()).await;
        server.insert(&two_readings());
        let client = reqwest::Client::new();

        let body: Value = client
            .delete(server.url("/api/sensor-data?start=2024-01-15T10:03:00Z"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["deletedCount"], 1);
        assert_eq!(body["range"]["start"], "2024-01-15T10:03:00Z");
        assert!(body["range"]["end"].is_null());

        let body: Value = client
            .delete(server.url("/api/sensor-data"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["deletedCount"], 1);
        assert!(body["range"].is_null());

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_analytics_endpoints() {
        let server = start_server(39211, ServerConfig::default()).await;
        let window = "start=2024-01-15T00:00:00Z&end=2024-01-16T00:00:00Z";

        let response = reqwest::get(server.url(&format!("/api/analytics/health?{}", window)))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["message"], "No data available");

        server.insert(&two_readings());

        let body: Value = reqwest::get(server.url(&format!("/api/analytics/health?{}", window)))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(body["score"].as_u64().unwrap() <= 100);
        assert!(body["rating"].is_string());
        assert_eq!(body["metrics"]["maxTemp"], 95.0);

        let body: Value = reqwest::get(server.url(&format!(
            "/api/analytics/fuel?{}&price=10000",
            window
        )))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
        assert_eq!(body["avgConsumption"], 9.0);
        assert_eq!(body["totalFuel"], 18.0);
        assert_eq!(body["totalCost"], 180.0);
        assert_eq!(body["efficiency"], "Good");

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_comparison_endpoint() {
        let server = start_server(39212, ServerConfig::default()).await;
        server.insert(&[NewSensorReading::new(3000.0, 150.0, 40.0, 85.0, 8.0)]);

        let body: Value = reqwest::get(server.url("/api/analytics/comparison?preset=today-yesterday"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["preset"], "today-yesterday");
        assert!(body["rpm"].is_null());
        assert!(body["current"]["start"].is_string());
        assert_eq!(body["health"]["score"], 100);
        assert_eq!(body["fuel"]["avgConsumption"], 8.0);

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_cors_allowed_origin() {
        let config = ServerConfig {
            allowed_origins: vec!["http://dashboard.test".to_string()],
            ..Default::default()
        };
        let server = start_server(39213, config).await;

        let response = reqwest::Client::new()
            .get(server.url("/api/health"))
            .header("origin", "http://dashboard.test")
            .send()
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://dashboard.test"
        );

        server.handle.stop().await;
    }

    #[tokio::test]
    async fn test_check_port_available() {
        assert!(LocalServer::check_port_available(39250).await);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:39251").await.unwrap();
        assert!(!LocalServer::check_port_available(39251).await);

        let err = LocalServer::ensure_port_available(39251).await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Port 39251 is already in use");
        assert_eq!(err.code(), "VALIDATION_ERROR");

        drop(listener);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(LocalServer::check_port_available(39251).await);
        assert!(LocalServer::ensure_port_available(39251).await.is_ok());
    }
}
