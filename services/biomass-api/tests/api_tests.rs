//! Tests for the biomass API handlers.
//!
//! Handlers are exercised directly against a scripted imagery service;
//! no socket or database is required. Persistence-dependent paths are
//! covered in their disabled form.

use std::sync::Arc;

use analysis::AnalysisConfig;
use axum::extract::{Extension, Path};
use axum::response::IntoResponse;
use axum::Json;
use biomass_api::handlers;
use biomass_api::state::AppState;
use biomass_common::index::SensorGroup;
use test_utils::fixtures;
use test_utils::MockImagery;

fn state(mock: MockImagery) -> Extension<Arc<AppState>> {
    Extension(Arc::new(AppState::with_imagery(
        Arc::new(mock),
        AnalysisConfig::default(),
        None,
    )))
}

async fn error_status(err: handlers::ApiError) -> (u16, serde_json::Value) {
    let response = err.into_response();
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ============================================================================
// Analysis
// ============================================================================

#[tokio::test]
async fn test_calculate_returns_series_and_metadata() {
    let mock = MockImagery::new()
        .with_scene(
            SensorGroup::Multispectral,
            "2024-05-03",
            fixtures::band_values(&[("NDVI", 0.5), ("clear_ratio", 0.9)]),
        )
        .with_scene(
            SensorGroup::Multispectral,
            "2024-05-13",
            fixtures::band_values(&[("NDVI", 0.6), ("clear_ratio", 0.9)]),
        );
    let request = fixtures::analysis_request("field-7", &["NDVI"], "2024-05-01", "2024-06-01");

    let Json(response) = handlers::calculate_handler(state(mock), Json(request))
        .await
        .unwrap();

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["metadata"]["field_id"], "field-7");
    assert_eq!(json["metadata"]["sensor_labels"][0], "Sentinel-2 L2A");
    assert_eq!(json["timeseries"].as_array().unwrap().len(), 2);
    assert_eq!(json["timeseries"][0]["date"], "2024-05-03");
    assert_eq!(json["timeseries"][0]["values"]["NDVI"], 0.5);
    assert_eq!(json["period_summary"]["NDVI"], 0.55);
    assert_eq!(json["period_stats"]["NDVI"]["count"], 2);
    // Persistence is disabled, so no storage echo.
    assert!(json.get("storage").is_none());
}

#[tokio::test]
async fn test_calculate_maps_validation_failure_to_400() {
    let request = fixtures::analysis_request("f", &["NDWI"], "2024-05-01", "2024-06-01");

    let err = handlers::calculate_handler(state(MockImagery::new()), Json(request))
        .await
        .unwrap_err();

    let (status, body) = error_status(err).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Unknown index: NDWI");
}

#[tokio::test]
async fn test_calculate_maps_remote_failure_to_502() {
    let mock = MockImagery::new().with_listing_failure();
    let request = fixtures::analysis_request("f", &["NDVI"], "2024-05-01", "2024-06-01");

    let err = handlers::calculate_handler(state(mock), Json(request))
        .await
        .unwrap_err();

    let (status, _) = error_status(err).await;
    assert_eq!(status, 502);
}

#[tokio::test]
async fn test_history_without_store_reports_disabled() {
    let err = handlers::history_handler(state(MockImagery::new()), Path("field-7".to_string()))
        .await
        .unwrap_err();

    let (status, body) = error_status(err).await;
    assert_eq!(status, 500);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("persistence is disabled"));
}

// ============================================================================
// Visualization
// ============================================================================

#[tokio::test]
async fn test_map_returns_layer_url() {
    let mock = MockImagery::new().with_scene(
        SensorGroup::Multispectral,
        "2024-05-03",
        fixtures::band_values(&[("NDVI", 0.5)]),
    );
    let request = fixtures::analysis_request("f", &["NDVI"], "2024-05-03", "2024-05-03");

    let Json(layer) = handlers::map_handler(state(mock), Json(request))
        .await
        .unwrap();

    let json = serde_json::to_value(&layer).unwrap();
    assert_eq!(json["index_name"], "NDVI");
    assert_eq!(json["layer_url"], "https://tiles.test/NDVI/{z}/{x}/{y}");
}

#[tokio::test]
async fn test_map_without_scenes_is_404() {
    let request = fixtures::analysis_request("f", &["NDVI"], "2024-05-03", "2024-05-03");

    let err = handlers::map_handler(state(MockImagery::new()), Json(request))
        .await
        .unwrap_err();

    let (status, _) = error_status(err).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_map_batch_returns_layers_in_request_order() {
    let mock = MockImagery::new().with_scene(
        SensorGroup::Multispectral,
        "2024-05-03",
        fixtures::band_values(&[("NDVI", 0.5)]),
    );
    let request = fixtures::batch_tile_request(&["NDVI", "EVI"], "2024-05-03");

    let Json(result) = handlers::map_batch_handler(state(mock), Json(request))
        .await
        .unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["date"], "2024-05-03");
    assert_eq!(json["sensor"], "Sentinel-2");
    let layers = json["layers"].as_array().unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0]["index_name"], "NDVI");
    assert_eq!(layers[1]["index_name"], "EVI");
    assert!(json["elapsed_ms"].is_u64());
}

#[tokio::test]
async fn test_pixel_returns_point_values() {
    let mock = MockImagery::new().with_scene(
        SensorGroup::Multispectral,
        "2024-05-03",
        fixtures::band_values(&[("NDVI", 0.4321)]),
    );
    let request = fixtures::pixel_request(&["NDVI"], "2024-05-03");

    let Json(sample) = handlers::pixel_handler(state(mock), Json(request))
        .await
        .unwrap();

    let json = serde_json::to_value(&sample).unwrap();
    assert_eq!(json["lat"], 52.005);
    assert_eq!(json["lng"], 21.005);
    assert_eq!(json["date"], "2024-05-03");
    assert_eq!(json["values"]["NDVI"], 0.4321);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_service_identity() {
    let response = handlers::health_handler().await.into_response();
    assert_eq!(response.status().as_u16(), 200);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "biomass-api");
}

#[tokio::test]
async fn test_ready_without_store_is_ready() {
    let response = handlers::ready_handler(state(MockImagery::new()))
        .await
        .into_response();
    assert_eq!(response.status().as_u16(), 200);
}

// ============================================================================
// Response envelope serialization
// ============================================================================

#[test]
fn test_storage_summary_serialization_shape() {
    let summary = storage::UpsertSummary {
        new_records: 3,
        updated_records: 1,
    };
    let json = serde_json::to_value(summary).unwrap();
    assert_eq!(json["new_records"], 3);
    assert_eq!(json["updated_records"], 1);
}

#[test]
fn test_history_envelope_serialization_shape() {
    let response = handlers::HistoryResponse {
        field_id: "field-7".to_string(),
        measurements: vec![storage::MeasurementRecord {
            field_id: "field-7".to_string(),
            date: fixtures::date("2024-05-03"),
            sensor: "Sentinel-2".to_string(),
            ndvi: Some(0.52),
            ..Default::default()
        }],
    };

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["field_id"], "field-7");
    let rows = json["measurements"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["date"], "2024-05-03");
    assert_eq!(rows[0]["ndvi"], 0.52);
    // Unobserved columns serialize as explicit nulls.
    assert_eq!(rows[0]["lst"], serde_json::Value::Null);
}
