//! Tile-layer and pixel-sampling tests against a scripted imagery service.

use std::sync::Arc;

use analysis::{sample_pixel, TileService};
use biomass_common::error::BiomassError;
use biomass_common::index::{SensorGroup, VegetationIndex};
use test_utils::fixtures;
use test_utils::MockImagery;

fn tiles(mock: &Arc<MockImagery>) -> TileService {
    TileService::new(mock.clone())
}

fn scripted(group: SensorGroup, date: &str) -> MockImagery {
    MockImagery::new().with_scene(
        group,
        date,
        fixtures::band_values(&[("NDVI", 0.5), ("clear_ratio", 0.9)]),
    )
}

// ============================================================
// Single layer
// ============================================================

#[tokio::test]
async fn test_single_layer_widens_one_day_window() {
    let mock = Arc::new(scripted(SensorGroup::Multispectral, "2024-05-03"));
    let request = fixtures::analysis_request("f", &["NDVI"], "2024-05-03", "2024-05-03");

    let layer = tiles(&mock).single_layer(&request).await.unwrap();

    assert_eq!(layer.index_name, VegetationIndex::Ndvi);
    assert_eq!(layer.layer_url, "https://tiles.test/NDVI/{z}/{x}/{y}");
    assert_eq!(mock.tile_calls(), 1);
}

#[tokio::test]
async fn test_single_layer_true_color_follows_sensor_hint() {
    let mock = Arc::new(scripted(SensorGroup::Thermal, "2024-05-03"));
    let mut request = fixtures::analysis_request("f", &["RGB"], "2024-05-03", "2024-05-03");
    request.sensor = Some("thermal".to_string());

    let layer = tiles(&mock).single_layer(&request).await.unwrap();
    assert_eq!(layer.index_name, VegetationIndex::TrueColor);
    assert_eq!(layer.layer_url, "https://tiles.test/RGB/{z}/{x}/{y}");
}

#[tokio::test]
async fn test_single_layer_without_scenes_is_not_found() {
    let mock = Arc::new(MockImagery::new());
    let request = fixtures::analysis_request("f", &["NDVI"], "2024-05-03", "2024-05-03");

    let err = tiles(&mock).single_layer(&request).await.unwrap_err();
    assert!(matches!(err, BiomassError::NoImagery(_)));
    assert_eq!(err.http_status_code(), 404);
    assert_eq!(mock.tile_calls(), 0);
}

#[tokio::test]
async fn test_single_layer_failure_is_surfaced() {
    let mock = Arc::new(
        scripted(SensorGroup::Multispectral, "2024-05-03").with_tile_failure("NDVI"),
    );
    let request = fixtures::analysis_request("f", &["NDVI"], "2024-05-03", "2024-05-03");

    let err = tiles(&mock).single_layer(&request).await.unwrap_err();
    assert!(matches!(err, BiomassError::Imagery(_)));
}

// ============================================================
// Batch
// ============================================================

#[tokio::test]
async fn test_batch_preserves_request_order_under_delays() {
    let mock = Arc::new(
        scripted(SensorGroup::Multispectral, "2024-05-03")
            .with_tile_delay("NDVI", 30)
            .with_tile_delay("EVI", 15),
    );
    let request = fixtures::batch_tile_request(&["NDVI", "EVI", "SAVI"], "2024-05-03");

    let result = tiles(&mock).batch(&request).await.unwrap();

    let names: Vec<VegetationIndex> = result.layers.iter().map(|l| l.index_name).collect();
    assert_eq!(
        names,
        vec![
            VegetationIndex::Ndvi,
            VegetationIndex::Evi,
            VegetationIndex::Savi
        ]
    );
    assert_eq!(result.date, fixtures::date("2024-05-03"));
    assert_eq!(result.sensor, SensorGroup::Multispectral);
    assert!(result.elapsed_ms >= 30, "elapsed {}", result.elapsed_ms);
    assert_eq!(mock.tile_calls(), 3);
}

#[tokio::test]
async fn test_batch_drops_failed_layers() {
    let mock = Arc::new(
        scripted(SensorGroup::Multispectral, "2024-05-03").with_tile_failure("EVI"),
    );
    let request = fixtures::batch_tile_request(&["NDVI", "EVI", "SAVI"], "2024-05-03");

    let result = tiles(&mock).batch(&request).await.unwrap();

    let names: Vec<VegetationIndex> = result.layers.iter().map(|l| l.index_name).collect();
    assert_eq!(names, vec![VegetationIndex::Ndvi, VegetationIndex::Savi]);
}

#[tokio::test]
async fn test_batch_mixes_measured_and_true_color() {
    let mock = Arc::new(scripted(SensorGroup::Multispectral, "2024-05-03"));
    let request = fixtures::batch_tile_request(&["NDVI", "RGB"], "2024-05-03");

    let result = tiles(&mock).batch(&request).await.unwrap();

    assert_eq!(result.layers.len(), 2);
    assert_eq!(result.layers[1].index_name, VegetationIndex::TrueColor);
    assert_eq!(result.layers[1].layer_url, "https://tiles.test/RGB/{z}/{x}/{y}");
}

#[tokio::test]
async fn test_batch_without_scenes_is_not_found() {
    let mock = Arc::new(MockImagery::new());
    let request = fixtures::batch_tile_request(&["NDVI"], "2024-05-03");

    let err = tiles(&mock).batch(&request).await.unwrap_err();
    assert_eq!(err.http_status_code(), 404);
}

// ============================================================
// Pixel sampling
// ============================================================

#[tokio::test]
async fn test_pixel_rounds_and_omits_masked_indices() {
    let mut values = fixtures::band_values(&[("NDVI", 0.43219)]);
    values.insert("EVI", None);
    let mock = Arc::new(MockImagery::new().with_scene(
        SensorGroup::Multispectral,
        "2024-05-03",
        values,
    ));
    let request = fixtures::pixel_request(&["NDVI", "EVI"], "2024-05-03");

    let sample = sample_pixel(mock.as_ref(), &request).await.unwrap();

    assert_eq!(sample.lat, 52.005);
    assert_eq!(sample.lng, 21.005);
    assert_eq!(sample.date, fixtures::date("2024-05-03"));
    assert_eq!(sample.values.len(), 1);
    assert_eq!(sample.values[&VegetationIndex::Ndvi], 0.4322);
    assert_eq!(mock.reduce_calls(), 1);
}

#[tokio::test]
async fn test_pixel_without_scenes_is_not_found() {
    let mock = Arc::new(MockImagery::new());
    let request = fixtures::pixel_request(&["NDVI"], "2024-05-03");

    let err = sample_pixel(mock.as_ref(), &request).await.unwrap_err();
    assert!(matches!(err, BiomassError::NoImagery(_)));
    assert_eq!(mock.reduce_calls(), 0);
}
