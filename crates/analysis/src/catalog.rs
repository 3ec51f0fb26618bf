//! Index band expressions over a masked composite.
//!
//! [`MosaicContext`] wraps one composite for one sensor group and derives
//! per-index band expressions from it. Multispectral formulas work on raw
//! Sentinel-2 DN values (reflectance x 10000), which is why EVI and SAVI
//! carry scaled soil/denominator constants. Thermal formulas work on the
//! rescaled Landsat bands (reflectance and Kelvin) the gate's scene
//! transform produces, and the normalized thermal indices embed AOI min/max
//! statistics as scalar nodes so one remote evaluation covers everything.

use biomass_common::geometry::Geometry;
use biomass_common::index::{SensorGroup, VegetationIndex};
use ee_client::expr::{ImageExpr, StatKind};

/// Band name of the Landsat-derived NDVI the thermal indices share.
pub const THERMAL_NDVI_BAND: &str = "ndvi_l";
/// Band name of land surface temperature in Celsius.
pub const THERMAL_LST_BAND: &str = "lst_c";

/// Floor applied to min/max ranges before dividing, so a uniform AOI does
/// not blow up the normalized indices.
const RANGE_FLOOR: f64 = 0.001;

/// DN-domain constant corresponding to EVI's canonical `+1` term.
const EVI_CANOPY_TERM: f64 = 10_000.0;
/// DN-domain constant corresponding to SAVI's `L = 0.5` soil term.
const SAVI_SOIL_TERM: f64 = 5_000.0;

/// One composite plus everything needed to derive index bands from it.
pub struct MosaicContext {
    group: SensorGroup,
    mosaic: ImageExpr,
    thermal: Option<ThermalBands>,
}

/// Shared intermediate bands and AOI statistics for the thermal group.
struct ThermalBands {
    ndvi: ImageExpr,
    lst: ImageExpr,
    ndvi_min: ImageExpr,
    ndvi_range: ImageExpr,
    lst_min: ImageExpr,
    lst_max: ImageExpr,
    lst_range: ImageExpr,
}

impl ThermalBands {
    fn new(mosaic: &ImageExpr, aoi: &Geometry) -> Self {
        let ndvi = mosaic
            .normalized_difference("SR_B5", "SR_B4")
            .rename(THERMAL_NDVI_BAND);
        let lst = mosaic.select("ST_B10").sub(273.15).rename(THERMAL_LST_BAND);

        let stack = ImageExpr::cat(vec![ndvi.clone(), lst.clone()]);
        let scale = SensorGroup::Thermal.gsd();
        let ndvi_min = stack.region_stat(THERMAL_NDVI_BAND, StatKind::Min, aoi, scale);
        let ndvi_max = stack.region_stat(THERMAL_NDVI_BAND, StatKind::Max, aoi, scale);
        let lst_min = stack.region_stat(THERMAL_LST_BAND, StatKind::Min, aoi, scale);
        let lst_max = stack.region_stat(THERMAL_LST_BAND, StatKind::Max, aoi, scale);

        let ndvi_range = ndvi_max.sub(&ndvi_min).max(RANGE_FLOOR);
        let lst_range = lst_max.sub(&lst_min).max(RANGE_FLOOR);

        Self {
            ndvi,
            lst,
            ndvi_min,
            ndvi_range,
            lst_min,
            lst_max,
            lst_range,
        }
    }

    /// Vegetation condition index, 0-100 within the AOI.
    fn vci(&self) -> ImageExpr {
        self.ndvi.sub(&self.ndvi_min).div(&self.ndvi_range).mul(100.0)
    }

    /// Temperature condition index, 0-100 within the AOI (cool is healthy).
    fn tci(&self) -> ImageExpr {
        self.lst_max.sub(&self.lst).div(&self.lst_range).mul(100.0)
    }
}

impl MosaicContext {
    pub fn new(group: SensorGroup, mosaic: &ImageExpr, aoi: &Geometry) -> Self {
        let thermal = match group {
            SensorGroup::Thermal => Some(ThermalBands::new(mosaic, aoi)),
            SensorGroup::Multispectral => None,
        };
        Self {
            group,
            mosaic: mosaic.clone(),
            thermal,
        }
    }

    pub fn group(&self) -> SensorGroup {
        self.group
    }

    pub fn mosaic(&self) -> &ImageExpr {
        &self.mosaic
    }

    /// Band expression for one index, named after the index.
    ///
    /// `None` when the index has no measured band on this context's sensor
    /// group (including true-color, which is visualization-only).
    pub fn index_band(&self, index: VegetationIndex) -> Option<ImageExpr> {
        if !index.is_measured() || index.sensor_group() != self.group {
            return None;
        }
        let band = match index.sensor_group() {
            SensorGroup::Multispectral => self.multispectral_band(index)?,
            SensorGroup::Thermal => self.thermal_band(index)?,
        };
        Some(band.rename(index.name()))
    }

    fn multispectral_band(&self, index: VegetationIndex) -> Option<ImageExpr> {
        let mosaic = &self.mosaic;
        let band = match index {
            VegetationIndex::Ndvi => mosaic.normalized_difference("B8", "B4"),
            VegetationIndex::Ndre => mosaic.normalized_difference("B8", "B5"),
            VegetationIndex::Gndvi => mosaic.normalized_difference("B8", "B3"),
            VegetationIndex::Evi => {
                let nir = mosaic.select("B8");
                let red = mosaic.select("B4");
                let blue = mosaic.select("B2");
                let denom = nir
                    .add(red.mul(6.0))
                    .sub(blue.mul(7.5))
                    .add(EVI_CANOPY_TERM);
                nir.sub(&red).div(denom).mul(2.5)
            }
            VegetationIndex::Savi => {
                let nir = mosaic.select("B8");
                let red = mosaic.select("B4");
                nir.sub(&red).div(nir.add(&red).add(SAVI_SOIL_TERM)).mul(1.5)
            }
            VegetationIndex::Cire => mosaic.select("B7").div(mosaic.select("B5")).sub(1.0),
            VegetationIndex::Mtci => {
                let re1 = mosaic.select("B5");
                let re2 = mosaic.select("B6");
                let red = mosaic.select("B4");
                re2.sub(&re1).div(re1.sub(&red))
            }
            VegetationIndex::Ireci => {
                let re3 = mosaic.select("B7");
                let re2 = mosaic.select("B6");
                let re1 = mosaic.select("B5");
                let red = mosaic.select("B4");
                re3.sub(&red).mul(&re2).div(re1.mul(10_000.0))
            }
            VegetationIndex::Ndmi => mosaic.normalized_difference("B8", "B11"),
            VegetationIndex::Nmdi => {
                let nir = mosaic.select("B8");
                let swir_diff = mosaic.select("B11").sub(mosaic.select("B12"));
                nir.sub(&swir_diff).div(nir.add(&swir_diff))
            }
            _ => return None,
        };
        Some(band)
    }

    fn thermal_band(&self, index: VegetationIndex) -> Option<ImageExpr> {
        let t = self.thermal.as_ref()?;
        let band = match index {
            VegetationIndex::Lst => t.lst.clone(),
            VegetationIndex::Vswi => t.ndvi.div(&t.lst),
            VegetationIndex::Tvdi => t.lst.sub(&t.lst_min).div(&t.lst_range),
            VegetationIndex::Tci => t.tci(),
            VegetationIndex::Vhi => t.vci().mul(0.5).add(t.tci().mul(0.5)),
            _ => return None,
        };
        Some(band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ee_client::eval::{evaluate, PixelEnv};
    use test_utils::assert_approx_eq;

    fn square() -> Geometry {
        Geometry::polygon(vec![
            [21.0, 52.0],
            [21.01, 52.0],
            [21.01, 52.01],
            [21.0, 52.0],
        ])
    }

    fn multispectral_env() -> PixelEnv {
        PixelEnv::new()
            .with_band("B2", 500.0)
            .with_band("B3", 1000.0)
            .with_band("B4", 1000.0)
            .with_band("B5", 1200.0)
            .with_band("B6", 2400.0)
            .with_band("B7", 3000.0)
            .with_band("B8", 4000.0)
            .with_band("B11", 1500.0)
            .with_band("B12", 500.0)
    }

    fn sample(ctx: &MosaicContext, env: &PixelEnv, index: VegetationIndex) -> f64 {
        let expr = ctx.index_band(index).unwrap();
        evaluate(&expr, env)
            .unwrap()
            .get(index.name())
            .copied()
            .flatten()
            .unwrap()
    }

    #[test]
    fn test_multispectral_formulas() {
        let ctx = MosaicContext::new(SensorGroup::Multispectral, &ImageExpr::scene(), &square());
        let env = multispectral_env();

        // NDVI = (4000 - 1000) / (4000 + 1000)
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Ndvi), 0.6, 1e-12);
        // NDRE = (4000 - 1200) / (4000 + 1200)
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Ndre), 2800.0 / 5200.0, 1e-12);
        // GNDVI = (4000 - 1000) / (4000 + 1000)
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Gndvi), 0.6, 1e-12);
        // EVI = 2.5 * 3000 / (4000 + 6000 - 3750 + 10000)
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Evi), 7500.0 / 16250.0, 1e-12);
        // SAVI = 1.5 * 3000 / (4000 + 1000 + 5000)
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Savi), 0.45, 1e-12);
        // CIre = 3000 / 1200 - 1
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Cire), 1.5, 1e-12);
        // MTCI = (2400 - 1200) / (1200 - 1000)
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Mtci), 6.0, 1e-12);
        // IRECI = (3000 - 1000) * 2400 / (1200 * 10000)
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Ireci), 0.4, 1e-12);
        // NDMI = (4000 - 1500) / (4000 + 1500)
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Ndmi), 2500.0 / 5500.0, 1e-12);
        // NMDI = (4000 - 1000) / (4000 + 1000) with swir diff 1500 - 500
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Nmdi), 0.6, 1e-12);
    }

    fn thermal_env() -> PixelEnv {
        // Reflectance and Kelvin as the gate's scene transform leaves them.
        PixelEnv::new()
            .with_band("SR_B4", 0.13)
            .with_band("SR_B5", 0.27)
            .with_band("ST_B10", 298.15)
            .with_stat(THERMAL_NDVI_BAND, StatKind::Min, 0.1)
            .with_stat(THERMAL_NDVI_BAND, StatKind::Max, 0.6)
            .with_stat(THERMAL_LST_BAND, StatKind::Min, 10.0)
            .with_stat(THERMAL_LST_BAND, StatKind::Max, 40.0)
    }

    #[test]
    fn test_thermal_formulas() {
        let ctx = MosaicContext::new(SensorGroup::Thermal, &ImageExpr::scene(), &square());
        let env = thermal_env();

        // LST = 298.15 K - 273.15
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Lst), 25.0, 1e-9);
        // Pixel NDVI = (0.27 - 0.13) / (0.27 + 0.13) = 0.35
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Vswi), 0.35 / 25.0, 1e-9);
        // TVDI = (25 - 10) / 30
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Tvdi), 0.5, 1e-9);
        // TCI = 100 * (40 - 25) / 30
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Tci), 50.0, 1e-9);
        // VCI = 100 * (0.35 - 0.1) / 0.5 = 50, VHI = (50 + 50) / 2
        assert_approx_eq!(sample(&ctx, &env, VegetationIndex::Vhi), 50.0, 1e-9);
    }

    #[test]
    fn test_uniform_aoi_uses_range_floor() {
        let ctx = MosaicContext::new(SensorGroup::Thermal, &ImageExpr::scene(), &square());
        // Identical min and max: the range floor keeps TVDI finite.
        let env = PixelEnv::new()
            .with_band("SR_B4", 0.13)
            .with_band("SR_B5", 0.27)
            .with_band("ST_B10", 298.15)
            .with_stat(THERMAL_NDVI_BAND, StatKind::Min, 0.35)
            .with_stat(THERMAL_NDVI_BAND, StatKind::Max, 0.35)
            .with_stat(THERMAL_LST_BAND, StatKind::Min, 25.0)
            .with_stat(THERMAL_LST_BAND, StatKind::Max, 25.0);

        let tvdi = sample(&ctx, &env, VegetationIndex::Tvdi);
        assert!(tvdi.is_finite());
        // (25 - 25) / max(0, 0.001) = 0
        assert_approx_eq!(tvdi, 0.0, 1e-12);
    }

    #[test]
    fn test_index_band_rejects_wrong_group() {
        let ctx = MosaicContext::new(SensorGroup::Multispectral, &ImageExpr::scene(), &square());
        assert!(ctx.index_band(VegetationIndex::Lst).is_none());
        assert!(ctx.index_band(VegetationIndex::TrueColor).is_none());
        assert!(ctx.index_band(VegetationIndex::Ndvi).is_some());

        let thermal = MosaicContext::new(SensorGroup::Thermal, &ImageExpr::scene(), &square());
        assert!(thermal.index_band(VegetationIndex::Ndvi).is_none());
        assert!(thermal.index_band(VegetationIndex::Vhi).is_some());
    }

    #[test]
    fn test_bands_are_named_after_their_index() {
        let ctx = MosaicContext::new(SensorGroup::Multispectral, &ImageExpr::scene(), &square());
        let env = multispectral_env();
        for index in [VegetationIndex::Ndvi, VegetationIndex::Evi, VegetationIndex::Nmdi] {
            let expr = ctx.index_band(index).unwrap();
            let bands = evaluate(&expr, &env).unwrap();
            assert!(bands.contains_key(index.name()), "{}", index);
            assert_eq!(bands.len(), 1);
        }
    }
}
