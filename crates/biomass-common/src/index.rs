//! The spectral index registry.
//!
//! Every index the service can compute is a variant of [`VegetationIndex`];
//! its sensor group, persisted column name and visualization parameters are
//! resolved at compile time rather than through string-keyed tables. The
//! band formulas themselves live with the imagery expression builders in
//! the analysis crate.

use serde::{Deserialize, Serialize};

/// Sensor group an index is derived from.
///
/// Serializes as the sensor label used in time-series payloads and in the
/// `sensor` column of persisted measurements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SensorGroup {
    /// Sentinel-2 L2A surface reflectance (10 m bands).
    #[serde(rename = "Sentinel-2")]
    Multispectral,

    /// Landsat 8/9 Collection 2 Level-2 (30 m bands, thermal).
    #[serde(rename = "Landsat 8/9")]
    Thermal,
}

impl SensorGroup {
    /// Short label used in time-series entries and storage rows.
    pub fn label(&self) -> &'static str {
        match self {
            SensorGroup::Multispectral => "Sentinel-2",
            SensorGroup::Thermal => "Landsat 8/9",
        }
    }

    /// Long label used in response metadata.
    pub fn long_label(&self) -> &'static str {
        match self {
            SensorGroup::Multispectral => "Sentinel-2 L2A",
            SensorGroup::Thermal => "Landsat 8/9 C2L2",
        }
    }

    /// Native ground sample distance in meters.
    pub fn gsd(&self) -> f64 {
        match self {
            SensorGroup::Multispectral => 10.0,
            SensorGroup::Thermal => 30.0,
        }
    }

    /// Parse a request's sensor hint (used to disambiguate true-color).
    pub fn parse_hint(hint: &str) -> Option<Self> {
        match hint.to_ascii_lowercase().as_str() {
            "multispectral" | "sentinel-2" | "sentinel2" | "s2" => {
                Some(SensorGroup::Multispectral)
            }
            "thermal" | "landsat" | "landsat 8/9" | "landsat8/9" => Some(SensorGroup::Thermal),
            _ => None,
        }
    }
}

impl std::fmt::Display for SensorGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A spectral index the service knows how to compute or visualize.
///
/// Serializes as the public index name (`"NDVI"`, `"CIre"`, ...), so maps
/// keyed by `VegetationIndex` produce the same JSON objects as the
/// string-keyed payloads of the API.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum VegetationIndex {
    #[serde(rename = "NDVI")]
    Ndvi,
    #[serde(rename = "NDRE")]
    Ndre,
    #[serde(rename = "GNDVI")]
    Gndvi,
    #[serde(rename = "EVI")]
    Evi,
    #[serde(rename = "SAVI")]
    Savi,
    #[serde(rename = "CIre")]
    Cire,
    #[serde(rename = "MTCI")]
    Mtci,
    #[serde(rename = "IRECI")]
    Ireci,
    #[serde(rename = "NDMI")]
    Ndmi,
    #[serde(rename = "NMDI")]
    Nmdi,
    #[serde(rename = "LST")]
    Lst,
    #[serde(rename = "VSWI")]
    Vswi,
    #[serde(rename = "TVDI")]
    Tvdi,
    #[serde(rename = "TCI")]
    Tci,
    #[serde(rename = "VHI")]
    Vhi,
    /// True-color composite, visualization only.
    #[serde(rename = "RGB")]
    TrueColor,
}

/// Indices computed when a request names none.
pub const DEFAULT_INDICES: [VegetationIndex; 5] = [
    VegetationIndex::Ndvi,
    VegetationIndex::Gndvi,
    VegetationIndex::Evi,
    VegetationIndex::Savi,
    VegetationIndex::Ndre,
];

impl VegetationIndex {
    /// Every index with a measured value (everything except true-color).
    pub const MEASURED: [VegetationIndex; 15] = [
        VegetationIndex::Ndvi,
        VegetationIndex::Ndre,
        VegetationIndex::Gndvi,
        VegetationIndex::Evi,
        VegetationIndex::Savi,
        VegetationIndex::Cire,
        VegetationIndex::Mtci,
        VegetationIndex::Ireci,
        VegetationIndex::Ndmi,
        VegetationIndex::Nmdi,
        VegetationIndex::Lst,
        VegetationIndex::Vswi,
        VegetationIndex::Tvdi,
        VegetationIndex::Tci,
        VegetationIndex::Vhi,
    ];

    /// Public name used in request/response payloads.
    pub fn name(&self) -> &'static str {
        match self {
            VegetationIndex::Ndvi => "NDVI",
            VegetationIndex::Ndre => "NDRE",
            VegetationIndex::Gndvi => "GNDVI",
            VegetationIndex::Evi => "EVI",
            VegetationIndex::Savi => "SAVI",
            VegetationIndex::Cire => "CIre",
            VegetationIndex::Mtci => "MTCI",
            VegetationIndex::Ireci => "IRECI",
            VegetationIndex::Ndmi => "NDMI",
            VegetationIndex::Nmdi => "NMDI",
            VegetationIndex::Lst => "LST",
            VegetationIndex::Vswi => "VSWI",
            VegetationIndex::Tvdi => "TVDI",
            VegetationIndex::Tci => "TCI",
            VegetationIndex::Vhi => "VHI",
            VegetationIndex::TrueColor => "RGB",
        }
    }

    /// Parse the public index name. Names are case-sensitive.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "NDVI" => Some(VegetationIndex::Ndvi),
            "NDRE" => Some(VegetationIndex::Ndre),
            "GNDVI" => Some(VegetationIndex::Gndvi),
            "EVI" => Some(VegetationIndex::Evi),
            "SAVI" => Some(VegetationIndex::Savi),
            "CIre" => Some(VegetationIndex::Cire),
            "MTCI" => Some(VegetationIndex::Mtci),
            "IRECI" => Some(VegetationIndex::Ireci),
            "NDMI" => Some(VegetationIndex::Ndmi),
            "NMDI" => Some(VegetationIndex::Nmdi),
            "LST" => Some(VegetationIndex::Lst),
            "VSWI" => Some(VegetationIndex::Vswi),
            "TVDI" => Some(VegetationIndex::Tvdi),
            "TCI" => Some(VegetationIndex::Tci),
            "VHI" => Some(VegetationIndex::Vhi),
            "RGB" => Some(VegetationIndex::TrueColor),
            _ => None,
        }
    }

    /// Sensor group the index is computed from.
    ///
    /// True-color defaults to multispectral; a request's sensor hint may
    /// override that at the visualization layer.
    pub fn sensor_group(&self) -> SensorGroup {
        match self {
            VegetationIndex::Lst
            | VegetationIndex::Vswi
            | VegetationIndex::Tvdi
            | VegetationIndex::Tci
            | VegetationIndex::Vhi => SensorGroup::Thermal,
            _ => SensorGroup::Multispectral,
        }
    }

    /// Whether the index produces a measured time-series value.
    pub fn is_measured(&self) -> bool {
        !matches!(self, VegetationIndex::TrueColor)
    }

    /// Database column name for the measured value.
    pub fn column_name(&self) -> Option<&'static str> {
        match self {
            VegetationIndex::Ndvi => Some("ndvi"),
            VegetationIndex::Ndre => Some("ndre"),
            VegetationIndex::Gndvi => Some("gndvi"),
            VegetationIndex::Evi => Some("evi"),
            VegetationIndex::Savi => Some("savi"),
            VegetationIndex::Cire => Some("cire"),
            VegetationIndex::Mtci => Some("mtci"),
            VegetationIndex::Ireci => Some("ireci"),
            VegetationIndex::Ndmi => Some("ndmi"),
            VegetationIndex::Nmdi => Some("nmdi"),
            VegetationIndex::Lst => Some("lst"),
            VegetationIndex::Vswi => Some("vswi"),
            VegetationIndex::Tvdi => Some("tvdi"),
            VegetationIndex::Tci => Some("tci"),
            VegetationIndex::Vhi => Some("vhi"),
            VegetationIndex::TrueColor => None,
        }
    }

    /// Visualization domain and palette.
    ///
    /// True-color has no palette; its RGB bands are stretched over the
    /// returned domain instead.
    pub fn vis_spec(&self) -> VisSpec {
        match self {
            VegetationIndex::Ndvi => VisSpec::new(-0.2, 1.0, NDVI_PALETTE),
            VegetationIndex::Ndre => VisSpec::new(-0.2, 0.8, NDRE_PALETTE),
            VegetationIndex::Gndvi => VisSpec::new(-0.2, 0.9, GNDVI_PALETTE),
            VegetationIndex::Evi => VisSpec::new(-0.2, 0.8, EVI_PALETTE),
            VegetationIndex::Savi => VisSpec::new(-0.2, 0.8, SAVI_PALETTE),
            VegetationIndex::Cire => VisSpec::new(0.0, 10.0, CIRE_PALETTE),
            VegetationIndex::Mtci => VisSpec::new(0.0, 6.0, MTCI_PALETTE),
            VegetationIndex::Ireci => VisSpec::new(0.0, 3.0, IRECI_PALETTE),
            VegetationIndex::Ndmi => VisSpec::new(-0.8, 0.8, NDMI_PALETTE),
            VegetationIndex::Nmdi => VisSpec::new(0.0, 1.0, NMDI_PALETTE),
            VegetationIndex::Lst => VisSpec::new(0.0, 45.0, LST_PALETTE),
            VegetationIndex::Vswi => VisSpec::new(0.0, 0.06, VSWI_PALETTE),
            VegetationIndex::Tvdi => VisSpec::new(0.0, 1.0, TVDI_PALETTE),
            VegetationIndex::Tci => VisSpec::new(0.0, 100.0, HEALTH_PALETTE),
            VegetationIndex::Vhi => VisSpec::new(0.0, 100.0, HEALTH_PALETTE),
            VegetationIndex::TrueColor => VisSpec::new(0.0, 3000.0, &[]),
        }
    }
}

impl std::fmt::Display for VegetationIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Partition indices by sensor group, preserving request order.
pub fn partition_by_sensor(
    indices: &[VegetationIndex],
) -> (Vec<VegetationIndex>, Vec<VegetationIndex>) {
    indices
        .iter()
        .copied()
        .partition(|i| i.sensor_group() == SensorGroup::Multispectral)
}

/// Visualization domain and palette for one index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisSpec {
    pub min: f64,
    pub max: f64,
    /// Hex colors without a leading `#`, low to high.
    pub palette: &'static [&'static str],
}

impl VisSpec {
    const fn new(min: f64, max: f64, palette: &'static [&'static str]) -> Self {
        VisSpec { min, max, palette }
    }
}

const NDVI_PALETTE: &[&str] = &[
    "a50026", "d73027", "f46d43", "fdae61", "fee08b", "d9ef8b", "a6d96a", "66bd63", "1a9850",
    "006837",
];
const NDRE_PALETTE: &[&str] = &[
    "440154", "482878", "3e4989", "31688e", "26828e", "1f9e89", "35b779", "6ece58", "b5de2b",
    "fde725",
];
const GNDVI_PALETTE: &[&str] = &["a50026", "f46d43", "fee08b", "addd8e", "66bd63", "006837"];
const EVI_PALETTE: &[&str] = &[
    "CE7E45", "DF923D", "F1B555", "FCD163", "99B718", "74A901", "66A000", "529400", "3E8601",
    "207401",
];
const SAVI_PALETTE: &[&str] = &[
    "8c510a", "bf812d", "dfc27d", "f6e8c3", "c7eae5", "80cdc1", "35978f", "01665e",
];
const CIRE_PALETTE: &[&str] = &[
    "ffffcc", "d9f0a3", "addd8e", "78c679", "41ab5d", "238443", "005a32",
];
const MTCI_PALETTE: &[&str] = &[
    "ffffb2", "fed976", "feb24c", "fd8d3c", "fc4e2a", "e31a1c", "b10026",
];
const IRECI_PALETTE: &[&str] = &[
    "fef0d9", "fdd49e", "fdbb84", "fc8d59", "ef6548", "d7301f", "990000",
];
const NDMI_PALETTE: &[&str] = &[
    "8c510a", "d8b365", "f6e8c3", "c7eae5", "5ab4ac", "2166ac", "053061",
];
const NMDI_PALETTE: &[&str] = &[
    "d73027", "fc8d59", "fee090", "ffffbf", "e0f3f8", "91bfdb", "4575b4",
];
const LST_PALETTE: &[&str] = &[
    "08306b", "2171b5", "6baed6", "bdd7e7", "ffffcc", "fed976", "fd8d3c", "e31a1c", "800026",
];
const VSWI_PALETTE: &[&str] = &["d73027", "fc8d59", "fee08b", "d9ef8b", "66bd63", "1a9850"];
const TVDI_PALETTE: &[&str] = &["2166ac", "67a9cf", "d1e5f0", "fddbc7", "ef8a62", "b2182b"];
const HEALTH_PALETTE: &[&str] = &["d73027", "fc8d59", "fee08b", "d9ef8b", "66bd63", "1a9850"];
