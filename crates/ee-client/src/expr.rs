//! Lazy image expression graph.
//!
//! [`ImageExpr`] describes a server-side image computation without touching
//! any pixels locally. Expressions start from a [`ImageExpr::Composite`] over
//! a [`SceneQuery`] (or from [`ImageExpr::Scene`] inside a per-scene
//! transform) and are refined with band selection, arithmetic, masking and
//! renaming. The graph serializes to the JSON the remote service evaluates.
//!
//! Builder methods borrow their receiver and clone, so a composite can be
//! reused as the base of several derived bands without ceremony.

use biomass_common::geometry::Geometry;
use serde::{Deserialize, Serialize};

use crate::query::SceneQuery;

/// How a composite collapses the scenes matched by its query into one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompositeMode {
    /// Most recent valid pixel wins.
    Mosaic,
    /// Per-pixel median across scenes.
    Median,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Eq,
    Lt,
    Gt,
}

/// Region statistic embeddable as a scalar image node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatKind {
    Min,
    Max,
}

impl StatKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            StatKind::Min => "min",
            StatKind::Max => "max",
        }
    }
}

/// One node of a server-side image computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum ImageExpr {
    /// The current input scene inside a composite's per-scene transform.
    Scene,

    /// Single-band constant image. The band is named `constant`.
    Constant { value: f64 },

    /// Collapse the scenes matched by `query` into one image, optionally
    /// applying `scene_transform` to each scene first ([`ImageExpr::Scene`]
    /// refers to the scene being transformed).
    Composite {
        query: SceneQuery,
        mode: CompositeMode,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        scene_transform: Option<Box<ImageExpr>>,
    },

    /// Keep a single band.
    Select { source: Box<ImageExpr>, band: String },

    /// Keep the named bands, in the given order.
    SelectBands {
        source: Box<ImageExpr>,
        bands: Vec<String>,
    },

    /// Per-pixel binary arithmetic between two single-band images. The
    /// result keeps the left operand's band name; a masked pixel on either
    /// side masks the result.
    Arith {
        op: ArithOp,
        lhs: Box<ImageExpr>,
        rhs: Box<ImageExpr>,
    },

    /// Per-pixel comparison producing 1 where it holds and 0 elsewhere.
    Compare {
        op: CompareOp,
        lhs: Box<ImageExpr>,
        rhs: Box<ImageExpr>,
    },

    /// Bitwise AND of an integer-valued band against a constant mask.
    BitAnd { source: Box<ImageExpr>, mask: u32 },

    /// `(a - b) / (a + b)` over the two named bands; the result band is
    /// named `nd`.
    NormalizedDifference {
        source: Box<ImageExpr>,
        bands: [String; 2],
    },

    /// Apply `value * factor + offset` to every band whose name starts with
    /// `prefix`; other bands pass through untouched.
    ScaleBands {
        source: Box<ImageExpr>,
        prefix: String,
        factor: f64,
        offset: f64,
    },

    /// Mask out pixels where `mask` is 0 or itself masked.
    UpdateMask {
        source: Box<ImageExpr>,
        mask: Box<ImageExpr>,
    },

    /// Validity image: 1 where the source pixel carries data, 0 where it is
    /// masked. The result itself is unmasked everywhere, so its regional
    /// mean is the fraction of valid pixels.
    Mask { source: Box<ImageExpr> },

    /// Rename a single-band image.
    Rename { source: Box<ImageExpr>, name: String },

    /// Restrict the image footprint to a geometry.
    Clip {
        source: Box<ImageExpr>,
        geometry: Geometry,
    },

    /// Stack the bands of several images into one image, in order.
    Cat { sources: Vec<ImageExpr> },

    /// Scalar image holding a regional statistic of one band of `source`,
    /// computed server-side at `scale` meters. The band is named
    /// `{band}_{min|max}`. Embedding the statistic keeps derived expressions
    /// to a single remote evaluation.
    RegionStat {
        source: Box<ImageExpr>,
        band: String,
        stat: StatKind,
        geometry: Geometry,
        scale: f64,
    },
}

impl ImageExpr {
    pub fn scene() -> Self {
        ImageExpr::Scene
    }

    pub fn constant(value: f64) -> Self {
        ImageExpr::Constant { value }
    }

    pub fn composite(query: SceneQuery, mode: CompositeMode) -> Self {
        ImageExpr::Composite {
            query,
            mode,
            scene_transform: None,
        }
    }

    pub fn composite_with(query: SceneQuery, mode: CompositeMode, scene_transform: ImageExpr) -> Self {
        ImageExpr::Composite {
            query,
            mode,
            scene_transform: Some(Box::new(scene_transform)),
        }
    }

    pub fn cat(sources: Vec<ImageExpr>) -> Self {
        ImageExpr::Cat { sources }
    }

    pub fn select(&self, band: &str) -> Self {
        ImageExpr::Select {
            source: Box::new(self.clone()),
            band: band.to_string(),
        }
    }

    pub fn select_bands(&self, bands: &[&str]) -> Self {
        ImageExpr::SelectBands {
            source: Box::new(self.clone()),
            bands: bands.iter().map(|b| b.to_string()).collect(),
        }
    }

    fn arith(&self, op: ArithOp, rhs: impl Into<ImageExpr>) -> Self {
        ImageExpr::Arith {
            op,
            lhs: Box::new(self.clone()),
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn add(&self, rhs: impl Into<ImageExpr>) -> Self {
        self.arith(ArithOp::Add, rhs)
    }

    pub fn sub(&self, rhs: impl Into<ImageExpr>) -> Self {
        self.arith(ArithOp::Sub, rhs)
    }

    pub fn mul(&self, rhs: impl Into<ImageExpr>) -> Self {
        self.arith(ArithOp::Mul, rhs)
    }

    pub fn div(&self, rhs: impl Into<ImageExpr>) -> Self {
        self.arith(ArithOp::Div, rhs)
    }

    pub fn max(&self, rhs: impl Into<ImageExpr>) -> Self {
        self.arith(ArithOp::Max, rhs)
    }

    pub fn and(&self, rhs: impl Into<ImageExpr>) -> Self {
        self.arith(ArithOp::And, rhs)
    }

    pub fn or(&self, rhs: impl Into<ImageExpr>) -> Self {
        self.arith(ArithOp::Or, rhs)
    }

    fn compare(&self, op: CompareOp, rhs: impl Into<ImageExpr>) -> Self {
        ImageExpr::Compare {
            op,
            lhs: Box::new(self.clone()),
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn eq(&self, rhs: impl Into<ImageExpr>) -> Self {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn lt(&self, rhs: impl Into<ImageExpr>) -> Self {
        self.compare(CompareOp::Lt, rhs)
    }

    pub fn gt(&self, rhs: impl Into<ImageExpr>) -> Self {
        self.compare(CompareOp::Gt, rhs)
    }

    pub fn bitwise_and(&self, mask: u32) -> Self {
        ImageExpr::BitAnd {
            source: Box::new(self.clone()),
            mask,
        }
    }

    pub fn normalized_difference(&self, first: &str, second: &str) -> Self {
        ImageExpr::NormalizedDifference {
            source: Box::new(self.clone()),
            bands: [first.to_string(), second.to_string()],
        }
    }

    pub fn scale_bands(&self, prefix: &str, factor: f64, offset: f64) -> Self {
        ImageExpr::ScaleBands {
            source: Box::new(self.clone()),
            prefix: prefix.to_string(),
            factor,
            offset,
        }
    }

    pub fn update_mask(&self, mask: ImageExpr) -> Self {
        ImageExpr::UpdateMask {
            source: Box::new(self.clone()),
            mask: Box::new(mask),
        }
    }

    pub fn mask(&self) -> Self {
        ImageExpr::Mask {
            source: Box::new(self.clone()),
        }
    }

    pub fn rename(&self, name: &str) -> Self {
        ImageExpr::Rename {
            source: Box::new(self.clone()),
            name: name.to_string(),
        }
    }

    pub fn clip(&self, geometry: &Geometry) -> Self {
        ImageExpr::Clip {
            source: Box::new(self.clone()),
            geometry: geometry.clone(),
        }
    }

    pub fn region_stat(&self, band: &str, stat: StatKind, geometry: &Geometry, scale: f64) -> Self {
        ImageExpr::RegionStat {
            source: Box::new(self.clone()),
            band: band.to_string(),
            stat,
            geometry: geometry.clone(),
            scale,
        }
    }

    /// First scene query reachable from this expression, walking sources
    /// depth-first. Composites are where pixels come from, so this is the
    /// query a reduction over the expression will ultimately read.
    pub fn scene_query(&self) -> Option<&SceneQuery> {
        match self {
            ImageExpr::Scene | ImageExpr::Constant { .. } => None,
            ImageExpr::Composite { query, .. } => Some(query),
            ImageExpr::Select { source, .. }
            | ImageExpr::SelectBands { source, .. }
            | ImageExpr::BitAnd { source, .. }
            | ImageExpr::NormalizedDifference { source, .. }
            | ImageExpr::ScaleBands { source, .. }
            | ImageExpr::Mask { source }
            | ImageExpr::Rename { source, .. }
            | ImageExpr::Clip { source, .. }
            | ImageExpr::RegionStat { source, .. } => source.scene_query(),
            ImageExpr::Arith { lhs, rhs, .. } | ImageExpr::Compare { lhs, rhs, .. } => {
                lhs.scene_query().or_else(|| rhs.scene_query())
            }
            ImageExpr::UpdateMask { source, mask } => {
                source.scene_query().or_else(|| mask.scene_query())
            }
            ImageExpr::Cat { sources } => sources.iter().find_map(|s| s.scene_query()),
        }
    }
}

impl From<f64> for ImageExpr {
    fn from(value: f64) -> Self {
        ImageExpr::Constant { value }
    }
}

impl From<&ImageExpr> for ImageExpr {
    fn from(expr: &ImageExpr) -> Self {
        expr.clone()
    }
}
