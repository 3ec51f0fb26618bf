//! Scalar reference evaluator for image expressions.
//!
//! Evaluates an [`ImageExpr`] at a single synthetic pixel: composites
//! collapse to the one scene described by a [`PixelEnv`], and embedded
//! region statistics are looked up from scripted values. This pins down the
//! per-pixel semantics of the expression graph (band naming, mask
//! propagation, scaling) without a remote service, and is what the index
//! formula tests run against.

use std::collections::BTreeMap;

use crate::error::{EeError, EeResult};
use crate::expr::{ArithOp, CompareOp, ImageExpr, StatKind};

/// Band values of an evaluated pixel; `None` marks a masked band.
pub type PixelBands = BTreeMap<String, Option<f64>>;

/// The synthetic scene a pixel is evaluated against.
#[derive(Debug, Clone, Default)]
pub struct PixelEnv {
    bands: PixelBands,
    stats: BTreeMap<(String, StatKind), f64>,
}

impl PixelEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_band(mut self, name: &str, value: f64) -> Self {
        self.bands.insert(name.to_string(), Some(value));
        self
    }

    pub fn with_masked_band(mut self, name: &str) -> Self {
        self.bands.insert(name.to_string(), None);
        self
    }

    /// Scripted result for a [`ImageExpr::RegionStat`] node over `band`.
    pub fn with_stat(mut self, band: &str, stat: StatKind, value: f64) -> Self {
        self.stats.insert((band.to_string(), stat), value);
        self
    }
}

/// Evaluate `expr` at the pixel described by `env`.
pub fn evaluate(expr: &ImageExpr, env: &PixelEnv) -> EeResult<PixelBands> {
    match expr {
        ImageExpr::Scene => Ok(env.bands.clone()),

        ImageExpr::Constant { value } => {
            Ok(BTreeMap::from([("constant".to_string(), Some(*value))]))
        }

        ImageExpr::Composite { scene_transform, .. } => match scene_transform {
            Some(transform) => evaluate(transform, env),
            None => Ok(env.bands.clone()),
        },

        ImageExpr::Select { source, band } => {
            let bands = evaluate(source, env)?;
            let value = bands
                .get(band)
                .copied()
                .ok_or_else(|| EeError::Expression(format!("unknown band: {}", band)))?;
            Ok(BTreeMap::from([(band.clone(), value)]))
        }

        ImageExpr::SelectBands { source, bands } => {
            let evaluated = evaluate(source, env)?;
            let mut out = BTreeMap::new();
            for band in bands {
                let value = evaluated
                    .get(band)
                    .copied()
                    .ok_or_else(|| EeError::Expression(format!("unknown band: {}", band)))?;
                out.insert(band.clone(), value);
            }
            Ok(out)
        }

        ImageExpr::Arith { op, lhs, rhs } => {
            let (name, left) = single(evaluate(lhs, env)?)?;
            let (_, right) = single(evaluate(rhs, env)?)?;
            let value = match (left, right) {
                (Some(a), Some(b)) => Some(apply_arith(*op, a, b)),
                _ => None,
            };
            Ok(BTreeMap::from([(name, value)]))
        }

        ImageExpr::Compare { op, lhs, rhs } => {
            let (name, left) = single(evaluate(lhs, env)?)?;
            let (_, right) = single(evaluate(rhs, env)?)?;
            let value = match (left, right) {
                (Some(a), Some(b)) => Some(if apply_compare(*op, a, b) { 1.0 } else { 0.0 }),
                _ => None,
            };
            Ok(BTreeMap::from([(name, value)]))
        }

        ImageExpr::BitAnd { source, mask } => {
            let (name, value) = single(evaluate(source, env)?)?;
            let value = value.map(|v| ((v as u32) & mask) as f64);
            Ok(BTreeMap::from([(name, value)]))
        }

        ImageExpr::NormalizedDifference { source, bands } => {
            let evaluated = evaluate(source, env)?;
            let first = evaluated
                .get(&bands[0])
                .copied()
                .ok_or_else(|| EeError::Expression(format!("unknown band: {}", bands[0])))?;
            let second = evaluated
                .get(&bands[1])
                .copied()
                .ok_or_else(|| EeError::Expression(format!("unknown band: {}", bands[1])))?;
            let value = match (first, second) {
                (Some(a), Some(b)) => Some((a - b) / (a + b)),
                _ => None,
            };
            Ok(BTreeMap::from([("nd".to_string(), value)]))
        }

        ImageExpr::ScaleBands { source, prefix, factor, offset } => {
            let evaluated = evaluate(source, env)?;
            Ok(evaluated
                .into_iter()
                .map(|(name, value)| {
                    let scaled = if name.starts_with(prefix.as_str()) {
                        value.map(|v| v * factor + offset)
                    } else {
                        value
                    };
                    (name, scaled)
                })
                .collect())
        }

        ImageExpr::UpdateMask { source, mask } => {
            let evaluated = evaluate(source, env)?;
            let (_, mask_value) = single(evaluate(mask, env)?)?;
            let keep = matches!(mask_value, Some(v) if v != 0.0);
            if keep {
                Ok(evaluated)
            } else {
                Ok(evaluated.into_keys().map(|name| (name, None)).collect())
            }
        }

        ImageExpr::Mask { source } => {
            let evaluated = evaluate(source, env)?;
            Ok(evaluated
                .into_iter()
                .map(|(name, value)| (name, Some(if value.is_some() { 1.0 } else { 0.0 })))
                .collect())
        }

        ImageExpr::Rename { source, name } => {
            let (_, value) = single(evaluate(source, env)?)?;
            Ok(BTreeMap::from([(name.clone(), value)]))
        }

        ImageExpr::Clip { source, .. } => evaluate(source, env),

        ImageExpr::Cat { sources } => {
            let mut out = BTreeMap::new();
            for source in sources {
                out.extend(evaluate(source, env)?);
            }
            Ok(out)
        }

        ImageExpr::RegionStat { band, stat, .. } => {
            let value = env
                .stats
                .get(&(band.clone(), *stat))
                .copied()
                .ok_or_else(|| {
                    EeError::Expression(format!("no scripted {} statistic for band {}", stat.suffix(), band))
                })?;
            Ok(BTreeMap::from([(
                format!("{}_{}", band, stat.suffix()),
                Some(value),
            )]))
        }
    }
}

fn single(bands: PixelBands) -> EeResult<(String, Option<f64>)> {
    let count = bands.len();
    bands.into_iter().next().filter(|_| count == 1).ok_or_else(|| {
        EeError::Expression(format!("expected a single-band operand, got {} bands", count))
    })
}

fn apply_arith(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::Max => a.max(b),
        ArithOp::And => {
            if a != 0.0 && b != 0.0 {
                1.0
            } else {
                0.0
            }
        }
        ArithOp::Or => {
            if a != 0.0 || b != 0.0 {
                1.0
            } else {
                0.0
            }
        }
    }
}

fn apply_compare(op: CompareOp, a: f64, b: f64) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Lt => a < b,
        CompareOp::Gt => a > b,
    }
}
