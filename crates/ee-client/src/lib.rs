//! Client for the remote imagery-analytics service.
//!
//! The service evaluates lazily-built image expressions ([`expr::ImageExpr`])
//! against satellite scene collections. Nothing is fetched while an expression
//! is composed; pixels are only touched remotely when the expression is posted
//! through one of the [`service::ImageryService`] operations. [`eval`] holds a
//! scalar reference evaluator for the expression semantics so formula logic can
//! be tested without a live endpoint.

pub mod auth;
pub mod error;
pub mod eval;
pub mod expr;
pub mod query;
pub mod reduce;
pub mod rest;
pub mod service;
pub mod vis;

pub use error::{EeError, EeResult};
pub use expr::{ArithOp, CompareOp, CompositeMode, ImageExpr, StatKind};
pub use query::{CloudFilter, SceneQuery};
pub use reduce::{BandValues, Reducer, RegionReduction};
pub use rest::EeRestClient;
pub use service::ImageryService;
pub use vis::VisParams;
