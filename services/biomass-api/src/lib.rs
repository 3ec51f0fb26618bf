//! Biomass API service library.
//!
//! HTTP server exposing field biomass analysis: vegetation and thermal
//! index time series, stored measurement history, visualization tile
//! layers, and pixel sampling.

pub mod handlers;
pub mod state;
