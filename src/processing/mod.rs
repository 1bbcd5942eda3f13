// src/processing/mod.rs
//! Amplitude reconstruction: estimators and error statistics

pub mod filters;
pub mod statistics;

pub use filters::{
    check_feasibility, Estimator, FilterOutput, FilterSpec, LeastSquares, Of2, SolutionStatus,
    WeightVector,
};
pub use statistics::*;
