//! Household viewing insights: crowd-sourced availability confidence, explainable
//! recommendations and value-based subscription guidance.

pub mod api;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
