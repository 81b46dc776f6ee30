//! SnakeSafe - snake identification and snakebite help for Nepal.
//!
//! # Overview
//!
//! A small web service that
//!
//! - identifies a snake from a photo with a pretrained image classifier,
//! - lists the hospitals and volunteer rescuers nearest to a point, and
//! - collects help requests that operators review on a login-protected dashboard.
//!
//! # Modules
//!
//! - [`model`]: Data types for facilities, help requests, and operators
//! - [`geo`]: Haversine distance and nearest-facility ranking
//! - [`species`]: Static metadata for the species the model knows
//! - [`classifier`]: Image preprocessing and model invocation
//! - [`intake`]: Help request validation and persistence
//! - [`auth`]: Password hashing and session cookies
//! - [`storage`]: SQLite storage layer
//! - [`seed`]: Built-in facility directory and operator account
//! - [`views`]: Server-rendered pages
//! - [`api`]: HTTP API handlers
//! - [`config`]: Environment configuration
//! - [`error`]: Error taxonomy and HTTP mapping

pub mod api;
pub mod auth;
pub mod classifier;
pub mod config;
pub mod error;
pub mod geo;
pub mod intake;
pub mod model;
pub mod seed;
pub mod species;
pub mod storage;
pub mod views;
