//! Cofounder matching service: pairs startup CEOs with CTOs by embedding
//! similarity and explains each pairing.

pub mod advisor;
pub mod app;
pub mod auth;
pub mod completion;
pub mod config;
pub mod database;
pub mod embedding;
pub mod error;
pub mod matching;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod vector_store;
