//! Fundlinker - seller attribution and payment reconciliation for fundraising campaigns
//!
//! Sellers self-register for a campaign through a public link and receive a
//! personal selling link; every order is attributed to at most one seller;
//! payments are collected online or offline (cash / check) and reconciled per
//! campaign.
//!
//! # Architecture
//! - `storage`: domain models and the SeaORM backend
//! - `services`: identity, registration, order entry, payments, reconciliation
//! - `api`: HTTP services and middleware
//! - `interfaces`: command-line interface
//! - `config`: configuration management
//! - `runtime`: application lifecycle and execution modes
//! - `system`: logging

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
