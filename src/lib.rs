//! Outreach Relay
//!
//! Backend for a lead-generation outreach console. Relays scrape outcome
//! callbacks from an external automation platform into a Postgres store,
//! tracks batches of submitted websites, and drives the failed-scrape
//! retry/reconciliation workflow.

pub mod app_state;
pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;
