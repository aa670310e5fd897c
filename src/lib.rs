//! Outreach Governor - request governance for prospecting pipelines
//!
//! This crate implements a thread-safe, multi-strategy rate limiter shared by
//! every outbound API call of an outreach pipeline (LLM, enrichment, scraping,
//! CRM and email), together with the validators that enforce data contracts
//! before and after those calls.

pub mod config;
pub mod error;
pub mod ratelimit;
pub mod validation;
