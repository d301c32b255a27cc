//! Gantry Core
//!
//! Core types and abstractions for the Gantry runner autoscaler.
//!
//! This crate contains:
//! - Event types: GitHub `workflow_job` webhook payload models
//! - DTOs: response bodies shared between the server and its clients
//! - Provider traits: the runner-provider and credential-broker seams

pub mod dto;
pub mod event;
pub mod provider;
