//! Integration Tests Module
//!
//! End-to-end tests for the research engine: frame reassembly under
//! arbitrary byte splits, streaming into the transcript, progress unlock,
//! and thesis finalization against an in-memory database.

// Shared scripted advisor backend
mod support;

// Frame decoder reassembly properties
mod frame_decoder_test;

// Conversation flow, progress, and finalization tests
mod research_flow_test;
