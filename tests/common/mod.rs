//! Shared test utilities for statescope
//!
//! This module provides common helpers for integration tests:
//! - Message log fixtures in both on-disk forms
//! - A transition registry matching the fixtures

#![allow(dead_code)]

pub mod fixtures;
