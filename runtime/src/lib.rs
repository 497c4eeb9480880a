// Copyright 2026 Linkscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Linkscout: find the listing page for a construction material on a
//! commerce site, without an API.
//!
//! This library crate exposes the core modules for the binary and for
//! integration testing.

#![allow(clippy::new_without_default)]

pub mod acquisition;
pub mod cartography;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod progress;
pub mod renderer;
