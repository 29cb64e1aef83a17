// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Entry Point
//!
//! This test suite uses proptest to check properties of interval
//! reconciliation and validation that must hold for all inputs.

mod property;
