//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Gamepad detection and connection via evdev
//! - Reading axis extrema for normalization
//! - Translating raw events into the control vocabulary
//! - Rumble feedback

pub mod gamepad;
pub mod haptics;
pub mod mapper;
