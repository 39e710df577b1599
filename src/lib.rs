//! # RC Drive Library
//!
//! Drive a dual-motor, four-wheel-steered RC vehicle from an evdev gamepad on
//! a Raspberry Pi.
//!
//! This library provides the core functionality for turning gamepad sticks,
//! triggers and buttons into ESC pulse widths, servo angles and host actions.

pub mod actuator;
pub mod config;
pub mod control;
pub mod controller;
pub mod error;
pub mod host;
