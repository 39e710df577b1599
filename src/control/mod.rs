//! # Control Module
//!
//! The event-to-actuation core.
//!
//! This module handles:
//! - Normalizing raw stick and trigger samples
//! - Mixing stick deflection and trigger braking into ESC pulse widths
//! - Mixing steering with a stored trim
//! - Long-press detection for host actions
//! - The control loop that ties them together

pub mod control_loop;
pub mod drive;
pub mod hold;
pub mod normalize;
pub mod steering;
