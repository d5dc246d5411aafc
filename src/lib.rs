//! Food Delivery Simulation Library
//!
//! A discrete-tick simulation of restaurant delivery fleets, scored by
//! pluggable raters.

pub mod simulation;
