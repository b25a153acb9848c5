//! # u-pdptw
//!
//! Robot pickup-and-delivery planning with delivery time windows, robot
//! capacities and optional orders, solved by guided local search and scored
//! on adherence, carried-time efficiency and distance.
//!
//! ## Modules
//!
//! - [`models`] — Domain types (Robot, Order, node indexing, Problem, Solution)
//! - [`clock`] — Clock encoding ↔ elapsed planning minutes
//! - [`distance`] — Node×node distance and duration matrices
//! - [`builder`] — Robots and orders to a normalized Problem
//! - [`evaluation`] — Capacity/time dimensions and the 3-axis cost
//! - [`local_search`] — Pair insert, remove, relocate, exchange and 2-opt moves
//! - [`search`] — Guided local search engine
//! - [`extract`] — Raw depot-to-depot paths to timed routes
//! - [`postprocess`] — Carried-time polishing and late-order recovery
//! - [`planner`] — End-to-end pipeline with a two-strategy portfolio
//! - [`io`] — JSON question/answer framing
//! - [`config`] — Planner configuration (TOML)
//! - [`error`] — Error types

pub mod builder;
pub mod clock;
pub mod config;
pub mod distance;
pub mod error;
pub mod evaluation;
pub mod extract;
pub mod io;
pub mod local_search;
pub mod models;
pub mod planner;
pub mod postprocess;
pub mod search;
