// src/lib.rs
//! Webcam pinch-to-shoot client for a server-authoritative duck hunt.
//!
//! Landmark frames flow through [`mapper`], [`tracking`] and [`shoot`] and
//! leave as shoot events on the [`channel`]; world snapshots flow back in
//! through [`world`] and are drawn by [`render`] into a mirrored scene.
pub mod app;
pub mod channel;
pub mod config;
pub mod effects;
pub mod mapper;
pub mod protocol;
pub mod render;
pub mod shoot;
pub mod tracking;
pub mod ui;
pub mod video;
pub mod world;
