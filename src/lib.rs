//! # vocalfx
//!
//! Real-time microphone effect processing with user-scriptable effects.
//!
//! `vocalfx` captures a live mono audio stream, optionally transforms each
//! buffer through a user-authored effect script, and writes the result to a
//! playback device at a fixed latency (1024-sample buffers at 44.1 kHz,
//! about 23 ms one-way). Effects are plain script files with one entry
//! point; a misbehaving effect degrades a single buffer to pass-through and
//! never takes the stream down.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use vocalfx::{EffectSelection, SessionParams, VocalFx};
//!
//! let mut fx = VocalFx::new("effects")
//!     .with_event_callback(|e| tracing::warn!(?e, "engine event"));
//!
//! fx.save_effect("robo", vocalfx::EffectStore::template())?;
//! fx.start(
//!     "USB Microphone",
//!     "Speakers",
//!     EffectSelection::Stored("robo".to_string()),
//!     SessionParams::with_gain(2.0),
//! )?;
//!
//! // Adjust controls while audio flows...
//! fx.set_param("gain", 1.2);
//!
//! fx.stop();
//! ```
//!
//! ## Architecture
//!
//! Two actors, a strict boundary:
//!
//! - **Control actor** ([`VocalFx`]): start/stop requests and live parameter
//!   updates; never blocks on the engine.
//! - **Engine actor** (one thread per [`Session`]): the blocking
//!   capture → transform → playback loop. It is the only context that calls
//!   into the effect plugin or touches the device endpoints.
//!
//! CPAL's real-time callbacks exchange samples with the engine thread
//! through lock-free SPSC rings, so capture is never interrupted by effect
//! processing, and buffers flow strictly in order.
//!
//! ## Trust boundary
//!
//! Effect scripts are untrusted user input executed in an embedded engine
//! with a per-invocation operation budget but no further capability
//! restriction. See [`ScriptEffect`] for details.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod catalog;
mod config;
mod controller;
mod effect;
mod engine;
mod error;
mod event;
mod params;
mod processor;
mod recorder;

pub use catalog::{DeviceCatalog, DeviceDescriptor, Direction, ResolvedPair};
pub use config::SessionConfig;
pub use controller::VocalFx;
pub use effect::{EffectPlugin, EffectSelection, EffectStore, ScriptEffect, EFFECT_EXTENSION};
pub use engine::{Session, SessionStats, StreamState};
pub use error::{ApplyError, EngineError, LoadError};
pub use event::{event_callback, EngineEvent, EventCallback};
pub use params::{ParamsReader, SessionParams, SharedParams};
pub use processor::BufferProcessor;
pub use recorder::WavRecorder;
