#![forbid(unsafe_code)]

//! Browser event adapters.
//!
//! Each adapter wires one browser primitive (a DOM or window event, a timer,
//! the animation-frame loop, an audio element, the canvas style) to one
//! host-supplied handler. Adapters take their configuration eagerly and return
//! an [`Effect`]: running it performs the registration and completes with
//! unit. Nothing is reported back; a missing element is a silent no-op.
//!
//! The adapters are written against the [`Platform`] trait:
//! - on `wasm32`, `BrowserPlatform` binds it to `web-sys` and the `wasm`
//!   module exports every adapter to JS as a thunk-returning function;
//! - everywhere, [`HeadlessPlatform`] provides a deterministic, host-driven
//!   implementation (explicit clock, explicit event dispatch, JSON replay).

pub mod adapter;
pub mod canvas;
pub mod config;
pub mod effect;
pub mod frame_clock;
pub mod headless;
pub mod key_repeat;
pub mod platform;

#[cfg(target_arch = "wasm32")]
mod browser;
#[cfg(target_arch = "wasm32")]
mod wasm;

pub use adapter::EventAdapter;
#[cfg(target_arch = "wasm32")]
pub use browser::BrowserPlatform;
pub use config::AdapterConfig;
pub use effect::Effect;
pub use headless::HeadlessPlatform;
pub use platform::{DomEvent, Platform, PlatformError};
