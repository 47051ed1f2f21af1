#![forbid(unsafe_code)]

//! Browser primitive surface consumed by the event adapters.
//!
//! [`Platform`] is the narrow slice of the DOM/window API that the adapters
//! need: element lookup, listener registration, inline styles, timers,
//! animation frames, a millisecond wall clock and audio playback. The browser
//! implementation lives in `browser.rs` (wasm32 only); the deterministic
//! in-memory implementation is [`crate::headless::HeadlessPlatform`].

use serde::{Deserialize, Serialize};

/// Errors reported by a [`Platform`] implementation.
///
/// The adapters never hand these to their callers; they are logged and the
/// deferred action still completes with unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// No global `window` object (not running on a browser main thread).
    NoWindow,
    /// The window has no `document`.
    NoDocument,
    /// The element handle no longer refers to a live element.
    Detached(String),
    /// A browser call threw; carries the stringified exception.
    Js(String),
}

impl core::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoWindow => write!(f, "no global window"),
            Self::NoDocument => write!(f, "window has no document"),
            Self::Detached(id) => write!(f, "element {id:?} is detached"),
            Self::Js(msg) => write!(f, "browser call failed: {msg}"),
        }
    }
}

impl std::error::Error for PlatformError {}

/// The fields the adapters read from a native DOM event.
///
/// Keyboard events carry `key`; mouse events carry `button`, `clientX` and
/// `clientY`. Everything else (resize, click without coordinates, ...) is
/// [`DomEvent::Plain`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomEvent {
    Key {
        key: String,
    },
    Mouse {
        button: i16,
        client_x: i32,
        client_y: i32,
    },
    #[default]
    Plain,
}

impl DomEvent {
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key { key: key.into() }
    }

    #[must_use]
    pub const fn mouse(button: i16, client_x: i32, client_y: i32) -> Self {
        Self::Mouse {
            button,
            client_x,
            client_y,
        }
    }

    /// The DOM `key` label, for keyboard events.
    #[must_use]
    pub fn key_label(&self) -> Option<&str> {
        match self {
            Self::Key { key } => Some(key),
            _ => None,
        }
    }

    /// Encode as a compact JSON object (`{"kind":"key","key":"a"}`).
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a previously encoded event.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Handle returned by [`Platform::set_interval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalId(pub i32);

/// Inline style properties the canvas configurator writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StyleProperty {
    BackgroundImage,
    BackgroundSize,
    Width,
    Height,
}

impl StyleProperty {
    /// CSS property name, as passed to `style.setProperty`.
    #[must_use]
    pub const fn css_name(self) -> &'static str {
        match self {
            Self::BackgroundImage => "background-image",
            Self::BackgroundSize => "background-size",
            Self::Width => "width",
            Self::Height => "height",
        }
    }
}

/// Listener callback installed on an element or on the window.
///
/// `Fn` rather than `FnMut`: a listener may be re-entered when its own
/// handler dispatches another event synchronously.
pub type Listener = Box<dyn Fn(&DomEvent)>;

/// The browser primitives the adapters are written against.
///
/// All methods take `&self`: implementations are single-threaded and use
/// interior mutability. Implementations must not hold any internal borrow
/// while invoking a callback, since callbacks re-enter the platform.
pub trait Platform {
    /// Live element handle, as returned by `getElementById`.
    type Element;
    /// Playable audio handle.
    type Audio: 'static;

    /// `document.getElementById(id)`.
    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    /// `element.addEventListener(event, listener)`. No removal API exists.
    fn add_element_listener(
        &self,
        element: &Self::Element,
        event: &str,
        listener: Listener,
    ) -> Result<(), PlatformError>;

    /// `window.addEventListener(event, listener)`.
    fn add_window_listener(&self, event: &str, listener: Listener) -> Result<(), PlatformError>;

    /// Write one inline style property.
    fn set_style(
        &self,
        element: &Self::Element,
        property: StyleProperty,
        value: &str,
    ) -> Result<(), PlatformError>;

    /// `setTimeout(callback, delay_ms)`.
    fn set_timeout(&self, delay_ms: f64, callback: Box<dyn FnOnce()>)
    -> Result<(), PlatformError>;

    /// `setInterval(callback, period_ms)`.
    fn set_interval(
        &self,
        period_ms: f64,
        callback: Box<dyn Fn()>,
    ) -> Result<IntervalId, PlatformError>;

    /// `clearInterval(id)`. Unknown ids are ignored.
    fn clear_interval(&self, id: IntervalId);

    /// `window.requestAnimationFrame(callback)`.
    fn request_animation_frame(&self, callback: Box<dyn FnOnce()>) -> Result<(), PlatformError>;

    /// Wall clock in milliseconds (`Date.now()`).
    fn now_ms(&self) -> f64;

    /// `new Audio(src)`, with `loop` set to `looping`.
    fn create_audio(&self, src: &str, looping: bool) -> Result<Self::Audio, PlatformError>;

    /// `audio.play()`. Rejection of the returned promise is left to the
    /// browser.
    fn play(&self, audio: &Self::Audio) -> Result<(), PlatformError>;
}
