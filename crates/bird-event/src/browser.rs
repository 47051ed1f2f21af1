#![forbid(unsafe_code)]

//! `web-sys` implementation of [`Platform`].
//!
//! Listener and timeout closures are handed to the JS garbage collector with
//! `into_js_value`, so they live exactly as long as the browser keeps the
//! registration (for listeners, until the page unloads). Interval closures
//! are owned here and dropped on `clear_interval`.

use std::cell::RefCell;
use std::collections::HashMap;

use js_sys::Date;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, Event, HtmlAudioElement, HtmlElement, KeyboardEvent, MouseEvent, Window,
};

use crate::platform::{DomEvent, IntervalId, Listener, Platform, PlatformError, StyleProperty};

/// The live browser page.
pub struct BrowserPlatform {
    window: Window,
    document: Document,
    intervals: RefCell<HashMap<i32, Closure<dyn Fn()>>>,
}

impl BrowserPlatform {
    /// Bind to the global `window` and its `document`.
    pub fn new() -> Result<Self, PlatformError> {
        let window = web_sys::window().ok_or(PlatformError::NoWindow)?;
        let document = window.document().ok_or(PlatformError::NoDocument)?;
        Ok(Self {
            window,
            document,
            intervals: RefCell::new(HashMap::new()),
        })
    }
}

fn js_error(err: JsValue) -> PlatformError {
    PlatformError::Js(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

/// Read the fields the adapters care about from a native event.
fn to_dom_event(event: &Event) -> DomEvent {
    if let Some(key) = event.dyn_ref::<KeyboardEvent>() {
        return DomEvent::key(key.key());
    }
    if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
        return DomEvent::mouse(mouse.button(), mouse.client_x(), mouse.client_y());
    }
    DomEvent::Plain
}

fn listener_callback(listener: Listener) -> JsValue {
    Closure::<dyn Fn(Event)>::new(move |event: Event| listener(&to_dom_event(&event)))
        .into_js_value()
}

/// Timer arguments are WebIDL `long`: fractional milliseconds truncate,
/// NaN becomes `0` and out-of-range values wrap modulo 2^32.
fn timer_ms(ms: f64) -> i32 {
    ms as i64 as i32
}

impl Platform for BrowserPlatform {
    type Element = Element;
    type Audio = HtmlAudioElement;

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn add_element_listener(
        &self,
        element: &Element,
        event: &str,
        listener: Listener,
    ) -> Result<(), PlatformError> {
        let callback = listener_callback(listener);
        element
            .add_event_listener_with_callback(event, callback.unchecked_ref())
            .map_err(js_error)
    }

    fn add_window_listener(&self, event: &str, listener: Listener) -> Result<(), PlatformError> {
        let callback = listener_callback(listener);
        self.window
            .add_event_listener_with_callback(event, callback.unchecked_ref())
            .map_err(js_error)
    }

    fn set_style(
        &self,
        element: &Element,
        property: StyleProperty,
        value: &str,
    ) -> Result<(), PlatformError> {
        let html = element
            .dyn_ref::<HtmlElement>()
            .ok_or_else(|| PlatformError::Js(format!("#{} has no inline style", element.id())))?;
        html.style()
            .set_property(property.css_name(), value)
            .map_err(js_error)
    }

    fn set_timeout(
        &self,
        delay_ms: f64,
        callback: Box<dyn FnOnce()>,
    ) -> Result<(), PlatformError> {
        let callback = Closure::once_into_js(move || callback());
        self.window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.unchecked_ref(),
                timer_ms(delay_ms),
            )
            .map(drop)
            .map_err(js_error)
    }

    fn set_interval(
        &self,
        period_ms: f64,
        callback: Box<dyn Fn()>,
    ) -> Result<IntervalId, PlatformError> {
        let closure = Closure::<dyn Fn()>::new(move || callback());
        let id = self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                timer_ms(period_ms),
            )
            .map_err(js_error)?;
        self.intervals.borrow_mut().insert(id, closure);
        Ok(IntervalId(id))
    }

    fn clear_interval(&self, id: IntervalId) {
        self.window.clear_interval_with_handle(id.0);
        self.intervals.borrow_mut().remove(&id.0);
    }

    fn request_animation_frame(&self, callback: Box<dyn FnOnce()>) -> Result<(), PlatformError> {
        let callback = Closure::once_into_js(move || callback());
        self.window
            .request_animation_frame(callback.unchecked_ref())
            .map(drop)
            .map_err(js_error)
    }

    fn now_ms(&self) -> f64 {
        Date::now()
    }

    fn create_audio(&self, src: &str, looping: bool) -> Result<HtmlAudioElement, PlatformError> {
        let audio = HtmlAudioElement::new_with_src(src).map_err(js_error)?;
        audio.set_loop(looping);
        Ok(audio)
    }

    fn play(&self, audio: &HtmlAudioElement) -> Result<(), PlatformError> {
        audio.play().map(drop).map_err(js_error)
    }
}
