#![forbid(unsafe_code)]

//! The browser event adapters.
//!
//! Every operation takes its configuration eagerly and returns an [`Effect`].
//! Running the effect performs the registration against the [`Platform`] and
//! completes with unit. Nothing is ever reported back to the caller: a
//! missing element makes the effect a silent no-op, and platform failures are
//! logged and swallowed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::canvas::CanvasBackground;
use crate::config::AdapterConfig;
use crate::effect::Effect;
use crate::frame_clock::FrameClock;
use crate::key_repeat::{KeyRepeat, RepeatTransition};
use crate::platform::{DomEvent, Platform, PlatformError};

/// Event names used for window-level listeners.
pub const KEYDOWN: &str = "keydown";
pub const KEYUP: &str = "keyup";
pub const MOUSEDOWN: &str = "mousedown";
pub const RESIZE: &str = "resize";

type Handler = Rc<dyn Fn()>;

/// Factory for browser event adapters bound to one [`Platform`].
pub struct EventAdapter<P: Platform> {
    platform: Rc<P>,
    config: AdapterConfig,
}

impl<P: Platform> Clone for EventAdapter<P> {
    fn clone(&self) -> Self {
        Self {
            platform: Rc::clone(&self.platform),
            config: self.config.clone(),
        }
    }
}

impl<P: Platform + 'static> EventAdapter<P> {
    #[must_use]
    pub fn new(platform: Rc<P>) -> Self {
        Self::with_config(platform, AdapterConfig::default())
    }

    #[must_use]
    pub fn with_config(platform: Rc<P>, config: AdapterConfig) -> Self {
        Self { platform, config }
    }

    #[must_use]
    pub fn platform(&self) -> &Rc<P> {
        &self.platform
    }

    #[must_use]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Invoke `handler` on every `event` fired at element `element_id`.
    pub fn listen(&self, element_id: &str, event: &str, handler: impl Fn() + 'static) -> Effect {
        let platform = Rc::clone(&self.platform);
        let element_id = element_id.to_owned();
        let event = event.to_owned();
        let handler: Handler = Rc::new(handler);
        Effect::new(move || {
            let Some(element) = platform.element_by_id(&element_id) else {
                debug!(%element_id, %event, "element not found; listener skipped");
                return;
            };
            let handler = Rc::clone(&handler);
            let result = platform.add_element_listener(
                &element,
                &event,
                Box::new(move |_: &DomEvent| handler()),
            );
            report("listen", result);
        })
    }

    /// Invoke `handler` on every window `keydown` whose `key` equals `key`,
    /// browser auto-repeat included.
    pub fn keydown(&self, key: &str, handler: impl Fn() + 'static) -> Effect {
        self.single_key(KEYDOWN, key, Rc::new(handler))
    }

    /// Invoke `handler` on every window `keyup` whose `key` equals `key`.
    pub fn keyup(&self, key: &str, handler: impl Fn() + 'static) -> Effect {
        self.single_key(KEYUP, key, Rc::new(handler))
    }

    fn single_key(&self, event: &'static str, key: &str, handler: Handler) -> Effect {
        let platform = Rc::clone(&self.platform);
        let key = key.to_owned();
        Effect::new(move || {
            let handler = Rc::clone(&handler);
            let key = key.clone();
            let result = platform.add_window_listener(
                event,
                Box::new(move |ev: &DomEvent| {
                    if ev.key_label() == Some(key.as_str()) {
                        handler();
                    }
                }),
            );
            report(event, result);
        })
    }

    /// Call `handler` at a fixed cadence while `key` is held.
    ///
    /// The first matching `keydown` starts an interval of
    /// [`AdapterConfig::repeat_interval_ms`]; the matching `keyup` clears it.
    /// Browser auto-repeat `keydown`s in between start nothing. Each run of
    /// the returned effect owns its own timer slot.
    pub fn key(&self, key: &str, handler: impl Fn() + 'static) -> Effect {
        let platform = Rc::clone(&self.platform);
        let period_ms = self.config.repeat_interval_ms;
        let key = key.to_owned();
        let handler: Handler = Rc::new(handler);
        Effect::new(move || {
            let repeat = Rc::new(RefCell::new(KeyRepeat::new(key.clone())));

            let on_down = {
                let platform = Rc::clone(&platform);
                let repeat = Rc::clone(&repeat);
                let handler = Rc::clone(&handler);
                move |ev: &DomEvent| {
                    let Some(pressed) = ev.key_label() else {
                        return;
                    };
                    let transition = repeat.borrow_mut().key_down(pressed, || {
                        let handler = Rc::clone(&handler);
                        platform.set_interval(period_ms, Box::new(move || handler()))
                    });
                    match transition {
                        Ok(RepeatTransition::Started(id)) => {
                            trace!(key = pressed, interval = id.0, "key repeat started");
                        }
                        Ok(_) => {}
                        Err(err) => warn!(key = pressed, error = %err, "key repeat timer failed"),
                    }
                }
            };

            let on_up = {
                let platform = Rc::clone(&platform);
                move |ev: &DomEvent| {
                    let Some(released) = ev.key_label() else {
                        return;
                    };
                    let transition = repeat.borrow_mut().key_up(released);
                    if let RepeatTransition::Stopped(id) = transition {
                        platform.clear_interval(id);
                        trace!(key = released, interval = id.0, "key repeat stopped");
                    }
                }
            };

            report(KEYDOWN, platform.add_window_listener(KEYDOWN, Box::new(on_down)));
            report(KEYUP, platform.add_window_listener(KEYUP, Box::new(on_up)));
        })
    }

    /// Forward `(button, clientX, clientY)` of every `mousedown` on element
    /// `element_id` to `handler`.
    pub fn mousedown(&self, element_id: &str, handler: impl Fn(i16, i32, i32) + 'static) -> Effect {
        let platform = Rc::clone(&self.platform);
        let element_id = element_id.to_owned();
        let handler: Rc<dyn Fn(i16, i32, i32)> = Rc::new(handler);
        Effect::new(move || {
            let Some(element) = platform.element_by_id(&element_id) else {
                debug!(%element_id, "element not found; mousedown listener skipped");
                return;
            };
            let handler = Rc::clone(&handler);
            let result = platform.add_element_listener(
                &element,
                MOUSEDOWN,
                Box::new(move |ev: &DomEvent| {
                    if let DomEvent::Mouse {
                        button,
                        client_x,
                        client_y,
                    } = *ev
                    {
                        handler(button, client_x, client_y);
                    }
                }),
            );
            report(MOUSEDOWN, result);
        })
    }

    /// Call `handler` once per animation frame with the milliseconds elapsed
    /// since the previous frame (the first delta is measured from when the
    /// effect ran). Runs for the lifetime of the page.
    pub fn frames(&self, handler: impl Fn(f64) + 'static) -> Effect {
        let platform = Rc::clone(&self.platform);
        let handler: Rc<dyn Fn(f64)> = Rc::new(handler);
        Effect::new(move || {
            let frame_loop = Rc::new(FrameLoop {
                clock: Cell::new(FrameClock::starting_at(platform.now_ms())),
                platform: Rc::clone(&platform),
                handler: Rc::clone(&handler),
            });
            frame_loop.schedule();
        })
    }

    /// Call `handler` once, `delay_ms` milliseconds after the effect runs.
    pub fn after(&self, delay_ms: f64, handler: impl Fn() + 'static) -> Effect {
        let platform = Rc::clone(&self.platform);
        let handler: Handler = Rc::new(handler);
        Effect::new(move || {
            let handler = Rc::clone(&handler);
            report(
                "after",
                platform.set_timeout(delay_ms, Box::new(move || handler())),
            );
        })
    }

    /// Invoke `handler` on every window `resize`.
    pub fn resize(&self, handler: impl Fn() + 'static) -> Effect {
        let platform = Rc::clone(&self.platform);
        let handler: Handler = Rc::new(handler);
        Effect::new(move || {
            let handler = Rc::clone(&handler);
            report(
                RESIZE,
                platform.add_window_listener(RESIZE, Box::new(move |_: &DomEvent| handler())),
            );
        })
    }

    /// Give the canvas element a background image and an explicit pixel size.
    pub fn set_canvas_background(&self, image: &str, width: f64, height: f64) -> Effect {
        let platform = Rc::clone(&self.platform);
        let element_id = self.config.canvas_element_id.clone();
        let background = CanvasBackground::new(image, width, height);
        Effect::new(move || {
            let Some(element) = platform.element_by_id(&element_id) else {
                debug!(%element_id, "canvas element not found; background skipped");
                return;
            };
            for (property, value) in background.declarations() {
                report(
                    "set_canvas_background",
                    platform.set_style(&element, property, &value),
                );
            }
        })
    }

    /// Looping background music. The audio element is created now; the
    /// effect starts playback.
    pub fn music(&self, src: &str) -> Effect {
        self.audio(src, true)
    }

    /// One-shot sound. The audio element is created now; the effect starts
    /// playback.
    pub fn sound(&self, src: &str) -> Effect {
        self.audio(src, false)
    }

    fn audio(&self, src: &str, looping: bool) -> Effect {
        let audio = match self.platform.create_audio(src, looping) {
            Ok(audio) => audio,
            Err(err) => {
                warn!(src, error = %err, "audio construction failed");
                return Effect::noop();
            }
        };
        let platform = Rc::clone(&self.platform);
        Effect::new(move || report("play", platform.play(&audio)))
    }
}

/// Self-rescheduling animation-frame callback with its own clock.
struct FrameLoop<P: Platform> {
    platform: Rc<P>,
    handler: Rc<dyn Fn(f64)>,
    clock: Cell<FrameClock>,
}

impl<P: Platform + 'static> FrameLoop<P> {
    fn schedule(self: Rc<Self>) {
        let platform = Rc::clone(&self.platform);
        let result = platform.request_animation_frame(Box::new(move || self.tick()));
        report("frames", result);
    }

    fn tick(self: Rc<Self>) {
        let mut clock = self.clock.get();
        let dt = clock.tick(self.platform.now_ms());
        self.clock.set(clock);
        (self.handler)(dt);
        self.schedule();
    }
}

fn report(operation: &'static str, result: Result<(), PlatformError>) {
    if let Err(err) = result {
        warn!(operation, error = %err, "browser call failed");
    }
}
