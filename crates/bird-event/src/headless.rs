#![forbid(unsafe_code)]

//! Deterministic in-memory [`Platform`].
//!
//! `HeadlessPlatform` stands in for the browser when the adapters run outside
//! a page (native tests, record/replay). Nothing happens on its own: the host
//! registers elements, dispatches events, advances the millisecond clock and
//! runs animation frames explicitly. Timers fire in due-time order (ties in
//! registration order) while the clock is advanced across them.
//!
//! Callbacks are always invoked with every internal borrow released, so they
//! may register listeners or schedule timers on the same platform.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::platform::{DomEvent, IntervalId, Listener, Platform, PlatformError, StyleProperty};

/// Shortest interval period; a zero period would never let the clock move.
const MIN_INTERVAL_MS: f64 = 1.0;

/// Element handle handed out by [`HeadlessPlatform::element_by_id`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessElement {
    id: String,
}

impl HeadlessElement {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Audio handle; records its loop flag and how often it was played.
#[derive(Debug)]
pub struct HeadlessAudio {
    src: String,
    looping: bool,
    plays: Cell<u32>,
}

impl HeadlessAudio {
    #[must_use]
    pub fn src(&self) -> &str {
        &self.src
    }

    #[must_use]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    #[must_use]
    pub fn play_count(&self) -> u32 {
        self.plays.get()
    }
}

type SharedListener = Rc<dyn Fn(&DomEvent)>;

struct Registered {
    event: String,
    listener: SharedListener,
}

#[derive(Default)]
struct ElementState {
    listeners: Vec<Registered>,
    style: BTreeMap<StyleProperty, String>,
}

type SharedTick = Rc<dyn Fn()>;

enum TimerKind {
    Timeout(Box<dyn FnOnce()>),
    Interval { period_ms: f64, callback: SharedTick },
}

struct Timer {
    id: i32,
    due_ms: f64,
    kind: TimerKind,
}

impl Timer {
    const fn is_interval(&self) -> bool {
        matches!(self.kind, TimerKind::Interval { .. })
    }
}

/// Callback of a timer that just came due.
enum Due {
    Timeout(Box<dyn FnOnce()>),
    Interval(SharedTick),
}

/// In-memory browser: elements, listeners, timers, frames and audio.
#[derive(Default)]
pub struct HeadlessPlatform {
    now_ms: Cell<f64>,
    elements: RefCell<BTreeMap<String, ElementState>>,
    window_listeners: RefCell<Vec<Registered>>,
    timers: RefCell<Vec<Timer>>,
    next_timer_id: Cell<i32>,
    frame_queue: RefCell<Vec<Box<dyn FnOnce()>>>,
    audio: RefCell<Vec<Rc<HeadlessAudio>>>,
}

impl core::fmt::Debug for HeadlessPlatform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HeadlessPlatform")
            .field("now_ms", &self.now_ms.get())
            .field("elements", &self.elements.borrow().keys().collect::<Vec<_>>())
            .field("window_listeners", &self.window_listeners.borrow().len())
            .field("timers", &self.timers.borrow().len())
            .field("pending_frames", &self.frame_queue.borrow().len())
            .finish()
    }
}

impl HeadlessPlatform {
    /// Empty document, clock at `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty document, clock at `now_ms`.
    #[must_use]
    pub fn starting_at(now_ms: f64) -> Self {
        let platform = Self::default();
        platform.now_ms.set(now_ms);
        platform
    }

    /// Add an element with the given id to the document.
    pub fn add_element(&self, id: impl Into<String>) {
        self.elements.borrow_mut().entry(id.into()).or_default();
    }

    #[must_use]
    pub fn has_element(&self, id: &str) -> bool {
        self.elements.borrow().contains_key(id)
    }

    /// Listeners attached to element `id` (all event names).
    #[must_use]
    pub fn element_listener_count(&self, id: &str) -> usize {
        self.elements
            .borrow()
            .get(id)
            .map_or(0, |el| el.listeners.len())
    }

    /// Window listeners registered for `event`.
    #[must_use]
    pub fn window_listener_count(&self, event: &str) -> usize {
        self.window_listeners
            .borrow()
            .iter()
            .filter(|r| r.event == event)
            .count()
    }

    /// Inline style value last written to `property` on element `id`.
    #[must_use]
    pub fn style(&self, id: &str, property: StyleProperty) -> Option<String> {
        self.elements
            .borrow()
            .get(id)
            .and_then(|el| el.style.get(&property).cloned())
    }

    #[must_use]
    pub fn active_interval_count(&self) -> usize {
        self.timers
            .borrow()
            .iter()
            .filter(|t| t.is_interval())
            .count()
    }

    #[must_use]
    pub fn pending_timeout_count(&self) -> usize {
        self.timers
            .borrow()
            .iter()
            .filter(|t| !t.is_interval())
            .count()
    }

    #[must_use]
    pub fn pending_frame_count(&self) -> usize {
        self.frame_queue.borrow().len()
    }

    /// Every audio handle created so far, in creation order.
    #[must_use]
    pub fn audio_handles(&self) -> Vec<Rc<HeadlessAudio>> {
        self.audio.borrow().clone()
    }

    /// Jump the clock to `now_ms` without firing timers.
    pub fn set_now_ms(&self, now_ms: f64) {
        self.now_ms.set(now_ms);
    }

    /// Deliver `event` to window listeners registered for `event_name`.
    /// Returns the number of listeners invoked.
    pub fn dispatch_window(&self, event_name: &str, event: &DomEvent) -> usize {
        let listeners = matching(&self.window_listeners.borrow(), event_name);
        invoke_all(&listeners, event)
    }

    /// Deliver `event` to listeners on element `id`. A missing element
    /// receives nothing.
    pub fn dispatch_element(&self, id: &str, event_name: &str, event: &DomEvent) -> usize {
        let listeners = match self.elements.borrow().get(id) {
            Some(el) => matching(&el.listeners, event_name),
            None => return 0,
        };
        invoke_all(&listeners, event)
    }

    /// Advance the clock by `dt_ms`, firing every timer that comes due on
    /// the way. Returns the number of timer callbacks invoked.
    pub fn advance_ms(&self, dt_ms: f64) -> usize {
        let target = self.now_ms.get() + dt_ms.max(0.0);
        let mut fired = 0;
        while let Some(callback) = self.take_next_due(target) {
            match callback {
                Due::Timeout(callback) => callback(),
                Due::Interval(callback) => callback(),
            }
            fired += 1;
        }
        // A callback may itself have advanced past `target`.
        if target > self.now_ms.get() {
            self.now_ms.set(target);
        }
        fired
    }

    /// Run one animation frame at `timestamp_ms`.
    ///
    /// Only callbacks queued before this call run; callbacks they request are
    /// queued for the next frame. Returns the number of callbacks invoked.
    pub fn run_frame(&self, timestamp_ms: f64) -> usize {
        self.now_ms.set(timestamp_ms);
        let queued = std::mem::take(&mut *self.frame_queue.borrow_mut());
        let count = queued.len();
        for callback in queued {
            callback();
        }
        count
    }

    /// Parse a JSON replay script and apply it. See [`ReplayStep`].
    pub fn replay_json(&self, script: &str) -> Result<usize, ReplayError> {
        let steps: Vec<ReplayStep> =
            serde_json::from_str(script).map_err(|e| ReplayError::Json(e.to_string()))?;
        self.replay(&steps)
    }

    /// Apply replay steps in order. Returns the number of steps applied.
    pub fn replay(&self, steps: &[ReplayStep]) -> Result<usize, ReplayError> {
        for (index, step) in steps.iter().enumerate() {
            match step {
                ReplayStep::Advance { advance_ms } => {
                    if *advance_ms < 0.0 {
                        return Err(ReplayError::NegativeAdvance {
                            step: index,
                            advance_ms: *advance_ms,
                        });
                    }
                    self.advance_ms(*advance_ms);
                }
                ReplayStep::Frame { frame_ms } => {
                    let now_ms = self.now_ms.get();
                    if *frame_ms < now_ms {
                        return Err(ReplayError::ClockRewind {
                            step: index,
                            now_ms,
                            requested_ms: *frame_ms,
                        });
                    }
                    self.run_frame(*frame_ms);
                }
                ReplayStep::Window { window, event } => {
                    self.dispatch_window(window, event);
                }
                ReplayStep::Element {
                    element,
                    event_type,
                    event,
                } => {
                    self.dispatch_element(element, event_type, event);
                }
            }
        }
        Ok(steps.len())
    }

    fn next_id(&self) -> i32 {
        let id = self.next_timer_id.get() + 1;
        self.next_timer_id.set(id);
        id
    }

    fn push_timer(&self, due_ms: f64, kind: TimerKind) -> i32 {
        let id = self.next_id();
        self.timers.borrow_mut().push(Timer { id, due_ms, kind });
        id
    }

    /// Pop (timeout) or reschedule (interval) the earliest timer due at or
    /// before `target`, moving the clock to its due time.
    fn take_next_due(&self, target: f64) -> Option<Due> {
        let mut timers = self.timers.borrow_mut();
        let index = timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= target)
            .min_by(|(_, a), (_, b)| a.due_ms.total_cmp(&b.due_ms).then(a.id.cmp(&b.id)))
            .map(|(i, _)| i)?;
        let due = timers[index].due_ms;
        if due > self.now_ms.get() {
            self.now_ms.set(due);
        }
        if let TimerKind::Interval {
            period_ms,
            callback,
        } = &timers[index].kind
        {
            let (period_ms, callback) = (*period_ms, Rc::clone(callback));
            timers[index].due_ms = due + period_ms;
            return Some(Due::Interval(callback));
        }
        match timers.remove(index).kind {
            TimerKind::Timeout(callback) => Some(Due::Timeout(callback)),
            TimerKind::Interval { callback, .. } => Some(Due::Interval(callback)),
        }
    }
}

fn matching(registered: &[Registered], event_name: &str) -> Vec<SharedListener> {
    registered
        .iter()
        .filter(|r| r.event == event_name)
        .map(|r| Rc::clone(&r.listener))
        .collect()
}

fn invoke_all(listeners: &[SharedListener], event: &DomEvent) -> usize {
    for listener in listeners {
        listener(event);
    }
    listeners.len()
}

impl Platform for HeadlessPlatform {
    type Element = HeadlessElement;
    type Audio = Rc<HeadlessAudio>;

    fn element_by_id(&self, id: &str) -> Option<HeadlessElement> {
        self.has_element(id).then(|| HeadlessElement { id: id.to_owned() })
    }

    fn add_element_listener(
        &self,
        element: &HeadlessElement,
        event: &str,
        listener: Listener,
    ) -> Result<(), PlatformError> {
        let mut elements = self.elements.borrow_mut();
        let state = elements
            .get_mut(&element.id)
            .ok_or_else(|| PlatformError::Detached(element.id.clone()))?;
        state.listeners.push(Registered {
            event: event.to_owned(),
            listener: Rc::from(listener),
        });
        Ok(())
    }

    fn add_window_listener(&self, event: &str, listener: Listener) -> Result<(), PlatformError> {
        self.window_listeners.borrow_mut().push(Registered {
            event: event.to_owned(),
            listener: Rc::from(listener),
        });
        Ok(())
    }

    fn set_style(
        &self,
        element: &HeadlessElement,
        property: StyleProperty,
        value: &str,
    ) -> Result<(), PlatformError> {
        let mut elements = self.elements.borrow_mut();
        let state = elements
            .get_mut(&element.id)
            .ok_or_else(|| PlatformError::Detached(element.id.clone()))?;
        state.style.insert(property, value.to_owned());
        Ok(())
    }

    fn set_timeout(
        &self,
        delay_ms: f64,
        callback: Box<dyn FnOnce()>,
    ) -> Result<(), PlatformError> {
        let due = self.now_ms.get() + delay_ms.max(0.0);
        self.push_timer(due, TimerKind::Timeout(callback));
        Ok(())
    }

    fn set_interval(
        &self,
        period_ms: f64,
        callback: Box<dyn Fn()>,
    ) -> Result<IntervalId, PlatformError> {
        let period = period_ms.max(MIN_INTERVAL_MS);
        let due = self.now_ms.get() + period;
        let id = self.push_timer(
            due,
            TimerKind::Interval {
                period_ms: period,
                callback: Rc::from(callback),
            },
        );
        Ok(IntervalId(id))
    }

    fn clear_interval(&self, id: IntervalId) {
        self.timers
            .borrow_mut()
            .retain(|t| !(t.id == id.0 && t.is_interval()));
    }

    fn request_animation_frame(&self, callback: Box<dyn FnOnce()>) -> Result<(), PlatformError> {
        self.frame_queue.borrow_mut().push(callback);
        Ok(())
    }

    fn now_ms(&self) -> f64 {
        self.now_ms.get()
    }

    fn create_audio(&self, src: &str, looping: bool) -> Result<Rc<HeadlessAudio>, PlatformError> {
        let audio = Rc::new(HeadlessAudio {
            src: src.to_owned(),
            looping,
            plays: Cell::new(0),
        });
        self.audio.borrow_mut().push(Rc::clone(&audio));
        Ok(audio)
    }

    fn play(&self, audio: &Rc<HeadlessAudio>) -> Result<(), PlatformError> {
        audio.plays.set(audio.plays.get() + 1);
        Ok(())
    }
}

/// One step of a recorded browser session.
///
/// Scripts are JSON arrays of objects:
///
/// ```json
/// [
///   {"window": "keydown", "event": {"kind": "key", "key": "a"}},
///   {"advance_ms": 100},
///   {"element": "canvas", "type": "mousedown",
///    "event": {"kind": "mouse", "button": 0, "client_x": 4, "client_y": 9}},
///   {"frame_ms": 116}
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplayStep {
    Advance {
        advance_ms: f64,
    },
    Frame {
        frame_ms: f64,
    },
    Window {
        window: String,
        #[serde(default)]
        event: DomEvent,
    },
    Element {
        element: String,
        #[serde(rename = "type")]
        event_type: String,
        #[serde(default)]
        event: DomEvent,
    },
}

/// Errors from [`HeadlessPlatform::replay_json`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// Malformed JSON or a step matching no known shape.
    Json(String),
    /// `advance_ms` below zero.
    NegativeAdvance { step: usize, advance_ms: f64 },
    /// `frame_ms` earlier than the current clock.
    ClockRewind {
        step: usize,
        now_ms: f64,
        requested_ms: f64,
    },
}

impl core::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "replay script parse error: {msg}"),
            Self::NegativeAdvance { step, advance_ms } => {
                write!(f, "step {step}: negative advance of {advance_ms}ms")
            }
            Self::ClockRewind {
                step,
                now_ms,
                requested_ms,
            } => write!(
                f,
                "step {step}: frame at {requested_ms}ms is before current time {now_ms}ms"
            ),
        }
    }
}

impl std::error::Error for ReplayError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + Clone + 'static) {
        let hits = Rc::new(Cell::new(0));
        let inner = Rc::clone(&hits);
        (hits, move || inner.set(inner.get() + 1))
    }

    #[test]
    fn element_lookup() {
        let platform = HeadlessPlatform::new();
        assert!(platform.element_by_id("btn").is_none());
        platform.add_element("btn");
        let el = platform.element_by_id("btn").expect("element");
        assert_eq!(el.id(), "btn");
    }

    #[test]
    fn dispatch_filters_by_event_name() {
        let platform = HeadlessPlatform::new();
        let (hits, bump) = counter();
        platform
            .add_window_listener("keydown", Box::new(move |_: &DomEvent| bump()))
            .unwrap();
        assert_eq!(platform.dispatch_window("keyup", &DomEvent::key("a")), 0);
        assert_eq!(platform.dispatch_window("keydown", &DomEvent::key("a")), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(platform.window_listener_count("keydown"), 1);
    }

    #[test]
    fn dispatch_to_missing_element_is_silent() {
        let platform = HeadlessPlatform::new();
        assert_eq!(platform.dispatch_element("nope", "click", &DomEvent::Plain), 0);
    }

    #[test]
    fn timeouts_fire_in_due_order() {
        let platform = HeadlessPlatform::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for (delay, tag) in [(30.0, 'c'), (10.0, 'a'), (20.0, 'b')] {
            let order = Rc::clone(&order);
            platform
                .set_timeout(delay, Box::new(move || order.borrow_mut().push(tag)))
                .unwrap();
        }
        assert_eq!(platform.advance_ms(25.0), 2);
        assert_eq!(*order.borrow(), vec!['a', 'b']);
        assert_eq!(platform.now_ms(), 25.0);
        assert_eq!(platform.advance_ms(5.0), 1);
        assert_eq!(*order.borrow(), vec!['a', 'b', 'c']);
        assert_eq!(platform.pending_timeout_count(), 0);
    }

    #[test]
    fn timer_sees_its_due_time() {
        let platform = Rc::new(HeadlessPlatform::new());
        let seen = Rc::new(Cell::new(f64::NAN));
        let (p, s) = (Rc::clone(&platform), Rc::clone(&seen));
        platform
            .set_timeout(40.0, Box::new(move || s.set(p.now_ms())))
            .unwrap();
        platform.advance_ms(100.0);
        assert_eq!(seen.get(), 40.0);
        assert_eq!(platform.now_ms(), 100.0);
    }

    #[test]
    fn interval_repeats_until_cleared() {
        let platform = HeadlessPlatform::new();
        let (hits, bump) = counter();
        let id = platform.set_interval(10.0, Box::new(bump)).unwrap();
        assert_eq!(platform.advance_ms(35.0), 3);
        assert_eq!(hits.get(), 3);
        platform.clear_interval(id);
        assert_eq!(platform.active_interval_count(), 0);
        assert_eq!(platform.advance_ms(100.0), 0);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn listener_may_dispatch_to_itself() {
        let platform = Rc::new(HeadlessPlatform::new());
        platform.add_element("btn");
        let btn = platform.element_by_id("btn").unwrap();
        let depth = Rc::new(Cell::new(0u32));
        let (p, d) = (Rc::clone(&platform), Rc::clone(&depth));
        platform
            .add_element_listener(
                &btn,
                "click",
                Box::new(move |_: &DomEvent| {
                    d.set(d.get() + 1);
                    if d.get() == 1 {
                        p.dispatch_element("btn", "click", &DomEvent::Plain);
                    }
                }),
            )
            .unwrap();
        assert_eq!(platform.dispatch_element("btn", "click", &DomEvent::Plain), 1);
        assert_eq!(depth.get(), 2);
    }

    #[test]
    fn interval_tick_may_advance_the_clock() {
        let platform = Rc::new(HeadlessPlatform::new());
        let ticks = Rc::new(Cell::new(0u32));
        let (p, t) = (Rc::clone(&platform), Rc::clone(&ticks));
        platform
            .set_interval(
                10.0,
                Box::new(move || {
                    t.set(t.get() + 1);
                    if t.get() == 1 {
                        p.advance_ms(10.0);
                    }
                }),
            )
            .unwrap();
        assert_eq!(platform.advance_ms(10.0), 1);
        assert_eq!(ticks.get(), 2);
        assert_eq!(platform.now_ms(), 20.0);
    }

    #[test]
    fn callbacks_may_schedule_more_work() {
        let platform = Rc::new(HeadlessPlatform::new());
        let (hits, bump) = counter();
        let p = Rc::clone(&platform);
        platform
            .set_timeout(
                5.0,
                Box::new(move || {
                    let bump = bump.clone();
                    p.set_timeout(5.0, Box::new(bump)).unwrap();
                }),
            )
            .unwrap();
        platform.advance_ms(10.0);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn frames_requested_during_a_frame_wait_for_the_next() {
        let platform = Rc::new(HeadlessPlatform::new());
        let (hits, bump) = counter();
        let p = Rc::clone(&platform);
        platform
            .request_animation_frame(Box::new(move || {
                bump();
                p.request_animation_frame(Box::new(|| {})).unwrap();
            }))
            .unwrap();
        assert_eq!(platform.run_frame(16.0), 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(platform.pending_frame_count(), 1);
        assert_eq!(platform.now_ms(), 16.0);
    }

    #[test]
    fn style_writes_are_recorded() {
        let platform = HeadlessPlatform::new();
        platform.add_element("canvas");
        let el = platform.element_by_id("canvas").unwrap();
        platform.set_style(&el, StyleProperty::Width, "10px").unwrap();
        assert_eq!(
            platform.style("canvas", StyleProperty::Width).as_deref(),
            Some("10px")
        );
        assert_eq!(platform.style("canvas", StyleProperty::Height), None);
    }

    #[test]
    fn audio_records_plays() {
        let platform = HeadlessPlatform::new();
        let audio = platform.create_audio("beep.ogg", false).unwrap();
        platform.play(&audio).unwrap();
        platform.play(&audio).unwrap();
        assert_eq!(audio.src(), "beep.ogg");
        assert!(!audio.is_looping());
        assert_eq!(audio.play_count(), 2);
        assert_eq!(platform.audio_handles().len(), 1);
    }

    #[test]
    fn replay_drives_listeners_and_clock() {
        let platform = HeadlessPlatform::new();
        platform.add_element("pad");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        platform
            .add_window_listener(
                "keydown",
                Box::new(move |ev: &DomEvent| s.borrow_mut().push(ev.clone())),
            )
            .unwrap();
        let s = Rc::clone(&seen);
        let pad = platform.element_by_id("pad").unwrap();
        platform
            .add_element_listener(
                &pad,
                "mousedown",
                Box::new(move |ev: &DomEvent| s.borrow_mut().push(ev.clone())),
            )
            .unwrap();

        let applied = platform
            .replay_json(
                r#"[
                    {"window": "keydown", "event": {"kind": "key", "key": "x"}},
                    {"advance_ms": 50},
                    {"element": "pad", "type": "mousedown",
                     "event": {"kind": "mouse", "button": 1, "client_x": 3, "client_y": 4}},
                    {"frame_ms": 60}
                ]"#,
            )
            .expect("replay");
        assert_eq!(applied, 4);
        assert_eq!(
            *seen.borrow(),
            vec![DomEvent::key("x"), DomEvent::mouse(1, 3, 4)]
        );
        assert_eq!(platform.now_ms(), 60.0);
    }

    #[test]
    fn replay_rejects_bad_scripts() {
        let platform = HeadlessPlatform::starting_at(100.0);
        assert!(matches!(
            platform.replay_json("not json"),
            Err(ReplayError::Json(_))
        ));
        assert_eq!(
            platform.replay_json(r#"[{"advance_ms": -1}]"#),
            Err(ReplayError::NegativeAdvance {
                step: 0,
                advance_ms: -1.0
            })
        );
        assert_eq!(
            platform.replay_json(r#"[{"advance_ms": 1}, {"frame_ms": 50}]"#),
            Err(ReplayError::ClockRewind {
                step: 1,
                now_ms: 101.0,
                requested_ms: 50.0
            })
        );
    }
}
