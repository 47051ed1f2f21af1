#![cfg(target_arch = "wasm32")]

//! In-browser checks of the `web-sys` platform.
//!
//!   wasm-pack test --headless --firefox crates/bird-event

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bird_event::{BrowserPlatform, EventAdapter, Platform};
use js_sys::Promise;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;
use web_sys::{
    HtmlAudioElement, HtmlElement, KeyboardEvent, KeyboardEventInit, MouseEvent, MouseEventInit,
};

wasm_bindgen_test_configure!(run_in_browser);

fn adapter() -> EventAdapter<BrowserPlatform> {
    EventAdapter::new(Rc::new(BrowserPlatform::new().expect("browser window")))
}

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

fn mount(id: &str, tag: &str) -> HtmlElement {
    let doc = document();
    if let Some(old) = doc.get_element_by_id(id) {
        old.remove();
    }
    let el = doc.create_element(tag).unwrap();
    el.set_id(id);
    doc.body().unwrap().append_child(&el).unwrap();
    el.dyn_into().unwrap()
}

#[wasm_bindgen_test]
fn canvas_background_writes_pixel_styles() {
    let canvas = mount("canvas", "canvas");
    adapter()
        .set_canvas_background("url(\"sky.png\")", 800.0, 600.0)
        .run();
    let style = canvas.style();
    assert_eq!(style.get_property_value("width").unwrap(), "800px");
    assert_eq!(style.get_property_value("height").unwrap(), "600px");
    assert_eq!(
        style.get_property_value("background-size").unwrap(),
        "800px 600px"
    );
    canvas.remove();
}

#[wasm_bindgen_test]
fn missing_element_is_a_noop() {
    let events = adapter();
    events.listen("no-such-element", "click", || {}).run();
    events.mousedown("no-such-element", |_, _, _| {}).run();
}

#[wasm_bindgen_test]
fn listen_fires_on_dispatched_event() {
    let button = mount("bird-button", "button");
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    adapter()
        .listen("bird-button", "click", move || counter.set(counter.get() + 1))
        .run();
    button.click();
    button.click();
    assert_eq!(hits.get(), 2);
    button.remove();
}

async fn sleep(ms: i32) {
    let promise = Promise::new(&mut |resolve, _reject| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

fn press(event: &str, key: &str) {
    let init = KeyboardEventInit::new();
    init.set_key(key);
    let event = KeyboardEvent::new_with_keyboard_event_init_dict(event, &init).unwrap();
    web_sys::window().unwrap().dispatch_event(&event).unwrap();
}

#[wasm_bindgen_test]
fn keydown_matches_key_label() {
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    adapter()
        .keydown("q", move || counter.set(counter.get() + 1))
        .run();
    for key in ["q", "w", "q"] {
        press("keydown", key);
    }
    assert_eq!(hits.get(), 2);
}

#[wasm_bindgen_test]
fn mousedown_forwards_button_and_client_coordinates() {
    let pad = mount("bird-pad", "div");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    adapter()
        .mousedown("bird-pad", move |button, x, y| {
            sink.borrow_mut().push((button, x, y));
        })
        .run();

    let init = MouseEventInit::new();
    init.set_button(1);
    init.set_client_x(12);
    init.set_client_y(34);
    let event = MouseEvent::new_with_mouse_event_init_dict("mousedown", &init).unwrap();
    pad.dispatch_event(&event).unwrap();
    assert_eq!(*seen.borrow(), vec![(1, 12, 34)]);
    pad.remove();
}

#[wasm_bindgen_test]
async fn key_repeat_starts_and_stops_interval() {
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    adapter()
        .key("F8", move || counter.set(counter.get() + 1))
        .run();
    assert_eq!(hits.get(), 0);

    press("keydown", "F8");
    sleep(60).await;
    press("keydown", "F8");
    sleep(60).await;
    press("keyup", "F8");
    let held = hits.get();
    assert!(held >= 2, "only {held} repeats while held");

    sleep(100).await;
    assert_eq!(hits.get(), held);
}

#[wasm_bindgen_test]
async fn after_runs_once_through_set_timeout() {
    let hits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&hits);
    adapter()
        .after(20.0, move || counter.set(counter.get() + 1))
        .run();
    assert_eq!(hits.get(), 0);
    sleep(100).await;
    assert_eq!(hits.get(), 1);
}

#[wasm_bindgen_test]
fn audio_loop_flag() {
    let platform = BrowserPlatform::new().unwrap();
    let music: HtmlAudioElement = platform.create_audio("theme.ogg", true).unwrap();
    let sound: HtmlAudioElement = platform.create_audio("jump.wav", false).unwrap();
    assert!(music.loop_());
    assert!(!sound.loop_());
}
