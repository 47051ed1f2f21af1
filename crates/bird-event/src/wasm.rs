#![forbid(unsafe_code)]

//! `wasm-bindgen` exports.
//!
//! Every export takes its configuration plus a JS callback and returns a
//! thunk. Calling the thunk performs the registration (or playback) and
//! returns `undefined`. Only compiled on `wasm32` targets.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::adapter::EventAdapter;
use crate::browser::BrowserPlatform;
use crate::effect::Effect;

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            let msg = if let Some(loc) = info.location() {
                format!(
                    "panic at {}:{}:{}: {info}",
                    loc.file(),
                    loc.line(),
                    loc.column()
                )
            } else {
                format!("panic: {info}")
            };
            console_error(&msg);
        }));
    });
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

thread_local! {
    static ADAPTER: RefCell<Option<EventAdapter<BrowserPlatform>>> = const { RefCell::new(None) };
}

/// The page-wide adapter, created on first use.
fn adapter() -> Result<EventAdapter<BrowserPlatform>, JsValue> {
    ADAPTER.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(adapter) = slot.as_ref() {
            return Ok(adapter.clone());
        }
        let platform = BrowserPlatform::new().map_err(|e| JsValue::from_str(&e.to_string()))?;
        let adapter = EventAdapter::new(Rc::new(platform));
        *slot = Some(adapter.clone());
        Ok(adapter)
    })
}

fn into_thunk(effect: Effect) -> Function {
    Closure::<dyn Fn()>::new(move || effect.run())
        .into_js_value()
        .unchecked_into()
}

/// A throwing handler is reported and its listener stays installed.
fn report_thrown(result: Result<JsValue, JsValue>) {
    if let Err(err) = result {
        console_error(&format!("event handler threw: {err:?}"));
    }
}

fn call0(handler: Function) -> impl Fn() + 'static {
    move || report_thrown(handler.call0(&JsValue::UNDEFINED))
}

/// `listen(id, event, handler)`: handler on every `event` at element `id`.
#[wasm_bindgen]
pub fn listen(id: &str, event: &str, handler: Function) -> Result<Function, JsValue> {
    Ok(into_thunk(adapter()?.listen(id, event, call0(handler))))
}

/// `keydown(key, handler)`: handler on every matching window `keydown`.
#[wasm_bindgen]
pub fn keydown(key: &str, handler: Function) -> Result<Function, JsValue> {
    Ok(into_thunk(adapter()?.keydown(key, call0(handler))))
}

/// `keyup(key, handler)`: handler on every matching window `keyup`.
#[wasm_bindgen]
pub fn keyup(key: &str, handler: Function) -> Result<Function, JsValue> {
    Ok(into_thunk(adapter()?.keyup(key, call0(handler))))
}

/// `key(key, handler)`: handler at 60 Hz while `key` is held.
#[wasm_bindgen]
pub fn key(key: &str, handler: Function) -> Result<Function, JsValue> {
    Ok(into_thunk(adapter()?.key(key, call0(handler))))
}

/// `mousedown(id, handler)`: `handler(button, clientX, clientY)`.
#[wasm_bindgen]
pub fn mousedown(id: &str, handler: Function) -> Result<Function, JsValue> {
    let forward = move |button: i16, x: i32, y: i32| {
        report_thrown(handler.call3(
            &JsValue::UNDEFINED,
            &JsValue::from(button),
            &JsValue::from(x),
            &JsValue::from(y),
        ));
    };
    Ok(into_thunk(adapter()?.mousedown(id, forward)))
}

/// `frames(handler)`: `handler(dtMs)` once per animation frame.
#[wasm_bindgen]
pub fn frames(handler: Function) -> Result<Function, JsValue> {
    let forward = move |dt: f64| {
        report_thrown(handler.call1(&JsValue::UNDEFINED, &JsValue::from_f64(dt)));
    };
    Ok(into_thunk(adapter()?.frames(forward)))
}

/// `after(delayMs, handler)`: handler once after the delay.
#[wasm_bindgen]
pub fn after(delay_ms: f64, handler: Function) -> Result<Function, JsValue> {
    Ok(into_thunk(adapter()?.after(delay_ms, call0(handler))))
}

/// `resize(handler)`: handler on every window resize.
#[wasm_bindgen]
pub fn resize(handler: Function) -> Result<Function, JsValue> {
    Ok(into_thunk(adapter()?.resize(call0(handler))))
}

/// `setCanvasBackground(bg, width, height)` for the `#canvas` element.
#[wasm_bindgen(js_name = setCanvasBackground)]
pub fn set_canvas_background(bg: &str, width: f64, height: f64) -> Result<Function, JsValue> {
    Ok(into_thunk(adapter()?.set_canvas_background(bg, width, height)))
}

/// `music(src)`: looping playback. The audio element is created now.
#[wasm_bindgen]
pub fn music(src: &str) -> Result<Function, JsValue> {
    Ok(into_thunk(adapter()?.music(src)))
}

/// `sound(src)`: one-shot playback. The audio element is created now.
#[wasm_bindgen]
pub fn sound(src: &str) -> Result<Function, JsValue> {
    Ok(into_thunk(adapter()?.sound(src)))
}
