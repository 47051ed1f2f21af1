#![forbid(unsafe_code)]

//! Adapter configuration.

/// Key-repeat cadence: 60 handler calls per second.
pub const DEFAULT_REPEAT_INTERVAL_MS: f64 = 1000.0 / 60.0;

/// Element id the canvas background configurator writes to.
pub const DEFAULT_CANVAS_ELEMENT_ID: &str = "canvas";

/// Settings shared by every adapter created from one
/// [`EventAdapter`](crate::adapter::EventAdapter).
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    /// Period of the key-repeat timer, in milliseconds.
    pub repeat_interval_ms: f64,
    /// Id of the element styled by `set_canvas_background`.
    pub canvas_element_id: String,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            repeat_interval_ms: DEFAULT_REPEAT_INTERVAL_MS,
            canvas_element_id: DEFAULT_CANVAS_ELEMENT_ID.to_owned(),
        }
    }
}

impl AdapterConfig {
    #[must_use]
    pub fn with_repeat_interval_ms(mut self, repeat_interval_ms: f64) -> Self {
        self.repeat_interval_ms = repeat_interval_ms;
        self
    }

    #[must_use]
    pub fn with_canvas_element_id(mut self, id: impl Into<String>) -> Self {
        self.canvas_element_id = id.into();
        self
    }
}
