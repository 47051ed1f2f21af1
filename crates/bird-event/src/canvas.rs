#![forbid(unsafe_code)]

//! Canvas background styling.

use crate::platform::StyleProperty;

/// Background image plus explicit pixel size for the canvas element.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasBackground {
    /// CSS `background-image` value, e.g. `url(sky.png)`.
    pub image: String,
    pub width: f64,
    pub height: f64,
}

impl CanvasBackground {
    #[must_use]
    pub fn new(image: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            image: image.into(),
            width,
            height,
        }
    }

    #[must_use]
    pub fn width_px(&self) -> String {
        px(self.width)
    }

    #[must_use]
    pub fn height_px(&self) -> String {
        px(self.height)
    }

    /// `"<w>px <h>px"`.
    #[must_use]
    pub fn background_size(&self) -> String {
        format!("{} {}", self.width_px(), self.height_px())
    }

    /// Inline style writes, in application order.
    #[must_use]
    pub fn declarations(&self) -> [(StyleProperty, String); 4] {
        [
            (StyleProperty::BackgroundImage, self.image.clone()),
            (StyleProperty::BackgroundSize, self.background_size()),
            (StyleProperty::Width, self.width_px()),
            (StyleProperty::Height, self.height_px()),
        ]
    }
}

fn px(value: f64) -> String {
    format!("{}px", js_number(value))
}

/// Format a number the way JS `Number.prototype.toString` does: shortest
/// round-trip digits, `-0` as `0`, and exponent notation outside
/// `[1e-6, 1e21)`.
fn js_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }
    if value.is_infinite() {
        let sign = if value < 0.0 { "-" } else { "" };
        return format!("{sign}Infinity");
    }
    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let sci = format!("{value:e}");
        if let Some((mantissa, exponent)) = sci.split_once('e') {
            let sign = if exponent.starts_with('-') { "" } else { "+" };
            return format!("{mantissa}e{sign}{exponent}");
        }
    }
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn eight_hundred_by_six_hundred() {
        let bg = CanvasBackground::new("url(sky.png)", 800.0, 600.0);
        assert_eq!(bg.width_px(), "800px");
        assert_eq!(bg.height_px(), "600px");
        assert_eq!(bg.background_size(), "800px 600px");
    }

    #[test]
    fn declarations_in_order() {
        let bg = CanvasBackground::new("url(a.png)", 320.0, 240.0);
        assert_eq!(
            bg.declarations(),
            [
                (StyleProperty::BackgroundImage, "url(a.png)".to_owned()),
                (StyleProperty::BackgroundSize, "320px 240px".to_owned()),
                (StyleProperty::Width, "320px".to_owned()),
                (StyleProperty::Height, "240px".to_owned()),
            ]
        );
    }

    #[test]
    fn fractional_and_edge_values() {
        assert_eq!(px(12.5), "12.5px");
        assert_eq!(px(-0.0), "0px");
        assert_eq!(px(f64::INFINITY), "Infinitypx");
        assert_eq!(px(f64::NAN), "NaNpx");
    }

    #[test]
    fn very_large_and_small_values_use_exponents() {
        let bg = CanvasBackground::new("x", 1e21, 1e-7);
        assert_eq!(bg.background_size(), "1e+21px 1e-7px");
        assert_eq!(js_number(1.5e22), "1.5e+22");
        assert_eq!(js_number(-2.5e-8), "-2.5e-8");
        assert_eq!(js_number(1e20), "100000000000000000000");
        assert_eq!(js_number(0.000_001), "0.000001");
    }
}
