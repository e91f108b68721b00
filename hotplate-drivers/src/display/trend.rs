//! Trend view
//!
//! Draws the live readout and the temperature trend onto any RGB565
//! `embedded-graphics` target. The screen is laid out for a 320x240
//! landscape panel:
//!
//! - setpoint at the top
//! - liquid temperature readout, SSR state and fault line in the middle
//! - a 300x50 graph at the bottom, spanning `setpoint ± 5 °C`, with the
//!   measured temperature in blue and the setpoint in red
//!
//! Geometry lives in [`TrendLayout`] so it can be checked without a panel.

use core::fmt::Write;

use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use heapless::String;

use hotplate_core::config::DEFAULT_HISTORY_CAPACITY;
use hotplate_core::history::HistorySample;
use hotplate_core::shared::SharedSnapshot;
use hotplate_core::traits::TrendRenderer;

const BACKGROUND: Rgb565 = Rgb565::WHITE;
const TEXT: Rgb565 = Rgb565::BLACK;
const ACTUAL: Rgb565 = Rgb565::BLUE;
const TARGET: Rgb565 = Rgb565::RED;
const ALERT: Rgb565 = Rgb565::RED;

/// Left edge of the text rows
const TEXT_X: i32 = 20;
/// Readout value column
const VALUE_X: i32 = 180;
const TEXT_WIDTH: u32 = 290;

const SETPOINT_Y: i32 = 20;
const READOUT_Y: i32 = 80;
const SSR_Y: i32 = 110;
const FAULT_Y: i32 = 140;

/// Graph placement and scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendLayout {
    /// Top-left corner of the graph
    pub origin: Point,
    pub size: Size,
    /// Graph spans `setpoint - half_span_c` to `setpoint + half_span_c`
    pub half_span_c: f32,
    /// Horizontal slots, one per history sample
    pub slots: usize,
}

impl Default for TrendLayout {
    fn default() -> Self {
        Self {
            origin: Point::new(10, 190),
            size: Size::new(300, 50),
            half_span_c: 5.0,
            slots: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl TrendLayout {
    /// Default placement with `slots` samples across the width
    pub fn with_slots(slots: usize) -> Self {
        Self {
            slots,
            ..Self::default()
        }
    }

    /// Graph rectangle
    pub fn area(&self) -> Rectangle {
        Rectangle::new(self.origin, self.size)
    }

    /// Screen position of sample `index` with value `value_c`
    ///
    /// `center_c` is the setpoint the vertical range is centred on. Values
    /// outside the range are pinned to the graph edge. Returns `None` for
    /// non-finite values (gaps) and for indices beyond the last slot.
    pub fn point(&self, index: usize, value_c: f32, center_c: f32) -> Option<Point> {
        if !value_c.is_finite() || !center_c.is_finite() || index >= self.slots {
            return None;
        }
        if self.size.width == 0 || self.size.height == 0 || self.half_span_c <= 0.0 {
            return None;
        }

        let column = index as u64 * u64::from(self.size.width) / self.slots as u64;
        let x = self.origin.x + column as i32;

        let rows = (self.size.height - 1) as f32;
        let min_c = center_c - self.half_span_c;
        let offset = ((value_c - min_c) * rows / (2.0 * self.half_span_c)) as i32;
        let offset = offset.clamp(0, rows as i32);
        let y = self.origin.y + rows as i32 - offset;

        Some(Point::new(x, y))
    }
}

/// [`TrendRenderer`] drawing onto an RGB565 target
pub struct TrendView<D> {
    target: D,
    layout: TrendLayout,
    cleared: bool,
}

impl<D> TrendView<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    pub fn new(target: D, layout: TrendLayout) -> Self {
        Self {
            target,
            layout,
            cleared: false,
        }
    }

    /// Get access to the draw target
    pub fn target(&self) -> &D {
        &self.target
    }

    /// Release the draw target
    pub fn into_inner(self) -> D {
        self.target
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: Point,
        font: &MonoFont<'_>,
        color: Rgb565,
    ) -> Result<(), D::Error> {
        let style = MonoTextStyle::new(font, color);
        Text::with_baseline(text, position, style, Baseline::Top).draw(&mut self.target)?;
        Ok(())
    }

    fn clear_row(&mut self, y: i32, font: &MonoFont<'_>) -> Result<(), D::Error> {
        Rectangle::new(
            Point::new(TEXT_X, y),
            Size::new(TEXT_WIDTH, font.character_size.height),
        )
        .into_styled(PrimitiveStyle::with_fill(BACKGROUND))
        .draw(&mut self.target)
    }

    fn draw_setpoint(&mut self, snapshot: &SharedSnapshot) -> Result<(), D::Error> {
        self.clear_row(SETPOINT_Y, &FONT_10X20)?;
        let mut line: String<32> = String::new();
        let _ = write!(line, "Target: {:.2} C", snapshot.setpoint_c);
        self.draw_text(&line, Point::new(TEXT_X, SETPOINT_Y), &FONT_10X20, TEXT)
    }

    fn draw_readout(&mut self, snapshot: &SharedSnapshot) -> Result<(), D::Error> {
        self.clear_row(READOUT_Y, &FONT_10X20)?;
        self.draw_text("Liquid Temp:", Point::new(TEXT_X, READOUT_Y), &FONT_10X20, TEXT)?;

        let mut value: String<16> = String::new();
        let color = match snapshot.temperature_c() {
            Some(t) => {
                let _ = write!(value, "{:.2} C", t);
                ACTUAL
            }
            None => {
                let _ = value.push_str("----");
                ALERT
            }
        };
        self.draw_text(&value, Point::new(VALUE_X, READOUT_Y), &FONT_10X20, color)
    }

    fn draw_ssr(&mut self, snapshot: &SharedSnapshot) -> Result<(), D::Error> {
        self.clear_row(SSR_Y, &FONT_10X20)?;
        let mut line: String<32> = String::new();
        let color = if snapshot.actuator.energized {
            let _ = write!(line, "SSR: ON  {} ms", snapshot.actuator.on_duration_ms);
            ALERT
        } else {
            let _ = write!(line, "SSR: OFF {} ms", snapshot.actuator.on_duration_ms);
            TEXT
        };
        self.draw_text(&line, Point::new(TEXT_X, SSR_Y), &FONT_10X20, color)
    }

    fn draw_faults(&mut self, snapshot: &SharedSnapshot) -> Result<(), D::Error> {
        self.clear_row(FAULT_Y, &FONT_6X10)?;
        let Some(first) = snapshot.faults.first() else {
            return Ok(());
        };

        let mut line: String<48> = String::new();
        let _ = line.push_str(first.description());
        let more = snapshot.faults.len() - 1;
        if more > 0 {
            let _ = write!(line, " (+{})", more);
        }
        self.draw_text(&line, Point::new(TEXT_X, FAULT_Y), &FONT_6X10, ALERT)
    }

    fn draw_graph(&mut self, center_c: f32, history: &[HistorySample]) -> Result<(), D::Error> {
        self.layout
            .area()
            .into_styled(PrimitiveStyle::with_fill(BACKGROUND))
            .draw(&mut self.target)?;

        self.draw_series(history, center_c, |s| s.actual_c, ACTUAL)?;
        self.draw_series(history, center_c, |s| s.target_c, TARGET)
    }

    /// Connect consecutive samples; non-finite samples break the line
    fn draw_series(
        &mut self,
        history: &[HistorySample],
        center_c: f32,
        value: impl Fn(&HistorySample) -> f32,
        color: Rgb565,
    ) -> Result<(), D::Error> {
        let style = PrimitiveStyle::with_stroke(color, 1);
        let layout = self.layout;
        let point = |i: usize| history.get(i).and_then(|s| layout.point(i, value(s), center_c));

        for i in 0..history.len() {
            let Some(current) = point(i) else {
                continue;
            };
            let previous = i.checked_sub(1).and_then(&point);
            match previous {
                Some(previous) => Line::new(previous, current)
                    .into_styled(style)
                    .draw(&mut self.target)?,
                // Isolated sample between two gaps
                None if point(i + 1).is_none() => {
                    Pixel(current, color).draw(&mut self.target)?
                }
                None => {}
            }
        }
        Ok(())
    }
}

impl<D> TrendRenderer for TrendView<D>
where
    D: DrawTarget<Color = Rgb565>,
{
    type Error = D::Error;

    fn render(
        &mut self,
        snapshot: &SharedSnapshot,
        history: &[HistorySample],
    ) -> Result<(), D::Error> {
        if !self.cleared {
            self.target.clear(BACKGROUND)?;
            self.cleared = true;
        }

        if !snapshot.is_published() {
            self.clear_row(READOUT_Y, &FONT_10X20)?;
            return self.draw_text(
                "Waiting for sensor",
                Point::new(TEXT_X, READOUT_Y),
                &FONT_10X20,
                TEXT,
            );
        }

        self.draw_setpoint(snapshot)?;
        self.draw_readout(snapshot)?;
        self.draw_ssr(snapshot)?;
        self.draw_faults(snapshot)?;
        self.draw_graph(snapshot.setpoint_c, history)
    }
}
