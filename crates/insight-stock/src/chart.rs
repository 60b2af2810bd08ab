//! Trend chart rendering
//!
//! Charts are rasterised in memory and returned as PNG bytes. The default
//! renderer draws the close-price line on a framed, gridded canvas with a
//! title, axis labels, price and date ticks and a legend. When the series is
//! long enough a simple moving average is overlaid.

mod font;

use crate::config::InsightConfig;
use crate::error::{Result, StockError};
use crate::model::{PricePoint, Timeframe};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use ta::Next;
use ta::indicators::SimpleMovingAverage;
use tracing::debug;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const FRAME: Rgb<u8> = Rgb([90, 90, 90]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);
const TEXT: Rgb<u8> = Rgb([40, 40, 40]);
const PRICE_LINE: Rgb<u8> = Rgb([31, 119, 180]);
const SMA_LINE: Rgb<u8> = Rgb([255, 127, 14]);

const MARGIN_LEFT: u32 = 80;
const MARGIN_RIGHT: u32 = 20;
const MARGIN_TOP: u32 = 40;
const MARGIN_BOTTOM: u32 = 50;
const GRID_ROWS: u32 = 5;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Renders a price series into an image
#[cfg_attr(test, mockall::automock)]
pub trait ChartRenderer: Send + Sync {
    /// Render `series` (oldest first) and return the encoded image bytes
    fn render(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        series: &[PricePoint],
    ) -> Result<Vec<u8>>;
}

/// PNG line chart with an optional SMA overlay
#[derive(Debug, Clone)]
pub struct PngChartRenderer {
    width: u32,
    height: u32,
    sma_period: usize,
}

impl Default for PngChartRenderer {
    fn default() -> Self {
        Self::new(1000, 500, 20)
    }
}

impl PngChartRenderer {
    /// Create a renderer; `sma_period == 0` disables the overlay
    pub fn new(width: u32, height: u32, sma_period: usize) -> Self {
        Self {
            width: width.max(MARGIN_LEFT + MARGIN_RIGHT + 2),
            height: height.max(MARGIN_TOP + MARGIN_BOTTOM + 2),
            sma_period,
        }
    }

    pub fn from_config(config: &InsightConfig) -> Self {
        Self::new(config.chart_width, config.chart_height, config.chart_sma_period)
    }

    fn moving_average(&self, closes: &[f64]) -> Option<Vec<f64>> {
        if self.sma_period == 0 || closes.len() < self.sma_period {
            return None;
        }

        let mut sma = SimpleMovingAverage::new(self.sma_period).ok()?;
        let mut values: Vec<f64> = closes.iter().map(|c| sma.next(*c)).collect();

        // The first period-1 values average over a partial window
        Some(values.split_off(self.sma_period - 1))
    }
}

impl ChartRenderer for PngChartRenderer {
    fn render(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        series: &[PricePoint],
    ) -> Result<Vec<u8>> {
        let (Some(first), Some(last)) = (series.first(), series.last()) else {
            return Err(StockError::DataAbsent {
                symbol: symbol.to_string(),
                reason: "empty price series".to_string(),
            });
        };

        let closes: Vec<f64> = series.iter().map(|p| p.close).collect();
        let sma = self.moving_average(&closes);
        let mut legend = vec![(PRICE_LINE, format!("{symbol} Price Trend"))];

        let mut canvas = Canvas::new(self.width, self.height, &closes);
        canvas.draw_grid();
        canvas.draw_series(&closes, 0, PRICE_LINE);
        if let Some(sma) = &sma {
            canvas.draw_series(sma, self.sma_period - 1, SMA_LINE);
            legend.push((SMA_LINE, format!("SMA {}", self.sma_period)));
        }
        canvas.draw_frame();

        canvas.draw_price_ticks();
        let start = first.timestamp.format(DATE_FORMAT).to_string();
        let end = (series.len() > 1).then(|| last.timestamp.format(DATE_FORMAT).to_string());
        canvas.draw_date_ticks(&start, end.as_deref());
        canvas.draw_title(&format!("{symbol} Stock Price Trend Over {timeframe}"));
        canvas.draw_axis_labels("Date", "Stock Price");
        canvas.draw_legend(&legend);

        let bytes = canvas.encode_png()?;
        debug!(
            symbol,
            %timeframe,
            points = series.len(),
            sma = sma.is_some(),
            bytes = bytes.len(),
            "Rendered chart"
        );
        Ok(bytes)
    }
}

/// Raster plus the value range mapped onto it
struct Canvas {
    img: RgbImage,
    points: usize,
    min: f64,
    max: f64,
}

impl Canvas {
    fn new(width: u32, height: u32, closes: &[f64]) -> Self {
        let min = closes.iter().copied().fold(f64::INFINITY, f64::min);
        let max = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            img: RgbImage::from_pixel(width, height, BACKGROUND),
            points: closes.len(),
            min,
            max,
        }
    }

    fn left(&self) -> i64 {
        i64::from(MARGIN_LEFT)
    }

    fn right(&self) -> i64 {
        i64::from(self.img.width() - MARGIN_RIGHT - 1)
    }

    fn top(&self) -> i64 {
        i64::from(MARGIN_TOP)
    }

    fn bottom(&self) -> i64 {
        i64::from(self.img.height() - MARGIN_BOTTOM - 1)
    }

    fn flat(&self) -> bool {
        let range = self.max - self.min;
        !range.is_finite() || range <= f64::EPSILON
    }

    fn x_at(&self, index: usize) -> i64 {
        if self.points <= 1 {
            return self.left();
        }
        let span = (self.right() - self.left()) as f64;
        self.left() + (span * index as f64 / (self.points - 1) as f64).round() as i64
    }

    fn y_at(&self, value: f64) -> i64 {
        let span = (self.bottom() - self.top()) as f64;
        if self.flat() {
            return self.top() + (span / 2.0).round() as i64;
        }
        let ratio = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        self.bottom() - (span * ratio).round() as i64
    }

    fn draw_grid(&mut self) {
        let (left, right, top, bottom) = (self.left(), self.right(), self.top(), self.bottom());
        for row in 1..GRID_ROWS {
            let y = top + (bottom - top) * i64::from(row) / i64::from(GRID_ROWS);
            self.line(left, y, right, y, GRID);
        }
    }

    fn draw_frame(&mut self) {
        let (left, right, top, bottom) = (self.left(), self.right(), self.top(), self.bottom());
        self.line(left, top, right, top, FRAME);
        self.line(left, bottom, right, bottom, FRAME);
        self.line(left, top, left, bottom, FRAME);
        self.line(right, top, right, bottom, FRAME);
    }

    /// Polyline through `values`, whose first element sits at point `offset`
    fn draw_series(&mut self, values: &[f64], offset: usize, color: Rgb<u8>) {
        if let [only] = values {
            let y = self.y_at(*only);
            let (left, right) = (self.left(), self.right());
            self.thick_line(left, y, right, y, color);
            return;
        }

        for (i, pair) in values.windows(2).enumerate() {
            let (x0, y0) = (self.x_at(offset + i), self.y_at(pair[0]));
            let (x1, y1) = (self.x_at(offset + i + 1), self.y_at(pair[1]));
            self.thick_line(x0, y0, x1, y1, color);
        }
    }

    /// Price labels left of the gridlines; a flat series gets one label
    fn draw_price_ticks(&mut self) {
        if self.flat() {
            let y = self.y_at(self.min);
            self.price_label(y, self.min);
            return;
        }

        let (top, bottom) = (self.top(), self.bottom());
        for row in 0..=GRID_ROWS {
            let y = top + (bottom - top) * i64::from(row) / i64::from(GRID_ROWS);
            let value =
                self.max - (self.max - self.min) * f64::from(row) / f64::from(GRID_ROWS);
            self.price_label(y, value);
        }
    }

    fn price_label(&mut self, y: i64, value: f64) {
        let label = format!("{value:.2}");
        let x = self.left() - 4 - i64::from(font::text_width(&label, 1));
        self.text(x, y - 3, &label, 1, TEXT);
    }

    /// First date under the left edge, last date under the right edge
    fn draw_date_ticks(&mut self, start: &str, end: Option<&str>) {
        let y = self.bottom() + 6;
        let left = self.left();
        self.text(left, y, start, 1, TEXT);
        if let Some(end) = end {
            let x = self.right() - i64::from(font::text_width(end, 1));
            self.text(x, y, end, 1, TEXT);
        }
    }

    fn draw_title(&mut self, title: &str) {
        let width = i64::from(self.img.width());
        let x = ((width - i64::from(font::text_width(title, 2))) / 2).max(0);
        self.text(x, 12, title, 2, TEXT);
    }

    fn draw_axis_labels(&mut self, x_label: &str, y_label: &str) {
        let x_width = i64::from(font::text_width(x_label, 2));
        let x = (self.left() + self.right() - x_width) / 2;
        let y = i64::from(self.img.height()) - 20;
        self.text(x, y, x_label, 2, TEXT);

        let y_width = i64::from(font::text_width(y_label, 2));
        let baseline = (self.top() + self.bottom() + y_width) / 2;
        self.vertical_text(8, baseline, y_label, 2, TEXT);
    }

    /// Boxed key in the top-left corner of the plot area
    fn draw_legend(&mut self, entries: &[(Rgb<u8>, String)]) {
        let label_width = entries
            .iter()
            .map(|(_, label)| font::text_width(label, 1))
            .max()
            .unwrap_or(0);
        let (x0, y0) = (self.left() + 10, self.top() + 10);
        let x1 = x0 + i64::from(label_width) + 44;
        let y1 = y0 + 8 + 12 * entries.len() as i64;

        self.fill_rect(x0, y0, x1 - x0, y1 - y0, BACKGROUND);
        self.line(x0, y0, x1, y0, FRAME);
        self.line(x0, y1, x1, y1, FRAME);
        self.line(x0, y0, x0, y1, FRAME);
        self.line(x1, y0, x1, y1, FRAME);

        for (i, (color, label)) in entries.iter().enumerate() {
            let y = y0 + 6 + 12 * i as i64;
            self.thick_line(x0 + 8, y + 3, x0 + 28, y + 3, *color);
            self.text(x0 + 34, y, label, 1, TEXT);
        }
    }

    fn text(&mut self, x: i64, y: i64, text: &str, scale: u32, color: Rgb<u8>) {
        let scale = i64::from(scale);
        for (i, c) in text.chars().enumerate() {
            let origin = x + i as i64 * i64::from(font::ADVANCE) * scale;
            for (col, row) in font::lit_pixels(c) {
                let (px, py) = (origin + i64::from(col) * scale, y + i64::from(row) * scale);
                self.fill_rect(px, py, scale, scale, color);
            }
        }
    }

    /// Text turned a quarter counter-clockwise, read bottom to top from `baseline`
    fn vertical_text(&mut self, x: i64, baseline: i64, text: &str, scale: u32, color: Rgb<u8>) {
        let scale = i64::from(scale);
        for (i, c) in text.chars().enumerate() {
            let origin = baseline - i as i64 * i64::from(font::ADVANCE) * scale;
            for (col, row) in font::lit_pixels(c) {
                let px = x + i64::from(row) * scale;
                let py = origin - (i64::from(col) + 1) * scale + 1;
                self.fill_rect(px, py, scale, scale, color);
            }
        }
    }

    fn fill_rect(&mut self, x: i64, y: i64, width: i64, height: i64, color: Rgb<u8>) {
        for py in y..y + height {
            for px in x..x + width {
                self.plot(px, py, color);
            }
        }
    }

    fn thick_line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        self.line(x0, y0, x1, y1, color);
        self.line(x0, y0 + 1, x1, y1 + 1, color);
    }

    /// Bresenham line, clipped to the image
    fn line(&mut self, mut x0: i64, mut y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.plot(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn plot(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if x < self.img.width() && y < self.img.height() {
            self.img.put_pixel(x, y, color);
        }
    }

    fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.img
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| StockError::Chart(format!("PNG encoding failed: {e}")))?;
        Ok(bytes)
    }
}
