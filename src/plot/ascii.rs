//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a forecast against actuals
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - actual series: `-` line
//! - forecast series: `+` line
//! - cells where both lines pass: `*`
//!
//! Missing values break a line; it resumes at the next present value.

use chrono::NaiveDateTime;

use crate::domain::LongSeries;

const ACTUAL: char = '-';
const FORECAST: char = '+';
const BOTH: char = '*';

/// Render actual (and optionally forecast) values over time.
///
/// The x axis spans from the first to the last timestamp of either series.
pub fn render_ascii_plot(actual: &LongSeries, forecast: Option<&LongSeries>, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let actual_points = points(actual);
    let forecast_points = forecast.map(points).unwrap_or_default();

    let Some((start, end)) = time_range(&actual_points, &forecast_points) else {
        return "Plot: (no data)\n".to_string();
    };
    let t_max = minutes_between(start, end).max(1.0);

    let (y_min, y_max) = y_range(&actual_points, &forecast_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let to_cell = |(ts, v): (NaiveDateTime, Option<f64>)| {
        v.map(|y| {
            (
                map_x(minutes_between(start, ts), 0.0, t_max, width),
                map_y(y, y_min, y_max, height),
            )
        })
    };

    draw_series(&mut grid, actual_points.iter().copied().map(to_cell), ACTUAL);
    draw_series(&mut grid, forecast_points.iter().copied().map(to_cell), FORECAST);

    let legend = if forecast.is_some() {
        "- actual, + forecast"
    } else {
        "- actual"
    };
    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {} .. {} | y=[{y_min:.2}, {y_max:.2}] | {legend}\n",
        start.format("%Y-%m-%d %H:%M"),
        end.format("%Y-%m-%d %H:%M"),
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn points(series: &LongSeries) -> Vec<(NaiveDateTime, Option<f64>)> {
    series.iter().collect()
}

fn time_range(
    a: &[(NaiveDateTime, Option<f64>)],
    b: &[(NaiveDateTime, Option<f64>)],
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let times = || a.iter().chain(b.iter()).map(|(ts, _)| *ts);
    Some((times().min()?, times().max()?))
}

fn minutes_between(start: NaiveDateTime, ts: NaiveDateTime) -> f64 {
    (ts - start).num_minutes() as f64
}

fn y_range(a: &[(NaiveDateTime, Option<f64>)], b: &[(NaiveDateTime, Option<f64>)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for y in a.iter().chain(b.iter()).filter_map(|(_, v)| *v) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        Some((min_y - 1.0, min_y + 1.0))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Connect consecutive present cells; `None` starts a new segment.
fn draw_series(grid: &mut [Vec<char>], cells: impl Iterator<Item = Option<(usize, usize)>>, ch: char) {
    let mut prev = None;
    for cell in cells {
        match (prev, cell) {
            (Some((x0, y0)), Some((x, y))) => draw_line(grid, x0, y0, x, y, ch),
            (None, Some((x, y))) => mark(grid, x as isize, y as isize, ch),
            _ => {}
        }
        prev = cell;
    }
}

fn mark(grid: &mut [Vec<char>], x: isize, y: isize, ch: char) {
    if y < 0 || x < 0 {
        return;
    }
    let Some(cell) = grid.get_mut(y as usize).and_then(|row| row.get_mut(x as usize)) else {
        return;
    };
    *cell = match *cell {
        ' ' => ch,
        c if c == ch => ch,
        _ => BOTH,
    };
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        mark(grid, x0, y0, ch);

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
