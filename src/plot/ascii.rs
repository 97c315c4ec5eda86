//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - fitted curves: `-` line (one per experiment, starting at t = 0)
//! - observed points: one marker per experiment (`o`, `x`, `+`, ...)

use crate::domain::{CurveGrid, ExperimentData, FitFile, ParameterSet};
use crate::io::{GRID_POINTS, build_grid};

const MARKERS: [char; 6] = ['o', 'x', '+', '*', '#', '@'];

/// One experiment's observed points and fitted curve.
#[derive(Debug, Clone)]
struct Series {
    label: String,
    marker: char,
    observed: Vec<(f64, f64)>,
    curve: Vec<(f64, f64)>,
}

/// Render observed vs fitted concentrations for an in-memory fit.
pub fn render_ascii_plot(
    experiments: &[ExperimentData],
    params: &ParameterSet,
    width: usize,
    height: usize,
) -> String {
    let grids: Vec<CurveGrid> = experiments
        .iter()
        .map(|exp| build_grid(exp, params, GRID_POINTS))
        .collect();
    render_plot(&collect_series(experiments, &grids), width, height)
}

/// Render a plot from a saved fit JSON file (stored grids + observations).
pub fn render_ascii_plot_from_fit_file(fit_file: &FitFile, width: usize, height: usize) -> String {
    render_plot(
        &collect_series(&fit_file.experiments, &fit_file.grids),
        width,
        height,
    )
}

fn collect_series(experiments: &[ExperimentData], grids: &[CurveGrid]) -> Vec<Series> {
    experiments
        .iter()
        .zip(grids.iter())
        .enumerate()
        .map(|(i, (exp, grid))| Series {
            label: exp.display_label(),
            marker: MARKERS[i % MARKERS.len()],
            observed: exp.times.iter().copied().zip(exp.c_a.iter().copied()).collect(),
            curve: grid.time.iter().copied().zip(grid.c_a.iter().copied()).collect(),
        })
        .collect()
}

fn render_plot(series: &[Series], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (t_min, t_max) = axis_range(series, |p| p.0).unwrap_or((0.0, 1.0));
    let (c_min, c_max) = axis_range(series, |p| p.1).unwrap_or((0.0, 1.0));
    let (c_min, c_max) = pad_range(c_min, c_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curves first (so points can overlay).
    for s in series {
        draw_curve(&mut grid, &s.curve, t_min, t_max, c_min, c_max);
    }

    for s in series {
        for &(t, c) in &s.observed {
            if !(t.is_finite() && c.is_finite()) {
                continue;
            }
            let x = map_x(t, t_min, t_max, width);
            let y = map_y(c, c_min, c_max, height);
            grid[y][x] = s.marker;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: t=[{t_min:.2}, {t_max:.2}]s | c_A=[{c_min:.2}, {c_max:.2}] mol/L\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    let legend: Vec<String> = series
        .iter()
        .map(|s| format!("{} {}", s.marker, s.label))
        .collect();
    out.push_str(&format!("Legend: - fit | {}\n", legend.join(" | ")));

    out
}

/// Finite min/max of one coordinate over every observed and curve point.
fn axis_range(series: &[Series], coord: impl Fn(&(f64, f64)) -> f64) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for s in series {
        for p in s.observed.iter().chain(s.curve.iter()) {
            let v = coord(p);
            if v.is_finite() {
                min = min.min(v);
                max = max.max(v);
            }
        }
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
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

fn map_y(c: f64, c_min: f64, c_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((c - c_min) / (c_max - c_min)).clamp(0.0, 1.0);
    // c=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, c_min: f64, c_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, c) in curve {
        if !(t.is_finite() && c.is_finite()) {
            prev = None;
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let y = map_y(c, c_min, c_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, y, '-');
        } else if grid[y][x] == ' ' {
            grid[y][x] = '-';
        }
        prev = Some((x, y));
    }
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
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{REFERENCE_TRUTH, reference_experiments};

    #[test]
    fn plot_golden_snapshot_small() {
        let series = vec![Series {
            label: "run".to_string(),
            marker: 'o',
            observed: vec![(0.0, 1.0), (10.0, 0.0)],
            curve: vec![(0.0, 0.5), (10.0, 0.5)],
        }];

        let txt = render_plot(&series, 10, 5);
        let expected = concat!(
            "Plot: t=[0.00, 10.00]s | c_A=[-0.05, 1.05] mol/L\n",
            "o         \n",
            "          \n",
            "----------\n",
            "          \n",
            "         o\n",
            "Legend: - fit | o run\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn reference_plot_marks_every_experiment() {
        let exps = reference_experiments();
        let txt = render_ascii_plot(&exps, &REFERENCE_TRUTH, 60, 20);
        let lines: Vec<&str> = txt.lines().collect();

        assert_eq!(lines.len(), 1 + 20 + 1);
        assert!(lines[0].starts_with("Plot: t=[0.00, 100.00]s"));
        assert!(lines[1..21].iter().all(|l| l.chars().count() == 60));
        // Every curve starts at cA0, just below the padded top edge.
        assert!(lines[2].starts_with('-'));
        for marker in ['o', 'x', '+'] {
            assert!(lines[1..21].iter().any(|l| l.contains(marker)), "missing {marker}");
        }
        assert_eq!(
            lines[21],
            "Legend: - fit | o 298.15 K | x 308.15 K | + 323.15 K"
        );
        assert_eq!(txt, render_ascii_plot(&exps, &REFERENCE_TRUTH, 60, 20));
    }
}
