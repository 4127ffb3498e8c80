//! ASCII residual map for terminal output.
//!
//! The local plane is drawn with Z (east) across and X (north) up, matching
//! how the mission editor shows it. Residuals of a good fit are tiny
//! compared with the map, so arrows are exaggerated by a common factor
//! printed in the header.
//!
//! Plot elements:
//! - known record position: `o`
//! - residual arrow towards the predicted position: `.` line ending in `+`

use crate::domain::RecordResidual;

/// Longest arrow as a fraction of the larger map span.
const ARROW_FRACTION: f64 = 0.1;

/// Render known positions with exaggerated residual arrows.
pub fn render_residual_map(residuals: &[RecordResidual], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (z_min, z_max) = range(residuals.iter().map(|r| r.record.local.z)).unwrap_or((-1.0, 1.0));
    let (x_min, x_max) = range(residuals.iter().map(|r| r.record.local.x)).unwrap_or((-1.0, 1.0));
    let (z_min, z_max) = pad_range(z_min, z_max, 0.05);
    let (x_min, x_max) = pad_range(x_min, x_max, 0.05);

    let d_max = residuals.iter().map(|r| r.distance).fold(0.0_f64, f64::max);
    let exaggeration = if d_max > 0.0 {
        ARROW_FRACTION * (z_max - z_min).max(x_max - x_min) / d_max
    } else {
        0.0
    };

    let mut grid = vec![vec![' '; width]; height];

    // Arrows first so positions overlay them.
    if exaggeration > 0.0 {
        for r in residuals {
            let from = (
                map_x(r.record.local.z, z_min, z_max, width),
                map_y(r.record.local.x, x_min, x_max, height),
            );
            let to = (
                map_x(r.record.local.z - exaggeration * r.dz, z_min, z_max, width),
                map_y(r.record.local.x - exaggeration * r.dx, x_min, x_max, height),
            );
            if from != to {
                draw_line(&mut grid, from, to, '.');
                grid[to.1][to.0] = '+';
            }
        }
    }

    for r in residuals {
        let col = map_x(r.record.local.z, z_min, z_max, width);
        let row = map_y(r.record.local.x, x_min, x_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Residual map: Z=[{z_min:.0}, {z_max:.0}] m (east) | X=[{x_min:.0}, {x_max:.0}] m (north) | arrows x{exaggeration:.0}\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !(min.is_finite() && max.is_finite()) {
        return None;
    }
    if max > min {
        Some((min, max))
    } else {
        // A single point (or a line of them): give the axis some width.
        Some((min - 1.0, max + 1.0))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(v: f64, min: f64, max: f64, width: usize) -> usize {
    let u = ((v - min) / (max - min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(v: f64, min: f64, max: f64, height: usize) -> usize {
    let u = ((v - min) / (max - min)).clamp(0.0, 1.0);
    // max is the top row
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham) that never overwrites existing marks.
fn draw_line(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char) {
    let (mut x0, mut y0) = (from.0 as isize, from.1 as isize);
    let (x1, y1) = (to.0 as isize, to.1 as isize);

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
    use crate::domain::{CorrespondenceRecord, GeodeticCoordinate, LocalCoordinate};

    fn residual(x: f64, z: f64, dx: f64, dz: f64) -> RecordResidual {
        RecordResidual {
            record: CorrespondenceRecord {
                label: format!("{x},{z}"),
                geodetic: GeodeticCoordinate::new(25.0, 56.0).unwrap(),
                local: LocalCoordinate::new(x, z),
            },
            predicted: LocalCoordinate::new(x - dx, z - dz),
            dx,
            dz,
            distance: dx.hypot(dz),
        }
    }

    #[test]
    fn map_golden_snapshot_small() {
        let residuals = vec![residual(0.0, 0.0, 0.0, 0.0), residual(100.0, 100.0, 0.0, 0.0)];
        let txt = render_residual_map(&residuals, 10, 5);
        let expected = concat!(
            "Residual map: Z=[-5, 105] m (east) | X=[-5, 105] m (north) | arrows x0\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn arrows_point_at_predictions() {
        // Predicted 1 m east of the known point: arrow goes right.
        let residuals = vec![
            residual(0.0, 0.0, 0.0, -1.0),
            residual(1000.0, 1000.0, 0.0, 0.0),
            residual(0.0, 1000.0, 0.0, 0.0),
        ];
        let txt = render_residual_map(&residuals, 40, 10);
        let bottom = txt.lines().last().unwrap().trim_start();
        assert!(bottom.starts_with("o..."), "{txt}");
        assert!(bottom.contains('+'), "{txt}");
    }
}
