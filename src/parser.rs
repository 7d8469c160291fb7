use std::f64::consts::{FRAC_PI_2, PI};

use glam::DVec2;

use crate::error::{Error, Result};
use crate::types::PathCommand;

/// Parse an SVG path `d` attribute into absolute commands.
///
/// Relative commands are resolved, H/V become lines, smooth curves get their
/// reflected control point and arcs are converted to cubic segments. The
/// command order is kept as written; validating it is the extractor's job.
/// Errors report `command_index` as the number of commands emitted so far.
pub fn parse_path_data(d: &str) -> Result<Vec<PathCommand>> {
    let mut scanner = Scanner::new(d);
    let mut commands = Vec::new();

    let mut current = DVec2::ZERO;
    let mut subpath_start = DVec2::ZERO;
    // Last control point of the previous curve, for S and T
    let mut last_cubic_ctrl: Option<DVec2> = None;
    let mut last_quad_ctrl: Option<DVec2> = None;
    let mut command: Option<u8> = None;

    loop {
        scanner.skip_separators();
        let Some(ch) = scanner.peek() else {
            break;
        };

        if ch.is_ascii_alphabetic() {
            scanner.pos += 1;
            command = Some(ch);
        } else if command.is_none() || !scanner.at_number() {
            return Err(parse_error(
                commands.len(),
                format!("expected a command letter, found '{}'", ch as char),
            ));
        } else if let Some(prev) = command {
            // Implicit repetition; extra moveto pairs are linetos
            command = Some(match prev {
                b'M' => b'L',
                b'm' => b'l',
                b'Z' | b'z' => {
                    return Err(parse_error(
                        commands.len(),
                        "numbers are not allowed after a close command".to_string(),
                    ));
                }
                other => other,
            });
        }

        let Some(cmd) = command else {
            break;
        };
        let relative = cmd.is_ascii_lowercase();
        let base = if relative { current } else { DVec2::ZERO };
        let index = commands.len();

        let mut next_cubic_ctrl = None;
        let mut next_quad_ctrl = None;

        match cmd.to_ascii_uppercase() {
            b'M' => {
                let p = base + scanner.point(index)?;
                commands.push(PathCommand::MoveTo(p));
                current = p;
                subpath_start = p;
            }
            b'L' => {
                let p = base + scanner.point(index)?;
                commands.push(PathCommand::LineTo(p));
                current = p;
            }
            b'H' => {
                let x = scanner.number(index)?;
                let p = DVec2::new(if relative { current.x + x } else { x }, current.y);
                commands.push(PathCommand::LineTo(p));
                current = p;
            }
            b'V' => {
                let y = scanner.number(index)?;
                let p = DVec2::new(current.x, if relative { current.y + y } else { y });
                commands.push(PathCommand::LineTo(p));
                current = p;
            }
            b'C' => {
                let ctrl1 = base + scanner.point(index)?;
                let ctrl2 = base + scanner.point(index)?;
                let end = base + scanner.point(index)?;
                commands.push(PathCommand::CubicTo { ctrl1, ctrl2, end });
                next_cubic_ctrl = Some(ctrl2);
                current = end;
            }
            b'S' => {
                let ctrl1 = last_cubic_ctrl.map_or(current, |c| current * 2.0 - c);
                let ctrl2 = base + scanner.point(index)?;
                let end = base + scanner.point(index)?;
                commands.push(PathCommand::CubicTo { ctrl1, ctrl2, end });
                next_cubic_ctrl = Some(ctrl2);
                current = end;
            }
            b'Q' => {
                let ctrl = base + scanner.point(index)?;
                let end = base + scanner.point(index)?;
                commands.push(PathCommand::QuadTo { ctrl, end });
                next_quad_ctrl = Some(ctrl);
                current = end;
            }
            b'T' => {
                let ctrl = last_quad_ctrl.map_or(current, |c| current * 2.0 - c);
                let end = base + scanner.point(index)?;
                commands.push(PathCommand::QuadTo { ctrl, end });
                next_quad_ctrl = Some(ctrl);
                current = end;
            }
            b'A' => {
                let rx = scanner.number(index)?;
                let ry = scanner.number(index)?;
                let rotation = scanner.number(index)?;
                let large_arc = scanner.flag(index)?;
                let sweep = scanner.flag(index)?;
                let end = base + scanner.point(index)?;
                let arc = Arc {
                    from: current,
                    radii: DVec2::new(rx, ry),
                    rotation_deg: rotation,
                    large_arc,
                    sweep,
                    to: end,
                };
                commands.extend(arc.to_commands());
                current = end;
            }
            b'Z' => {
                commands.push(PathCommand::Close);
                current = subpath_start;
            }
            other => {
                return Err(parse_error(
                    index,
                    format!("unsupported command '{}'", other as char),
                ));
            }
        }

        last_cubic_ctrl = next_cubic_ctrl;
        last_quad_ctrl = next_quad_ctrl;
    }

    Ok(commands)
}

fn parse_error(command_index: usize, message: String) -> Error {
    Error::SvgParse {
        path_index: 0,
        command_index,
        message,
    }
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            bytes: s.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_separators(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() || ch == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn at_number(&mut self) -> bool {
        self.skip_separators();
        matches!(self.peek(), Some(ch) if ch.is_ascii_digit() || matches!(ch, b'+' | b'-' | b'.'))
    }

    fn number(&mut self, index: usize) -> Result<f64> {
        self.skip_separators();
        let start = self.pos;

        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut seen_dot = false;
        let mut seen_digit = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                seen_digit = true;
                self.pos += 1;
            } else if ch == b'.' && !seen_dot {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        // Exponent, only when followed by digits so "1e" stays a bad number
        if seen_digit && matches!(self.peek(), Some(b'e' | b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
                while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = mark;
            }
        }

        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default();
        if !seen_digit {
            return Err(parse_error(
                index,
                match self.peek() {
                    Some(ch) => format!("expected a number, found '{}'", ch as char),
                    None => "expected a number, found end of data".to_string(),
                },
            ));
        }
        let value = text
            .parse::<f64>()
            .map_err(|e| parse_error(index, format!("invalid number '{}': {}", text, e)))?;
        if !value.is_finite() {
            return Err(parse_error(index, format!("number '{}' is out of range", text)));
        }
        Ok(value)
    }

    fn point(&mut self, index: usize) -> Result<DVec2> {
        let x = self.number(index)?;
        let y = self.number(index)?;
        Ok(DVec2::new(x, y))
    }

    /// Arc flags are a single 0 or 1 and may run into the next number
    fn flag(&mut self, index: usize) -> Result<bool> {
        self.skip_separators();
        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                Ok(false)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(true)
            }
            _ => Err(parse_error(index, "expected an arc flag (0 or 1)".to_string())),
        }
    }
}

/// Elliptical arc in SVG endpoint parameterization
struct Arc {
    from: DVec2,
    radii: DVec2,
    rotation_deg: f64,
    large_arc: bool,
    sweep: bool,
    to: DVec2,
}

impl Arc {
    /// Convert to cubic segments spanning at most a quarter turn each
    fn to_commands(&self) -> Vec<PathCommand> {
        if self.from == self.to {
            return Vec::new();
        }
        let mut rx = self.radii.x.abs();
        let mut ry = self.radii.y.abs();
        if rx == 0.0 || ry == 0.0 {
            return vec![PathCommand::LineTo(self.to)];
        }

        let (sin_phi, cos_phi) = self.rotation_deg.to_radians().sin_cos();
        let half = (self.from - self.to) * 0.5;
        let x1p = cos_phi * half.x + sin_phi * half.y;
        let y1p = -sin_phi * half.x + cos_phi * half.y;

        // Scale radii up when the endpoints are too far apart
        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            let s = lambda.sqrt();
            rx *= s;
            ry *= s;
        }

        let num = rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p;
        let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
        let mut coef = if den > 0.0 { (num / den).max(0.0).sqrt() } else { 0.0 };
        if self.large_arc == self.sweep {
            coef = -coef;
        }
        let cxp = coef * rx * y1p / ry;
        let cyp = -coef * ry * x1p / rx;
        let mid = (self.from + self.to) * 0.5;
        let center = DVec2::new(
            cos_phi * cxp - sin_phi * cyp + mid.x,
            sin_phi * cxp + cos_phi * cyp + mid.y,
        );

        let u = DVec2::new((x1p - cxp) / rx, (y1p - cyp) / ry);
        let v = DVec2::new((-x1p - cxp) / rx, (-y1p - cyp) / ry);
        let theta1 = angle_between(DVec2::X, u);
        let mut delta = angle_between(u, v);
        if !self.sweep && delta > 0.0 {
            delta -= 2.0 * PI;
        } else if self.sweep && delta < 0.0 {
            delta += 2.0 * PI;
        }

        let segments = (delta.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
        let step = delta / segments as f64;
        let k = 4.0 / 3.0 * (step / 4.0).tan();

        let map = |p: DVec2| {
            DVec2::new(
                center.x + rx * cos_phi * p.x - ry * sin_phi * p.y,
                center.y + rx * sin_phi * p.x + ry * cos_phi * p.y,
            )
        };

        (0..segments)
            .map(|i| {
                let a1 = theta1 + step * i as f64;
                let a2 = a1 + step;
                let (s1, c1) = a1.sin_cos();
                let (s2, c2) = a2.sin_cos();
                let ctrl1 = map(DVec2::new(c1 - k * s1, s1 + k * c1));
                let ctrl2 = map(DVec2::new(c2 + k * s2, s2 - k * c2));
                let end = if i + 1 == segments {
                    self.to
                } else {
                    map(DVec2::new(c2, s2))
                };
                PathCommand::CubicTo { ctrl1, ctrl2, end }
            })
            .collect()
    }
}

fn angle_between(u: DVec2, v: DVec2) -> f64 {
    (u.x * v.y - u.y * v.x).atan2(u.dot(v))
}
