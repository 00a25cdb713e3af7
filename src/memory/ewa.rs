//! Elliptical weighted average filtering.
//!
//! The pixel footprint is described by its derivatives along the destination axes. They define an
//! ellipse in source space whose implicit form `A*u^2 + B*u*v + C*v^2 = F` is scaled so the
//! quadratic directly indexes a Gaussian-like weight table.

use std::sync::OnceLock;

const WEIGHT_MAX_INDEX: usize = 255;

fn weights() -> &'static [f32; WEIGHT_MAX_INDEX + 1] {
    static TABLE: OnceLock<[f32; WEIGHT_MAX_INDEX + 1]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut t = [0.0f32; WEIGHT_MAX_INDEX + 1];
        for (i, w) in t.iter_mut().enumerate() {
            *w = (-2.0 * i as f32 / WEIGHT_MAX_INDEX as f32).exp();
        }
        t
    })
}

/// Radii and orientation of a footprint ellipse.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EllipseShape {
    /// Major radius.
    pub major: f32,
    /// Minor radius (zero for degenerate footprints).
    pub minor: f32,
    /// Angle of the major axis.
    pub angle: f32,
    /// `major / minor`, `1e10` when the minor radius is zero.
    pub eccentricity: f32,
}

/// Convert the implicit ellipse coefficients to radii and angle.
pub fn implicit_to_shape(a: f32, b: f32, c: f32, f: f32) -> EllipseShape {
    let angle_of = |b: f32, amc: f32| 0.5 * (b.atan2(amc) + std::f32::consts::PI);
    if f <= 1e-5 {
        return EllipseShape {
            major: a.max(c).sqrt(),
            minor: 0.0,
            angle: angle_of(b, a - c),
            eccentricity: 1e10,
        };
    }
    let amc = a - c;
    let apc = a + c;
    let f2 = f * 2.0;
    let r = (amc * amc + b * b).sqrt();
    let d = apc - r;
    let major = if d <= 0.0 {
        a.max(c).sqrt()
    } else {
        (f2 / d).sqrt()
    };
    let d = apc + r;
    let (minor, eccentricity) = if d <= 0.0 {
        (0.0, 1e10)
    } else {
        let minor = (f2 / d).sqrt();
        (minor, major / minor)
    };
    EllipseShape {
        major,
        minor,
        angle: angle_of(b, amc),
        eccentricity,
    }
}

/// Inverse of [`implicit_to_shape`] taking squared radii. Returns `(A, B, C, F)`.
pub fn shape_to_implicit(major2: f32, minor2: f32, angle: f32) -> (f32, f32, f32, f32) {
    let (st, ct) = angle.sin_cos();
    let ct2 = ct * ct;
    let st2 = st * st;
    (
        major2 * st2 + minor2 * ct2,
        (minor2 - major2) * (2.0 * angle).sin(),
        major2 * ct2 + minor2 * st2,
        major2 * minor2,
    )
}

/// Filter the footprint centred at normalised `uv` with normalised derivatives `du`, `dv`.
///
/// `read` fetches the texel at integer source coordinates `[0, width) x [0, height)` (it is also
/// called for coordinates outside that range and should return zeros there). With `use_alpha`
/// unset the fourth result channel is forced to one.
#[allow(clippy::too_many_arguments)]
pub fn ewa_filter(
    width: i32,
    height: i32,
    interpolate: bool,
    use_alpha: bool,
    uv: [f32; 2],
    du: [f32; 2],
    dv: [f32; 2],
    mut read: impl FnMut(i32, i32, &mut [f32; 4]),
    result: &mut [f32; 4],
) {
    *result = [0.0; 4];
    if width <= 0 || height <= 0 {
        return;
    }
    let ff2 = width as f32;
    let ff = ff2.sqrt();
    let q = height as f32 / ff;
    let ux = du[0] * ff;
    let vx = du[1] * q;
    let uy = dv[0] * ff;
    let vy = dv[1] * q;
    let mut a = vx * vx + vy * vy;
    let mut b = -2.0 * (ux * vx + uy * vy);
    let mut c = ux * ux + uy * uy;
    let mut f = a * c - b * b * 0.25;

    let rmin = (if interpolate { 1.5625 } else { 0.765625 }) / ff2;
    let shape = implicit_to_shape(a, b, c, f);
    if shape.minor * shape.minor < rmin {
        let major2 = shape.major * shape.major;
        if major2 < rmin {
            b = 0.0;
            a = rmin;
            c = rmin;
            f = a * c;
        } else {
            (a, b, c, f) = shape_to_implicit(major2, rmin, shape.angle);
        }
    }

    let ue = ff * c.sqrt();
    let ve = ff * a.sqrt();
    let scale = (WEIGHT_MAX_INDEX + 1) as f32 / (f * ff2);
    a *= scale;
    b *= scale;
    c *= scale;

    let max_idx = WEIGHT_MAX_INDEX as i32;
    let u0 = uv[0] * width as f32;
    let v0 = uv[1] * height as f32;
    let centre_limit = (i32::MAX / 2) as f32;
    if !(u0.abs() < centre_limit && v0.abs() < centre_limit) {
        return;
    }
    let mut u1 = (u0 - ue).floor() as i32;
    let mut u2 = (u0 + ue).ceil() as i32;
    let mut v1 = (v0 - ve).floor() as i32;
    let mut v2 = (v0 + ve).ceil() as i32;
    if u0 - u1 as f32 > max_idx as f32 {
        u1 = u0 as i32 - max_idx;
    }
    if u2 as f32 - u0 > max_idx as f32 {
        u2 = u0 as i32 + max_idx;
    }
    if v0 - v1 as f32 > max_idx as f32 {
        v1 = v0 as i32 - max_idx;
    }
    if v2 as f32 - v0 > max_idx as f32 {
        v2 = v0 as i32 + max_idx;
    }
    if u2 < 0 || u1 >= width || v2 < 0 || v1 >= height {
        return;
    }

    let u0 = u0 - 0.5;
    let v0 = v0 - 0.5;
    let ddq = 2.0 * a;
    let u_start = u1 as f32 - u0;
    let ac1 = a * (2.0 * u_start + 1.0);
    let ac2 = a * u_start * u_start;
    let bu = b * u_start;

    let table = weights();
    let limit = (WEIGHT_MAX_INDEX + 1) as f32;
    let mut total = 0.0f32;
    let mut texel = [0.0f32; 4];
    for v in v1..=v2 {
        let vv = v as f32 - v0;
        let mut dq = ac1 + b * vv;
        let mut qv = (c * vv + bu) * vv + ac2;
        for u in u1..=u2 {
            if qv < limit {
                let wt = table[if qv < 0.0 { 0 } else { qv as usize }];
                read(u, v, &mut texel);
                for ch in 0..3 {
                    result[ch] += texel[ch] * wt;
                }
                if use_alpha {
                    result[3] += texel[3] * wt;
                }
                total += wt;
            }
            qv += dq;
            dq += ddq;
        }
    }

    if total == 0.0 {
        *result = [0.0; 4];
        return;
    }
    let inv = 1.0 / total;
    for ch in result.iter_mut().take(3) {
        *ch *= inv;
    }
    result[3] = if use_alpha { result[3] * inv } else { 1.0 };
}

#[cfg(test)]
#[path = "../../tests/unit/memory/ewa.rs"]
mod tests;
