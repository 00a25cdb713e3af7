use crate::foundation::rect::Rect;
use crate::memory::ewa::ewa_filter;

/// Pixel element layout carried by sockets and buffers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum DataType {
    /// One channel.
    Value,
    /// Three channels (x, y, z).
    Vector,
    /// Four channels (r, g, b, a).
    Color,
}

impl DataType {
    /// Channels per element.
    pub const fn num_channels(self) -> usize {
        match self {
            DataType::Value => 1,
            DataType::Vector => 3,
            DataType::Color => 4,
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            DataType::Value => 0,
            DataType::Vector => 1,
            DataType::Color => 2,
        }
    }
}

/// Interpolation used by [`MemoryBuffer::read`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PixelSampler {
    /// Closest element.
    #[default]
    Nearest,
    /// Linear blend of the 2x2 neighbourhood.
    Bilinear,
    /// Cubic B-spline over the 4x4 neighbourhood.
    Bicubic,
}

/// Boundary handling for reads outside a buffer's rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MemoryBufferExtend {
    /// Outside reads are zero.
    #[default]
    Clip,
    /// Outside reads clamp to the nearest edge element.
    Extend,
    /// Outside reads wrap around.
    Repeat,
}

/// Ownership state of a buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub enum BufferState {
    /// Canonical buffer owned by a memory proxy or the full-frame executor.
    #[default]
    Default,
    /// Scratch buffer owned by whoever constructed it; dropped once the consuming chunk finalizes.
    Temporary,
}

/// Flat strided float storage over a rectangle.
///
/// A single-element buffer stores exactly one element and answers every read with it, which is
/// how constant operations avoid allocating full-resolution storage.
#[derive(Clone, Debug)]
pub struct MemoryBuffer {
    data_type: DataType,
    num_channels: usize,
    rect: Rect,
    buffer: Vec<f32>,
    is_a_single_elem: bool,
    elem_stride: usize,
    row_stride: usize,
    state: BufferState,
}

impl MemoryBuffer {
    /// Zero-initialised buffer covering `rect`.
    pub fn new(data_type: DataType, rect: Rect) -> Self {
        Self::with_state(data_type, rect, false, BufferState::Default)
    }

    /// Zero-initialised single-element buffer nominally covering `rect`.
    pub fn new_single_elem(data_type: DataType, rect: Rect) -> Self {
        Self::with_state(data_type, rect, true, BufferState::Default)
    }

    /// Single-element buffer holding `elem`.
    ///
    /// `elem` is truncated or zero-padded to the channel count of `data_type`.
    pub fn from_elem(data_type: DataType, elem: &[f32]) -> Self {
        let mut b = Self::new_single_elem(data_type, Rect::from_size(1, 1));
        let n = b.num_channels.min(elem.len());
        b.buffer[..n].copy_from_slice(&elem[..n]);
        b
    }

    /// Buffer with explicit single-element mode and ownership state.
    pub fn with_state(
        data_type: DataType,
        rect: Rect,
        is_a_single_elem: bool,
        state: BufferState,
    ) -> Self {
        let num_channels = data_type.num_channels();
        let (len, elem_stride, row_stride) = if is_a_single_elem {
            (num_channels, 0, 0)
        } else {
            let w = rect.width() as usize;
            (
                w * rect.height() as usize * num_channels,
                num_channels,
                w * num_channels,
            )
        };
        Self {
            data_type,
            num_channels,
            rect,
            buffer: vec![0.0; len],
            is_a_single_elem,
            elem_stride,
            row_stride,
            state,
        }
    }

    /// Element layout.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Channels per element.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Placement of the buffer in canvas coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Width of the covered rectangle.
    pub fn width(&self) -> i32 {
        self.rect.width()
    }

    /// Height of the covered rectangle.
    pub fn height(&self) -> i32 {
        self.rect.height()
    }

    /// Return `true` for single-element (broadcast) buffers.
    pub fn is_a_single_elem(&self) -> bool {
        self.is_a_single_elem
    }

    /// Ownership state.
    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Return `true` for scratch buffers.
    pub fn is_temporary(&self) -> bool {
        self.state == BufferState::Temporary
    }

    /// Distance in floats between horizontally adjacent elements (zero for single-element buffers).
    pub fn elem_stride(&self) -> usize {
        self.elem_stride
    }

    /// Distance in floats between vertically adjacent elements (zero for single-element buffers).
    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    /// Raw storage.
    pub fn as_slice(&self) -> &[f32] {
        &self.buffer
    }

    /// The broadcast element of a single-element buffer.
    pub fn single_elem(&self) -> Option<&[f32]> {
        self.is_a_single_elem
            .then(|| &self.buffer[..self.num_channels])
    }

    fn offset(&self, x: i32, y: i32) -> usize {
        (y - self.rect.ymin) as usize * self.row_stride
            + (x - self.rect.xmin) as usize * self.elem_stride
    }

    /// Return `true` when `(x, y)` maps to stored data.
    pub fn has_coords(&self, x: i32, y: i32) -> bool {
        self.is_a_single_elem || self.rect.contains(x, y)
    }

    /// Element at `(x, y)`, `None` outside the rectangle.
    pub fn elem(&self, x: i32, y: i32) -> Option<&[f32]> {
        if !self.has_coords(x, y) {
            return None;
        }
        if self.is_a_single_elem {
            return Some(&self.buffer[..self.num_channels]);
        }
        let o = self.offset(x, y);
        Some(&self.buffer[o..o + self.num_channels])
    }

    /// Mutable element at `(x, y)`, `None` outside the rectangle.
    pub fn elem_mut(&mut self, x: i32, y: i32) -> Option<&mut [f32]> {
        if !self.has_coords(x, y) {
            return None;
        }
        let n = self.num_channels;
        if self.is_a_single_elem {
            return Some(&mut self.buffer[..n]);
        }
        let o = self.offset(x, y);
        Some(&mut self.buffer[o..o + n])
    }

    /// Write `value` at `(x, y)`; ignored outside the rectangle.
    pub fn write_elem(&mut self, x: i32, y: i32, value: &[f32]) {
        if let Some(dst) = self.elem_mut(x, y) {
            let n = dst.len().min(value.len());
            dst[..n].copy_from_slice(&value[..n]);
        }
    }

    /// Copy the element at `(x, y)` into `out`, zero outside the rectangle.
    pub fn read_elem_checked(&self, x: i32, y: i32, out: &mut [f32]) {
        match self.elem(x, y) {
            Some(e) => copy_elem(out, e),
            None => out.iter_mut().for_each(|v| *v = 0.0),
        }
    }

    /// Sample at `(x, y)` with the given interpolation and boundary handling.
    ///
    /// `out` receives `num_channels` values. Coordinates are in canvas space; integer coordinates
    /// address element `(x, y)` exactly for every sampler except [`PixelSampler::Bicubic`].
    pub fn read(
        &self,
        out: &mut [f32],
        x: f32,
        y: f32,
        sampler: PixelSampler,
        extend_x: MemoryBufferExtend,
        extend_y: MemoryBufferExtend,
    ) {
        if self.is_a_single_elem {
            copy_elem(out, &self.buffer[..self.num_channels]);
            return;
        }
        if self.rect.is_empty() {
            out.iter_mut().for_each(|v| *v = 0.0);
            return;
        }
        match sampler {
            PixelSampler::Nearest => {
                let (xi, _) = split_coord(x);
                let (yi, _) = split_coord(y);
                match self.tap(xi, yi, extend_x, extend_y) {
                    Some(e) => copy_elem(out, e),
                    None => out.iter_mut().for_each(|v| *v = 0.0),
                }
            }
            PixelSampler::Bilinear => self.read_bilinear(out, x, y, extend_x, extend_y),
            PixelSampler::Bicubic => self.read_bicubic(out, x, y, extend_x, extend_y),
        }
    }

    fn tap(
        &self,
        x: i64,
        y: i64,
        extend_x: MemoryBufferExtend,
        extend_y: MemoryBufferExtend,
    ) -> Option<&[f32]> {
        let x = wrap_coord(x, self.rect.xmin, self.rect.width(), extend_x)?;
        let y = wrap_coord(y, self.rect.ymin, self.rect.height(), extend_y)?;
        self.elem(x, y)
    }

    fn read_bilinear(
        &self,
        out: &mut [f32],
        x: f32,
        y: f32,
        extend_x: MemoryBufferExtend,
        extend_y: MemoryBufferExtend,
    ) {
        let (x1, a) = split_coord(x);
        let (y1, b) = split_coord(y);
        let taps = [
            (x1, y1, (1.0 - a) * (1.0 - b)),
            (x1 + 1, y1, a * (1.0 - b)),
            (x1, y1 + 1, (1.0 - a) * b),
            (x1 + 1, y1 + 1, a * b),
        ];
        self.accumulate(out, &taps, extend_x, extend_y);
    }

    fn read_bicubic(
        &self,
        out: &mut [f32],
        x: f32,
        y: f32,
        extend_x: MemoryBufferExtend,
        extend_y: MemoryBufferExtend,
    ) {
        let (x1, fx) = split_coord(x);
        let (y1, fy) = split_coord(y);
        let wx = bspline_weights(fx);
        let wy = bspline_weights(fy);
        let mut taps = [(0i64, 0i64, 0.0f32); 16];
        for (j, wyj) in wy.iter().enumerate() {
            for (i, wxi) in wx.iter().enumerate() {
                taps[j * 4 + i] = (x1 - 1 + i as i64, y1 - 1 + j as i64, wxi * wyj);
            }
        }
        self.accumulate(out, &taps, extend_x, extend_y);
    }

    fn accumulate(
        &self,
        out: &mut [f32],
        taps: &[(i64, i64, f32)],
        extend_x: MemoryBufferExtend,
        extend_y: MemoryBufferExtend,
    ) {
        let n = out.len().min(self.num_channels);
        out.iter_mut().for_each(|v| *v = 0.0);
        for &(tx, ty, w) in taps {
            if w == 0.0 {
                continue;
            }
            if let Some(e) = self.tap(tx, ty, extend_x, extend_y) {
                for c in 0..n {
                    out[c] += e[c] * w;
                }
            }
        }
    }

    /// Elliptical weighted average read for minification.
    ///
    /// `dx` and `dy` are the pixel-space derivatives of the sampling footprint along the
    /// destination x and y axes.
    pub fn read_ewa(&self, out: &mut [f32], x: f32, y: f32, dx: [f32; 2], dy: [f32; 2]) {
        if self.is_a_single_elem {
            copy_elem(out, &self.buffer[..self.num_channels]);
            return;
        }
        let w = self.width();
        let h = self.height();
        if w == 0 || h == 0 {
            out.iter_mut().for_each(|v| *v = 0.0);
            return;
        }
        let inv_w = 1.0 / w as f32;
        let inv_h = 1.0 / h as f32;
        let uv = [
            (x - self.rect.xmin as f32) * inv_w,
            (y - self.rect.ymin as f32) * inv_h,
        ];
        let du = [dx[0] * inv_w, dx[1] * inv_h];
        let dv = [dy[0] * inv_w, dy[1] * inv_h];
        let use_alpha = self.num_channels == 4;
        let mut result = [0.0f32; 4];
        ewa_filter(
            w,
            h,
            false,
            use_alpha,
            uv,
            du,
            dv,
            |u, v, px: &mut [f32; 4]| {
                *px = [0.0; 4];
                let n = self.num_channels;
                self.read_elem_checked(u + self.rect.xmin, v + self.rect.ymin, &mut px[..n]);
            },
            &mut result,
        );
        copy_elem(out, &result[..self.num_channels]);
    }

    /// Set every element inside `area` to `value`.
    pub fn fill(&mut self, area: Rect, value: &[f32]) {
        if self.is_a_single_elem {
            copy_elem(&mut self.buffer, value);
            return;
        }
        let area = area.intersect(&self.rect);
        for y in area.ymin..area.ymax {
            for x in area.xmin..area.xmax {
                self.write_elem(x, y, value);
            }
        }
    }

    /// Zero every element.
    pub fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Copy `area` of `src` into the same coordinates of `self`.
    ///
    /// Only the part of `area` covered by both buffers is copied. A single-element `src`
    /// broadcasts its element.
    pub fn copy_from(&mut self, src: &MemoryBuffer, area: Rect) {
        if self.is_a_single_elem {
            if let Some(e) = src.elem(area.xmin, area.ymin) {
                copy_elem(&mut self.buffer, e);
            }
            return;
        }
        let area = if src.is_a_single_elem {
            area.intersect(&self.rect)
        } else {
            area.intersect(&self.rect).intersect(&src.rect)
        };
        if area.is_empty() {
            return;
        }
        let n = self.num_channels.min(src.num_channels);
        if src.is_a_single_elem {
            let e = &src.buffer[..src.num_channels];
            for y in area.ymin..area.ymax {
                for x in area.xmin..area.xmax {
                    let o = self.offset(x, y);
                    self.buffer[o..o + n].copy_from_slice(&e[..n]);
                }
            }
            return;
        }
        if self.num_channels == src.num_channels {
            let row_len = area.width() as usize * self.num_channels;
            for y in area.ymin..area.ymax {
                let d = self.offset(area.xmin, y);
                let s = src.offset(area.xmin, y);
                let row = &src.buffer[s..s + row_len];
                self.buffer[d..d + row_len].copy_from_slice(row);
            }
            return;
        }
        for y in area.ymin..area.ymax {
            for x in area.xmin..area.xmax {
                let d = self.offset(x, y);
                let s = src.offset(x, y);
                self.buffer[d..d + n].copy_from_slice(&src.buffer[s..s + n]);
            }
        }
    }

    /// Copy the overlap of both rectangles from `src`.
    pub fn fill_from(&mut self, src: &MemoryBuffer) {
        let area = if src.is_a_single_elem {
            self.rect
        } else {
            self.rect.intersect(&src.rect)
        };
        self.copy_from(src, area);
    }
}

fn copy_elem(out: &mut [f32], elem: &[f32]) {
    let n = out.len().min(elem.len());
    out[..n].copy_from_slice(&elem[..n]);
    out[n..].iter_mut().for_each(|v| *v = 0.0);
}

/// Sample positions are clamped to this magnitude so tap arithmetic stays in range.
const COORD_LIMIT: f32 = 1.0e15;

/// Integer element and fractional offset of a sample position. NaN samples element zero.
fn split_coord(v: f32) -> (i64, f32) {
    let v = if v.is_nan() {
        0.0
    } else {
        v.clamp(-COORD_LIMIT, COORD_LIMIT)
    };
    let floor = v.floor();
    (floor as i64, v - floor)
}

fn wrap_coord(c: i64, min: i32, len: i32, extend: MemoryBufferExtend) -> Option<i32> {
    if len <= 0 {
        return None;
    }
    let len = i64::from(len);
    let rel = c - i64::from(min);
    let rel = match extend {
        MemoryBufferExtend::Clip => {
            if rel < 0 || rel >= len {
                return None;
            }
            rel
        }
        MemoryBufferExtend::Extend => rel.clamp(0, len - 1),
        MemoryBufferExtend::Repeat => rel.rem_euclid(len),
    };
    i32::try_from(rel + i64::from(min)).ok()
}

fn bspline_weights(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    let it = 1.0 - t;
    [
        it * it * it / 6.0,
        (3.0 * t3 - 6.0 * t2 + 4.0) / 6.0,
        (-3.0 * t3 + 3.0 * t2 + 3.0 * t + 1.0) / 6.0,
        t3 / 6.0,
    ]
}

#[cfg(test)]
#[path = "../../tests/unit/memory/buffer.rs"]
mod tests;
