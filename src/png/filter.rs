//! PNG filtering implementation.
//!
//! PNG uses filtering to improve compression by exploiting correlations
//! between adjacent pixels. Each row is tried under every filter and the
//! one with the smallest sum of absolute signed bytes wins, the same
//! heuristic libpng uses.

/// Filter type bytes written at the start of each scanline.
pub const FILTER_NONE: u8 = 0;
/// Difference from the left pixel.
pub const FILTER_SUB: u8 = 1;
/// Difference from the pixel above.
pub const FILTER_UP: u8 = 2;
/// Difference from the mean of left and above.
pub const FILTER_AVERAGE: u8 = 3;
/// Difference from the Paeth predictor.
pub const FILTER_PAETH: u8 = 4;

/// Number of PNG filter types.
pub const N_FILTERS: usize = 5;

/// Row buffers reused for every scanline of an image.
///
/// `rows[f]` holds the current row under filter `f`, with `rows[f][0] == f`.
/// `rows[0]` is therefore the raw (unfiltered) row. `prev` is the raw
/// previous row, also with a leading zero byte.
#[derive(Debug, Default)]
pub struct ScratchBuffers {
    rows: [Vec<u8>; N_FILTERS],
    prev: Vec<u8>,
}

impl ScratchBuffers {
    /// Empty buffers; nothing is allocated until [`ScratchBuffers::prepare`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Size every buffer to `row_len` bytes for a new image and zero the
    /// previous row. Capacity is kept across images.
    pub fn prepare(&mut self, row_len: usize) {
        for (f, row) in self.rows.iter_mut().enumerate() {
            row.resize(row_len, 0);
            row[0] = f as u8;
        }
        self.prev.clear();
        self.prev.resize(row_len, 0);
    }

    /// Allocated capacity of the raw row buffer.
    pub fn capacity(&self) -> usize {
        self.rows[0].capacity()
    }

    /// The raw current row, without its filter byte, for the converter to fill.
    pub fn current_mut(&mut self) -> &mut [u8] {
        &mut self.rows[0][1..]
    }

    /// Choose a filter for the current row. See [`select_filter`].
    pub fn select(&mut self, bpp: usize) -> u8 {
        select_filter(&mut self.rows, &self.prev, bpp)
    }

    /// The current row under `filter`, including its filter byte.
    pub fn filtered(&self, filter: u8) -> &[u8] {
        &self.rows[filter as usize]
    }

    /// Make the current raw row the previous row. Buffers are swapped, not
    /// copied.
    pub fn advance(&mut self) {
        std::mem::swap(&mut self.prev, &mut self.rows[0]);
    }
}

/// Absolute value of a byte read as `i8`.
#[inline]
fn abs8(d: u8) -> usize {
    (d as i8).unsigned_abs() as usize
}

/// Pick the filter minimizing the sum of absolute signed bytes for the raw
/// row in `rows[0]` against the raw previous row `prev`, writing each tried
/// transform into its own buffer.
///
/// Filters are tried in order Up, Paeth, None, Sub, Average, and a later
/// filter replaces the incumbent only if strictly better. Every filter but
/// the first stops accumulating once it can no longer win, so the result is
/// a greedy choice and the losing buffers may be partially written.
pub fn select_filter(rows: &mut [Vec<u8>; N_FILTERS], prev: &[u8], bpp: usize) -> u8 {
    let [raw, sub, up, avg, paeth] = rows;
    let cur = &raw[1..];
    let prev = &prev[1..];
    debug_assert_eq!(cur.len(), prev.len());

    let mut best = filter_up(cur, prev, &mut up[1..]);
    let mut filter = FILTER_UP;

    let sum = filter_paeth(cur, prev, &mut paeth[1..], bpp, best);
    if sum < best {
        best = sum;
        filter = FILTER_PAETH;
    }

    let sum = score_none(cur, best);
    if sum < best {
        best = sum;
        filter = FILTER_NONE;
    }

    let sum = filter_sub(cur, &mut sub[1..], bpp, best);
    if sum < best {
        best = sum;
        filter = FILTER_SUB;
    }

    let sum = filter_average(cur, prev, &mut avg[1..], bpp, best);
    if sum < best {
        filter = FILTER_AVERAGE;
    }

    filter
}

/// Up filter: difference from above pixel.
fn filter_up(cur: &[u8], prev: &[u8], out: &mut [u8]) -> usize {
    let mut sum = 0;
    for ((o, &c), &p) in out.iter_mut().zip(cur).zip(prev) {
        *o = c.wrapping_sub(p);
        sum += abs8(*o);
    }
    sum
}

/// Paeth filter: difference from Paeth predictor.
fn filter_paeth(cur: &[u8], prev: &[u8], out: &mut [u8], bpp: usize, best: usize) -> usize {
    let n = cur.len();
    let head = bpp.min(n);
    let mut sum = 0;
    // With no left neighbour the predictor reduces to the byte above.
    for i in 0..head {
        out[i] = cur[i].wrapping_sub(prev[i]);
        sum += abs8(out[i]);
    }
    for i in head..n {
        out[i] = cur[i].wrapping_sub(paeth_predictor(cur[i - bpp], prev[i], prev[i - bpp]));
        sum += abs8(out[i]);
        if sum >= best {
            break;
        }
    }
    sum
}

/// None filter: the raw row itself, so only the score is computed.
fn score_none(cur: &[u8], best: usize) -> usize {
    let mut sum = 0;
    for &c in cur {
        sum += abs8(c);
        if sum >= best {
            break;
        }
    }
    sum
}

/// Sub filter: difference from left pixel.
fn filter_sub(cur: &[u8], out: &mut [u8], bpp: usize, best: usize) -> usize {
    let n = cur.len();
    let head = bpp.min(n);
    let mut sum = 0;
    for i in 0..head {
        out[i] = cur[i];
        sum += abs8(out[i]);
    }
    for i in head..n {
        out[i] = cur[i].wrapping_sub(cur[i - bpp]);
        sum += abs8(out[i]);
        if sum >= best {
            break;
        }
    }
    sum
}

/// Average filter: difference from average of left and above.
fn filter_average(cur: &[u8], prev: &[u8], out: &mut [u8], bpp: usize, best: usize) -> usize {
    let n = cur.len();
    let head = bpp.min(n);
    let mut sum = 0;
    for i in 0..head {
        out[i] = cur[i].wrapping_sub(prev[i] / 2);
        sum += abs8(out[i]);
    }
    for i in head..n {
        let avg = ((cur[i - bpp] as u16 + prev[i] as u16) / 2) as u8;
        out[i] = cur[i].wrapping_sub(avg);
        sum += abs8(out[i]);
        if sum >= best {
            break;
        }
    }
    sum
}

/// Paeth predictor function.
///
/// Selects the value (a, b, or c) closest to p = a + b - c.
#[inline]
fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
    let a_i = a as i16;
    let b_i = b as i16;
    let c_i = c as i16;

    let p = a_i + b_i - c_i;
    let pa = (p - a_i).abs();
    let pb = (p - b_i).abs();
    let pc = (p - c_i).abs();

    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Score a filtered row (without its filter byte) using sum of absolute
/// signed values.
///
/// Lower scores typically result in better compression.
#[inline]
pub fn score_filter(filtered: &[u8]) -> usize {
    filtered.iter().map(|&b| abs8(b)).sum()
}
