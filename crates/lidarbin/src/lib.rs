//! Reader for planar LiDAR point-cloud binaries.
//!
//! - Stores signed 16-bit coordinates in struct-of-arrays order (all X,
//!   then all Y, then all Z), not interleaved per point.
//! - Consumers typically treat `y` as elevation; the format itself does not
//!   care.
//! - The layout is fully self-describing: the count at offset 0 fixes the
//!   total length, so a buffer of any other length is malformed.
//!
//! File layout (little-endian):
//!   00    : u32     points_count (N)
//!   04    : i16[N]  X coordinates, in point order
//!   04+2N : i16[N]  Y coordinates, in point order
//!   04+4N : i16[N]  Z coordinates, in point order
//!   total : exactly 4 + 6N bytes
//!
//! Decoding is a pure, single-pass transformation with no I/O and no
//! logging; `read_file` and [`ByteSource`] layer the I/O on top.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Size of the point-count header, in bytes.
pub const HEADER_LEN: usize = 4;

/// Bytes contributed by one point across the three coordinate blocks.
pub const BYTES_PER_POINT: usize = 6;

/// One decoded sample. Plain data, suitable for direct GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Point3 {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

/// Why a buffer failed to decode, or why its bytes never arrived.
///
/// The three structural variants are non-retryable: the bytes themselves are
/// malformed and decoding them again cannot succeed.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Fewer than [`HEADER_LEN`] bytes; the point count cannot be read.
    #[error("buffer too short for point-count header: {len} bytes")]
    TruncatedHeader { len: usize },

    /// The header promised more coordinate data than the buffer holds.
    #[error("buffer ends before coordinate data: need {expected} bytes, have {actual}")]
    TruncatedBody { expected: u64, actual: u64 },

    /// Data continues past the end implied by the header. Always a hard
    /// error: extra bytes mean the producer wrote a layout we do not
    /// understand, which must not be ignored silently.
    #[error("{extra} trailing bytes past the end of the coordinate data")]
    TrailingBytes { extra: u64 },

    /// I/O failure while obtaining the buffer (file read, asset fetch).
    /// Pass-through from the byte source; never produced by `decode` itself.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

#[inline(always)]
fn le_i16_at(block: &[u8], i: usize) -> i16 {
    i16::from_le_bytes([block[2 * i], block[2 * i + 1]])
}

/// Decode one buffer into its points, preserving file order.
///
/// Total for every buffer of exactly `4 + 6N` bytes, where `N` is the count
/// at offset 0; `N == 0` yields an empty vector. Any other length fails with
/// [`DecodeError::TruncatedHeader`], [`DecodeError::TruncatedBody`] or
/// [`DecodeError::TrailingBytes`]. No partial output is ever returned.
pub fn decode(buf: &[u8]) -> Result<Vec<Point3>, DecodeError> {
    if buf.len() < HEADER_LEN {
        return Err(DecodeError::TruncatedHeader { len: buf.len() });
    }

    let count = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

    // Length arithmetic in u64 so a hostile count cannot overflow usize on
    // 32-bit targets.
    let expected = HEADER_LEN as u64 + count as u64 * BYTES_PER_POINT as u64;
    let actual = buf.len() as u64;

    if actual < expected {
        return Err(DecodeError::TruncatedBody { expected, actual });
    }

    if actual > expected {
        return Err(DecodeError::TrailingBytes {
            extra: actual - expected,
        });
    }

    // Three tightly packed 2N-byte blocks, X then Y then Z.
    let stride = count * 2;
    let (x_raw, rest) = buf[HEADER_LEN..].split_at(stride);
    let (y_raw, z_raw) = rest.split_at(stride);

    #[cfg(target_endian = "little")]
    {
        // Fast path: zero-copy reinterpret of the coordinate blocks. A &[u8]
        // carries no alignment guarantee, so the cast may legitimately fail;
        // all three blocks share parity (the stride is even), so checking
        // them together is enough.
        if let (Ok(xs), Ok(ys), Ok(zs)) = (
            bytemuck::try_cast_slice::<u8, i16>(x_raw),
            bytemuck::try_cast_slice::<u8, i16>(y_raw),
            bytemuck::try_cast_slice::<u8, i16>(z_raw),
        ) {
            return Ok(xs
                .iter()
                .zip(ys)
                .zip(zs)
                .map(|((&x, &y), &z)| Point3 { x, y, z })
                .collect());
        }
    }

    // Portable decode (misaligned input, or big-endian target).
    let mut points = Vec::<Point3>::with_capacity(count);

    for i in 0..count {
        points.push(Point3 {
            x: le_i16_at(x_raw, i),
            y: le_i16_at(y_raw, i),
            z: le_i16_at(z_raw, i),
        });
    }

    Ok(points)
}

/// Fast path: prefer mmap; fall back to a single read.
#[cfg(feature = "mmap")]
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<Point3>, DecodeError> {
    let file = std::fs::File::open(path)?;
    let map = unsafe { memmap2::MmapOptions::new().map(&file)? };
    decode(&map)
}

#[cfg(not(feature = "mmap"))]
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<Point3>, DecodeError> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Where asset bytes come from. Implementations own all transport concerns
/// (retries, timeouts, cancellation); the decoder never sees them.
pub trait ByteSource {
    /// Fetch the complete buffer for a named asset.
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>>;
}

/// Assets resolved as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }
}

impl ByteSource for DirSource {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(name))
    }
}

/// Fetch a named asset from `source` and decode it.
pub fn load<S: ByteSource>(source: &S, name: &str) -> Result<Vec<Point3>, DecodeError> {
    let bytes = source.fetch(name)?;
    decode(&bytes)
}
