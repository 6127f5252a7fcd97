//! WAV completeness predicate.
//!
//! A RIFF/WAVE file declares its own length: the little-endian u32 at byte 4
//! counts every byte after that field, so a finished file is exactly
//! `declared + 8` bytes long. While the producer is still writing, the actual
//! size lags the declared size and the file is deferred.

use std::fs::File;
use std::io::Read;
use std::path::Path;

const RIFF_MAGIC: &[u8; 4] = b"RIFF";
const FMT_MARKER: &[u8; 4] = b"fmt ";
const HEADER_LEN: usize = 16;

/// Check whether `path` is a fully written WAV file.
///
/// Fails closed: any read error (missing file, permission denied, deleted
/// mid-check) or short header means "not yet ready", never an error; the
/// producer may still be writing.
pub fn is_complete(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut header = [0u8; HEADER_LEN];
    if file.read_exact(&mut header).is_err() {
        return false;
    }

    let file_size = match file.metadata() {
        Ok(m) => m.len(),
        Err(_) => return false,
    };

    if &header[0..4] != RIFF_MAGIC || &header[12..16] != FMT_MARKER {
        return false;
    }

    let declared = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as u64;
    declared + 8 == file_size
}
