//! Queue and output path allocation.
//!
//! Queue names carry the *arrival* time at millisecond precision so arrivals
//! stay ordered and distinguishable within one second. Output names derive
//! from the source file's *modification* time. Both are probed for
//! collisions, so uniqueness is a checked property rather than an accident
//! of formatting precision. Allocation never creates anything on disk;
//! directory creation is the coordinator's explicit, idempotent step.

use std::path::{Path, PathBuf};

use chrono::DateTime;
use chrono_tz::Tz;

/// Derive an unused queue-area path for an original file.
///
/// Layout: `queue_dir/<%Y-%m-%d %H%M%S.mmm> <basename>`, with a counter
/// inserted before the extension on collision. Same-named files under
/// different subdirectories of the watch tree can arrive within one
/// millisecond, and a rename over an existing queue entry would silently
/// replace it.
pub fn queue_path(original: &Path, arrival: DateTime<Tz>, queue_dir: &Path) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = original.extension().map(|e| e.to_string_lossy().into_owned());
    let prefix = arrival.format("%Y-%m-%d %H%M%S%.3f").to_string();

    let mut tries = 0u32;
    loop {
        let name = match (&ext, tries) {
            (Some(ext), 0) => format!("{prefix} {stem}.{ext}"),
            (Some(ext), n) => format!("{prefix} {stem} {n}.{ext}"),
            (None, 0) => format!("{prefix} {stem}"),
            (None, n) => format!("{prefix} {stem} {n}"),
        };
        let candidate = queue_dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        tries += 1;
    }
}

/// Allocate an unused output path for a source modification time.
///
/// Layout: `output_dir/<%Y-%m-%d>/<%Y-%m-%d %H%M%S> Raw.<ext>`, with a
/// counter inserted before the extension on collision (`… Raw 1.flac`).
/// The returned path does not exist at call time; nothing is created.
pub fn allocate_output_path(modified: DateTime<Tz>, output_dir: &Path, ext: &str) -> PathBuf {
    let day_dir = output_dir.join(modified.format("%Y-%m-%d").to_string());
    let stem = modified.format("%Y-%m-%d %H%M%S").to_string();

    let mut tries = 0u32;
    loop {
        let name = if tries == 0 {
            format!("{stem} Raw.{ext}")
        } else {
            format!("{stem} Raw {tries}.{ext}")
        };
        let candidate = day_dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        tries += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Tz> {
        chrono_tz::UTC.with_ymd_and_hms(2020, 3, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_queue_path_layout() {
        let arrival = chrono_tz::UTC
            .with_ymd_and_hms(2020, 3, 14, 9, 26, 53)
            .unwrap()
            + chrono::Duration::milliseconds(589);

        let path = queue_path(Path::new("/watch/talk.wav"), arrival, Path::new("/queue"));
        assert_eq!(
            path,
            PathBuf::from("/queue/2020-03-14 092653.589 talk.wav")
        );
    }

    #[test]
    fn test_queue_paths_distinct_within_one_second() {
        let first = at(9, 26, 53) + chrono::Duration::milliseconds(100);
        let second = at(9, 26, 53) + chrono::Duration::milliseconds(200);

        let a = queue_path(Path::new("talk.wav"), first, Path::new("/queue"));
        let b = queue_path(Path::new("talk.wav"), second, Path::new("/queue"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_queue_path_probes_past_existing_entry() {
        let temp = TempDir::new().unwrap();
        let arrival = at(9, 26, 53) + chrono::Duration::milliseconds(589);

        // Same basename from two watch subdirectories, same millisecond
        let first = queue_path(Path::new("/watch/a/talk.wav"), arrival, temp.path());
        std::fs::write(&first, b"audio").unwrap();

        let second = queue_path(Path::new("/watch/b/talk.wav"), arrival, temp.path());
        assert_ne!(first, second);
        assert!(!second.exists());
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "2020-03-14 092653.589 talk 1.wav"
        );
    }

    #[test]
    fn test_output_path_layout() {
        let temp = TempDir::new().unwrap();
        let path = allocate_output_path(at(14, 5, 9), temp.path(), "flac");
        assert_eq!(
            path,
            temp.path().join("2020-03-14").join("2020-03-14 140509 Raw.flac")
        );
    }

    #[test]
    fn test_allocation_never_returns_existing_path() {
        let temp = TempDir::new().unwrap();
        let first = allocate_output_path(at(14, 5, 9), temp.path(), "flac");

        std::fs::create_dir_all(first.parent().unwrap()).unwrap();
        std::fs::write(&first, b"audio").unwrap();

        let second = allocate_output_path(at(14, 5, 9), temp.path(), "flac");
        assert_ne!(first, second);
        assert!(!second.exists());
        assert_eq!(
            second.file_name().unwrap().to_str().unwrap(),
            "2020-03-14 140509 Raw 1.flac"
        );

        std::fs::write(&second, b"audio").unwrap();
        let third = allocate_output_path(at(14, 5, 9), temp.path(), "flac");
        assert_eq!(
            third.file_name().unwrap().to_str().unwrap(),
            "2020-03-14 140509 Raw 2.flac"
        );
    }

    #[test]
    fn test_allocation_does_not_create_anything() {
        let temp = TempDir::new().unwrap();
        let path = allocate_output_path(at(14, 5, 9), temp.path(), "flac");

        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }
}
