//! Output path allocation properties.
//!
//! Uniqueness must hold by probing, not by formatting precision: repeated
//! allocations for the same timestamp must keep producing unused names as
//! earlier ones get taken.

use chrono::TimeZone;
use tempfile::TempDir;

use wavegate::transfer::{allocate_output_path, queue_path};

#[test]
fn test_repeated_allocation_for_colliding_timestamp_stays_unique() {
    let temp = TempDir::new().unwrap();
    let modified = chrono_tz::UTC.with_ymd_and_hms(2022, 9, 3, 11, 45, 7).unwrap();

    let mut taken = Vec::new();
    for _ in 0..5 {
        let path = allocate_output_path(modified, temp.path(), "flac");

        // Never a path that exists at call time, never a repeat
        assert!(!path.exists());
        assert!(!taken.contains(&path));

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"taken").unwrap();
        taken.push(path);
    }

    // All five names live in the same date directory
    let day_dir = temp.path().join("2022-09-03");
    assert!(taken.iter().all(|p| p.parent() == Some(day_dir.as_path())));
}

#[test]
fn test_allocation_ignores_unrelated_files() {
    let temp = TempDir::new().unwrap();
    let modified = chrono_tz::UTC.with_ymd_and_hms(2022, 9, 3, 11, 45, 7).unwrap();

    let day_dir = temp.path().join("2022-09-03");
    std::fs::create_dir_all(&day_dir).unwrap();
    std::fs::write(day_dir.join("2022-09-03 114508 Raw.flac"), b"other second").unwrap();

    let path = allocate_output_path(modified, temp.path(), "flac");
    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "2022-09-03 114507 Raw.flac"
    );
}

#[test]
fn test_queue_names_order_arrivals_within_a_second() {
    let base = chrono_tz::UTC.with_ymd_and_hms(2022, 9, 3, 11, 45, 7).unwrap();
    let queue_dir = std::path::Path::new("/queue");

    let mut names: Vec<String> = (0..4)
        .map(|i| {
            let arrival = base + chrono::Duration::milliseconds(i * 250);
            queue_path(std::path::Path::new("talk.wav"), arrival, queue_dir)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();

    let sorted = {
        let mut s = names.clone();
        s.sort();
        s
    };
    assert_eq!(names, sorted);

    names.dedup();
    assert_eq!(names.len(), 4);
}
