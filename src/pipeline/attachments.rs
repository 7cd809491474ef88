//! Session attachment inventory.
//!
//! Lists the non-HAR evidence files inside one archive directory: screen
//! recordings, hash files and external timestamp files, recorded relative
//! to the session directory.

use std::path::Path;

use crate::models::SessionAttachments;

const RECORDING_EXTENSIONS: [&str; 5] = ["avi", "mp4", "mkv", "mov", "webm"];

/// Scan one archive directory for attachments.
pub fn scan(archive_dir: &Path) -> SessionAttachments {
    let mut attachments = SessionAttachments::default();
    if !archive_dir.is_dir() {
        return attachments;
    }

    // Main screen recording in the session root.
    let main_recording = archive_dir.join("screen_recording.avi");
    if main_recording.is_file() {
        attachments
            .screen_recordings
            .push("screen_recording.avi".to_string());
    }

    // Additional recordings: keep only the largest.
    let recordings_dir = archive_dir.join("screen_recordings");
    if recordings_dir.is_dir() {
        let largest = list_files(&recordings_dir)
            .into_iter()
            .filter(|p| has_extension(p, &RECORDING_EXTENSIONS))
            .max_by_key(|p| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0));
        if let Some(path) = largest {
            push_relative(&mut attachments.screen_recordings, archive_dir, &path);
        }
    }

    if archive_dir.join("archive.har").is_file() {
        attachments.har_archives.push("archive.har".to_string());
    }
    if archive_dir.join("har_hash.txt").is_file() {
        attachments.hash_files.push("har_hash.txt".to_string());
    }
    if archive_dir.join("har_hash.txt.tsr").is_file() {
        attachments
            .timestamp_files
            .push("har_hash.txt.tsr".to_string());
    }

    // Hash and timestamp sidecars written next to extracted media.
    for subdir in ["photos", "videos"] {
        let dir = archive_dir.join(subdir);
        if !dir.is_dir() {
            continue;
        }
        for path in list_files(&dir) {
            if has_extension(&path, &["txt", "json"]) {
                push_relative(&mut attachments.hash_files, archive_dir, &path);
            } else if has_extension(&path, &["tsr"]) {
                push_relative(&mut attachments.timestamp_files, archive_dir, &path);
            }
        }
    }

    attachments
}

fn list_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

fn push_relative(list: &mut Vec<String>, base: &Path, path: &Path) {
    if let Ok(rel) = path.strip_prefix(base) {
        list.push(rel.to_string_lossy().replace('\\', "/"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_full_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("archive.har"), b"{}").unwrap();
        std::fs::write(root.join("screen_recording.avi"), b"avi").unwrap();
        std::fs::write(root.join("har_hash.txt"), b"abc").unwrap();
        std::fs::write(root.join("har_hash.txt.tsr"), b"tsr").unwrap();

        let recordings = root.join("screen_recordings");
        std::fs::create_dir(&recordings).unwrap();
        std::fs::write(recordings.join("small.mp4"), b"x").unwrap();
        std::fs::write(recordings.join("big.mp4"), b"xxxxxxxx").unwrap();

        let photos = root.join("photos");
        std::fs::create_dir(&photos).unwrap();
        std::fs::write(photos.join("a.jpg"), b"img").unwrap();
        std::fs::write(photos.join("photo_hashes_1.json"), b"{}").unwrap();
        std::fs::write(photos.join("hashes.txt.tsr"), b"ts").unwrap();

        let attachments = scan(root);
        assert_eq!(
            attachments.screen_recordings,
            vec!["screen_recording.avi", "screen_recordings/big.mp4"]
        );
        assert_eq!(attachments.har_archives, vec!["archive.har"]);
        assert!(attachments
            .hash_files
            .contains(&"photos/photo_hashes_1.json".to_string()));
        assert!(attachments
            .timestamp_files
            .contains(&"photos/hashes.txt.tsr".to_string()));
        // Plain media files are not attachments.
        assert!(!attachments.hash_files.contains(&"photos/a.jpg".to_string()));
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let attachments = scan(Path::new("/nonexistent/archive"));
        assert!(attachments.har_archives.is_empty());
        assert!(attachments.screen_recordings.is_empty());
    }
}
