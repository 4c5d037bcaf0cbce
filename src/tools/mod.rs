//! Dataset helpers shared by `qrtool batch` and the benches.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// Dataset root from `QR_PROBE_DATASET`, `benches/images` when unset.
pub fn dataset_root_from_env() -> PathBuf {
    env::var("QR_PROBE_DATASET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("benches/images"))
}

/// Image limit from `QR_PROBE_LIMIT`.
///
/// Returns `None` (whole dataset) when unset, unparsable or `0`.
pub fn limit_from_env() -> Option<usize> {
    env::var("QR_PROBE_LIMIT")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&v| v != 0)
}

/// Whether `path` has an extension the ingest layer can decode
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Image paths under `root`, sorted, truncated to `limit`.
pub fn dataset_iter<P: AsRef<Path>>(root: P, limit: Option<usize>) -> impl Iterator<Item = PathBuf> {
    let mut images = collect_images(root.as_ref());
    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images.into_iter()
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if is_image_path(&path) {
                images.push(path);
            }
        }
    }

    images
}

/// The expected payload stored next to an image as `<name>.txt`, if any
pub fn expected_payload(image: &Path) -> Option<String> {
    fs::read_to_string(image.with_extension("txt"))
        .ok()
        .map(|text| text.trim_end_matches(['\r', '\n']).to_string())
}
