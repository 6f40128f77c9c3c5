use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::fs;
use image::{GrayImage, ImageFormat, RgbImage};

use crate::errors::{BubbleKickerError, Result};
use crate::image_utils::labels_to_gray;
use crate::regions::LabelImage;

/// File extensions picked up when scanning a directory
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "bmp", "tif", "tiff", "jpg", "jpeg"];

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: RgbImage,
    pub path: PathBuf,
    pub filename: String,
}

/// Get all supported image files from a directory (recursively), sorted by path
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.exists() {
        return Err(BubbleKickerError::InvalidPath(dir_path.to_path_buf()));
    }

    if !dir_path.is_dir() {
        return Err(BubbleKickerError::Config(format!(
            "{} is not a directory", dir_path.display()
        )));
    }

    let mut files = Vec::new();
    find_image_files_recursive(dir_path, &mut files)?;
    files.sort();

    Ok(files)
}

/// Helper function to recursively search for image files
fn find_image_files_recursive(dir_path: &Path, result: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();

        if path.is_dir() {
            find_image_files_recursive(&path, result)?;
        } else if path.is_file() && is_supported_image(&path) {
            result.push(path);
        }
    }

    Ok(())
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Output name for an image below `root`: its relative path without
/// extension, directories joined by `_` (`a/frame.png` -> `a_frame`)
pub fn output_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| BubbleKickerError::InvalidPath(path.to_path_buf()))?
        .with_extension("");

    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| BubbleKickerError::InvalidPath(path.to_path_buf()))?;

    if parts.is_empty() {
        return Err(BubbleKickerError::InvalidPath(path.to_path_buf()));
    }

    Ok(parts.join("_"))
}

/// Output names for a batch, in file order. Fails when two files would
/// write to the same outputs, e.g. `frame.png` and `frame.bmp`.
pub fn output_names(root: &Path, files: &[PathBuf]) -> Result<Vec<String>> {
    let mut seen: BTreeMap<String, &Path> = BTreeMap::new();
    let mut names = Vec::with_capacity(files.len());

    for path in files {
        let name = output_name(root, path)?;
        if let Some(previous) = seen.insert(name.clone(), path.as_path()) {
            return Err(BubbleKickerError::Config(format!(
                "{} and {} would both write outputs named '{}'",
                previous.display(),
                path.display(),
                name
            )));
        }
        names.push(name);
    }

    Ok(names)
}

/// Load an image and convert it to 8-bit RGB
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();

    let filename = path.file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| BubbleKickerError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let image = image::open(path)?.to_rgb8();

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        filename,
    })
}

/// Save a grayscale mask as PNG
pub fn save_gray_image<P: AsRef<Path>>(image: &GrayImage, path: P) -> Result<()> {
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a label image as an 8-bit PNG for inspection
pub fn save_label_image<P: AsRef<Path>>(labels: &LabelImage, path: P) -> Result<()> {
    save_gray_image(&labels_to_gray(labels), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bubble_kicker_io_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn finds_images_recursively() {
        let dir = scratch_dir("scan");
        fs::create_dir_all(dir.join("nested")).unwrap();
        let image = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        image.save(dir.join("a.png")).unwrap();
        image.save(dir.join("nested").join("b.bmp")).unwrap();
        fs::write(dir.join("notes.txt"), "not an image").unwrap();

        let files = get_image_files_in_dir(&dir).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| is_supported_image(f)));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn output_names_keep_directories_apart() {
        let root = Path::new("frames");
        let files = vec![
            root.join("a").join("frame.png"),
            root.join("b").join("frame.png"),
            root.join("frame.png"),
        ];
        let names = output_names(root, &files).unwrap();
        assert_eq!(names, vec!["a_frame", "b_frame", "frame"]);
    }

    #[test]
    fn output_names_reject_shared_stems() {
        let root = Path::new("frames");
        let files = vec![root.join("frame.bmp"), root.join("frame.png")];
        let err = output_names(root, &files).unwrap_err();
        assert!(matches!(err, BubbleKickerError::Config(ref msg) if msg.contains("'frame'")));

        assert!(output_name(root, Path::new("elsewhere/frame.png")).is_err());
    }

    #[test]
    fn missing_directory_is_invalid_path() {
        let err = get_image_files_in_dir("/definitely/not/here").unwrap_err();
        assert!(matches!(err, BubbleKickerError::InvalidPath(_)));
    }

    #[test]
    fn loads_saved_frame() {
        let dir = scratch_dir("load");
        let path = dir.join("frame_01.png");
        RgbImage::from_pixel(3, 2, Rgb([200, 100, 50])).save(&path).unwrap();

        let input = load_image(&path).unwrap();
        assert_eq!(input.filename, "frame_01");
        assert_eq!(input.image.dimensions(), (3, 2));
        assert_eq!(input.image.get_pixel(0, 0), &Rgb([200, 100, 50]));

        let mut labels = LabelImage::new(3, 2);
        labels.put_pixel(1, 1, Luma([1]));
        save_label_image(&labels, dir.join("labels.png")).unwrap();
        assert!(dir.join("labels.png").exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
