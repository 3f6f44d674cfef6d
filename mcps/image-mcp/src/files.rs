//! Saved image files: naming, listing and inspection

use std::io;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "generated_";
const FILE_SUFFIX: &str = ".png";
const MAX_NAME_CHARS: usize = 50;

/// File name an image generated from `prompt` is saved under
///
/// Keeps alphanumerics, spaces, `-` and `_`, then turns spaces into `_`.
pub fn image_filename(prompt: &str) -> String {
    let kept: String = prompt
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let name: String = kept
        .trim_end()
        .replace(' ', "_")
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();
    format!("{}{}{}", FILE_PREFIX, name, FILE_SUFFIX)
}

/// Numbered listing of the generated images in `dir`
pub fn list_images(dir: &Path) -> io::Result<String> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
            images.push((name, entry.metadata()?.len()));
        }
    }

    if images.is_empty() {
        return Ok("No generated images found in the current directory.".to_string());
    }

    images.sort();
    let mut listing = String::from("Generated image files:\n");
    for (i, (name, size)) in images.iter().enumerate() {
        listing.push_str(&format!(
            "{}. {} ({} bytes)\n",
            i + 1,
            name,
            group_thousands(*size)
        ));
    }
    Ok(listing)
}

/// Size, path and (when decodable) dimensions of one image
///
/// Relative names are looked up in `dir`. A missing file is reported in the
/// text rather than as an error.
pub fn image_info(dir: &Path, filename: &str) -> io::Result<String> {
    let path = resolve(dir, filename);
    if !path.exists() {
        return Ok(format!("File '{}' not found.", filename));
    }

    let size = std::fs::metadata(&path)?.len();
    let absolute = std::path::absolute(&path)?;
    let mut info = format!(
        "File: {}\nPath: {}\nSize: {} bytes\n",
        filename,
        absolute.display(),
        group_thousands(size)
    );

    match image::open(&path) {
        Ok(img) => info.push_str(&format!(
            "Dimensions: {}x{}\nMode: {:?}",
            img.width(),
            img.height(),
            img.color()
        )),
        Err(e) => {
            tracing::debug!(file = %filename, "Not a readable image: {}", e);
            info.push_str("(Could not read image dimensions)");
        }
    }
    Ok(info)
}

fn resolve(dir: &Path, filename: &str) -> PathBuf {
    let path = Path::new(filename);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_image_filename() {
        assert_eq!(
            image_filename("a red bicycle, golden hour!"),
            "generated_a_red_bicycle_golden_hour.png"
        );
        assert_eq!(image_filename("cat & dog  "), "generated_cat__dog.png");

        let long = image_filename(&"x".repeat(80));
        assert_eq!(long, format!("generated_{}.png", "x".repeat(50)));
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_list_images_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        std::fs::write(dir.path().join("generated_cat.jpg"), "hi").unwrap();

        assert_eq!(
            list_images(dir.path()).unwrap(),
            "No generated images found in the current directory."
        );
    }

    #[test]
    fn test_list_images_sorted_with_sizes() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("generated_robot.png"), vec![0u8; 1500]).unwrap();
        std::fs::write(dir.path().join("generated_cat.png"), vec![0u8; 12]).unwrap();
        std::fs::write(dir.path().join("other.png"), vec![0u8; 5]).unwrap();

        assert_eq!(
            list_images(dir.path()).unwrap(),
            "Generated image files:\n\
             1. generated_cat.png (12 bytes)\n\
             2. generated_robot.png (1,500 bytes)\n"
        );
    }

    #[test]
    fn test_image_info_missing() {
        let dir = tempdir().unwrap();
        assert_eq!(
            image_info(dir.path(), "generated_none.png").unwrap(),
            "File 'generated_none.png' not found."
        );
    }

    #[test]
    fn test_image_info_reads_dimensions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("generated_tiny.png");
        image::RgbImage::new(3, 2).save(&path).unwrap();

        let info = image_info(dir.path(), "generated_tiny.png").unwrap();
        assert!(info.starts_with("File: generated_tiny.png\n"));
        assert!(info.contains(&format!("Path: {}\n", path.display())));
        assert!(info.contains("Dimensions: 3x2\n"));
        assert!(info.ends_with("Mode: Rgb8"));
    }

    #[test]
    fn test_image_info_undecodable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("generated_broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        // absolute paths bypass the output directory
        let info = image_info(Path::new("/unused"), &path.display().to_string()).unwrap();
        assert!(info.contains("Size: 9 bytes\n"));
        assert!(info.ends_with("(Could not read image dimensions)"));
    }
}
