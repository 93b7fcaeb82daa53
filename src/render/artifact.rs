//! Artifact naming and PNG encoding.

use image::{ImageBuffer, Rgba};
use std::path::{Path, PathBuf};

use crate::error::{ExportError, Result};

use super::matrix::FrameMatrix;

/// Reduces a name to filesystem-safe characters, `_` for everything else.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "spectrum".into()
    } else {
        cleaned
    }
}

/// Path of one frame artifact: `{name}_{index}` zero-padded to `digits`.
pub fn frame_path(dir: &Path, name: &str, index: usize, digits: usize) -> PathBuf {
    dir.join(format!("{name}_{index:0digits$}.png"))
}

/// Encodes the matrix as an 8-bit RGBA PNG, clamping float channels to
/// [0, 1].
pub fn write_frame(path: &Path, matrix: &FrameMatrix) -> Result<()> {
    let bytes: Vec<u8> = matrix
        .pixels()
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();

    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(matrix.width() as u32, matrix.rows() as u32, bytes)
            .expect("matrix dimensions match pixel buffer");

    img.save(path).map_err(|source| match source {
        image::ImageError::IoError(source) => ExportError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => ExportError::Image {
            path: path.to_path_buf(),
            source,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_name("my track (final).wav"), "my_track__final_.wav");
        assert_eq!(sanitize_name("clean-name_01"), "clean-name_01");
        assert_eq!(sanitize_name(""), "spectrum");
    }

    #[test]
    fn frame_path_zero_pads_index() {
        let p = frame_path(Path::new("/out"), "song_fft", 7, 3);
        assert_eq!(p, PathBuf::from("/out/song_fft_007.png"));
    }
}
