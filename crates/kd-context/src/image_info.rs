use std::fs;
use std::path::Path;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
}

impl ImageInfo {
    /// Reads the image header and the file size.
    pub fn read(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok().filter(|meta| meta.is_file())?;
        match image::image_dimensions(path) {
            Ok((width, height)) => Some(Self {
                width,
                height,
                file_size: metadata.len(),
            }),
            Err(error) => {
                log::info!("cannot read image {}: {}", path.display(), error);
                None
            }
        }
    }

    pub fn markup(&self) -> String {
        format!(
            "<b>Dimensions:</b> {}x{}<br><b>File size:</b> {:.2} kb",
            self.width,
            self.height,
            self.file_size as f64 / 1024.0
        )
    }
}
