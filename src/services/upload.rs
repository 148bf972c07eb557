use crate::error::{AppError, AppResult};
use std::env;
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

#[derive(Clone)]
pub struct UploadConfig {
    pub upload_dir: String,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        Self {
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
        }
    }
}

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5 MB

/// Subdirectory of the upload root that holds post images.
pub const POST_IMAGES_DIR: &str = "posts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }

    fn from_guessed(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
            image::ImageFormat::Png => Some(ImageFormat::Png),
            image::ImageFormat::Gif => Some(ImageFormat::Gif),
            image::ImageFormat::WebP => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    fn decoder_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Gif => image::ImageFormat::Gif,
            ImageFormat::Webp => image::ImageFormat::WebP,
        }
    }
}

/// Identify a supported image encoding from its signature. The filename and
/// the declared content type are never consulted.
pub fn detect_image_format(data: &[u8]) -> Option<ImageFormat> {
    image::guess_format(data)
        .ok()
        .and_then(ImageFormat::from_guessed)
}

/// Sniff the format, then decode the whole file. Truncated or corrupted
/// data behind a valid signature yields `None`.
pub fn decode_image(data: &[u8]) -> Option<ImageFormat> {
    let format = detect_image_format(data)?;
    match image::load_from_memory_with_format(data, format.decoder_format()) {
        Ok(_) => Some(format),
        Err(e) => {
            tracing::debug!(?format, "Rejected undecodable image: {}", e);
            None
        }
    }
}

pub struct UploadService;

impl UploadService {
    /// Write an already validated image under `subdirectory`.
    /// Returns the stored path relative to the upload root, e.g. `posts/<uuid>.gif`.
    pub async fn save_image(
        config: &UploadConfig,
        data: &[u8],
        format: ImageFormat,
        subdirectory: &str,
    ) -> AppResult<String> {
        let filename = format!("{}.{}", Uuid::new_v4(), format.extension());
        let dir = Path::new(&config.upload_dir).join(subdirectory);

        fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create upload directory: {}", e))
        })?;

        let file_path = dir.join(&filename);
        fs::write(&file_path, data)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to write file: {}", e)))?;

        tracing::debug!("Stored image {}", file_path.display());
        Ok(format!("{}/{}", subdirectory, filename))
    }

    /// Best-effort removal of a stored file; a missing file is not an error.
    pub async fn remove(config: &UploadConfig, stored_path: &str) {
        let file_path = Path::new(&config.upload_dir).join(stored_path);
        if let Err(e) = fs::remove_file(&file_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", file_path.display(), e);
            }
        }
    }

    pub fn public_url(stored_path: &str) -> String {
        format!("/uploads/{}", stored_path)
    }
}
