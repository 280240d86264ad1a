//! Saving remote images (QR codes, vouchers) to local storage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::permission::{await_permission, PermissionHandler, WRITE_EXTERNAL_STORAGE};
use crate::{CheckoutError, Result};

#[async_trait]
pub trait ImageSaver: Send + Sync {
    /// Download `image_url` and store it as `file_name`, asking
    /// `permission_handler` for storage permission first when required.
    async fn save_image_from_url(
        &self,
        permission_handler: &dyn PermissionHandler,
        image_url: &str,
        file_name: &str,
    ) -> Result<PathBuf>;
}

/// Fetches raw image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// Writes downloaded images into a directory.
pub struct FileImageSaver {
    directory: PathBuf,
    fetcher: Arc<dyn ImageFetcher>,
    required_permission: Option<String>,
}

impl FileImageSaver {
    /// Saver that asks for external storage permission before writing.
    pub fn new(directory: impl AsRef<Path>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            fetcher,
            required_permission: Some(WRITE_EXTERNAL_STORAGE.to_string()),
        }
    }

    /// Skip the permission round-trip (app-private storage).
    pub fn without_permission(mut self) -> Self {
        self.required_permission = None;
        self
    }
}

#[async_trait]
impl ImageSaver for FileImageSaver {
    async fn save_image_from_url(
        &self,
        permission_handler: &dyn PermissionHandler,
        image_url: &str,
        file_name: &str,
    ) -> Result<PathBuf> {
        if image_url.is_empty() {
            return Err(CheckoutError::checkout("Image URL is empty"));
        }
        let url = Url::parse(image_url)?;

        if let Some(permission) = &self.required_permission {
            await_permission(permission_handler, permission).await?;
        }

        let bytes = self.fetcher.fetch(&url).await?;
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| CheckoutError::checkout(format!("Failed to create image directory: {}", e)))?;

        let path = self.directory.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CheckoutError::checkout(format!("Failed to save image: {}", e)))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(path = %path.display(), "image saved");
        Ok(path)
    }
}

/// [`ImageFetcher`] using the HTTP client.
pub struct HttpImageFetcher {
    #[cfg(feature = "http-client")]
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self {
            #[cfg(feature = "http-client")]
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    #[cfg(feature = "http-client")]
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(CheckoutError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckoutError::Http {
                code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
                error_body: None,
            });
        }
        let bytes = response.bytes().await.map_err(CheckoutError::transport)?;
        Ok(bytes.to_vec())
    }

    #[cfg(not(feature = "http-client"))]
    async fn fetch(&self, _url: &Url) -> Result<Vec<u8>> {
        Err(CheckoutError::Unimplemented(
            "HTTP image download - enable the 'http-client' feature",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::PermissionHandlerCallback;

    struct StaticFetcher;

    #[async_trait]
    impl ImageFetcher for StaticFetcher {
        async fn fetch(&self, _url: &Url) -> Result<Vec<u8>> {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
    }

    struct Grant;

    impl PermissionHandler for Grant {
        fn request_permission(
            &self,
            required_permission: &str,
            callback: Arc<dyn PermissionHandlerCallback>,
        ) {
            callback.on_permission_granted(required_permission);
        }
    }

    struct Deny;

    impl PermissionHandler for Deny {
        fn request_permission(
            &self,
            required_permission: &str,
            callback: Arc<dyn PermissionHandlerCallback>,
        ) {
            callback.on_permission_denied(required_permission);
        }
    }

    #[tokio::test]
    async fn test_saves_image_after_permission() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FileImageSaver::new(dir.path(), Arc::new(StaticFetcher));

        let path = saver
            .save_image_from_url(&Grant, "https://example.com/qr.png", "pix-1.png")
            .await
            .unwrap();

        assert_eq!(std::fs::read(path).unwrap(), vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_denied_permission_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FileImageSaver::new(dir.path(), Arc::new(StaticFetcher));

        let err = saver
            .save_image_from_url(&Deny, "https://example.com/qr.png", "pix-1.png")
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::PermissionRequest(_)));
        assert!(!dir.path().join("pix-1.png").exists());
    }
}
