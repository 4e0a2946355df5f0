//! Object storage client for product photos
//!
//! Photos are uploaded to a bucket of an S3-style storage API. Products only
//! keep the object key; public URLs are derived from it at read time.

use reqwest::Client;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};

/// Photo storage API client
#[derive(Clone)]
pub struct PhotoStorageClient {
    client: Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl PhotoStorageClient {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// Prefix under which objects of the bucket are publicly readable
    pub fn public_base_url(&self) -> String {
        format!("{}/object/public/{}", self.base_url, self.bucket)
    }

    /// Upload (or overwrite) an object and return its key
    pub async fn upload(
        &self,
        object_key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<String> {
        let url = format!("{}/object/{}/{}", self.base_url, self.bucket, object_key);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StorageError(format!("{} - {}", status, body)));
        }

        Ok(object_key.to_string())
    }
}

/// Object key of a product photo, keyed by product and upload extension
pub fn photo_object_key(product_id: uuid::Uuid, file_name: Option<&str>) -> String {
    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string());
    format!("products/{}.{}", product_id, extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_object_key_extension() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            photo_object_key(id, Some("Pump.PNG")),
            "products/00000000-0000-0000-0000-000000000000.png"
        );
        assert_eq!(
            photo_object_key(id, None),
            "products/00000000-0000-0000-0000-000000000000.jpg"
        );
        assert_eq!(
            photo_object_key(id, Some("weird.../")),
            "products/00000000-0000-0000-0000-000000000000.jpg"
        );
    }

    #[test]
    fn test_public_base_url() {
        let client = PhotoStorageClient::new(&StorageConfig {
            base_url: "https://storage.example.com/storage/v1/".to_string(),
            bucket: "product-photos".to_string(),
            api_key: "key".to_string(),
        });
        assert_eq!(
            client.public_base_url(),
            "https://storage.example.com/storage/v1/object/public/product-photos"
        );
    }
}
