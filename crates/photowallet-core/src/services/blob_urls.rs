//! 图片显示句柄
//!
//! 前端显示图片时需要一个指向数据的临时 URL。[`BlobUrl`] 在创建时登记，
//! 离开作用域时自动注销，注册表里的数量可以用来发现泄漏。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::{Photo, PhotoBlob, PhotoId};

const URL_PREFIX: &str = "blob:photowallet/";

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: Mutex<HashMap<String, PhotoBlob>>,
}

impl RegistryInner {
    fn live(&self) -> std::sync::MutexGuard<'_, HashMap<String, PhotoBlob>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 显示句柄注册表
#[derive(Clone, Default)]
pub struct BlobUrlRegistry {
    inner: Arc<RegistryInner>,
}

impl BlobUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为照片创建显示句柄
    pub fn acquire(&self, photo: &Photo) -> BlobUrl {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("{}{}/{}", URL_PREFIX, photo.id, id);
        self.inner.live().insert(url.clone(), photo.blob.clone());

        tracing::trace!("创建显示句柄: {}", url);

        BlobUrl {
            url,
            photo_id: photo.id.clone(),
            blob: photo.blob.clone(),
            registry: Arc::clone(&self.inner),
        }
    }

    /// 根据 URL 取回图片数据（句柄已注销则为 None）
    pub fn resolve(&self, url: &str) -> Option<PhotoBlob> {
        self.inner.live().get(url).cloned()
    }

    /// 仍然存活的句柄数量
    pub fn live_count(&self) -> usize {
        self.inner.live().len()
    }
}

/// 显示句柄，Drop 时自动注销
pub struct BlobUrl {
    url: String,
    photo_id: PhotoId,
    blob: PhotoBlob,
    registry: Arc<RegistryInner>,
}

impl BlobUrl {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn photo_id(&self) -> &PhotoId {
        &self.photo_id
    }

    pub fn blob(&self) -> &PhotoBlob {
        &self.blob
    }
}

impl std::fmt::Debug for BlobUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobUrl")
            .field("url", &self.url)
            .field("blob", &self.blob)
            .finish()
    }
}

impl Drop for BlobUrl {
    fn drop(&mut self) {
        self.registry.live().remove(&self.url);
        tracing::trace!("注销显示句柄: {}", self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::photo::chrono_now;

    fn photo(bytes: &[u8]) -> Photo {
        Photo {
            id: PhotoId::generate(),
            original_name: "a.png".to_string(),
            blob: PhotoBlob::new(bytes.to_vec()),
            order: 0,
            import_date: chrono_now(),
            size: bytes.len() as u64,
            mime_type: "image/png".to_string(),
            width: None,
            height: None,
        }
    }

    #[test]
    fn test_handle_revoked_on_drop() {
        let registry = BlobUrlRegistry::new();
        let photo = photo(&[1, 2, 3]);

        let url = {
            let handle = registry.acquire(&photo);
            assert_eq!(registry.live_count(), 1);
            let resolved = registry.resolve(handle.url()).unwrap();
            assert!(resolved.ptr_eq(&photo.blob));
            handle.url().to_string()
        };

        assert_eq!(registry.live_count(), 0);
        assert!(registry.resolve(&url).is_none());
    }

    #[test]
    fn test_handles_are_distinct() {
        let registry = BlobUrlRegistry::new();
        let photo = photo(&[9]);

        let a = registry.acquire(&photo);
        let b = registry.acquire(&photo);
        assert_ne!(a.url(), b.url());
        assert_eq!(registry.live_count(), 2);

        drop(a);
        assert_eq!(registry.live_count(), 1);
        assert_eq!(b.blob().as_bytes(), &[9]);
    }
}
