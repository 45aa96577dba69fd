//! Media library backed by a plain directory

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::stream::BoxStream;
use tracing::{debug, info};

use crate::error::CameraError;
use crate::model::{Movie, Photo, Thumbnail};

use super::{EventFeed, MediaLibrary};

const THUMBNAIL_WIDTH: u32 = 160;
const THUMBNAIL_HEIGHT: u32 = 120;

/// Stores captured media as files and announces a thumbnail per save
pub struct DirectoryLibrary {
    root: PathBuf,
    next_asset: AtomicU64,
    thumbnails: EventFeed<Option<Thumbnail>>,
}

impl DirectoryLibrary {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            next_asset: AtomicU64::new(1),
            thumbnails: EventFeed::new(None, 16),
        }
    }

    fn next_name(&self, prefix: &str, extension: &str) -> String {
        let n = self.next_asset.fetch_add(1, Ordering::SeqCst);
        format!("{prefix}_{n:05}.{extension}")
    }

    async fn ensure_root(&self) -> Result<(), CameraError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| save_failed(&self.root, e))
    }

    fn announce(&self, asset_id: String) {
        debug!(%asset_id, "thumbnail updated");
        self.thumbnails.publish(Some(Thumbnail {
            asset_id,
            width: THUMBNAIL_WIDTH,
            height: THUMBNAIL_HEIGHT,
        }));
    }
}

fn save_failed(path: &Path, err: std::io::Error) -> CameraError {
    CameraError::SaveFailed(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl MediaLibrary for DirectoryLibrary {
    async fn save_photo(&self, photo: Photo) -> Result<(), CameraError> {
        self.ensure_root().await?;

        let name = self.next_name("IMG", "jpg");
        let path = self.root.join(&name);
        tokio::fs::write(&path, &photo.data)
            .await
            .map_err(|e| save_failed(&path, e))?;

        if let Some(movie) = photo.live_photo_movie {
            let companion = path.with_extension("mov");
            // Without its companion the still is saved alone
            if tokio::fs::rename(&movie, &companion).await.is_err() {
                debug!(?movie, "live photo companion not found");
            }
        }

        info!(?path, proxy = photo.is_proxy, "photo saved");
        self.announce(name);
        Ok(())
    }

    async fn save_movie(&self, movie: Movie) -> Result<(), CameraError> {
        self.ensure_root().await?;

        let name = self.next_name("MOV", "mov");
        let path = self.root.join(&name);
        tokio::fs::rename(&movie.path, &path)
            .await
            .map_err(|e| save_failed(&movie.path, e))?;

        info!(?path, duration_secs = movie.duration_secs, "movie saved");
        self.announce(name);
        Ok(())
    }

    fn thumbnails(&self) -> BoxStream<'static, Option<Thumbnail>> {
        self.thumbnails.stream()
    }
}
