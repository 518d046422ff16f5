//! File layout of tiles and panoramas.
//!
//! Tiles live at `<images>/<FID>_<wgsX>_<wgsY>_<heading>.png` and panoramas
//! at `<panoramas>/<FID>.png`. A tile counts as present only when its file
//! exists and is non-empty; writes go through a `.part` file and a rename so
//! an interrupted write never produces a present tile.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{Fid, Heading, Point};

/// Errors from tile and panorama file handling.
#[derive(Debug, Error)]
pub enum TileStoreError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write tile {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("refusing to write an empty tile to {0}")]
    EmptyTile(PathBuf),
}

/// Paths of the tile and panorama directories.
#[derive(Debug, Clone)]
pub struct TileStore {
    images_dir: PathBuf,
    panoramas_dir: PathBuf,
}

impl TileStore {
    pub fn new(images_dir: impl Into<PathBuf>, panoramas_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            panoramas_dir: panoramas_dir.into(),
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn panoramas_dir(&self) -> &Path {
        &self.panoramas_dir
    }

    /// Create both directories if needed.
    pub fn ensure_dirs(&self) -> Result<(), TileStoreError> {
        for dir in [&self.images_dir, &self.panoramas_dir] {
            std::fs::create_dir_all(dir).map_err(|source| TileStoreError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn tile_file_name(point: &Point, heading: Heading) -> String {
        format!(
            "{}_{}_{}_{}.png",
            point.fid, point.wgs_x, point.wgs_y, heading
        )
    }

    pub fn tile_path(&self, point: &Point, heading: Heading) -> PathBuf {
        self.images_dir.join(Self::tile_file_name(point, heading))
    }

    pub fn panorama_path(&self, fid: &Fid) -> PathBuf {
        self.panoramas_dir.join(format!("{}.png", fid))
    }

    pub fn panorama_exists(&self, fid: &Fid) -> bool {
        is_non_empty_file(&self.panorama_path(fid))
    }

    pub fn has_tile(&self, point: &Point, heading: Heading) -> bool {
        is_non_empty_file(&self.tile_path(point, heading))
    }

    /// Present tiles of `point`, in heading order.
    pub fn present_headings(&self, point: &Point) -> Vec<Heading> {
        Heading::ALL
            .into_iter()
            .filter(|heading| self.has_tile(point, *heading))
            .collect()
    }

    /// Missing tiles of `point`, in heading order.
    pub fn missing_headings(&self, point: &Point) -> Vec<Heading> {
        Heading::ALL
            .into_iter()
            .filter(|heading| !self.has_tile(point, *heading))
            .collect()
    }

    /// Atomically write a tile and return its final path.
    pub async fn write_tile(
        &self,
        point: &Point,
        heading: Heading,
        bytes: &[u8],
    ) -> Result<PathBuf, TileStoreError> {
        let path = self.tile_path(point, heading);
        if bytes.is_empty() {
            return Err(TileStoreError::EmptyTile(path));
        }

        let partial = path.with_extension("png.part");
        let write = async {
            tokio::fs::write(&partial, bytes).await?;
            tokio::fs::rename(&partial, &path).await
        };

        if let Err(source) = write.await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(TileStoreError::Write { path, source });
        }

        Ok(path)
    }
}

fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}
