use crate::error::Result;
use crate::models::Location;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info};

/// On-disk cache of raw forecast responses, one file per coordinate pair.
///
/// Entry names carry a fingerprint of the source (endpoint and query shape),
/// so changing either never serves a body fetched under the old settings.
pub struct ResponseCache {
    dir: PathBuf,
    expiry: Duration,
    fingerprint: String,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, expiry: Duration, source: &str) -> Self {
        let digest = format!("{:x}", Sha256::digest(source.as_bytes()));
        Self {
            dir: dir.into(),
            expiry,
            fingerprint: digest[..12].to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entry_path(&self, location: &Location) -> PathBuf {
        self.dir.join(format!(
            "forecast_{}_{:.4}_{:.4}.json",
            self.fingerprint, location.latitude, location.longitude
        ))
    }

    /// Cached body for the location, or `None` when absent or expired.
    pub async fn get(&self, location: &Location) -> Result<Option<String>> {
        let path = self.entry_path(location);

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .unwrap_or(Duration::ZERO);

        if age > self.expiry {
            debug!(location = %location.code, ?age, "Cache entry expired");
            return Ok(None);
        }

        Ok(Some(fs::read_to_string(&path).await?))
    }

    pub async fn put(&self, location: &Location, body: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.entry_path(location), body).await?;
        Ok(())
    }

    /// Remove every cached response. Returns the number of files deleted.
    pub async fn clear(&self) -> Result<usize> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with("forecast_") && name.ends_with(".json") {
                fs::remove_file(entry.path()).await?;
                removed += 1;
            }
        }

        info!(removed, dir = %self.dir.display(), "Response cache cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SOURCE: &str = "https://example.invalid/v1/forecast?hourly=temperature_2m";

    #[tokio::test]
    async fn test_miss_then_hit() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let cache = ResponseCache::new(temp_dir.path().join("cache"), Duration::from_secs(3600), SOURCE);
        let london = Location::new("London", 51.52, -0.12);

        assert_eq!(cache.get(&london).await?, None);
        cache.put(&london, "{\"ok\":true}").await?;
        assert_eq!(cache.get(&london).await?.as_deref(), Some("{\"ok\":true}"));
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let cache = ResponseCache::new(temp_dir.path(), Duration::ZERO, SOURCE);
        let bergen = Location::new("Bergen", 60.363, 5.294);

        cache.put(&bergen, "{}").await?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get(&bergen).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_only_removes_entries() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let cache = ResponseCache::new(temp_dir.path(), Duration::from_secs(60), SOURCE);
        cache.put(&Location::new("A", 1.0, 2.0), "{}").await?;
        cache.put(&Location::new("B", 3.0, 4.0), "{}").await?;
        std::fs::write(temp_dir.path().join("notes.txt"), "keep")?;

        assert_eq!(cache.clear().await?, 2);
        assert!(temp_dir.path().join("notes.txt").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_missing_dir() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let cache = ResponseCache::new(temp_dir.path().join("absent"), Duration::from_secs(60), SOURCE);
        assert_eq!(cache.clear().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_source_change_is_miss() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let oslo = Location::new("Oslo", 59.91, 10.75);
        let before = ResponseCache::new(temp_dir.path(), Duration::from_secs(60), SOURCE);
        let after = ResponseCache::new(
            temp_dir.path(),
            Duration::from_secs(60),
            "https://example.invalid/v1/forecast?hourly=temperature_2m,wind_speed_10m",
        );

        before.put(&oslo, "{}").await?;
        assert_eq!(after.get(&oslo).await?, None);
        assert_eq!(before.get(&oslo).await?.as_deref(), Some("{}"));

        // Clearing removes entries for every source
        assert_eq!(after.clear().await?, 1);
        Ok(())
    }
}
