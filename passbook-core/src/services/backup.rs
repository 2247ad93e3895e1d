//! Backup management for the passbook data directory.
//!
//! Backups are ZIP archives holding the database file plus the config
//! files that travel with it.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Config files archived alongside the database (relative to passbook dir)
const CONFIG_FILES: &[&str] = &["settings.json", "token.secret"];

/// One backup archive on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Archive filename (e.g., "passbook-2025-01-15T10-30-00-000000.zip")
    pub name: String,
    /// When the backup was created
    pub created_at: DateTime<Utc>,
    /// File size in bytes
    pub size_bytes: u64,
}

impl BackupMetadata {
    /// Format size for human display
    pub fn size_display(&self) -> String {
        const UNITS: [(&str, u64); 3] = [
            ("GB", 1024 * 1024 * 1024),
            ("MB", 1024 * 1024),
            ("KB", 1024),
        ];
        for (unit, scale) in UNITS {
            if self.size_bytes >= scale {
                return format!("{:.1} {}", self.size_bytes as f64 / scale as f64, unit);
            }
        }
        format!("{} bytes", self.size_bytes)
    }
}

/// Creation time encoded in the archive name; unparseable names sort as now
fn parse_backup_time(backup_name: &str) -> DateTime<Utc> {
    backup_name
        .strip_prefix("passbook-")
        .and_then(|s| s.strip_suffix(".zip"))
        .and_then(|ts| {
            // Names carry microseconds; tolerate older ones without
            NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H-%M-%S-%f")
                .or_else(|_| NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H-%M-%S"))
                .ok()
        })
        .map(|dt| dt.and_utc())
        .unwrap_or_else(Utc::now)
}

/// Creates, lists, restores, and prunes backup archives
pub struct BackupService {
    passbook_dir: PathBuf,
    db_filename: String,
}

impl BackupService {
    pub fn new(passbook_dir: PathBuf, db_filename: String) -> Self {
        Self {
            passbook_dir,
            db_filename,
        }
    }

    fn backups_dir(&self) -> PathBuf {
        self.passbook_dir.join("backups")
    }

    fn generate_name(prefix: &str) -> String {
        let now = Utc::now();
        let timestamp = now.format("%Y-%m-%dT%H-%M-%S");
        let micros = now.timestamp_subsec_micros();
        format!("{}-{}-{:06}.zip", prefix, timestamp, micros)
    }

    /// Stream one file from disk into the archive under entry_name
    fn add_file(zip: &mut ZipWriter<File>, disk_path: &Path, entry_name: &str) -> Result<()> {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file(entry_name, options)?;
        let mut source = File::open(disk_path)?;
        io::copy(&mut source, zip)?;
        Ok(())
    }

    /// Archive the database and any present config files
    pub fn create(&self, max_backups: Option<usize>) -> Result<BackupMetadata> {
        let db_path = self.passbook_dir.join(&self.db_filename);
        if !db_path.exists() {
            anyhow::bail!("Database file not found");
        }

        let backups_dir = self.backups_dir();
        fs::create_dir_all(&backups_dir)?;
        let backup_name = Self::generate_name("passbook");
        let backup_path = backups_dir.join(&backup_name);

        let file = File::create(&backup_path).context("Failed to create backup file")?;
        let mut zip = ZipWriter::new(file);
        Self::add_file(&mut zip, &db_path, &self.db_filename)?;
        for config_file in CONFIG_FILES {
            let config_path = self.passbook_dir.join(config_file);
            if config_path.exists() {
                Self::add_file(&mut zip, &config_path, config_file)?;
            }
        }
        zip.finish()?;

        let size_bytes = fs::metadata(&backup_path)?.len();

        if let Some(max) = max_backups {
            self.prune_oldest(max)?;
        }

        Ok(BackupMetadata {
            name: backup_name,
            created_at: Utc::now(),
            size_bytes,
        })
    }

    /// List all backups, newest first
    pub fn list(&self) -> Result<Vec<BackupMetadata>> {
        let backups_dir = self.backups_dir();
        if !backups_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        for entry in fs::read_dir(&backups_dir)? {
            if let Some(meta) = Self::entry_metadata(&entry?.path())? {
                backups.push(meta);
            }
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    /// Metadata for one directory entry, None when it is not a backup archive
    fn entry_metadata(path: &Path) -> Result<Option<BackupMetadata>> {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) if n.starts_with("passbook-") && n.ends_with(".zip") => n.to_string(),
            _ => return Ok(None),
        };

        let size_bytes = fs::metadata(path)?.len();
        Ok(Some(BackupMetadata {
            created_at: parse_backup_time(&name),
            name,
            size_bytes,
        }))
    }

    /// Restore from a backup
    ///
    /// The current database is zipped into a pre-restore backup first, so
    /// a bad restore can itself be undone.
    pub fn restore(&self, backup_name: &str) -> Result<()> {
        let backup_path = self.backups_dir().join(backup_name);
        if !backup_path.exists() {
            anyhow::bail!("Backup not found: {}", backup_name);
        }

        let db_path = self.passbook_dir.join(&self.db_filename);
        if db_path.exists() {
            self.snapshot_database(&db_path)?;
        }

        let mut archive = ZipArchive::new(File::open(&backup_path)?)?;
        let mut restored_configs = HashSet::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let entry_name = entry.name().to_string();

            // A database entry lands under the configured filename; anything
            // else is a config file restored under its own name
            let target = if entry_name.ends_with(".duckdb") {
                self.passbook_dir.join(&self.db_filename)
            } else {
                if CONFIG_FILES.contains(&entry_name.as_str()) {
                    restored_configs.insert(entry_name.clone());
                }
                self.passbook_dir.join(&entry_name)
            };

            let mut outfile = File::create(&target)?;
            io::copy(&mut entry, &mut outfile)?;
        }

        // Config files absent from the archive are removed, so the restored
        // state matches the snapshot exactly
        for config_file in CONFIG_FILES {
            let config_path = self.passbook_dir.join(config_file);
            if !restored_configs.contains(*config_file) && config_path.exists() {
                fs::remove_file(&config_path)?;
            }
        }

        Ok(())
    }

    /// Zip just the database into a pre-restore backup
    fn snapshot_database(&self, db_path: &Path) -> Result<()> {
        let name = Self::generate_name("passbook-pre-restore");
        let file = File::create(self.backups_dir().join(name))?;
        let mut zip = ZipWriter::new(file);
        Self::add_file(&mut zip, db_path, &self.db_filename)?;
        zip.finish()?;
        Ok(())
    }

    /// Delete all backups
    pub fn clear(&self) -> Result<ClearResult> {
        let mut deleted = 0;
        for backup in self.list()? {
            fs::remove_file(self.backups_dir().join(&backup.name))?;
            deleted += 1;
        }
        Ok(ClearResult { deleted })
    }

    /// Drop the oldest archives until at most max_backups remain
    fn prune_oldest(&self, max_backups: usize) -> Result<()> {
        // list() sorts newest first, so everything past the cap is oldest
        for stale in self.list()?.iter().skip(max_backups) {
            fs::remove_file(self.backups_dir().join(&stale.name))?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ClearResult {
    pub deleted: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seed_dir() -> (TempDir, BackupService) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("passbook.duckdb"), b"ledger v1").unwrap();
        fs::write(dir.path().join("settings.json"), b"{}").unwrap();
        let service = BackupService::new(dir.path().to_path_buf(), "passbook.duckdb".to_string());
        (dir, service)
    }

    #[test]
    fn test_size_display() {
        let meta = BackupMetadata {
            name: "passbook-x.zip".to_string(),
            created_at: Utc::now(),
            size_bytes: 1536,
        };
        assert_eq!(meta.size_display(), "1.5 KB");

        let meta = BackupMetadata {
            name: "passbook-x.zip".to_string(),
            created_at: Utc::now(),
            size_bytes: 2 * 1024 * 1024,
        };
        assert_eq!(meta.size_display(), "2.0 MB");
    }

    #[test]
    fn test_create_and_list() {
        let (_dir, service) = seed_dir();

        let created = service.create(None).unwrap();
        assert!(created.name.starts_with("passbook-"));
        assert!(created.name.ends_with(".zip"));
        assert!(created.size_bytes > 0);

        let listed = service.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, created.name);
    }

    #[test]
    fn test_restore_round_trip() {
        let (dir, service) = seed_dir();

        let backup = service.create(None).unwrap();

        // Mutate the live database, then restore the snapshot
        fs::write(dir.path().join("passbook.duckdb"), b"ledger v2").unwrap();
        service.restore(&backup.name).unwrap();

        let restored = fs::read(dir.path().join("passbook.duckdb")).unwrap();
        assert_eq!(restored, b"ledger v1");

        // Restore leaves a pre-restore backup of the overwritten state
        let names: Vec<String> = service.list().unwrap().into_iter().map(|b| b.name).collect();
        assert!(names.iter().any(|n| n.starts_with("passbook-pre-restore-")));
    }

    #[test]
    fn test_restore_unknown_backup_fails() {
        let (_dir, service) = seed_dir();
        assert!(service.restore("passbook-missing.zip").is_err());
    }

    #[test]
    fn test_retention_keeps_newest() {
        let (_dir, service) = seed_dir();

        for _ in 0..4 {
            service.create(Some(2)).unwrap();
        }

        assert_eq!(service.list().unwrap().len(), 2);
    }

    #[test]
    fn test_clear_removes_everything() {
        let (_dir, service) = seed_dir();

        service.create(None).unwrap();
        service.create(None).unwrap();

        let result = service.clear().unwrap();
        assert_eq!(result.deleted, 2);
        assert!(service.list().unwrap().is_empty());
    }
}
