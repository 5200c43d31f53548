// database/migrator.rs - versioned SQL migrations
//
// A migration is a pair of files `<version>_<name>.up.sql` and
// `<version>_<name>.down.sql`. Applied versions live in `schema_migrations`.
// Every migration runs inside its own transaction.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Row};
use thiserror::Error;
use tracing::{debug, info};

pub const MIGRATIONS_TABLE: &str = "schema_migrations";
pub const UP_SUFFIX: &str = ".up.sql";
pub const DOWN_SUFFIX: &str = ".down.sql";

/// Versions at or above this are `YYYYMMDDHHMMSS` timestamps; below it they
/// are sequential.
const TIMESTAMP_VERSION_FLOOR: i64 = 10_000_000_000_000;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid migration file name: {0}")]
    InvalidFileName(String),

    #[error("duplicate migration version {0}")]
    DuplicateVersion(i64),

    #[error("migration {0} has no up file")]
    MissingUp(i64),

    #[error("migration {0} has no down file")]
    MissingDown(i64),

    #[error("no migration with version {0}")]
    UnknownVersion(i64),

    #[error("no migrations applied")]
    NothingApplied,

    #[error("invalid migration name: {0:?}")]
    InvalidName(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MigrationError + '_ {
    move |source| MigrationError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// One migration found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub up_path: PathBuf,
    pub down_path: Option<PathBuf>,
}

impl Migration {
    fn up_sql(&self) -> Result<String, MigrationError> {
        fs::read_to_string(&self.up_path).map_err(io_error(&self.up_path))
    }

    fn down_sql(&self) -> Result<String, MigrationError> {
        let path = self
            .down_path
            .as_ref()
            .ok_or(MigrationError::MissingDown(self.version))?;
        fs::read_to_string(path).map_err(io_error(path))
    }
}

/// Status line for one migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i64,
    pub name: String,
    pub applied_at: Option<DateTime<Utc>>,
}

fn parse_file_name(file_name: &str) -> Result<Option<(i64, String, bool)>, MigrationError> {
    let (stem, is_up) = if let Some(stem) = file_name.strip_suffix(UP_SUFFIX) {
        (stem, true)
    } else if let Some(stem) = file_name.strip_suffix(DOWN_SUFFIX) {
        (stem, false)
    } else {
        return Ok(None);
    };

    let (version, name) = stem
        .split_once('_')
        .ok_or_else(|| MigrationError::InvalidFileName(file_name.to_string()))?;
    let version: i64 = version
        .parse()
        .map_err(|_| MigrationError::InvalidFileName(file_name.to_string()))?;
    if version <= 0 || name.is_empty() {
        return Err(MigrationError::InvalidFileName(file_name.to_string()));
    }

    Ok(Some((version, name.to_string(), is_up)))
}

/// Read every migration in `dir`, ordered by version.
pub fn collect_migrations(dir: &Path) -> Result<Vec<Migration>, MigrationError> {
    let mut ups: BTreeMap<i64, (String, PathBuf)> = BTreeMap::new();
    let mut downs: BTreeMap<i64, PathBuf> = BTreeMap::new();

    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let entry = entry.map_err(io_error(dir))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((version, name, is_up)) = parse_file_name(file_name)? else {
            continue;
        };

        let duplicate = if is_up {
            ups.insert(version, (name, path.clone())).is_some()
        } else {
            downs.insert(version, path.clone()).is_some()
        };
        if duplicate {
            return Err(MigrationError::DuplicateVersion(version));
        }
    }

    if let Some(version) = downs.keys().find(|v| !ups.contains_key(v)) {
        return Err(MigrationError::MissingUp(*version));
    }

    Ok(ups
        .into_iter()
        .map(|(version, (name, up_path))| Migration {
            version,
            name,
            up_path,
            down_path: downs.remove(&version),
        })
        .collect())
}

/// Write an empty up/down pair named `<timestamp>_<name>`.
pub fn create(dir: &Path, name: &str, now: DateTime<Utc>) -> Result<(PathBuf, PathBuf), MigrationError> {
    let name = sanitize_name(name)?;
    let version = now.format("%Y%m%d%H%M%S").to_string();

    fs::create_dir_all(dir).map_err(io_error(dir))?;

    let up_path = dir.join(format!("{}_{}{}", version, name, UP_SUFFIX));
    let down_path = dir.join(format!("{}_{}{}", version, name, DOWN_SUFFIX));

    fs::write(&up_path, format!("-- {} (up)\n", name)).map_err(io_error(&up_path))?;
    fs::write(&down_path, format!("-- {} (down)\n", name)).map_err(io_error(&down_path))?;

    info!(path = %up_path.display(), "created migration");
    Ok((up_path, down_path))
}

fn sanitize_name(name: &str) -> Result<String, MigrationError> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_').to_string();
    if cleaned.is_empty() {
        return Err(MigrationError::InvalidName(name.to_string()));
    }
    Ok(cleaned)
}

/// Renumber timestamped migrations sequentially after the highest sequential
/// version. Returns `(old, new)` version pairs.
pub fn fix(dir: &Path) -> Result<Vec<(i64, i64)>, MigrationError> {
    let migrations = collect_migrations(dir)?;

    let mut next = migrations
        .iter()
        .map(|m| m.version)
        .filter(|v| *v < TIMESTAMP_VERSION_FLOOR)
        .max()
        .unwrap_or(0)
        + 1;

    let mut renamed = Vec::new();
    for migration in migrations.iter().filter(|m| m.version >= TIMESTAMP_VERSION_FLOOR) {
        let new_up = dir.join(format!("{:05}_{}{}", next, migration.name, UP_SUFFIX));
        fs::rename(&migration.up_path, &new_up).map_err(io_error(&migration.up_path))?;

        if let Some(down) = &migration.down_path {
            let new_down = dir.join(format!("{:05}_{}{}", next, migration.name, DOWN_SUFFIX));
            fs::rename(down, &new_down).map_err(io_error(down))?;
        }

        info!(from = migration.version, to = next, name = %migration.name, "renumbered migration");
        renamed.push((migration.version, next));
        next += 1;
    }

    Ok(renamed)
}

/// Applies and rolls back the migrations found in one directory.
pub struct Migrator {
    dir: PathBuf,
    pool: PgPool,
}

impl Migrator {
    pub fn new(dir: impl Into<PathBuf>, pool: PgPool) -> Self {
        Self {
            dir: dir.into(),
            pool,
        }
    }

    /// Apply every pending migration.
    pub async fn up(&self) -> Result<Vec<i64>, MigrationError> {
        self.up_to(i64::MAX).await
    }

    /// Apply pending migrations with a version up to and including `target`.
    pub async fn up_to(&self, target: i64) -> Result<Vec<i64>, MigrationError> {
        let migrations = collect_migrations(&self.dir)?;
        let applied = self.applied().await?;

        let mut done = Vec::new();
        for migration in migrations
            .iter()
            .filter(|m| m.version <= target && !applied.contains_key(&m.version))
        {
            self.apply(migration).await?;
            done.push(migration.version);
        }

        if done.is_empty() {
            info!(version = self.version().await?, "no migrations to run");
        }
        Ok(done)
    }

    /// Roll back the most recently applied migration.
    pub async fn down(&self) -> Result<i64, MigrationError> {
        let current = self.version().await?;
        if current == 0 {
            return Err(MigrationError::NothingApplied);
        }
        let migration = self.find(current)?;
        self.rollback(&migration).await?;
        Ok(current)
    }

    /// Roll back every applied migration newer than `target`.
    pub async fn down_to(&self, target: i64) -> Result<Vec<i64>, MigrationError> {
        let applied = self.applied().await?;

        let mut done = Vec::new();
        for version in applied.keys().rev().filter(|v| **v > target) {
            let migration = self.find(*version)?;
            self.rollback(&migration).await?;
            done.push(*version);
        }
        Ok(done)
    }

    /// Roll back and re-apply the latest migration.
    pub async fn redo(&self) -> Result<i64, MigrationError> {
        let version = self.down().await?;
        let migration = self.find(version)?;
        self.apply(&migration).await?;
        Ok(version)
    }

    /// Roll back everything.
    pub async fn reset(&self) -> Result<Vec<i64>, MigrationError> {
        self.down_to(0).await
    }

    pub async fn status(&self) -> Result<Vec<MigrationStatus>, MigrationError> {
        let migrations = collect_migrations(&self.dir)?;
        let applied = self.applied().await?;

        Ok(migrations
            .into_iter()
            .map(|m| MigrationStatus {
                applied_at: applied.get(&m.version).copied(),
                version: m.version,
                name: m.name,
            })
            .collect())
    }

    /// Highest applied version, `0` when nothing is applied.
    pub async fn version(&self) -> Result<i64, MigrationError> {
        Ok(self.applied().await?.keys().next_back().copied().unwrap_or(0))
    }

    fn find(&self, version: i64) -> Result<Migration, MigrationError> {
        collect_migrations(&self.dir)?
            .into_iter()
            .find(|m| m.version == version)
            .ok_or(MigrationError::UnknownVersion(version))
    }

    async fn ensure_table(&self) -> Result<(), MigrationError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                version BIGINT PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
            MIGRATIONS_TABLE
        );
        self.pool.execute(sql.as_str()).await?;
        Ok(())
    }

    async fn applied(&self) -> Result<BTreeMap<i64, DateTime<Utc>>, MigrationError> {
        self.ensure_table().await?;

        let sql = format!("SELECT version, applied_at FROM {} ORDER BY version", MIGRATIONS_TABLE);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut applied = BTreeMap::new();
        for row in rows {
            applied.insert(row.try_get("version")?, row.try_get("applied_at")?);
        }
        Ok(applied)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let sql = migration.up_sql()?;
        debug!(version = migration.version, sql = %sql, "applying migration");

        let mut tx = self.pool.begin().await?;
        (&mut *tx).execute(sql.as_str()).await?;
        sqlx::query(&format!("INSERT INTO {} (version, name) VALUES ($1, $2)", MIGRATIONS_TABLE))
            .bind(migration.version)
            .bind(&migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(version = migration.version, name = %migration.name, "OK applied migration");
        Ok(())
    }

    async fn rollback(&self, migration: &Migration) -> Result<(), MigrationError> {
        let sql = migration.down_sql()?;
        debug!(version = migration.version, sql = %sql, "rolling back migration");

        let mut tx = self.pool.begin().await?;
        (&mut *tx).execute(sql.as_str()).await?;
        sqlx::query(&format!("DELETE FROM {} WHERE version = $1", MIGRATIONS_TABLE))
            .bind(migration.version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(version = migration.version, name = %migration.name, "OK rolled back migration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "SELECT 1;").unwrap();
    }

    #[test]
    fn parses_file_names() {
        assert_eq!(
            parse_file_name("20241217061821_create_images_metadata_table.up.sql").unwrap(),
            Some((20241217061821, "create_images_metadata_table".to_string(), true))
        );
        assert_eq!(
            parse_file_name("00002_add_index.down.sql").unwrap(),
            Some((2, "add_index".to_string(), false))
        );
        assert_eq!(parse_file_name("README.md").unwrap(), None);
        assert!(parse_file_name("abc_x.up.sql").is_err());
        assert!(parse_file_name("12.up.sql").is_err());
    }

    #[test]
    fn collects_pairs_in_version_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "00002_second.up.sql");
        touch(dir.path(), "00002_second.down.sql");
        touch(dir.path(), "00001_first.up.sql");
        touch(dir.path(), "notes.txt");

        let migrations = collect_migrations(dir.path()).unwrap();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].version, 1);
        assert!(migrations[0].down_path.is_none());
        assert_eq!(migrations[1].name, "second");
        assert!(migrations[1].down_path.is_some());
    }

    #[test]
    fn down_without_up_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "00003_orphan.down.sql");
        assert!(matches!(
            collect_migrations(dir.path()),
            Err(MigrationError::MissingUp(3))
        ));
    }

    #[test]
    fn duplicate_versions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "00001_a.up.sql");
        touch(dir.path(), "00001_b.up.sql");
        assert!(matches!(
            collect_migrations(dir.path()),
            Err(MigrationError::DuplicateVersion(1))
        ));
    }

    #[test]
    fn create_writes_timestamped_pair() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 12, 17, 6, 18, 21).unwrap();

        let (up, down) = create(dir.path(), "Add Width Index", now).unwrap();

        assert!(up.ends_with("20241217061821_add_width_index.up.sql"));
        assert!(down.ends_with("20241217061821_add_width_index.down.sql"));
        assert_eq!(collect_migrations(dir.path()).unwrap()[0].version, 20241217061821);
    }

    #[test]
    fn create_rejects_blank_names() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            create(dir.path(), " -- ", Utc::now()),
            Err(MigrationError::InvalidName(_))
        ));
    }

    #[test]
    fn fix_renumbers_timestamped_after_sequential() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "00001_first.up.sql");
        touch(dir.path(), "20241217061821_create_images.up.sql");
        touch(dir.path(), "20241217061821_create_images.down.sql");
        touch(dir.path(), "20250101000000_add_index.up.sql");

        let renamed = fix(dir.path()).unwrap();

        assert_eq!(renamed, vec![(20241217061821, 2), (20250101000000, 3)]);
        assert!(dir.path().join("00002_create_images.up.sql").exists());
        assert!(dir.path().join("00002_create_images.down.sql").exists());
        assert!(dir.path().join("00003_add_index.up.sql").exists());
        assert!(!dir.path().join("20241217061821_create_images.up.sql").exists());
    }

    #[test]
    fn shipped_migrations_are_well_formed() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        let migrations = collect_migrations(&dir).unwrap();
        let first = &migrations[0];
        assert_eq!(first.name, "create_images_metadata_table");
        assert!(first.up_sql().unwrap().contains("CREATE TABLE images_metadata"));
        assert!(first.down_sql().unwrap().contains("DROP TABLE IF EXISTS images_metadata"));
    }
}
