use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use super::PrizeStore;
use crate::model::{Prize, PrizeUpdate, Prizes};
use crate::{NobelError, Result};

/// The primary struct for working with the prize collection.
///
/// The whole collection is held in memory, and is rewritten into a single JSON file, the
/// "data file", after every mutation. A mutation is first applied to a copy of the collection,
/// the copy is persisted, and only then does it replace the in-memory collection. If persisting
/// fails the store is left unchanged.
///
/// `JsonPrizeStore` is a handle, clones share the same collection. All operations go through
/// one lock, so concurrent writers are serialized and never lose each other's updates.
#[derive(Debug, Clone)]
pub struct JsonPrizeStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug)]
struct Inner {
    // the data file
    path: PathBuf,
    prizes: Prizes,
}

impl JsonPrizeStore {
    /// opens a [`JsonPrizeStore`] using the prizes stored in the data file at `path`.
    ///
    /// # Errors
    /// returns an IO error if the file does not exist or can not be read, and a JSON error if
    /// it does not hold a prize collection
    #[instrument]
    pub fn open(path: &Path) -> Result<JsonPrizeStore> {
        let reader = BufReader::new(fs::File::open(path)?);
        let prizes: Prizes = serde_json::from_reader(reader)?;
        info!(
            "loaded {} prizes from {}",
            prizes.prizes.len(),
            path.display()
        );

        Ok(JsonPrizeStore::from_parts(path, prizes))
    }

    /// creates a [`JsonPrizeStore`] holding `prizes`, and writes them into a (new) data file at
    /// `path`, replacing any existing file
    pub fn create_with(path: &Path, prizes: Prizes) -> Result<JsonPrizeStore> {
        write_json_atomic(path, &prizes)?;
        Ok(JsonPrizeStore::from_parts(path, prizes))
    }

    /// the location of the data file
    pub fn path(&self) -> Result<PathBuf> {
        Ok(self.lock()?.path.clone())
    }

    fn from_parts(path: &Path, prizes: Prizes) -> Self {
        JsonPrizeStore {
            inner: Arc::new(Mutex::new(Inner {
                path: path.to_path_buf(),
                prizes,
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| NobelError::Storage("the prize store lock was poisoned".to_string()))
    }

    /// runs `mutation` on a copy of the collection, persists the copy and swaps it in.
    fn mutate<T>(&self, mutation: impl FnOnce(&mut Prizes) -> Result<T>) -> Result<T> {
        let mut inner = self.lock()?;
        let mut next = inner.prizes.clone();
        let out = mutation(&mut next)?;

        write_json_atomic(&inner.path, &next)
            .map_err(|e| NobelError::Storage(format!("could not persist prizes: {}", e)))?;
        inner.prizes = next;
        Ok(out)
    }
}

impl PrizeStore for JsonPrizeStore {
    fn all(&self) -> Result<Prizes> {
        Ok(self.lock()?.prizes.clone())
    }

    fn by_year(&self, year: i32) -> Result<Vec<Prize>> {
        let found: Vec<Prize> = self
            .lock()?
            .prizes
            .prizes
            .iter()
            .filter(|p| p.year == year)
            .cloned()
            .collect();

        if found.is_empty() {
            return Err(NobelError::NotFound(format!("no prizes for year {}", year)));
        }
        Ok(found)
    }

    fn by_year_and_category(&self, year: i32, category: &str) -> Result<Vec<Prize>> {
        let found: Vec<Prize> = self
            .lock()?
            .prizes
            .prizes
            .iter()
            .filter(|p| p.matches(year, category))
            .cloned()
            .collect();

        if found.is_empty() {
            return Err(not_found(year, category));
        }
        Ok(found)
    }

    #[instrument(skip(self, update))]
    fn update(&self, year: i32, category: &str, update: PrizeUpdate) -> Result<Prize> {
        self.mutate(|prizes| {
            let idx = prizes
                .position(year, category)
                .ok_or_else(|| not_found(year, category))?;
            let prize = &mut prizes.prizes[idx];
            prize.apply(update)?;
            debug!("updated prize {} {}", prize.year, prize.category);
            Ok(prize.clone())
        })
    }

    #[instrument(skip(self))]
    fn delete(&self, year: i32, category: &str) -> Result<Prize> {
        self.mutate(|prizes| {
            let idx = prizes
                .position(year, category)
                .ok_or_else(|| not_found(year, category))?;
            Ok(prizes.prizes.remove(idx))
        })
    }

    #[instrument(skip(self, prize), fields(year = prize.year, category = %prize.category))]
    fn create(&self, mut prize: Prize) -> Result<Prize> {
        self.mutate(|prizes| {
            let mut next_id = prizes.max_laureate_id();
            for laureate in prize.laureates.iter_mut() {
                next_id = next_id.checked_add(1).ok_or_else(|| {
                    NobelError::Validation("no laureate ids are left to assign".to_string())
                })?;
                laureate.id = next_id;
            }
            debug!(last_id = next_id, "assigned laureate ids");

            prizes.prizes.push(prize.clone());
            Ok(prize)
        })
    }
}

fn not_found(year: i32, category: &str) -> NobelError {
    NobelError::NotFound(format!("no {} prize for year {}", category, year))
}

/// serializes `value` as pretty printed JSON into `path`.
///
/// The JSON is written into a temporary file in the same directory, synced, and then renamed
/// over `path`, so readers see either the old or the new file, never a partial one. The parent
/// directory is created if it does not exist.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| NobelError::Io(e.error))?;

    debug!("wrote {}", path.display());
    Ok(())
}
