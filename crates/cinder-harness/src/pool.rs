//! Persistent-memory pool lifecycle.
//!
//! Benchmark fixtures share one pool per manager instance. Creation is
//! exactly-once under concurrent callers (multiple fixture instances racing
//! during setup), teardown force-removes the backing file, and both
//! critical sections are guarded by a single mutex held only around the
//! check-and-create / check-and-destroy steps, never around the pool's
//! runtime use.
//!
//! Pool files are named with random lowercase letters so concurrently
//! running benchmark instances never collide in the shared PMem directory.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::MmapMut;
use parking_lot::Mutex;
use rand::Rng;

use cinder_common::{HarnessConfig, HarnessError, HarnessResult, POOL_FILE_SUFFIX, POOL_NAME_LEN};

/// Generates a fresh pool file path inside `base_dir`.
///
/// The directory is created if absent. The file name is `POOL_NAME_LEN`
/// random lowercase letters plus [`POOL_FILE_SUFFIX`]; the file itself is
/// not created here.
///
/// # Errors
///
/// Returns `DirectoryCreate` if the base directory cannot be created.
pub fn random_pool_file(base_dir: &Path) -> HarnessResult<PathBuf> {
    if !base_dir.exists() {
        fs::create_dir_all(base_dir).map_err(|e| HarnessError::directory_create(base_dir, e))?;
    }

    let mut rng = rand::thread_rng();
    let name: String = (0..POOL_NAME_LEN)
        .map(|_| rng.gen_range('a'..='z'))
        .collect();

    Ok(base_dir.join(format!("{name}{POOL_FILE_SUFFIX}")))
}

/// An open persistent-memory pool.
///
/// Owns the backing file's shared writable mapping for its whole lifetime;
/// dropping the handle unmaps and closes the pool. Valid only between
/// successful creation and teardown.
pub struct PoolHandle {
    path: PathBuf,
    len: u64,
    mmap: MmapMut,
}

impl PoolHandle {
    /// Creates the backing file, sizes it, and maps it shared-writable.
    fn create(path: &Path, size: u64) -> HarnessResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| HarnessError::pool_create(path, e))?;

        file.set_len(size)
            .map_err(|e| HarnessError::pool_create(path, e))?;

        // SAFETY: the file was created by us this instant and is sized to
        // `size`; the mapping lives inside the handle and is dropped with it.
        let mmap =
            unsafe { MmapMut::map_mut(&file) }.map_err(|e| HarnessError::pool_create(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            len: size,
            mmap,
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the pool size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the pool has zero size.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Flushes the mapped region to the backing store.
    ///
    /// The harness itself never calls this; it exists for callers that need
    /// durability guarantees from a store under test.
    pub fn flush(&self) -> HarnessResult<()> {
        self.mmap
            .flush()
            .map_err(|e| HarnessError::pool_create(&self.path, e))
    }
}

impl std::fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolHandle")
            .field("path", &self.path)
            .field("len", &self.len)
            .finish()
    }
}

#[derive(Default)]
struct PoolSlot {
    path: Option<PathBuf>,
    handle: Option<Arc<PoolHandle>>,
}

/// Creates and tears down the pool shared by a benchmark fixture.
///
/// # Example
///
/// ```rust,no_run
/// use cinder_common::HarnessConfig;
/// use cinder_harness::pool::PoolManager;
///
/// let manager = PoolManager::new(&HarnessConfig::for_testing());
/// let pool = manager.acquire()?;
/// assert!(pool.path().exists());
/// manager.release();
/// # Ok::<(), cinder_common::HarnessError>(())
/// ```
pub struct PoolManager {
    dir: PathBuf,
    pool_size: u64,
    slot: Mutex<PoolSlot>,
}

impl PoolManager {
    /// Creates a manager for the configured pool directory and size.
    #[must_use]
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            dir: config.pool_dir.clone(),
            pool_size: config.pool_size,
            slot: Mutex::new(PoolSlot::default()),
        }
    }

    /// Returns the currently recorded pool path, if a pool exists.
    #[must_use]
    pub fn pool_path(&self) -> Option<PathBuf> {
        self.slot.lock().path.clone()
    }

    /// Creates the pool on first use; a no-op if one already exists.
    ///
    /// Concurrent callers on the same instance observe exactly one
    /// creation: the second caller finds the path recorded and receives
    /// the existing handle.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryCreate` if the base directory cannot be created,
    /// or `PoolCreate` if the backing file cannot be created, sized, or
    /// mapped. Creation failure is fatal for the benchmark; the slot is
    /// left empty so nothing half-built survives.
    pub fn acquire(&self) -> HarnessResult<Arc<PoolHandle>> {
        let mut slot = self.slot.lock();

        if slot.path.is_some() {
            // Created by a concurrent caller on this instance.
            let handle = slot.handle.as_ref().expect("pool handle tracks recorded path");
            return Ok(Arc::clone(handle));
        }

        let path = random_pool_file(&self.dir)?;
        let handle = Arc::new(PoolHandle::create(&path, self.pool_size)?);
        tracing::info!(path = %path.display(), size = self.pool_size, "created pmem pool");

        slot.path = Some(path);
        slot.handle = Some(Arc::clone(&handle));
        Ok(handle)
    }

    /// Closes the pool and force-removes its backing file.
    ///
    /// Idempotent: if no path is recorded (or the backing file no longer
    /// exists), this is a no-op. Removal failure is logged and tolerated:
    /// an orphaned pool file costs disk space, not correctness. Outstanding
    /// `Arc<PoolHandle>` clones keep their mapping alive until dropped even
    /// though the file is unlinked.
    ///
    /// After a successful release the recorded path is cleared, so a later
    /// `acquire()` creates a fresh pool at a new path.
    pub fn release(&self) {
        let mut slot = self.slot.lock();

        let Some(path) = slot.path.clone() else {
            return;
        };
        if !path.exists() {
            return;
        }
        slot.path = None;

        // Drop our mapping before unlinking.
        slot.handle = None;

        if let Err(e) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), "failed to remove pool file: {e}");
        }
    }
}

impl std::fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolManager")
            .field("dir", &self.dir)
            .field("pool_size", &self.pool_size)
            .field("path", &self.slot.lock().path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_DIR_COUNTER: AtomicU32 = AtomicU32::new(0);

    /// Per-test pool directory so parallel tests never collide.
    fn test_config() -> HarnessConfig {
        let id = TEST_DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
        let mut config = HarnessConfig::for_testing();
        config.pool_dir = std::env::temp_dir().join(format!(
            "cinder_pool_test_{}_{id}",
            std::process::id()
        ));
        config
    }

    #[test]
    fn test_random_pool_file_shape() {
        let config = test_config();
        let path = random_pool_file(&config.pool_dir).unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.ends_with(POOL_FILE_SUFFIX));
        let stem = name.strip_suffix(POOL_FILE_SUFFIX).unwrap();
        assert_eq!(stem.len(), POOL_NAME_LEN);
        assert!(stem.chars().all(|c| c.is_ascii_lowercase()));

        // Directory was created on demand.
        assert!(config.pool_dir.exists());

        let other = random_pool_file(&config.pool_dir).unwrap();
        assert_ne!(path, other);

        fs::remove_dir_all(&config.pool_dir).unwrap();
    }

    #[test]
    fn test_acquire_creates_pool_once() {
        let config = test_config();
        let manager = PoolManager::new(&config);

        let pool = manager.acquire().unwrap();
        assert!(pool.path().exists());
        assert_eq!(pool.len(), config.pool_size);
        assert_eq!(
            fs::metadata(pool.path()).unwrap().len(),
            config.pool_size
        );

        // Second acquire is a no-op returning the same pool.
        let again = manager.acquire().unwrap();
        assert_eq!(pool.path(), again.path());

        manager.release();
        fs::remove_dir_all(&config.pool_dir).unwrap();
    }

    #[test]
    fn test_release_removes_backing_file() {
        let config = test_config();
        let manager = PoolManager::new(&config);

        let path = manager.acquire().unwrap().path().to_path_buf();
        assert!(path.exists());

        manager.release();
        assert!(!path.exists());
        assert!(manager.pool_path().is_none());

        // Second release is a no-op.
        manager.release();

        fs::remove_dir_all(&config.pool_dir).unwrap();
    }

    #[test]
    fn test_acquire_after_release_creates_fresh_pool() {
        let config = test_config();
        let manager = PoolManager::new(&config);

        let first = manager.acquire().unwrap().path().to_path_buf();
        manager.release();

        let second = manager.acquire().unwrap().path().to_path_buf();
        assert_ne!(first, second);
        assert!(second.exists());

        manager.release();
        fs::remove_dir_all(&config.pool_dir).unwrap();
    }

    #[test]
    fn test_concurrent_acquire_creates_exactly_one_pool() {
        let config = test_config();
        let manager = PoolManager::new(&config);

        let paths: Vec<PathBuf> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| manager.acquire().unwrap().path().to_path_buf()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(paths.windows(2).all(|w| w[0] == w[1]));

        manager.release();
        fs::remove_dir_all(&config.pool_dir).unwrap();
    }
}
