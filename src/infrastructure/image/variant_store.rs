//! Namespaced on-disk persistor for image variants.
//!
//! One file per `(key, modifier, size)` address inside the namespace
//! directory. The creation time of a record is its modification time (records
//! are only ever replaced whole), and the last-access time is stamped
//! explicitly on every successful read.

use std::fs::{self, FileTimes, OpenOptions};
use std::io::{Cursor, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use tracing::{debug, trace, warn};

use crate::domain::entities::{RetentionClass, StoredImage, StoredRecord, Variant, VariantSize};
use crate::domain::errors::{VendError, VendResult};

use super::store_roots::{StoreRoots, mark_namespace_dir};

/// File extension of stored records.
pub const RECORD_EXTENSION: &str = "img";

/// Persists encoded variants under one namespace with a fixed retention class.
///
/// Instances pointing at the same durable or reloadable namespace share their
/// records. Each `Temporary` instance writes to its own scratch directory
/// inside the namespace, which it deletes when dropped.
#[derive(Debug)]
pub struct VariantStore {
    namespace: String,
    retention: RetentionClass,
    dir: PathBuf,
    scratch: Option<TempDir>,
}

impl VariantStore {
    /// Opens (and creates if needed) `namespace` under the root for `retention`.
    ///
    /// # Errors
    /// Returns `InvalidAddress` for a bad namespace and `Write` if the
    /// directory cannot be created.
    pub fn new(
        namespace: impl Into<String>,
        retention: RetentionClass,
        roots: &StoreRoots,
    ) -> VendResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;

        let namespace_dir = roots.root_for(retention).join(&namespace);
        fs::create_dir_all(&namespace_dir).map_err(|e| VendError::write(&namespace_dir, e))?;
        mark_namespace_dir(&namespace_dir, retention);

        let scratch = if retention.wipes_on_drop() {
            let scratch = tempfile::Builder::new()
                .prefix("store-")
                .tempdir_in(&namespace_dir)
                .map_err(|e| VendError::write(&namespace_dir, e))?;
            Some(scratch)
        } else {
            None
        };
        let dir = scratch
            .as_ref()
            .map_or(namespace_dir, |scratch| scratch.path().to_path_buf());

        debug!(namespace = %namespace, retention = %retention, dir = %dir.display(), "Opened variant store");

        Ok(Self {
            namespace,
            retention,
            dir,
            scratch,
        })
    }

    /// Opens a namespace in the platform default roots.
    ///
    /// # Errors
    /// See [`VariantStore::new`].
    pub fn default_location(
        namespace: impl Into<String>,
        retention: RetentionClass,
    ) -> VendResult<Self> {
        Self::new(namespace, retention, &StoreRoots::default_location())
    }

    /// Namespace this store writes to.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Retention class fixed at construction.
    #[must_use]
    pub const fn retention(&self) -> RetentionClass {
        self.retention
    }

    /// Directory holding this namespace's records.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for an address. Pure: the same inputs always map to
    /// the same path, across instances and restarts of a non-temporary store.
    #[must_use]
    pub fn file_path(&self, key: &str, variant: Variant, size: VariantSize) -> PathBuf {
        self.dir.join(record_file_name(key, variant, size))
    }

    /// Persists the untouched original for `key`.
    ///
    /// # Errors
    /// See [`VariantStore::persist_bytes`].
    pub fn persist(&self, image: &DynamicImage, key: &str) -> VendResult<PathBuf> {
        self.persist_variant(image, key, Variant::Original, VariantSize::Original)
    }

    /// Encodes `image` as PNG and persists it at the address.
    ///
    /// # Errors
    /// See [`VariantStore::persist_bytes`].
    pub fn persist_variant(
        &self,
        image: &DynamicImage,
        key: &str,
        variant: Variant,
        size: VariantSize,
    ) -> VendResult<PathBuf> {
        validate_component(key, "key")?;
        let bytes = encode_png(image).map_err(|e| {
            VendError::write(&self.file_path(key, variant, size), format!("encode failed: {e}"))
        })?;
        self.persist_bytes(&bytes, key, variant, size)
    }

    /// Writes already-encoded bytes to the address, replacing any record there.
    ///
    /// The bytes go to a temporary file in the namespace directory first and
    /// are renamed into place, so readers never see a partial record and a
    /// failed write leaves nothing behind.
    ///
    /// # Errors
    /// Returns `InvalidAddress` before any I/O if the key contains a path
    /// separator, and `Write` if the storage write fails.
    pub fn persist_bytes(
        &self,
        bytes: &[u8],
        key: &str,
        variant: Variant,
        size: VariantSize,
    ) -> VendResult<PathBuf> {
        validate_component(key, "key")?;
        let path = self.file_path(key, variant, size);

        let mut temp_file =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| VendError::write(&path, e))?;
        temp_file
            .write_all(bytes)
            .map_err(|e| VendError::write(&path, e))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| VendError::write(&path, e))?;
        let file = temp_file
            .persist(&path)
            .map_err(|e| VendError::write(&path, e.error))?;

        let now = SystemTime::now();
        if let Err(e) = file.set_times(FileTimes::new().set_modified(now).set_accessed(now)) {
            warn!(path = %path.display(), error = %e, "Failed to stamp record times");
        }

        debug!(
            namespace = %self.namespace,
            key,
            variant = %variant,
            size = %size,
            bytes = bytes.len(),
            "Persisted variant"
        );
        Ok(path)
    }

    /// Reads the untouched original for `key`.
    #[must_use]
    pub fn image(&self, key: &str) -> Option<StoredImage> {
        self.image_variant(key, Variant::Original, VariantSize::Original, 1.0)
    }

    /// Reads and decodes a record; `scale` is the display density attached to
    /// the result and does not affect decoding.
    #[must_use]
    pub fn image_variant(
        &self,
        key: &str,
        variant: Variant,
        size: VariantSize,
        scale: f32,
    ) -> Option<StoredImage> {
        match self.try_image_variant(key, variant, size, scale) {
            Ok(image) => image,
            Err(e) => {
                warn!(namespace = %self.namespace, key, error = %e, "Failed to load stored variant");
                None
            }
        }
    }

    /// Like [`VariantStore::image_variant`] but reports why a read failed.
    /// A missing record is `Ok(None)`.
    ///
    /// # Errors
    /// Returns `InvalidAddress` for a bad key and `Read` if the record exists
    /// but cannot be read or decoded. Failed reads leave the access time alone.
    pub fn try_image_variant(
        &self,
        key: &str,
        variant: Variant,
        size: VariantSize,
        scale: f32,
    ) -> VendResult<Option<StoredImage>> {
        self.read_with(key, variant, size, |path, bytes| {
            image::load_from_memory(&bytes)
                .map(|image| StoredImage::new(image, scale))
                .map_err(|e| VendError::read(path, e))
        })
    }

    /// Raw bytes of a record.
    #[must_use]
    pub fn bytes(&self, key: &str, variant: Variant, size: VariantSize) -> Option<Vec<u8>> {
        match self.read_with(key, variant, size, |_, bytes| Ok(bytes)) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(namespace = %self.namespace, key, error = %e, "Failed to read stored variant");
                None
            }
        }
    }

    fn read_with<T>(
        &self,
        key: &str,
        variant: Variant,
        size: VariantSize,
        decode: impl FnOnce(&Path, Vec<u8>) -> VendResult<T>,
    ) -> VendResult<Option<T>> {
        validate_component(key, "key")?;
        let path = self.file_path(key, variant, size);

        let previous_access = fs::metadata(&path).and_then(|meta| meta.accessed()).ok();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(namespace = %self.namespace, key, "Variant store miss");
                return Ok(None);
            }
            Err(e) => return Err(VendError::read(&path, e)),
        };

        match decode(&path, bytes) {
            Ok(value) => {
                stamp_accessed(&path, SystemTime::now());
                trace!(namespace = %self.namespace, key, "Variant store hit");
                Ok(Some(value))
            }
            Err(e) => {
                // Undo any access-time bump the filesystem made during the read.
                if let Some(previous) = previous_access {
                    stamp_accessed(&path, previous);
                }
                Err(e)
            }
        }
    }

    /// Returns true if a record exists at the address.
    #[must_use]
    pub fn contains(&self, key: &str, variant: Variant, size: VariantSize) -> bool {
        validate_component(key, "key").is_ok() && self.file_path(key, variant, size).is_file()
    }

    /// Deletes the record at one address. Returns true if it existed.
    pub fn remove_variant(&self, key: &str, variant: Variant, size: VariantSize) -> bool {
        if validate_component(key, "key").is_err() {
            return false;
        }
        let path = self.file_path(key, variant, size);
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove stored variant");
                false
            }
        }
    }

    /// Deletes every record of `key` in this namespace. Returns how many went.
    pub fn remove_images(&self, key: &str) -> usize {
        if let Err(e) = validate_component(key, "key") {
            warn!(namespace = %self.namespace, error = %e, "Refusing to remove images");
            return 0;
        }
        let digest = key_digest(key);
        self.remove_where(|record| record.key_digest == digest)
    }

    /// Deletes every record in this namespace.
    pub fn remove_all_images(&self) -> usize {
        self.remove_where(|_| true)
    }

    /// Deletes records created strictly before `threshold`.
    pub fn remove_images_created_before(&self, threshold: DateTime<Utc>) -> usize {
        self.remove_where(|record| record.created_at < threshold)
    }

    /// Deletes records last read (or written) strictly before `threshold`.
    pub fn remove_images_accessed_before(&self, threshold: DateTime<Utc>) -> usize {
        self.remove_where(|record| record.accessed_at < threshold)
    }

    fn remove_where(&self, predicate: impl Fn(&StoredRecord) -> bool) -> usize {
        let mut removed = 0usize;
        for record in self.records().into_iter().filter(|record| predicate(record)) {
            match fs::remove_file(&record.path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %record.path.display(), error = %e, "Failed to remove stored variant");
                }
            }
        }
        debug!(namespace = %self.namespace, removed, "Removed stored variants");
        removed
    }

    /// Metadata of every record currently in the namespace.
    #[must_use]
    pub fn records(&self) -> Vec<StoredRecord> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_none_or(|ext| ext != RECORD_EXTENSION) {
                    return None;
                }
                let meta = entry.metadata().ok()?;
                if !meta.is_file() {
                    return None;
                }
                parse_record(path, &meta)
            })
            .collect()
    }

    /// Number of records in the namespace.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Returns true if the namespace holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size of all records in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.records().iter().map(|record| record.len).sum()
    }
}

impl Drop for VariantStore {
    fn drop(&mut self) {
        let Some(scratch) = self.scratch.take() else {
            return;
        };
        let removed = self.remove_all_images();
        if let Err(e) = scratch.close()
            && e.kind() != ErrorKind::NotFound
        {
            warn!(dir = %self.dir.display(), error = %e, "Failed to remove temporary store");
        }
        debug!(namespace = %self.namespace, removed, "Tore down temporary variant store");
    }
}

/// Rejects names that cannot be used as a single namespace directory.
pub(crate) fn validate_namespace(namespace: &str) -> VendResult<()> {
    validate_component(namespace, "namespace")?;
    if namespace == "." || namespace == ".." {
        return Err(VendError::invalid_address(
            namespace,
            "namespace must name a directory",
        ));
    }
    Ok(())
}

/// Rejects empty components and anything with a path separator.
fn validate_component(value: &str, label: &str) -> VendResult<()> {
    if value.is_empty() {
        return Err(VendError::invalid_address(value, format!("{label} is empty")));
    }
    if value.chars().any(|c| std::path::is_separator(c) || c == '/' || c == '\\') {
        return Err(VendError::invalid_address(
            value,
            format!("{label} contains a path separator"),
        ));
    }
    if value.contains('\0') {
        return Err(VendError::invalid_address(value, format!("{label} contains NUL")));
    }
    Ok(())
}

/// First 16 bytes of the key's SHA-256, hex encoded.
fn key_digest(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

fn record_file_name(key: &str, variant: Variant, size: VariantSize) -> String {
    let dimensions = size.dimensions();
    format!(
        "{}-{:02x}-{}x{}.{RECORD_EXTENSION}",
        key_digest(key),
        variant.bits(),
        dimensions.width,
        dimensions.height
    )
}

fn parse_record(path: PathBuf, meta: &fs::Metadata) -> Option<StoredRecord> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.splitn(3, '-');
    let key_digest = parts.next()?.to_string();
    let bits = u64::from_str_radix(parts.next()?, 16).ok()?;
    let (width, height) = parts.next()?.split_once('x')?;
    let size = VariantSize::new(width.parse().ok()?, height.parse().ok()?);

    let created_at: DateTime<Utc> = meta.modified().ok()?.into();
    let accessed_at = meta.accessed().map_or(created_at, DateTime::<Utc>::from);

    Some(StoredRecord {
        path,
        key_digest,
        variant: Variant::from_bits(bits),
        size,
        len: meta.len(),
        created_at,
        accessed_at,
    })
}

fn encode_png(image: &DynamicImage) -> image::ImageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    match image {
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            DynamicImage::ImageRgba16(image.to_rgba16())
                .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        }
        _ => image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?,
    }
    Ok(bytes)
}

fn stamp_accessed(path: &Path, when: SystemTime) {
    let result = OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| file.set_times(FileTimes::new().set_accessed(when)));
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Failed to stamp access time");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Modifier, Size};
    use chrono::Duration;
    use image::{GenericImageView, Rgba, RgbaImage};
    use std::time::UNIX_EPOCH;
    use tempfile::TempDir;

    fn create_test_store(retention: RetentionClass) -> (VariantStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = VariantStore::new("avatars", retention, &StoreRoots::under(temp_dir.path()))
            .unwrap();
        (store, temp_dir)
    }

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                u8::try_from(x % 256).unwrap(),
                u8::try_from(y % 256).unwrap(),
                u8::try_from((x + y) % 256).unwrap(),
                200,
            ])
        }))
    }

    /// Whole seconds, so filesystems with coarse timestamps compare exactly.
    fn whole_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
        DateTime::from_timestamp(time.timestamp(), 0).unwrap()
    }

    fn set_times(path: &Path, created: Option<DateTime<Utc>>, accessed: Option<DateTime<Utc>>) {
        let file = OpenOptions::new().write(true).open(path).unwrap();
        let mut times = FileTimes::new();
        if let Some(created) = created {
            times = times.set_modified(created.into());
        }
        if let Some(accessed) = accessed {
            times = times.set_accessed(accessed.into());
        }
        file.set_times(times).unwrap();
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        let original = gradient(37, 21);

        let path = store.persist(&original, "user-1").unwrap();
        assert_eq!(path, store.file_path("user-1", Variant::Original, VariantSize::Original));

        let loaded = store.image("user-1").unwrap();
        assert_eq!(loaded.image.dimensions(), (37, 21));
        assert_eq!(loaded.image.to_rgba8(), original.to_rgba8());
    }

    #[test]
    fn test_miss_returns_none() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        assert!(store.image("nobody").is_none());
        assert!(
            store
                .try_image_variant("nobody", Variant::Original, VariantSize::Original, 1.0)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_scale_is_display_only() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        let variant = Variant::from(Modifier::CIRCULAR);
        let size = VariantSize::new(40, 40);
        store.persist_variant(&gradient(40, 40), "k", variant, size).unwrap();

        let loaded = store.image_variant("k", variant, size, 2.0).unwrap();
        assert_eq!(loaded.pixel_size(), Size::new(40, 40));
        assert_eq!(loaded.point_size(), Size::new(20, 20));
    }

    #[test]
    fn test_file_path_is_pure() {
        let temp_dir = TempDir::new().unwrap();
        let roots = StoreRoots::under(temp_dir.path());
        let first = VariantStore::new("ns", RetentionClass::UserGenerated, &roots).unwrap();
        let second = VariantStore::new("ns", RetentionClass::UserGenerated, &roots).unwrap();

        let variant = Variant::from(Modifier::CIRCULAR | Modifier::BLURRED);
        let size = VariantSize::new(100, 100);
        let path = first.file_path("owner", variant, size);

        assert_eq!(path, first.file_path("owner", variant, size));
        assert_eq!(path, second.file_path("owner", variant, size));
        assert_eq!(
            path,
            temp_dir
                .path()
                .join("data")
                .join("ns")
                .join(format!("{}-03-100x100.img", key_digest("owner")))
        );
    }

    #[test]
    fn test_distinct_addresses_do_not_collide() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        let paths = [
            store.file_path("a", Variant::Original, VariantSize::Original),
            store.file_path("b", Variant::Original, VariantSize::Original),
            store.file_path("a", Modifier::CIRCULAR.into(), VariantSize::Original),
            store.file_path("a", Variant::Original, VariantSize::new(10, 10)),
            store.file_path("a", Variant::Original, VariantSize::new(10, 0)),
        ];
        let unique: std::collections::HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), paths.len());
    }

    #[test]
    fn test_separator_in_key_rejected_before_io() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);

        let err = store.persist(&gradient(2, 2), "a/b").unwrap_err();
        assert!(matches!(err, VendError::InvalidAddress { .. }));
        assert!(store.is_empty());
        assert!(store.image("a/b").is_none());
    }

    #[test]
    fn test_separator_in_namespace_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let roots = StoreRoots::under(temp_dir.path());

        for namespace in ["a/b", "", ".."] {
            let err = VariantStore::new(namespace, RetentionClass::Reloadable, &roots).unwrap_err();
            assert!(matches!(err, VendError::InvalidAddress { .. }), "{namespace}");
        }
    }

    #[test]
    fn test_overwrite_keeps_one_record() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);

        store.persist(&gradient(4, 4), "k").unwrap();
        store.persist(&gradient(8, 8), "k").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.image("k").unwrap().image.dimensions(), (8, 8));
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let (store, temp) = create_test_store(RetentionClass::Reloadable);
        fs::remove_dir_all(store.dir()).unwrap();

        let result = store.persist_bytes(b"data", "k", Variant::Original, VariantSize::Original);
        assert!(matches!(result, Err(VendError::Write { .. })));
        assert!(!store.file_path("k", Variant::Original, VariantSize::Original).exists());
        drop(temp);
    }

    #[test]
    fn test_remove_images_for_key() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        let image = gradient(4, 4);

        store.persist(&image, "keep").unwrap();
        store.persist(&image, "drop").unwrap();
        store
            .persist_variant(&image, "drop", Modifier::BLURRED.into(), VariantSize::new(2, 2))
            .unwrap();

        assert_eq!(store.remove_images("drop"), 2);
        assert_eq!(store.len(), 1);
        assert!(store.contains("keep", Variant::Original, VariantSize::Original));
    }

    #[test]
    fn test_remove_all_images() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        store.persist(&gradient(2, 2), "a").unwrap();
        store.persist(&gradient(2, 2), "b").unwrap();

        assert_eq!(store.remove_all_images(), 2);
        assert!(store.is_empty());
        assert!(store.dir().join("CACHEDIR.TAG").exists());
    }

    #[test]
    fn test_remove_created_before_is_strict() {
        let (store, _temp) = create_test_store(RetentionClass::UserGenerated);
        let threshold = whole_seconds(Utc::now());
        let image = gradient(2, 2);

        for (key, offset) in [("older", -1), ("exact", 0), ("newer", 1)] {
            let path = store.persist(&image, key).unwrap();
            set_times(&path, Some(threshold + Duration::hours(offset)), None);
        }

        assert_eq!(store.remove_images_created_before(threshold), 1);
        assert!(store.image("older").is_none());
        assert!(store.image("exact").is_some());
        assert!(store.image("newer").is_some());
    }

    #[test]
    fn test_remove_accessed_before() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        let threshold = whole_seconds(Utc::now()) - Duration::hours(1);
        let image = gradient(2, 2);

        let stale = store.persist(&image, "stale").unwrap();
        let fresh = store.persist(&image, "fresh").unwrap();
        set_times(&stale, None, Some(threshold - Duration::hours(1)));
        set_times(&fresh, None, Some(threshold - Duration::hours(1)));

        // Reading refreshes the access time.
        assert!(store.image("fresh").is_some());

        assert_eq!(store.remove_images_accessed_before(threshold), 1);
        assert!(!stale.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn test_failed_read_keeps_access_time() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        let path = store
            .persist_bytes(b"not an image", "broken", Variant::Original, VariantSize::Original)
            .unwrap();
        let old = whole_seconds(Utc::now()) - Duration::days(3);
        set_times(&path, None, Some(old));

        assert!(store.image("broken").is_none());
        assert!(matches!(
            store.try_image_variant("broken", Variant::Original, VariantSize::Original, 1.0),
            Err(VendError::Read { .. })
        ));

        let record = store.records().pop().unwrap();
        assert_eq!(record.accessed_at, old);
    }

    #[test]
    fn test_records_describe_addresses() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        let variant = Variant::from(Modifier::CIRCULAR | Modifier::GRAYSCALE);
        store
            .persist_variant(&gradient(6, 3), "k", variant, VariantSize::new(6, 0))
            .unwrap();

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key_digest, key_digest("k"));
        assert_eq!(records[0].variant, variant);
        assert_eq!(records[0].size, VariantSize::new(6, 0));
        assert_eq!(store.total_bytes(), records[0].len);
        assert!(records[0].created_at > DateTime::<Utc>::from(UNIX_EPOCH));
    }

    #[test]
    fn test_temporary_store_wiped_on_drop() {
        let (store, _temp) = create_test_store(RetentionClass::Temporary);
        store.persist(&gradient(2, 2), "k").unwrap();
        let dir = store.dir().to_path_buf();
        assert!(dir.exists());

        drop(store);
        assert!(!dir.exists());
    }

    #[test]
    fn test_remove_variant_targets_one_address() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        let circular = Variant::from(Modifier::CIRCULAR);
        store.persist(&gradient(4, 4), "k").unwrap();
        store
            .persist_variant(&gradient(4, 4), "k", circular, VariantSize::new(2, 2))
            .unwrap();

        assert!(store.remove_variant("k", circular, VariantSize::new(2, 2)));
        assert!(!store.remove_variant("k", circular, VariantSize::new(2, 2)));
        assert!(!store.remove_variant("a/b", circular, VariantSize::new(2, 2)));
        assert!(store.image("k").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_temporary_stores_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let roots = StoreRoots::under(temp_dir.path());
        let a = VariantStore::new("ns", RetentionClass::Temporary, &roots).unwrap();
        let b = VariantStore::new("ns", RetentionClass::Temporary, &roots).unwrap();
        assert_ne!(a.dir(), b.dir());

        b.persist(&gradient(2, 2), "k").unwrap();
        assert!(a.image("k").is_none());
        drop(a);

        assert_eq!(b.image("k").unwrap().image.dimensions(), (2, 2));
        b.persist(&gradient(2, 2), "k2").unwrap();
        assert_eq!(b.len(), 2);

        let b_dir = b.dir().to_path_buf();
        drop(b);
        assert!(!b_dir.exists());
        assert!(roots.scratch.join("ns").exists());
    }

    #[test]
    fn test_durable_store_survives_drop() {
        let temp_dir = TempDir::new().unwrap();
        let roots = StoreRoots::under(temp_dir.path());
        let store = VariantStore::new("ns", RetentionClass::BackedUp, &roots).unwrap();
        store.persist(&gradient(3, 3), "k").unwrap();
        drop(store);

        let reopened = VariantStore::new("ns", RetentionClass::BackedUp, &roots).unwrap();
        assert_eq!(reopened.image("k").unwrap().image.dimensions(), (3, 3));
    }

    #[test]
    fn test_concurrent_writers_never_expose_partial_records() {
        let (store, _temp) = create_test_store(RetentionClass::Reloadable);
        let images: Vec<DynamicImage> = (1..=4).map(|n| gradient(n * 16, n * 16)).collect();

        std::thread::scope(|scope| {
            for image in &images {
                let store = &store;
                scope.spawn(move || {
                    for _ in 0..5 {
                        store.persist(image, "shared").unwrap();
                        let loaded = store.image("shared").unwrap();
                        let (width, height) = loaded.image.dimensions();
                        assert_eq!(width, height);
                    }
                });
            }
        });

        assert_eq!(store.len(), 1);
    }
}
