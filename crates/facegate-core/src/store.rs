//! On-disk face store.
//!
//! One directory per person under the store root:
//!
//! ```text
//! <root>/<person_id>/<name>_<yyyymmdd_HHMMSS>.jpg
//! <root>/<person_id>/info.json
//! ```
//!
//! The existing record is checked first, then the crop is written, then the
//! record is replaced via rename, so an interrupted enrollment leaves at worst
//! an unreferenced crop.

use chrono::{Local, NaiveDateTime};
use image::codecs::jpeg::JpegEncoder;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

const RECORD_FILE: &str = "info.json";
const CROP_EXTENSION: &str = "jpg";
const JPEG_QUALITY: u8 = 95;
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const MAX_STEM_CHARS: usize = 64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encoding: {0}")]
    Image(#[from] image::ImageError),
    #[error("record JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid record {path}: {reason}")]
    InvalidRecord { path: PathBuf, reason: String },
}

/// One enrolled crop of a person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrolledImage {
    pub path: String,
    /// Capture time, `yyyymmdd_HHMMSS`.
    pub timestamp: String,
}

/// Sidecar record stored as `info.json` in each person directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: i64,
    pub name: String,
    pub added_date: NaiveDateTime,
    pub images: Vec<EnrolledImage>,
}

pub struct FaceStore {
    root: PathBuf,
    // Serializes record read-modify-write cycles and deletions.
    write_lock: Mutex<()>,
}

impl FaceStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::info!(root = %root.display(), "face store opened");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn person_dir(&self, person_id: i64) -> PathBuf {
        self.root.join(person_id.to_string())
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a grayscale face crop for a person and append it to their record,
    /// creating both directory and record on first enrollment.
    pub fn save_face_crop(
        &self,
        person_id: i64,
        name: &str,
        crop: &GrayImage,
    ) -> Result<PathBuf, StoreError> {
        let _guard = self.lock();

        let dir = self.person_dir(person_id);
        fs::create_dir_all(&dir)?;

        let now = Local::now().naive_local();
        let record_path = dir.join(RECORD_FILE);
        let mut record = if record_path.exists() {
            read_record(&record_path)?
        } else {
            PersonRecord {
                id: person_id,
                name: name.to_string(),
                added_date: now,
                images: Vec::new(),
            }
        };
        if record.id != person_id {
            return Err(StoreError::InvalidRecord {
                path: record_path,
                reason: format!("holds id {}, expected {person_id}", record.id),
            });
        }

        let timestamp = now.format(FILE_TIMESTAMP_FORMAT).to_string();
        let crop_path = unique_crop_path(&dir, &file_stem(name), &timestamp);
        write_jpeg(&crop_path, crop)?;

        record.images.push(EnrolledImage {
            path: crop_path.display().to_string(),
            timestamp,
        });
        write_record(&record_path, &record)?;

        tracing::info!(
            person_id,
            name,
            path = %crop_path.display(),
            images = record.images.len(),
            "face crop stored"
        );
        Ok(crop_path)
    }

    /// All valid person records. Directories without a record, or whose record
    /// fails validation, are skipped.
    pub fn list_people(&self) -> Result<Vec<PersonRecord>, StoreError> {
        let mut people = Vec::new();
        for dir in self.person_dirs()? {
            let record_path = dir.join(RECORD_FILE);
            if !record_path.exists() {
                tracing::warn!(dir = %dir.display(), "person directory without record, skipping");
                continue;
            }
            match read_valid_record(&dir, &record_path) {
                Ok(record) => people.push(record),
                Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "skipping invalid person record"),
            }
        }
        Ok(people)
    }

    /// Remove a person and all their crops. Returns `false` if unknown.
    pub fn delete_person(&self, person_id: i64) -> Result<bool, StoreError> {
        let _guard = self.lock();

        let dir = self.person_dir(person_id);
        if !dir.is_dir() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        tracing::info!(person_id, "person deleted");
        Ok(true)
    }

    /// Every readable crop paired with its person id (taken from the directory name).
    ///
    /// Walks directories and files in sorted order so the same store always
    /// yields the same training set.
    pub fn load_all_faces_for_training(&self) -> Result<Vec<(GrayImage, i64)>, StoreError> {
        let mut faces = Vec::new();

        for dir in self.person_dirs()? {
            let label = dir
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.parse::<i64>().ok());
            let Some(label) = label else {
                tracing::warn!(dir = %dir.display(), "directory name is not a person id, skipping");
                continue;
            };

            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "unreadable person directory, skipping");
                    continue;
                }
            };
            let mut crops: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| is_crop(p))
                .collect();
            crops.sort();

            for path in crops {
                match image::open(&path) {
                    Ok(img) => faces.push((img.to_luma8(), label)),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "unreadable face crop, skipping")
                    }
                }
            }
        }

        tracing::debug!(faces = faces.len(), "loaded training set");
        Ok(faces)
    }

    fn person_dirs(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }
}

fn is_crop(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(CROP_EXTENSION))
}

/// Reduce a display name to something safe to use as a file name stem.
fn file_stem(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .take(MAX_STEM_CHARS)
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "face".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `<stem>_<timestamp>.jpg`, or `<stem>_<timestamp>_<n>.jpg` if taken.
fn unique_crop_path(dir: &Path, stem: &str, timestamp: &str) -> PathBuf {
    let path = dir.join(format!("{stem}_{timestamp}.{CROP_EXTENSION}"));
    if !path.exists() {
        return path;
    }
    let mut n = 1u32;
    loop {
        let path = dir.join(format!("{stem}_{timestamp}_{n}.{CROP_EXTENSION}"));
        if !path.exists() {
            return path;
        }
        n += 1;
    }
}

fn write_jpeg(path: &Path, crop: &GrayImage) -> Result<(), StoreError> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(crop)?;
    out.flush()?;
    Ok(())
}

fn read_record(path: &Path) -> Result<PersonRecord, StoreError> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

fn write_record(path: &Path, record: &PersonRecord) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(record)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Parse a record and check it matches its directory and that its crops exist.
fn read_valid_record(dir: &Path, record_path: &Path) -> Result<PersonRecord, StoreError> {
    let record = read_record(record_path)?;
    let invalid = |reason: String| StoreError::InvalidRecord {
        path: record_path.to_path_buf(),
        reason,
    };

    let dir_name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if dir_name != record.id.to_string() {
        return Err(invalid(format!("id {} stored under directory {dir_name:?}", record.id)));
    }

    for image in &record.images {
        if !crop_exists(dir, &image.path) {
            return Err(invalid(format!("missing image {}", image.path)));
        }
    }
    Ok(record)
}

/// A crop reference resolves either as stored or by file name inside the
/// person directory (covers a relocated store root).
fn crop_exists(dir: &Path, stored: &str) -> bool {
    let stored = Path::new(stored);
    stored.is_file()
        || stored
            .file_name()
            .is_some_and(|name| dir.join(name).is_file())
}
