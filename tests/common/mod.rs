//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use chrono::{Local, TimeZone};
use filetime::{set_file_mtime, FileTime};
use photo_archiver::core::repository::ContentRepository;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_DATE_TIME: u16 = 0x0132;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;
const TAG_DATE_TIME_DIGITIZED: u16 = 0x9004;

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;

/// Builds a minimal JPEG whose APP1 segment carries real EXIF fields
#[derive(Debug, Clone, Default)]
pub struct ExifFixture {
    make: Option<String>,
    model: Option<String>,
    date_time: Option<String>,
    date_time_original: Option<String>,
    date_time_digitized: Option<String>,
}

impl ExifFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixture taken at `YYYY:MM:DD HH:MM:SS`
    pub fn taken(date: &str) -> Self {
        Self::new().original(date)
    }

    pub fn camera(mut self, make: &str, model: &str) -> Self {
        self.make = Some(make.to_string());
        self.model = Some(model.to_string());
        self
    }

    pub fn original(mut self, date: &str) -> Self {
        self.date_time_original = Some(date.to_string());
        self
    }

    pub fn digitized(mut self, date: &str) -> Self {
        self.date_time_digitized = Some(date.to_string());
        self
    }

    pub fn date_time(mut self, date: &str) -> Self {
        self.date_time = Some(date.to_string());
        self
    }

    /// JPEG bytes; `payload` goes in a comment segment to make content unique
    pub fn jpeg(&self, payload: &[u8]) -> Vec<u8> {
        let mut app1 = b"Exif\0\0".to_vec();
        app1.extend(self.tiff());

        let mut out = vec![0xFF, 0xD8];
        push_segment(&mut out, 0xE1, &app1);
        push_segment(&mut out, 0xFE, payload);
        out.extend([0xFF, 0xD9]);
        out
    }

    pub fn write(&self, path: &Path, payload: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, self.jpeg(payload)).unwrap();
    }

    /// Little-endian TIFF block: IFD0, then the Exif IFD, then string data
    fn tiff(&self) -> Vec<u8> {
        let present = |fields: &[(u16, &Option<String>)]| -> Vec<(u16, String)> {
            fields
                .iter()
                .filter_map(|(tag, value)| value.as_ref().map(|v| (*tag, v.clone())))
                .collect()
        };
        let ifd0 = present(&[
            (TAG_MAKE, &self.make),
            (TAG_MODEL, &self.model),
            (TAG_DATE_TIME, &self.date_time),
        ]);
        let exif = present(&[
            (TAG_DATE_TIME_ORIGINAL, &self.date_time_original),
            (TAG_DATE_TIME_DIGITIZED, &self.date_time_digitized),
        ]);

        let ifd0_count = ifd0.len() + usize::from(!exif.is_empty());
        let exif_offset = 8 + 2 + 12 * ifd0_count + 4;
        let exif_size = if exif.is_empty() {
            0
        } else {
            2 + 12 * exif.len() + 4
        };
        let data_offset = exif_offset + exif_size;

        let mut out = Vec::new();
        let mut data = Vec::new();

        out.extend(b"II");
        out.extend(42u16.to_le_bytes());
        out.extend(8u32.to_le_bytes());

        out.extend((ifd0_count as u16).to_le_bytes());
        for (tag, value) in &ifd0 {
            push_ascii(&mut out, &mut data, data_offset, *tag, value);
        }
        if !exif.is_empty() {
            out.extend(TAG_EXIF_IFD.to_le_bytes());
            out.extend(TYPE_LONG.to_le_bytes());
            out.extend(1u32.to_le_bytes());
            out.extend((exif_offset as u32).to_le_bytes());
        }
        out.extend(0u32.to_le_bytes());

        if !exif.is_empty() {
            out.extend((exif.len() as u16).to_le_bytes());
            for (tag, value) in &exif {
                push_ascii(&mut out, &mut data, data_offset, *tag, value);
            }
            out.extend(0u32.to_le_bytes());
        }

        assert_eq!(out.len(), data_offset);
        out.extend(data);
        out
    }
}

fn push_segment(out: &mut Vec<u8>, marker: u8, body: &[u8]) {
    out.extend([0xFF, marker]);
    out.extend(((body.len() + 2) as u16).to_be_bytes());
    out.extend(body);
}

fn push_ascii(out: &mut Vec<u8>, data: &mut Vec<u8>, data_offset: usize, tag: u16, value: &str) {
    let mut bytes = value.as_bytes().to_vec();
    bytes.push(0);

    out.extend(tag.to_le_bytes());
    out.extend(TYPE_ASCII.to_le_bytes());
    out.extend((bytes.len() as u32).to_le_bytes());

    if bytes.len() <= 4 {
        bytes.resize(4, 0);
        out.extend(bytes);
    } else {
        out.extend(((data_offset + data.len()) as u32).to_le_bytes());
        data.extend(bytes);
        if data.len() % 2 == 1 {
            data.push(0);
        }
    }
}

/// Epoch seconds of noon on the 15th of a month, local time
pub fn local_noon(year: i32, month: u32) -> i64 {
    Local
        .with_ymd_and_hms(year, month, 15, 12, 0, 0)
        .unwrap()
        .timestamp()
}

/// Write a file with no EXIF and pin its modification time
pub fn write_plain(path: &Path, contents: &[u8], mtime: i64) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
    set_file_mtime(path, FileTime::from_unix_time(mtime, 0)).unwrap();
}

/// An empty archive and an empty source directory
pub struct TestEnv {
    pub media: TempDir,
    pub source: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            media: TempDir::new().unwrap(),
            source: TempDir::new().unwrap(),
        }
    }

    pub fn repository(&self) -> ContentRepository {
        ContentRepository::open(self.media.path()).unwrap()
    }

    pub fn source_path(&self, name: &str) -> PathBuf {
        self.source.path().join(name)
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.media.path().join("photos")
    }

    /// Every regular file under `photos/`, relative to it, sorted
    pub fn archived_files(&self) -> Vec<PathBuf> {
        let root = self.photos_dir();
        let mut files: Vec<PathBuf> = WalkDir::new(&root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(&root).unwrap().to_path_buf())
            .collect();
        files.sort();
        files
    }
}

/// Five distinct photos with known capture months
pub fn five_photos(env: &TestEnv) -> Vec<(&'static str, &'static str)> {
    let photos = [
        ("IMG_1427.JPG", "2012:08:19 15:14:04", "2012/08_August"),
        ("IMG_0001.JPG", "2012:07:04 09:30:00", "2012/07_July"),
        ("594-9436_IMG.JPG", "2003:03:02 11:00:00", "2003/03_March"),
        ("DSC00042.JPG", "2002:10:31 18:45:10", "2002/10_October"),
        ("P1010017.JPG", "2006:03:12 08:05:55", "2006/03_March"),
    ];

    photos
        .iter()
        .map(|(name, date, folder)| {
            ExifFixture::taken(date)
                .camera("Canon", "Canon PowerShot S30")
                .write(&env.source_path(name), name.as_bytes());
            (*name, *folder)
        })
        .collect()
}
