//! NPZ archive - a zip of `.npy` entries
//!
//! Entry `name` is stored as `name.npy`, matching `numpy.savez`. The
//! container is handled here with `zip` rather than `ndarray-npy`'s own
//! NPZ types, which cannot hold unicode entries or pin entry timestamps.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::{NpyArray, NpzError, NpzResult};

const ENTRY_SUFFIX: &str = ".npy";

/// Upper bound on buffer space reserved from an entry's declared size
const MAX_PREALLOC: usize = 1 << 26;

/// Streaming NPZ writer
pub struct NpzWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    entries: Vec<String>,
}

impl<W: Write + Seek> NpzWriter<W> {
    /// Uncompressed archive (`numpy.savez`)
    pub fn new(inner: W) -> Self {
        Self::with_compression(inner, false)
    }

    /// Deflated archive when `compress` is set (`numpy.savez_compressed`)
    ///
    /// Entries carry the zip epoch as their timestamp, so equal inputs give
    /// byte-identical archives.
    pub fn with_compression(inner: W, compress: bool) -> Self {
        let method = if compress {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        NpzWriter {
            zip: ZipWriter::new(inner),
            options: SimpleFileOptions::default()
                .compression_method(method)
                .last_modified_time(DateTime::default()),
            entries: Vec::new(),
        }
    }

    /// Append an array under `name`
    pub fn add(&mut self, name: &str, array: &NpyArray) -> NpzResult<()> {
        self.zip
            .start_file(format!("{}{}", name, ENTRY_SUFFIX), self.options)?;
        array.write_npy(&mut self.zip)?;
        self.entries.push(name.to_string());
        Ok(())
    }

    /// Names written so far, in order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Write the central directory and return the inner writer
    pub fn finish(self) -> NpzResult<W> {
        Ok(self.zip.finish()?)
    }
}

/// Random-access NPZ reader
pub struct NpzArchive<R: Read + Seek> {
    zip: ZipArchive<R>,
}

impl NpzArchive<BufReader<File>> {
    /// Open an archive on disk
    pub fn open<P: AsRef<Path>>(path: P) -> NpzResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<'a> NpzArchive<Cursor<&'a [u8]>> {
    /// Read an archive held in memory
    pub fn from_bytes(bytes: &'a [u8]) -> NpzResult<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> NpzArchive<R> {
    pub fn from_reader(reader: R) -> NpzResult<Self> {
        Ok(NpzArchive {
            zip: ZipArchive::new(reader)?,
        })
    }

    /// Array names (without the `.npy` suffix)
    pub fn names(&self) -> Vec<String> {
        self.zip
            .file_names()
            .map(|n| n.strip_suffix(ENTRY_SUFFIX).unwrap_or(n).to_string())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.zip
            .file_names()
            .any(|n| n == name || n.strip_suffix(ENTRY_SUFFIX) == Some(name))
    }

    /// Read an array, or `None` if the archive has no such entry
    pub fn get(&mut self, name: &str) -> NpzResult<Option<NpyArray>> {
        let entry = format!("{}{}", name, ENTRY_SUFFIX);
        let mut file = match self.zip.by_name(&entry) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let declared = usize::try_from(file.size()).unwrap_or(usize::MAX);
        let mut buf = Vec::with_capacity(declared.min(MAX_PREALLOC));
        file.read_to_end(&mut buf)?;
        NpyArray::decode(&buf).map(Some)
    }

    /// Read an array that must be present
    pub fn array(&mut self, name: &str) -> NpzResult<NpyArray> {
        self.get(name)?
            .ok_or_else(|| NpzError::MissingEntry(name.to_string()))
    }
}
