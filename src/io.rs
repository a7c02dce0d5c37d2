//! Raw byte-level access to the file backing an [`crate::Elf`]. Every typed
//! header accessor in [`crate::header`] bottoms out in one of the functions
//! here; nothing else in the crate touches a [`std::fs::File`] directly.
//!
//! Mirrors the source tool's `ELF._read_from_file`/`_write_to_file` plus its
//! `insert`/`append`/`delete` family: the bulk operations read the whole
//! file into memory, splice it, and atomically rewrite it through a sibling
//! temp file (see [`Inner::file_overwrite`]) rather than editing in place.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::header::ident::ElfIdent;
use crate::Error;

/// Read in this many bytes at a time when scanning for a string's NUL
/// terminator. Matches the source implementation's block size.
const STRING_READ_BLOCK: usize = 1024;

/// Shared, file-backed state. Every live handle ([`crate::Elf`], its
/// [`crate::header::FileHeader`], and each [`crate::header::ProgramHeader`]/
/// [`crate::header::SectionHeader`]) holds a clone of the `Rc<RefCell<Inner>>`
/// wrapping this, so a write through any one of them is visible to all the
/// others without re-opening the file.
#[derive(Debug)]
pub(crate) struct Inner {
    path: PathBuf,
    file: File,
    read_only: bool,
    pub(crate) ident: ElfIdent,
}

impl Inner {
    pub(crate) fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let file = fs::OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(&path)?;
        let mut inner = Self {
            path,
            file,
            read_only,
            ident: ElfIdent::parse(&[0; 16]).unwrap_or(ElfIdent {
                class: crate::header::ident::ElfClass::Invalid,
                endian: crate::header::ident::ElfEndian::Invalid,
                version: crate::header::ident::ElfVersion::Invalid,
                abi: crate::header::ident::ElfOsAbi::Unspecified,
                abi_version: 0,
            }),
        };
        inner.reload_ident()?;
        Ok(inner)
    }

    fn reload_ident(&mut self) -> Result<(), Error> {
        let mut buf = [0u8; 16];
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_exact(&mut buf)?;
        self.ident = ElfIdent::parse(&buf).ok_or_else(|| {
            Error::MalformedElf("missing \\x7fELF magic bytes".to_string())
        })?;
        Ok(())
    }

    pub(crate) fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn require_writable(&self) -> Result<(), Error> {
        if self.read_only {
            return Err(Error::ReadOnlyViolation);
        }
        Ok(())
    }

    pub(crate) fn len(&mut self) -> Result<u64, Error> {
        Ok(self.file.seek(SeekFrom::End(0))?)
    }

    pub(crate) fn read(&mut self, offset: u64, size: usize) -> Result<Vec<u8>, Error> {
        let file_len = self.len()?;
        if offset.saturating_add(size as u64) > file_len {
            return Err(Error::OutOfBounds {
                offset,
                size,
                file_len,
            });
        }
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size];
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn write(&mut self, offset: u64, data: &[u8]) -> Result<(), Error> {
        self.require_writable()?;
        trace!("write {} bytes at offset {:#x}", data.len(), offset);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.flush()?;
        Ok(())
    }

    pub(crate) fn read_byte(&mut self, offset: u64) -> Result<u8, Error> {
        Ok(self.read(offset, 1)?[0])
    }

    pub(crate) fn write_byte(&mut self, offset: u64, value: u8) -> Result<(), Error> {
        self.write(offset, &[value])
    }

    pub(crate) fn read_half(&mut self, offset: u64) -> Result<u16, Error> {
        let bytes = self.read(offset, 2)?;
        self.ident
            .endian
            .read(&bytes, None)
            .ok_or_else(|| Error::MalformedElf("truncated half-word".to_string()))
    }

    pub(crate) fn write_half(&mut self, offset: u64, value: u16) -> Result<(), Error> {
        let bytes = self.ident.endian.write(value);
        self.write(offset, &bytes)
    }

    pub(crate) fn read_word(&mut self, offset: u64) -> Result<u32, Error> {
        let bytes = self.read(offset, 4)?;
        self.ident
            .endian
            .read(&bytes, None)
            .ok_or_else(|| Error::MalformedElf("truncated word".to_string()))
    }

    pub(crate) fn write_word(&mut self, offset: u64, value: u32) -> Result<(), Error> {
        let bytes = self.ident.endian.write(value);
        self.write(offset, &bytes)
    }

    /// Reads a signed 64-bit quantity. Callers that need an address treat the
    /// bits as unsigned (`as u64`); this function itself never reinterprets.
    pub(crate) fn read_double(&mut self, offset: u64) -> Result<i64, Error> {
        let bytes = self.read(offset, 8)?;
        self.ident
            .endian
            .read(&bytes, None)
            .ok_or_else(|| Error::MalformedElf("truncated double-word".to_string()))
    }

    pub(crate) fn write_double(&mut self, offset: u64, value: i64) -> Result<(), Error> {
        let bytes = self.ident.endian.write(value);
        self.write(offset, &bytes)
    }

    pub(crate) fn read_string(&mut self, offset: u64, size: Option<usize>) -> Result<Vec<u8>, Error> {
        if let Some(size) = size {
            return self.read(offset, size);
        }

        let mut data = Vec::new();
        let mut pos = offset;
        loop {
            let file_len = self.len()?;
            if pos >= file_len {
                break;
            }
            let remaining = (file_len - pos).min(STRING_READ_BLOCK as u64) as usize;
            let chunk = self.read(pos, remaining)?;
            if let Some(nul_index) = chunk.iter().position(|b| *b == 0) {
                data.extend_from_slice(&chunk[..nul_index]);
                break;
            }
            data.extend_from_slice(&chunk);
            pos += remaining as u64;
        }
        Ok(data)
    }

    pub(crate) fn write_string(&mut self, offset: u64, value: &[u8]) -> Result<(), Error> {
        let mut data = value.to_vec();
        data.push(0);
        self.write(offset, &data)
    }

    /// Reads the whole file into memory, performs `edit`, and atomically
    /// rewrites the file through a sibling temp file before re-parsing
    /// `e_ident`. `insert`/`append`/`delete` are all built on this.
    fn rewrite(&mut self, edit: impl FnOnce(Vec<u8>) -> Vec<u8>) -> Result<(), Error> {
        self.require_writable()?;
        let len = self.len()? as usize;
        let whole = self.read(0, len)?;
        let replacement = edit(whole);

        let tmp_path = self.path.with_extension("botox-tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&replacement)?;
            tmp.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        self.file = fs::OpenOptions::new()
            .read(true)
            .write(!self.read_only)
            .open(&self.path)?;
        self.reload_ident()?;
        Ok(())
    }

    pub(crate) fn insert(&mut self, offset: u64, data: &[u8]) -> Result<(), Error> {
        debug!("inserting {} bytes at offset {:#x}", data.len(), offset);
        let offset = offset as usize;
        let data = data.to_vec();
        self.rewrite(|mut whole| {
            whole.splice(offset..offset, data);
            whole
        })
    }

    pub(crate) fn append(&mut self, data: &[u8]) -> Result<(), Error> {
        debug!("appending {} bytes", data.len());
        let data = data.to_vec();
        self.rewrite(|mut whole| {
            whole.extend_from_slice(&data);
            whole
        })
    }

    pub(crate) fn delete(&mut self, offset: u64, size: usize) -> Result<(), Error> {
        debug!("deleting {} bytes at offset {:#x}", size, offset);
        let offset = offset as usize;
        self.rewrite(|mut whole| {
            whole.drain(offset..(offset + size));
            whole
        })
    }
}
