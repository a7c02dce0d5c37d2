//! Injects a small stop-and-jump shellcode payload into an ELF executable.
//!
//! The injected code suspends the process with `SIGSTOP` immediately on
//! startup and, once it receives `SIGCONT`, jumps to the binary's original
//! entry point. This gives an external debugger or instrumentation tool a
//! window to attach before any of the target's own code runs.
//!
//! This crate is the core: byte-level ELF surgery ([`header`], the raw I/O
//! primitives behind it), per-architecture payload templates ([`arch`]), an
//! assembler bridge ([`assembler`]), and the [`injector`] that ties them
//! together behind the single [`injector::infect`] entry point. Argument
//! parsing, usage text, and logging configuration belong to a driver built
//! on top of this crate, not to the crate itself.

pub mod arch;
pub mod assembler;
pub mod header;
pub mod injector;
pub(crate) mod endian;
pub(crate) mod io;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use thiserror_no_std::Error;

use header::{FileHeader, ProgramHeader, SectionHeader};

/// Everything that can go wrong while reading, writing, or infecting an ELF
/// file.
#[derive(Error, Debug)]
pub enum Error {
    /// A filesystem read, write, seek, or rename failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An access fell outside the bounds of the file.
    #[error("access of {size} bytes at offset {offset:#x} exceeds file length {file_len:#x}")]
    OutOfBounds {
        offset: u64,
        size: usize,
        file_len: u64,
    },

    /// The file is not a well-formed ELF: bad magic, an impossible field
    /// combination, or a header table that extends past the file.
    #[error("malformed ELF: {0}")]
    MalformedElf(String),

    /// `e_machine` does not match any supported architecture descriptor, or
    /// disagrees with the file's declared class.
    #[error("unsupported architecture (e_machine = {0})")]
    UnsupportedArchitecture(u16),

    /// The assembler bridge rejected one line of a payload template.
    #[error("failed to assemble line {line:?}: {source}")]
    Assembly { line: String, source: String },

    /// A section rename would grow past the name it replaces; the string
    /// table this crate writes to is never resized.
    #[error("new section name {attempted:?} is longer than current name {current:?}")]
    NameTooLong { current: String, attempted: String },

    /// A mutating operation was attempted on an [`Elf`] opened read-only.
    #[error("attempted to mutate a read-only ELF handle")]
    ReadOnlyViolation,

    /// An `infect` call failed after it had already modified the file on
    /// disk; the target file should be treated as not safely runnable.
    #[error("infection left the file partially modified: {0}")]
    PartiallyInfected(Box<Error>),
}

/// A mutable, on-disk view of an ELF32/ELF64 file, little- or big-endian.
///
/// Field accessors on [`Elf::header`], [`Elf::program_headers`], and
/// [`Elf::section_headers`] each perform their own disk read or write —
/// there is no separate "save" step. The whole-file mutating operations
/// ([`Elf::insert`], [`Elf::append`], [`Elf::delete`]) read the entire file,
/// splice it in memory, atomically rewrite it through a sibling temp file,
/// and re-parse `e_ident`.
#[derive(Debug)]
pub struct Elf {
    inner: Rc<RefCell<io::Inner>>,
}

impl Elf {
    /// Opens `path` for both reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::open_with_mode(path, false)
    }

    /// Opens `path` for reading only; every mutating operation on the
    /// returned handle (and any header/program-header/section-header
    /// derived from it) fails with [`Error::ReadOnlyViolation`].
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::open_with_mode(path, true)
    }

    fn open_with_mode(path: impl AsRef<Path>, read_only: bool) -> Result<Self, Error> {
        let inner = io::Inner::open(path, read_only)?;
        Ok(Self {
            inner: Rc::new(RefCell::new(inner)),
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.inner.borrow().is_read_only()
    }

    /// Size of the file on disk, in bytes.
    pub fn len(&self) -> Result<u64, Error> {
        self.inner.borrow_mut().len()
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    pub fn header(&self) -> FileHeader {
        FileHeader::new(self.inner.clone())
    }

    pub fn program_header(&self, index: u16) -> ProgramHeader {
        ProgramHeader::new(self.inner.clone(), index)
    }

    pub fn program_headers(&self) -> Result<Vec<ProgramHeader>, Error> {
        Ok((0..self.header().e_phnum()?)
            .map(|i| self.program_header(i))
            .collect())
    }

    pub fn section_header(&self, index: u16) -> SectionHeader {
        SectionHeader::new(self.inner.clone(), index)
    }

    pub fn section_headers(&self) -> Result<Vec<SectionHeader>, Error> {
        Ok((0..self.header().e_shnum()?)
            .map(|i| self.section_header(i))
            .collect())
    }

    pub fn read(&self, offset: u64, size: usize) -> Result<Vec<u8>, Error> {
        self.inner.borrow_mut().read(offset, size)
    }

    pub fn write(&self, offset: u64, data: &[u8]) -> Result<(), Error> {
        self.inner.borrow_mut().write(offset, data)
    }

    pub fn read_byte(&self, offset: u64) -> Result<u8, Error> {
        self.inner.borrow_mut().read_byte(offset)
    }

    pub fn write_byte(&self, offset: u64, value: u8) -> Result<(), Error> {
        self.inner.borrow_mut().write_byte(offset, value)
    }

    pub fn read_half(&self, offset: u64) -> Result<u16, Error> {
        self.inner.borrow_mut().read_half(offset)
    }

    pub fn write_half(&self, offset: u64, value: u16) -> Result<(), Error> {
        self.inner.borrow_mut().write_half(offset, value)
    }

    pub fn read_word(&self, offset: u64) -> Result<u32, Error> {
        self.inner.borrow_mut().read_word(offset)
    }

    pub fn write_word(&self, offset: u64, value: u32) -> Result<(), Error> {
        self.inner.borrow_mut().write_word(offset, value)
    }

    /// Reads a signed 64-bit quantity. Callers treating the result as an
    /// address should reinterpret the bits (`as u64`); this never does so
    /// itself, matching the source tool's `read_double`/`write_double`.
    pub fn read_double(&self, offset: u64) -> Result<i64, Error> {
        self.inner.borrow_mut().read_double(offset)
    }

    pub fn write_double(&self, offset: u64, value: i64) -> Result<(), Error> {
        self.inner.borrow_mut().write_double(offset, value)
    }

    /// Reads a NUL-terminated string. With `size: None`, reads in 1024-byte
    /// blocks up to the first embedded NUL or end-of-file.
    pub fn read_string(&self, offset: u64, size: Option<usize>) -> Result<Vec<u8>, Error> {
        self.inner.borrow_mut().read_string(offset, size)
    }

    /// Writes `value` followed by a single NUL terminator.
    pub fn write_string(&self, offset: u64, value: &[u8]) -> Result<(), Error> {
        self.inner.borrow_mut().write_string(offset, value)
    }

    pub fn insert(&self, offset: u64, data: &[u8]) -> Result<(), Error> {
        self.inner.borrow_mut().insert(offset, data)
    }

    pub fn append(&self, data: &[u8]) -> Result<(), Error> {
        self.inner.borrow_mut().append(data)
    }

    pub fn delete(&self, offset: u64, size: usize) -> Result<(), Error> {
        self.inner.borrow_mut().delete(offset, size)
    }

    pub fn endianness(&self) -> header::ident::ElfEndian {
        self.inner.borrow().ident.endian
    }

    pub fn class(&self) -> header::ident::ElfClass {
        self.inner.borrow().ident.class
    }
}
