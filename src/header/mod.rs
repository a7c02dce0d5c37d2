//! Typed, live views over an ELF file's header tables. Every getter here
//! performs a disk read and every setter a disk write — there is no
//! snapshot-then-save step, matching the behavioral rule that assigning to
//! `header.e_entry` really does write to the file immediately.
//!
//! ELF32 and ELF64 differ in field width and, for a few fields, field
//! order (`p_flags` moves relative to `p_offset`; see [`program::ProgramHeader`]).
//! Every accessor below branches on the file's class once, at the call
//! site, rather than maintaining two parallel struct definitions.

pub mod ident;
pub mod program;
pub mod section;

pub use program::ProgramHeader;
pub use section::SectionHeader;

use std::cell::RefCell;
use std::rc::Rc;

use ident::ElfClass;

use crate::io::Inner;
use crate::Error;

/// `e_type`: whether the file is an executable, a PIE/shared object, or
/// something this crate declines to inject into.
#[repr(u16)]
#[derive(Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Default)]
pub enum FileType {
    #[default]
    None = 0,
    Relocatable = 1,
    Executable = 2,
    SharedObject = 3,
    Core = 4,
}

impl FileType {
    pub fn from_raw(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Relocatable),
            2 => Some(Self::Executable),
            3 => Some(Self::SharedObject),
            4 => Some(Self::Core),
            _ => None,
        }
    }

    /// `ET_EXEC` and `ET_DYN` are the only types this crate will inject.
    pub fn is_injectable(self) -> bool {
        matches!(self, Self::Executable | Self::SharedObject)
    }
}

/// `p_type` of a program header entry.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum SegmentType {
    Null,
    Load,
    Dynamic,
    Interp,
    Note,
    ShLib,
    Phdr,
    Tls,
    Unknown(u32),
}

impl SegmentType {
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Null,
            1 => Self::Load,
            2 => Self::Dynamic,
            3 => Self::Interp,
            4 => Self::Note,
            5 => Self::ShLib,
            6 => Self::Phdr,
            7 => Self::Tls,
            other => Self::Unknown(other),
        }
    }

    pub fn as_raw(self) -> u32 {
        match self {
            Self::Null => 0,
            Self::Load => 1,
            Self::Dynamic => 2,
            Self::Interp => 3,
            Self::Note => 4,
            Self::ShLib => 5,
            Self::Phdr => 6,
            Self::Tls => 7,
            Self::Unknown(v) => v,
        }
    }
}

/// `sh_type` of a section header entry. Only the variants this crate reads
/// or cares about during injection are named; everything else round-trips
/// through `Unknown`.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum SectionType {
    Null,
    ProgBits,
    SymbolTable,
    StringTable,
    Rela,
    NoBits,
    Rel,
    DynamicSymbol,
    Unknown(u32),
}

impl SectionType {
    pub fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Null,
            1 => Self::ProgBits,
            2 => Self::SymbolTable,
            3 => Self::StringTable,
            4 => Self::Rela,
            8 => Self::NoBits,
            9 => Self::Rel,
            11 => Self::DynamicSymbol,
            other => Self::Unknown(other),
        }
    }
}

/// Byte offsets of every `e_*` field that is not part of `e_ident`, for one
/// ELF class. `original_source/elf.py`'s `Elf_Header` follows the same
/// layout; its ELF64 `e_phoff` setter has a bug that drops the value
/// argument entirely, which this module does not reproduce.
struct HeaderLayout {
    e_entry: u64,
    e_phoff: u64,
    e_shoff: u64,
    e_flags: u64,
    e_ehsize: u64,
    e_phentsize: u64,
    e_phnum: u64,
    e_shentsize: u64,
    e_shnum: u64,
    e_shstrndx: u64,
}

const LAYOUT_32: HeaderLayout = HeaderLayout {
    e_entry: 24,
    e_phoff: 28,
    e_shoff: 32,
    e_flags: 36,
    e_ehsize: 40,
    e_phentsize: 42,
    e_phnum: 44,
    e_shentsize: 46,
    e_shnum: 48,
    e_shstrndx: 50,
};

const LAYOUT_64: HeaderLayout = HeaderLayout {
    e_entry: 24,
    e_phoff: 32,
    e_shoff: 40,
    e_flags: 48,
    e_ehsize: 52,
    e_phentsize: 54,
    e_phnum: 56,
    e_shentsize: 58,
    e_shnum: 60,
    e_shstrndx: 62,
};

/// A live handle onto the 64-byte (ELF64) or 52-byte (ELF32) file header.
pub struct FileHeader {
    inner: Rc<RefCell<Inner>>,
}

impl FileHeader {
    pub(crate) fn new(inner: Rc<RefCell<Inner>>) -> Self {
        Self { inner }
    }

    pub(crate) fn shared(&self) -> Rc<RefCell<Inner>> {
        self.inner.clone()
    }

    fn layout(&self) -> &'static HeaderLayout {
        match self.inner.borrow().ident.class {
            ElfClass::Class64 => &LAYOUT_64,
            _ => &LAYOUT_32,
        }
    }

    fn is64(&self) -> bool {
        matches!(self.inner.borrow().ident.class, ElfClass::Class64)
    }

    pub fn ident(&self) -> ident::ElfIdent {
        self.inner.borrow().ident
    }

    pub fn e_type(&self) -> Result<u16, Error> {
        self.inner.borrow_mut().read_half(16)
    }

    pub fn set_e_type(&self, value: u16) -> Result<(), Error> {
        self.inner.borrow_mut().write_half(16, value)
    }

    pub fn e_machine(&self) -> Result<u16, Error> {
        self.inner.borrow_mut().read_half(18)
    }

    pub fn set_e_machine(&self, value: u16) -> Result<(), Error> {
        self.inner.borrow_mut().write_half(18, value)
    }

    pub fn e_version(&self) -> Result<u32, Error> {
        self.inner.borrow_mut().read_word(20)
    }

    pub fn set_e_version(&self, value: u32) -> Result<(), Error> {
        self.inner.borrow_mut().write_word(20, value)
    }

    /// Reads the class-dependent address field at `offset`, widened to `u64`.
    fn read_address(&self, offset: u64) -> Result<u64, Error> {
        let is64 = self.is64();
        let mut inner = self.inner.borrow_mut();
        if is64 {
            Ok(inner.read_double(offset)? as u64)
        } else {
            Ok(inner.read_word(offset)? as u64)
        }
    }

    /// Writes `value` to the class-dependent address field at `offset`.
    fn write_address(&self, offset: u64, value: u64) -> Result<(), Error> {
        let is64 = self.is64();
        let mut inner = self.inner.borrow_mut();
        if is64 {
            inner.write_double(offset, value as i64)
        } else {
            inner.write_word(offset, value as u32)
        }
    }

    pub fn e_entry(&self) -> Result<u64, Error> {
        self.read_address(self.layout().e_entry)
    }

    pub fn set_e_entry(&self, value: u64) -> Result<(), Error> {
        self.write_address(self.layout().e_entry, value)
    }

    pub fn e_phoff(&self) -> Result<u64, Error> {
        self.read_address(self.layout().e_phoff)
    }

    pub fn set_e_phoff(&self, value: u64) -> Result<(), Error> {
        self.write_address(self.layout().e_phoff, value)
    }

    pub fn e_shoff(&self) -> Result<u64, Error> {
        self.read_address(self.layout().e_shoff)
    }

    pub fn set_e_shoff(&self, value: u64) -> Result<(), Error> {
        self.write_address(self.layout().e_shoff, value)
    }

    pub fn e_flags(&self) -> Result<u32, Error> {
        let offset = self.layout().e_flags;
        self.inner.borrow_mut().read_word(offset)
    }

    pub fn set_e_flags(&self, value: u32) -> Result<(), Error> {
        let offset = self.layout().e_flags;
        self.inner.borrow_mut().write_word(offset, value)
    }

    pub fn e_ehsize(&self) -> Result<u16, Error> {
        let offset = self.layout().e_ehsize;
        self.inner.borrow_mut().read_half(offset)
    }

    pub fn set_e_ehsize(&self, value: u16) -> Result<(), Error> {
        let offset = self.layout().e_ehsize;
        self.inner.borrow_mut().write_half(offset, value)
    }

    pub fn e_phentsize(&self) -> Result<u16, Error> {
        let offset = self.layout().e_phentsize;
        self.inner.borrow_mut().read_half(offset)
    }

    pub fn set_e_phentsize(&self, value: u16) -> Result<(), Error> {
        let offset = self.layout().e_phentsize;
        self.inner.borrow_mut().write_half(offset, value)
    }

    pub fn e_phnum(&self) -> Result<u16, Error> {
        let offset = self.layout().e_phnum;
        self.inner.borrow_mut().read_half(offset)
    }

    pub fn set_e_phnum(&self, value: u16) -> Result<(), Error> {
        let offset = self.layout().e_phnum;
        self.inner.borrow_mut().write_half(offset, value)
    }

    pub fn e_shentsize(&self) -> Result<u16, Error> {
        let offset = self.layout().e_shentsize;
        self.inner.borrow_mut().read_half(offset)
    }

    pub fn set_e_shentsize(&self, value: u16) -> Result<(), Error> {
        let offset = self.layout().e_shentsize;
        self.inner.borrow_mut().write_half(offset, value)
    }

    pub fn e_shnum(&self) -> Result<u16, Error> {
        let offset = self.layout().e_shnum;
        self.inner.borrow_mut().read_half(offset)
    }

    pub fn set_e_shnum(&self, value: u16) -> Result<(), Error> {
        let offset = self.layout().e_shnum;
        self.inner.borrow_mut().write_half(offset, value)
    }

    pub fn e_shstrndx(&self) -> Result<u16, Error> {
        let offset = self.layout().e_shstrndx;
        self.inner.borrow_mut().read_half(offset)
    }

    pub fn set_e_shstrndx(&self, value: u16) -> Result<(), Error> {
        let offset = self.layout().e_shstrndx;
        self.inner.borrow_mut().write_half(offset, value)
    }
}
