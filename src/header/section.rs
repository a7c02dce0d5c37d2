//! A single entry of the section header table, plus name resolution against
//! `.shstrtab`.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use super::ident::ElfClass;
use super::{FileHeader, SectionType};
use crate::io::Inner;
use crate::Error;

bitflags! {
    /// `sh_flags`. Only the three bits spec'd as individually settable
    /// booleans (write/alloc/execute) are named; other bits still round
    /// trip through `from_bits_retain`/`bits()`.
    #[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Default)]
    pub struct SectionFlags: u64 {
        const WRITE    = 0x1;
        const ALLOC    = 0x2;
        const EXECUTE  = 0x4;
    }
}

/// A live handle onto one section header table entry.
pub struct SectionHeader {
    inner: Rc<RefCell<Inner>>,
    index: u16,
}

impl SectionHeader {
    pub(crate) fn new(inner: Rc<RefCell<Inner>>, index: u16) -> Self {
        Self { inner, index }
    }

    fn header(&self) -> FileHeader {
        FileHeader::new(self.inner.clone())
    }

    fn base(&self) -> Result<u64, Error> {
        let header = self.header();
        Ok(header.e_shoff()? + header.e_shentsize()? as u64 * self.index as u64)
    }

    fn is64(&self) -> bool {
        matches!(self.inner.borrow().ident.class, ElfClass::Class64)
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn sh_name(&self) -> Result<u32, Error> {
        let base = self.base()?;
        self.inner.borrow_mut().read_word(base)
    }

    pub fn set_sh_name(&self, value: u32) -> Result<(), Error> {
        let base = self.base()?;
        self.inner.borrow_mut().write_word(base, value)
    }

    pub fn sh_type(&self) -> Result<SectionType, Error> {
        let base = self.base()?;
        Ok(SectionType::from_raw(self.inner.borrow_mut().read_word(base + 4)?))
    }

    fn read_class_dependent(&self, offset32: u64, offset64: u64) -> Result<u64, Error> {
        let is64 = self.is64();
        let mut inner = self.inner.borrow_mut();
        if is64 {
            Ok(inner.read_double(offset64)? as u64)
        } else {
            Ok(inner.read_word(offset32)? as u64)
        }
    }

    fn write_class_dependent(&self, offset32: u64, offset64: u64, value: u64) -> Result<(), Error> {
        let is64 = self.is64();
        let mut inner = self.inner.borrow_mut();
        if is64 {
            inner.write_double(offset64, value as i64)
        } else {
            inner.write_word(offset32, value as u32)
        }
    }

    pub fn sh_flags(&self) -> Result<SectionFlags, Error> {
        let base = self.base()?;
        let raw = self.read_class_dependent(base + 8, base + 8)?;
        Ok(SectionFlags::from_bits_retain(raw))
    }

    pub fn set_sh_flags(&self, flags: SectionFlags) -> Result<(), Error> {
        let base = self.base()?;
        self.write_class_dependent(base + 8, base + 8, flags.bits())
    }

    fn set_flag_bit(&self, bit: SectionFlags, value: bool) -> Result<(), Error> {
        let mut flags = self.sh_flags()?;
        flags.set(bit, value);
        self.set_sh_flags(flags)
    }

    pub fn writable(&self) -> Result<bool, Error> {
        Ok(self.sh_flags()?.contains(SectionFlags::WRITE))
    }

    pub fn set_writable(&self, value: bool) -> Result<(), Error> {
        self.set_flag_bit(SectionFlags::WRITE, value)
    }

    pub fn allocated(&self) -> Result<bool, Error> {
        Ok(self.sh_flags()?.contains(SectionFlags::ALLOC))
    }

    pub fn set_allocated(&self, value: bool) -> Result<(), Error> {
        self.set_flag_bit(SectionFlags::ALLOC, value)
    }

    pub fn executable(&self) -> Result<bool, Error> {
        Ok(self.sh_flags()?.contains(SectionFlags::EXECUTE))
    }

    pub fn set_executable(&self, value: bool) -> Result<(), Error> {
        self.set_flag_bit(SectionFlags::EXECUTE, value)
    }

    pub fn sh_addr(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_class_dependent(base + 12, base + 16)
    }

    pub fn set_sh_addr(&self, value: u64) -> Result<(), Error> {
        let base = self.base()?;
        self.write_class_dependent(base + 12, base + 16, value)
    }

    pub fn sh_offset(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_class_dependent(base + 16, base + 24)
    }

    pub fn set_sh_offset(&self, value: u64) -> Result<(), Error> {
        let base = self.base()?;
        self.write_class_dependent(base + 16, base + 24, value)
    }

    pub fn sh_size(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_class_dependent(base + 20, base + 32)
    }

    pub fn set_sh_size(&self, value: u64) -> Result<(), Error> {
        let base = self.base()?;
        self.write_class_dependent(base + 20, base + 32, value)
    }

    pub fn sh_link(&self) -> Result<u32, Error> {
        let base = self.base()?;
        let offset = if self.is64() { base + 40 } else { base + 24 };
        self.inner.borrow_mut().read_word(offset)
    }

    pub fn sh_info(&self) -> Result<u32, Error> {
        let base = self.base()?;
        let offset = if self.is64() { base + 44 } else { base + 28 };
        self.inner.borrow_mut().read_word(offset)
    }

    pub fn sh_addralign(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_class_dependent(base + 32, base + 48)
    }

    pub fn sh_entsize(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_class_dependent(base + 36, base + 56)
    }

    /// Resolves this section's name against `.shstrtab` (the section
    /// indexed by `e_shstrndx`). The string-table section's own name is
    /// never resolved through itself — `original_source/elf.py`'s
    /// `Elf_Shdr.name` special-cases it the same way.
    pub fn name(&self) -> Result<String, Error> {
        let shstrndx = self.header().e_shstrndx()?;
        if self.index == shstrndx {
            return Ok(".shstrtab".to_string());
        }

        let shstrtab = SectionHeader::new(self.inner.clone(), shstrndx);
        let offset = shstrtab.sh_offset()? + self.sh_name()? as u64;
        let bytes = self.inner.borrow_mut().read_string(offset, None)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Renames this section in place. The string table is never resized,
    /// so the new name must fit within the current name's length.
    pub fn set_name(&self, value: &str) -> Result<(), Error> {
        let shstrndx = self.header().e_shstrndx()?;
        if self.index == shstrndx {
            return Err(Error::NameTooLong {
                current: ".shstrtab".to_string(),
                attempted: value.to_string(),
            });
        }

        let current = self.name()?;
        if value.len() > current.len() {
            return Err(Error::NameTooLong {
                current,
                attempted: value.to_string(),
            });
        }

        let shstrtab = SectionHeader::new(self.inner.clone(), shstrndx);
        let offset = shstrtab.sh_offset()? + self.sh_name()? as u64;
        self.inner.borrow_mut().write_string(offset, value.as_bytes())
    }
}
