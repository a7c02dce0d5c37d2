//! A single entry of the program header table.

use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;

use super::ident::ElfClass;
use super::{FileHeader, SegmentType};
use crate::io::Inner;
use crate::Error;

bitflags! {
    /// `p_flags`. Bit positions match `PF_R`/`PF_W`/`PF_X` from the ELF spec
    /// (0b100/0b010/0b001), the same values `original_source/elf.py`'s
    /// `Elf_Phdr_Flags` checks.
    #[derive(Clone, Copy, Eq, PartialEq, Debug, Hash, Default)]
    pub struct ProgramFlags: u32 {
        const EXECUTE = 0b001;
        const WRITE   = 0b010;
        const READ    = 0b100;
    }
}

/// A live handle onto one program header table entry. Field offsets are
/// computed from `e_phoff + e_phentsize * index` on every access — there is
/// no cached copy of the entry.
pub struct ProgramHeader {
    inner: Rc<RefCell<Inner>>,
    index: u16,
}

impl ProgramHeader {
    pub(crate) fn new(inner: Rc<RefCell<Inner>>, index: u16) -> Self {
        Self { inner, index }
    }

    fn header(&self) -> FileHeader {
        FileHeader::new(self.inner.clone())
    }

    fn base(&self) -> Result<u64, Error> {
        let header = self.header();
        Ok(header.e_phoff()? + header.e_phentsize()? as u64 * self.index as u64)
    }

    fn is64(&self) -> bool {
        matches!(self.inner.borrow().ident.class, ElfClass::Class64)
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn p_type(&self) -> Result<SegmentType, Error> {
        let base = self.base()?;
        Ok(SegmentType::from_raw(self.inner.borrow_mut().read_word(base)?))
    }

    pub fn set_p_type(&self, value: SegmentType) -> Result<(), Error> {
        let base = self.base()?;
        self.inner.borrow_mut().write_word(base, value.as_raw())
    }

    /// `p_flags`' byte offset differs between ELF32 (after `p_align`'s
    /// neighbors, at offset 24) and ELF64 (right after `p_type`, at offset
    /// 4) — see spec invariant on word order.
    fn flags_offset(&self, base: u64) -> u64 {
        if self.is64() {
            base + 4
        } else {
            base + 24
        }
    }

    pub fn flags(&self) -> Result<ProgramFlags, Error> {
        let base = self.base()?;
        let offset = self.flags_offset(base);
        let raw = self.inner.borrow_mut().read_word(offset)?;
        Ok(ProgramFlags::from_bits_retain(raw))
    }

    pub fn set_flags(&self, flags: ProgramFlags) -> Result<(), Error> {
        let base = self.base()?;
        let offset = self.flags_offset(base);
        self.inner.borrow_mut().write_word(offset, flags.bits())
    }

    fn set_flag_bit(&self, bit: ProgramFlags, value: bool) -> Result<(), Error> {
        let mut flags = self.flags()?;
        flags.set(bit, value);
        self.set_flags(flags)
    }

    pub fn readable(&self) -> Result<bool, Error> {
        Ok(self.flags()?.contains(ProgramFlags::READ))
    }

    pub fn set_readable(&self, value: bool) -> Result<(), Error> {
        self.set_flag_bit(ProgramFlags::READ, value)
    }

    pub fn writable(&self) -> Result<bool, Error> {
        Ok(self.flags()?.contains(ProgramFlags::WRITE))
    }

    pub fn set_writable(&self, value: bool) -> Result<(), Error> {
        self.set_flag_bit(ProgramFlags::WRITE, value)
    }

    pub fn executable(&self) -> Result<bool, Error> {
        Ok(self.flags()?.contains(ProgramFlags::EXECUTE))
    }

    pub fn set_executable(&self, value: bool) -> Result<(), Error> {
        self.set_flag_bit(ProgramFlags::EXECUTE, value)
    }

    fn read_address(&self, offset: u64) -> Result<u64, Error> {
        let is64 = self.is64();
        let mut inner = self.inner.borrow_mut();
        if is64 {
            Ok(inner.read_double(offset)? as u64)
        } else {
            Ok(inner.read_word(offset)? as u64)
        }
    }

    fn write_address(&self, offset: u64, value: u64) -> Result<(), Error> {
        let is64 = self.is64();
        let mut inner = self.inner.borrow_mut();
        if is64 {
            inner.write_double(offset, value as i64)
        } else {
            inner.write_word(offset, value as u32)
        }
    }

    pub fn p_offset(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_address(if self.is64() { base + 8 } else { base + 4 })
    }

    pub fn set_p_offset(&self, value: u64) -> Result<(), Error> {
        let base = self.base()?;
        self.write_address(if self.is64() { base + 8 } else { base + 4 }, value)
    }

    pub fn p_vaddr(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_address(if self.is64() { base + 16 } else { base + 8 })
    }

    pub fn set_p_vaddr(&self, value: u64) -> Result<(), Error> {
        let base = self.base()?;
        self.write_address(if self.is64() { base + 16 } else { base + 8 }, value)
    }

    pub fn p_paddr(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_address(if self.is64() { base + 24 } else { base + 12 })
    }

    pub fn set_p_paddr(&self, value: u64) -> Result<(), Error> {
        let base = self.base()?;
        self.write_address(if self.is64() { base + 24 } else { base + 12 }, value)
    }

    pub fn p_filesz(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_address(if self.is64() { base + 32 } else { base + 16 })
    }

    pub fn set_p_filesz(&self, value: u64) -> Result<(), Error> {
        let base = self.base()?;
        self.write_address(if self.is64() { base + 32 } else { base + 16 }, value)
    }

    pub fn p_memsz(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_address(if self.is64() { base + 40 } else { base + 20 })
    }

    pub fn set_p_memsz(&self, value: u64) -> Result<(), Error> {
        let base = self.base()?;
        self.write_address(if self.is64() { base + 40 } else { base + 20 }, value)
    }

    pub fn p_align(&self) -> Result<u64, Error> {
        let base = self.base()?;
        self.read_address(if self.is64() { base + 48 } else { base + 28 })
    }

    pub fn set_p_align(&self, value: u64) -> Result<(), Error> {
        let base = self.base()?;
        self.write_address(if self.is64() { base + 48 } else { base + 28 }, value)
    }
}
