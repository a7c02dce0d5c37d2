//! Splices the stop-and-jump payload into a new `PT_LOAD` segment and
//! rewires `e_entry` to it. This is the crate's single public entry point;
//! everything else in the crate exists to support [`infect`].

use std::path::Path;

use log::{debug, info, warn};

use crate::arch;
use crate::assembler;
use crate::header::{FileType, SegmentType};
use crate::{Elf, Error};

/// Tunables for where the new segment is placed. `Default` matches
/// spec's "typically 0x1000" page alignment guidance and places the new
/// segment immediately above the highest existing `p_vaddr + p_memsz`.
#[derive(Clone, Copy, Debug)]
pub struct InjectionOptions {
    /// Alignment (and the modular congruence) the new segment's virtual
    /// address and file offset must satisfy.
    pub page_align: u64,
    /// Extra virtual-address headroom above the highest existing segment,
    /// beyond what alignment already forces.
    pub vaddr_gap: u64,
}

impl Default for InjectionOptions {
    fn default() -> Self {
        Self {
            page_align: 0x1000,
            vaddr_gap: 0,
        }
    }
}

fn round_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        return value;
    }
    let remainder = value % align;
    if remainder == 0 {
        value
    } else {
        value + (align - remainder)
    }
}

/// Infects the ELF file at `path` in place with [`InjectionOptions::default`].
pub fn infect(path: impl AsRef<Path>) -> Result<(), Error> {
    infect_with_options(path, InjectionOptions::default())
}

/// Infects the ELF file at `path` in place: picks the architecture
/// descriptor matching `e_machine`, allocates a new loadable segment at the
/// end of the file, assembles the stop-and-jump payload for it, and
/// rewrites `e_entry` to point at it.
pub fn infect_with_options(path: impl AsRef<Path>, options: InjectionOptions) -> Result<(), Error> {
    let path = path.as_ref();
    info!("infecting {}", path.display());
    let elf = Elf::open(path)?;

    let e_type = elf.header().e_type()?;
    let injectable = FileType::from_raw(e_type).is_some_and(FileType::is_injectable);
    if !injectable {
        return Err(Error::MalformedElf(format!(
            "e_type {} is neither ET_EXEC nor ET_DYN; only executables and PIEs can be infected",
            e_type
        )));
    }

    let e_machine = elf.header().e_machine()?;
    let descriptor = arch::find(e_machine).ok_or(Error::UnsupportedArchitecture(e_machine))?;
    debug!("matched architecture descriptor: {}", descriptor.name);

    let phnum = elf.header().e_phnum()?;
    if phnum == 0 {
        return Err(Error::MalformedElf(
            "file has no program headers to splice a new segment next to".to_string(),
        ));
    }

    let phentsize = elf.header().e_phentsize()? as u64;
    let phoff = elf.header().e_phoff()?;
    let original_entry = elf.header().e_entry()?;

    let mut highest_vaddr_end: u64 = 0;
    for i in 0..phnum {
        let ph = elf.program_header(i);
        let end = ph.p_vaddr()?.saturating_add(ph.p_memsz()?);
        highest_vaddr_end = highest_vaddr_end.max(end);
    }

    let page = options.page_align;
    let v_new = round_up(highest_vaddr_end + options.vaddr_gap, page);

    // Everything from here on mutates the file; a failure partway through
    // is reported as PartiallyInfected rather than a plain error.
    infect_mutating(&elf, descriptor, phentsize, phoff, phnum, page, v_new, original_entry)
        .map_err(|e| Error::PartiallyInfected(Box::new(e)))
}

#[allow(clippy::too_many_arguments)]
fn infect_mutating(
    elf: &Elf,
    descriptor: &arch::ArchDescriptor,
    phentsize: u64,
    phoff: u64,
    phnum: u16,
    page: u64,
    v_new: u64,
    original_entry: u64,
) -> Result<(), Error> {
    // Step 4: reserve a new program-header slot at the end of the table,
    // shifting every downstream file-offset field by phentsize.
    let insertion_offset = phoff + phnum as u64 * phentsize;

    let old_shoff = elf.header().e_shoff()?;
    let shnum = elf.header().e_shnum()?;

    let mut old_p_offsets = Vec::with_capacity(phnum as usize);
    for i in 0..phnum {
        old_p_offsets.push(elf.program_header(i).p_offset()?);
    }
    let mut old_sh_offsets = Vec::with_capacity(shnum as usize);
    for i in 0..shnum {
        old_sh_offsets.push(elf.section_header(i).sh_offset()?);
    }

    debug!(
        "inserting program header slot at {:#x} ({} bytes)",
        insertion_offset, phentsize
    );
    elf.insert(insertion_offset, &vec![0u8; phentsize as usize])?;

    let new_shoff = if old_shoff >= insertion_offset {
        old_shoff + phentsize
    } else {
        old_shoff
    };
    elf.header().set_e_shoff(new_shoff)?;

    for (i, old_offset) in old_p_offsets.iter().enumerate() {
        if *old_offset >= insertion_offset {
            elf.program_header(i as u16).set_p_offset(*old_offset + phentsize)?;
        }
    }
    for (i, old_offset) in old_sh_offsets.iter().enumerate() {
        if *old_offset >= insertion_offset {
            elf.section_header(i as u16).set_sh_offset(*old_offset + phentsize)?;
        }
    }

    elf.header().set_e_phnum(phnum + 1)?;

    // Step 5/6: assemble the payload and append it at its final offset.
    let endian = elf.endianness();
    let payload = assembler::assemble(descriptor, endian, original_entry)?;

    let file_len = elf.len()?;
    let o_new = round_up(file_len, page);
    let padding = (o_new - file_len) as usize;
    if padding > 0 {
        warn!("padding {} zero bytes to reach aligned offset {:#x}", padding, o_new);
        elf.append(&vec![0u8; padding])?;
    }
    elf.append(&payload)?;

    // Step 7: populate the new slot.
    let new_slot = elf.program_header(phnum);
    new_slot.set_p_type(SegmentType::Load)?;
    new_slot.set_readable(true)?;
    new_slot.set_writable(false)?;
    new_slot.set_executable(true)?;
    new_slot.set_p_offset(o_new)?;
    new_slot.set_p_vaddr(v_new)?;
    new_slot.set_p_paddr(v_new)?;
    new_slot.set_p_filesz(payload.len() as u64)?;
    new_slot.set_p_memsz(payload.len() as u64)?;
    new_slot.set_p_align(page)?;

    // Step 8: rewire the entry point.
    elf.header().set_e_entry(v_new)?;

    info!(
        "infection complete: new segment at vaddr {:#x}, file offset {:#x}, {} byte payload",
        v_new,
        o_new,
        payload.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::round_up;

    #[test]
    fn round_up_aligns_to_page() {
        assert_eq!(round_up(0x1000, 0x1000), 0x1000);
        assert_eq!(round_up(0x1001, 0x1000), 0x2000);
        assert_eq!(round_up(0, 0x1000), 0);
    }
}
