//! Turns an [`crate::arch::ArchDescriptor`]'s assembly template into raw
//! machine code for a resolved jump address, via the Keystone assembler
//! framework (the same engine `original_source/architecture.py` drives
//! through its own Python binding).

use keystone::{Keystone, OptionType};

use crate::arch::{ArchDescriptor, ENTRY_POINT_TOKEN};
use crate::header::ident::ElfEndian;
use crate::Error;

/// Replaces the entry-point placeholder in one template line with the
/// hexadecimal form of `address`. Kept separate from the call into Keystone
/// so this substitution can be unit tested without linking `libkeystone`.
pub fn resolve_line(line: &str, address: u64) -> String {
    line.replace(ENTRY_POINT_TOKEN, &format!("{:#x}", address))
}

/// Assembles `descriptor`'s payload template for `endian`, with the
/// placeholder resolved to `jump_address`. Each line is assembled
/// independently (matching the source tool's per-line loop) so a failure
/// names the exact offending line rather than an opaque block offset.
pub fn assemble(
    descriptor: &ArchDescriptor,
    endian: ElfEndian,
    jump_address: u64,
) -> Result<Vec<u8>, Error> {
    let endian_mode = match endian {
        ElfEndian::Big => keystone::MODE_BIG_ENDIAN,
        _ => keystone::MODE_LITTLE_ENDIAN,
    };

    let engine = Keystone::new(descriptor.keystone_arch, descriptor.keystone_mode | endian_mode)
        .map_err(|e| Error::Assembly {
            line: format!("<engine init for {}>", descriptor.name),
            source: e.to_string(),
        })?;
    engine
        .option(OptionType::SYNTAX, keystone::OPT_SYNTAX_INTEL)
        .map_err(|e| Error::Assembly {
            line: format!("<engine option for {}>", descriptor.name),
            source: e.to_string(),
        })?;

    let mut encoded = Vec::new();
    for line in descriptor.asm {
        let resolved = resolve_line(line, jump_address);
        let result = engine.asm(resolved.clone(), 0).map_err(|e| Error::Assembly {
            line: resolved,
            source: e.to_string(),
        })?;
        encoded.extend(result.bytes);
    }
    Ok(encoded)
}
