//! Unit tests for the header accessors and the raw I/O primitives, built
//! against small synthetic ELF files rather than real compiled binaries.

use std::io::Write;

use crate::header::ident::{ElfClass, ElfEndian, ElfOsAbi, ElfVersion};
use crate::Elf;

/// Builds a minimal but well-formed ELF64 file: file header, one `PT_LOAD`
/// program header, and three section headers (a null entry, `.shstrtab`
/// holding its own name, and a plain `.data` section whose name lives in
/// the string table like any ordinary section). Good enough to exercise
/// every accessor without needing a real compiled binary on disk.
fn build_elf64(big_endian: bool) -> Vec<u8> {
    let e = |v: u16| -> [u8; 2] {
        if big_endian { v.to_be_bytes() } else { v.to_le_bytes() }
    };
    let e32 = |v: u32| -> [u8; 4] {
        if big_endian { v.to_be_bytes() } else { v.to_le_bytes() }
    };
    let e64 = |v: u64| -> [u8; 8] {
        if big_endian { v.to_be_bytes() } else { v.to_le_bytes() }
    };

    const EHSIZE: u16 = 64;
    const PHENTSIZE: u16 = 56;
    const SHENTSIZE: u16 = 64;
    let phoff: u64 = EHSIZE as u64;
    let phnum = 1u16;
    // Layout: NUL, ".shstrtab\0" (offset 1), ".data\0" (offset 11).
    let shstrtab_content = b"\0.shstrtab\0.data\0";
    const DATA_NAME_OFFSET: u32 = 11;
    let shoff: u64 = phoff + PHENTSIZE as u64;
    let shstrtab_data_off = shoff + SHENTSIZE as u64 * 3;

    let mut buf = Vec::new();

    // e_ident
    buf.extend_from_slice(&[0x7F, b'E', b'L', b'F']);
    buf.push(2); // EI_CLASS = ELFCLASS64
    buf.push(if big_endian { 2 } else { 1 }); // EI_DATA
    buf.push(1); // EI_VERSION
    buf.push(0); // EI_OSABI
    buf.push(0); // EI_ABIVERSION
    buf.extend_from_slice(&[0u8; 7]); // padding

    buf.extend_from_slice(&e(2)); // e_type = ET_EXEC
    buf.extend_from_slice(&e(62)); // e_machine = EM_X86_64
    buf.extend_from_slice(&e32(1)); // e_version
    buf.extend_from_slice(&e64(0x401000)); // e_entry
    buf.extend_from_slice(&e64(phoff)); // e_phoff
    buf.extend_from_slice(&e64(shoff)); // e_shoff
    buf.extend_from_slice(&e32(0)); // e_flags
    buf.extend_from_slice(&e(EHSIZE));
    buf.extend_from_slice(&e(PHENTSIZE));
    buf.extend_from_slice(&e(phnum));
    buf.extend_from_slice(&e(SHENTSIZE));
    buf.extend_from_slice(&e(3)); // e_shnum
    buf.extend_from_slice(&e(1)); // e_shstrndx

    assert_eq!(buf.len() as u64, phoff);

    // program header #0: PT_LOAD, R|X
    buf.extend_from_slice(&e32(1)); // p_type = PT_LOAD
    buf.extend_from_slice(&e32(0b101)); // p_flags = R|X
    buf.extend_from_slice(&e64(0)); // p_offset
    buf.extend_from_slice(&e64(0x400000)); // p_vaddr
    buf.extend_from_slice(&e64(0x400000)); // p_paddr
    buf.extend_from_slice(&e64(shstrtab_data_off + shstrtab_content.len() as u64)); // p_filesz
    buf.extend_from_slice(&e64(shstrtab_data_off + shstrtab_content.len() as u64)); // p_memsz
    buf.extend_from_slice(&e64(0x1000)); // p_align

    assert_eq!(buf.len() as u64, shoff);

    // section header #0: SHT_NULL
    buf.extend_from_slice(&[0u8; 64]);

    // section header #1: .shstrtab
    buf.extend_from_slice(&e32(1)); // sh_name -> offset 1 in the table ".shstrtab"
    buf.extend_from_slice(&e32(3)); // sh_type = SHT_STRTAB
    buf.extend_from_slice(&e64(0)); // sh_flags
    buf.extend_from_slice(&e64(0)); // sh_addr
    buf.extend_from_slice(&e64(shstrtab_data_off)); // sh_offset
    buf.extend_from_slice(&e64(shstrtab_content.len() as u64)); // sh_size
    buf.extend_from_slice(&e32(0)); // sh_link
    buf.extend_from_slice(&e32(0)); // sh_info
    buf.extend_from_slice(&e64(1)); // sh_addralign
    buf.extend_from_slice(&e64(0)); // sh_entsize

    // section header #2: .data, an ordinary section whose name lives in
    // the string table rather than being hardcoded like shstrtab's own.
    buf.extend_from_slice(&e32(DATA_NAME_OFFSET)); // sh_name -> ".data"
    buf.extend_from_slice(&e32(1)); // sh_type = SHT_PROGBITS
    buf.extend_from_slice(&e64(0b11)); // sh_flags = WRITE|ALLOC
    buf.extend_from_slice(&e64(0)); // sh_addr
    buf.extend_from_slice(&e64(shstrtab_data_off)); // sh_offset (unused content-wise)
    buf.extend_from_slice(&e64(0)); // sh_size
    buf.extend_from_slice(&e32(0)); // sh_link
    buf.extend_from_slice(&e32(0)); // sh_info
    buf.extend_from_slice(&e64(1)); // sh_addralign
    buf.extend_from_slice(&e64(0)); // sh_entsize

    assert_eq!(buf.len() as u64, shstrtab_data_off);
    buf.extend_from_slice(shstrtab_content);
    buf
}

fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_elf_ident() {
    let bytes = build_elf64(false);
    let file = write_temp(&bytes);
    let elf = Elf::open(file.path()).unwrap();

    let ident = elf.header().ident();
    assert_eq!(ident.abi, ElfOsAbi::Unspecified);
    assert_eq!(ident.class, ElfClass::Class64);
    assert_eq!(ident.endian, ElfEndian::Little);
    assert_eq!(ident.version, ElfVersion::Current);
    assert_eq!(ident.abi_version, 0);
}

#[test]
fn test_e_entry_round_trip() {
    let file = write_temp(&build_elf64(false));
    let elf = Elf::open(file.path()).unwrap();

    assert_eq!(elf.header().e_entry().unwrap(), 0x401000);
    elf.header().set_e_entry(0xDEADBEEF).unwrap();
    assert_eq!(elf.header().e_entry().unwrap(), 0xDEADBEEF);

    // High-bit-set values must round trip bit-exact.
    elf.header().set_e_entry(0xFFFF_FFFF_FFFF_FFFF).unwrap();
    assert_eq!(elf.header().e_entry().unwrap(), 0xFFFF_FFFF_FFFF_FFFF);
}

#[test]
fn test_endianness_byte_reversal() {
    let le = build_elf64(false);
    let be = build_elf64(true);

    // e_entry occupies the same 8 bytes at offset 24 in both files.
    let le_entry = &le[24..32];
    let mut be_entry = be[24..32].to_vec();
    be_entry.reverse();
    assert_eq!(le_entry, be_entry.as_slice());
}

#[test]
fn test_program_header_flags() {
    let file = write_temp(&build_elf64(false));
    let elf = Elf::open(file.path()).unwrap();
    let phdr = elf.program_header(0);

    assert!(phdr.readable().unwrap());
    assert!(!phdr.writable().unwrap());
    assert!(phdr.executable().unwrap());

    phdr.set_writable(true).unwrap();
    assert!(phdr.writable().unwrap());
    assert!(phdr.readable().unwrap());
}

#[test]
fn test_section_name_lookup_and_rename() {
    let file = write_temp(&build_elf64(false));
    let elf = Elf::open(file.path()).unwrap();

    // The string table section itself always resolves to the literal
    // ".shstrtab" and can never be renamed (original_source/elf.py special
    // cases it the same way).
    let shstrtab = elf.section_header(1);
    assert_eq!(shstrtab.name().unwrap(), ".shstrtab");
    let err = shstrtab.set_name(".dyn").unwrap_err();
    assert!(matches!(err, crate::Error::NameTooLong { .. }));

    // An ordinary section resolves its name through shstrtab and can be
    // renamed in place as long as the new name is no longer than the old.
    let data = elf.section_header(2);
    assert_eq!(data.name().unwrap(), ".data");

    data.set_name(".dyn").unwrap();
    assert_eq!(data.name().unwrap(), ".dyn");

    let err = data.set_name(".way-too-long-a-name").unwrap_err();
    assert!(matches!(err, crate::Error::NameTooLong { .. }));
}

#[test]
fn test_string_round_trip() {
    let file = write_temp(&build_elf64(false));
    let elf = Elf::open(file.path()).unwrap();

    let shstrtab_off = elf.section_header(1).sh_offset().unwrap();
    elf.write_string(shstrtab_off + 20, b"hello").unwrap();
    let read = elf.read_string(shstrtab_off + 20, None).unwrap();
    assert_eq!(read, b"hello");
}

#[test]
fn test_malformed_magic_rejected() {
    let mut bytes = build_elf64(false);
    bytes[0] = 0;
    let file = write_temp(&bytes);
    let err = Elf::open(file.path()).unwrap_err();
    assert!(matches!(err, crate::Error::MalformedElf(_)));
}

#[test]
fn test_read_only_rejects_writes() {
    let file = write_temp(&build_elf64(false));
    let elf = Elf::open_read_only(file.path()).unwrap();
    let err = elf.header().set_e_entry(1).unwrap_err();
    assert!(matches!(err, crate::Error::ReadOnlyViolation));
}

#[test]
fn test_insert_shifts_following_offsets() {
    let file = write_temp(&build_elf64(false));
    let elf = Elf::open(file.path()).unwrap();

    let original_shoff = elf.header().e_shoff().unwrap();
    elf.insert(elf.header().e_phoff().unwrap(), &[0u8; 56]).unwrap();
    assert_eq!(elf.header().e_shoff().unwrap(), original_shoff);
    // e_shoff on disk did not auto-shift (insert is a raw primitive); callers
    // needing coherent headers after a structural insert go through
    // injector::infect, which shifts every downstream offset itself.
}
