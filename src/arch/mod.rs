//! Per-architecture stop-and-jump payload templates.
//!
//! Each descriptor pairs an ELF `e_machine` value with the textual assembly
//! that, once the `{entry}` placeholder is substituted with the original
//! entry address, performs: `kill(getpid(), SIGSTOP)` followed by an
//! indirect jump to that address. Instruction text, syscall numbers, and
//! the per-arch `SIGSTOP` value all come from `original_source/
//! architecture.py`.

pub mod arm;
pub mod mips;
pub mod x86;
pub mod x86_64;

/// The placeholder token in an assembly template line that the assembler
/// bridge replaces with the hexadecimal jump address.
pub const ENTRY_POINT_TOKEN: &str = "entry_point";

/// A single supported target: its ELF `e_machine` number, the keystone
/// architecture/mode pair needed to assemble it, and its payload template.
pub struct ArchDescriptor {
    pub name: &'static str,
    pub machine: u16,
    pub keystone_arch: keystone::Arch,
    pub keystone_mode: keystone::Mode,
    pub asm: &'static [&'static str],
}

/// ELF `e_machine` constants this crate recognizes.
pub mod machine {
    pub const EM_386: u16 = 3;
    pub const EM_MIPS: u16 = 8;
    pub const EM_ARM: u16 = 40;
    pub const EM_X86_64: u16 = 62;
}

/// All supported descriptors, in no particular order.
pub const DESCRIPTORS: &[&ArchDescriptor] = &[
    &x86::DESCRIPTOR,
    &x86_64::DESCRIPTOR,
    &mips::DESCRIPTOR,
    &arm::DESCRIPTOR,
];

/// Finds the descriptor whose `machine` matches `e_machine`, if any.
pub fn find(e_machine: u16) -> Option<&'static ArchDescriptor> {
    DESCRIPTORS.iter().find(|d| d.machine == e_machine).copied()
}
