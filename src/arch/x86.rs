//! `EM_386`: 32-bit x86.

use super::{machine, ArchDescriptor};

pub static DESCRIPTOR: ArchDescriptor = ArchDescriptor {
    name: "x86",
    machine: machine::EM_386,
    keystone_arch: keystone::Arch::X86,
    keystone_mode: keystone::MODE_32,
    asm: &[
        "mov eax, 20",
        "int 0x80", // getpid()
        "mov ebx, eax",
        "mov ecx, 19",
        "mov eax, 37",
        "int 0x80", // kill(pid, SIGSTOP)
        "mov eax, entry_point",
        "jmp eax", // goto entry_point
    ],
};
