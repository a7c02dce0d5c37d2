//! `EM_X86_64`: 64-bit x86.

use super::{machine, ArchDescriptor};

pub static DESCRIPTOR: ArchDescriptor = ArchDescriptor {
    name: "x86-64",
    machine: machine::EM_X86_64,
    keystone_arch: keystone::Arch::X86,
    keystone_mode: keystone::MODE_64,
    asm: &[
        "mov eax, 0x27",
        "syscall", // getpid()
        "mov rdi, rax",
        "mov rsi, 19",
        "mov rax, 0x3E",
        "syscall", // kill(pid, SIGSTOP)
        "mov rax, entry_point",
        "jmp rax", // goto entry_point
    ],
};
