//! `EM_MIPS`: MIPS32. Uses `SIGSTOP = 23`, not the 19 used by the other
//! three architectures.

use super::{machine, ArchDescriptor};

pub static DESCRIPTOR: ArchDescriptor = ArchDescriptor {
    name: "mips32",
    machine: machine::EM_MIPS,
    keystone_arch: keystone::Arch::MIPS,
    keystone_mode: keystone::MODE_MIPS32,
    asm: &[
        "li $v0, 0xFB4",
        "syscall 0", // getpid()
        "move $a0, $v0",
        "li $a1, 23",
        "li $v0, 0xFC5",
        "syscall 0", // kill(pid, SIGSTOP)
        "li $t0, entry_point",
        "jr $t0", // goto entry_point
    ],
};
