#![no_std]
// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![allow(clippy::empty_loop)]

//! Runtime the PowerPC ELF example programs link against.
//!
//! `cmain` is called by the board's reset stub with a stack already set up.
//! The C console entry points forward to [`labwired_bsp::Board`] over real
//! MMIO. On any other architecture this crate is empty.

#[cfg(target_arch = "powerpc")]
mod powerpc {
    use core::ffi::c_int;
    use core::ptr::addr_of;
    use labwired_bsp::{Board, EabiLayout, IoMap, Mmio, RawMemory};

    extern "C" {
        static __sdata2_load: u8;
        static __sdata2_start: u8;
        static __sdata2_end: u8;
        static __data_load: u8;
        static __data_start: u8;
        static __data_end: u8;
        static __sbss2_start: u8;
        static __sbss2_end: u8;
        static __sbss_start: u8;
        static __sbss_end: u8;
        static __bss_start: u8;
        static __bss_end: u8;

        fn main() -> c_int;
    }

    fn board() -> Board<Mmio> {
        // SAFETY: the reference board maps its I/O window at `IoMap::POWERPC_ELF`.
        Board::new(unsafe { Mmio::new() }, IoMap::POWERPC_ELF)
    }

    fn layout() -> EabiLayout {
        // Only the addresses of the linker symbols are taken, never their contents.
        unsafe {
            EabiLayout::new(
                (
                    addr_of!(__sdata2_load) as u32,
                    addr_of!(__sdata2_start) as u32,
                    addr_of!(__sdata2_end) as u32,
                ),
                (
                    addr_of!(__data_load) as u32,
                    addr_of!(__data_start) as u32,
                    addr_of!(__data_end) as u32,
                ),
                (addr_of!(__sbss2_start) as u32, addr_of!(__sbss2_end) as u32),
                (addr_of!(__sbss_start) as u32, addr_of!(__sbss_end) as u32),
                (addr_of!(__bss_start) as u32, addr_of!(__bss_end) as u32),
            )
        }
    }

    #[no_mangle]
    pub extern "C" fn cmain() -> ! {
        // SAFETY: the linker script places these sections in RAM away from the stack.
        let mut memory = unsafe { RawMemory::new() };
        let _ = board().initialize_and_run(&mut memory, &layout().sections(), |_, _| unsafe {
            main()
        });
        loop {}
    }

    #[no_mangle]
    pub extern "C" fn abort() -> ! {
        board().halt();
        loop {}
    }

    #[no_mangle]
    pub extern "C" fn putchar(c: c_int) -> c_int {
        let _ = board().write_char(c as u8);
        c
    }

    #[no_mangle]
    pub extern "C" fn checkkey() -> c_int {
        board().read_ready() as c_int
    }

    #[no_mangle]
    pub extern "C" fn getchar() -> c_int {
        match board().read_char() {
            Ok(c) => c as c_int,
            Err(_) => loop {},
        }
    }

    #[no_mangle]
    pub extern "C" fn fsync(fd: c_int) -> c_int {
        match board().sync(fd) {
            Ok(()) => 0,
            Err(never) => match never {},
        }
    }

    #[panic_handler]
    fn panic(_info: &core::panic::PanicInfo) -> ! {
        abort()
    }
}
