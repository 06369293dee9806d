//! Ember kernel entry point.
//!
//! `_start` in the boot trampoline enters long mode and calls
//! [`kernel_main`] with the Multiboot2 information pointer and magic.

#![cfg_attr(target_os = "none", no_std, no_main)]

#[cfg(target_os = "none")]
mod entry {
    use core::fmt::Display;
    use core::panic::PanicInfo;

    use ember_common::KernelError;
    use ember_kernel::arch::x86_64::vga::{self, Color};
    use ember_kernel::arch::x86_64::{gdt, halt, halt_loop, serial, trap, HardwarePorts, Pics};
    use ember_kernel::boot::multiboot::{BootInformation, BOOTLOADER_MAGIC};
    use ember_kernel::boot::{self, banner, Status};
    use ember_kernel::drivers::{Keyboard, KEYBOARD_IRQ};
    use ember_kernel::interrupts::{exception, InterruptDescriptorTable, KERNEL_CODE_SELECTOR};
    use ember_kernel::memory::PhysicalMemoryManager;
    use ember_kernel::{print, println, selftest, Kernel};
    use ember_hal::InterruptController;

    extern "C" {
        static __kernel_start: u8;
        static __kernel_end: u8;
    }

    // SAFETY: the keyboard handler is the only reader of the PS/2 data port.
    static KEYBOARD: Keyboard<HardwarePorts> = Keyboard::new(unsafe { HardwarePorts::new() }, echo);

    fn echo(c: char) {
        print!("{}", c);
    }

    /// Physical range of the loaded kernel image.
    fn kernel_image() -> (u64, u64) {
        // SAFETY: only the addresses of the linker symbols are taken.
        unsafe {
            (
                core::ptr::addr_of!(__kernel_start) as u64,
                core::ptr::addr_of!(__kernel_end) as u64,
            )
        }
    }

    fn check<T, E: Into<KernelError>>(stage: &str, result: Result<T, E>) -> T {
        match result {
            Ok(value) => value,
            Err(e) => fail(stage, e.into()),
        }
    }

    fn fail(stage: &str, error: impl Display) -> ! {
        boot::log(Status::Fail, stage);
        panic!("{}: {}", stage, error);
    }

    /// Kernel entry point, called by the boot trampoline.
    #[unsafe(no_mangle)]
    pub extern "C" fn kernel_main(multiboot_info: usize, magic: u32) -> ! {
        ember_kernel::init();
        vga::clear_screen();
        banner::print_banner();
        boot::log(Status::Ok, "Serial console and kernel log ready");

        if magic != BOOTLOADER_MAGIC {
            fail("Multiboot2 hand-off", format_args!("bad magic {:#x}", magic));
        }
        // SAFETY: a Multiboot2 loader left the structure at this address and
        // the trampoline identity maps it.
        let boot_info = check("Boot information", unsafe {
            BootInformation::from_ptr(multiboot_info)
        });
        boot::log(Status::Ok, "Boot information parsed");
        if let Some(loader) = boot_info.boot_loader_name() {
            boot::log_detail(format_args!("Loader: {}", loader));
        }
        if let Some(cmdline) = boot_info.command_line().filter(|c| !c.is_empty()) {
            boot::log_detail(format_args!("Command line: {}", cmdline));
        }

        let mut pmm = PhysicalMemoryManager::new();
        pmm.init(&boot_info);
        let (image_start, image_end) = kernel_image();
        pmm.reserve_region(image_start, image_end - image_start);
        let stats = pmm.stats();
        boot::log(Status::Ok, "Physical memory manager initialized");
        boot::log_detail(format_args!(
            "{} KiB total, {} KiB used, {} KiB free",
            stats.total / 1024,
            stats.used / 1024,
            stats.free / 1024
        ));

        gdt::init();
        boot::log(Status::Ok, "GDT and TSS loaded");

        // SAFETY: ring 0, and the PICs belong to this value from here on.
        let mut pics = Pics::new(unsafe { HardwarePorts::new() });
        pics.remap();
        boot::log(Status::Ok, "PIC remapped to vectors 32-47");

        let mut idt = InterruptDescriptorTable::new();
        idt.install_stubs(&trap::stub_addresses(), KERNEL_CODE_SELECTOR);
        idt.set_stack_index(exception::DOUBLE_FAULT, gdt::DOUBLE_FAULT_IST);
        let kernel = trap::install(Kernel::new(idt, pics, pmm));
        boot::log(Status::Ok, "IDT populated");

        check(
            "Keyboard handler",
            kernel.interrupts().install_handler(KEYBOARD_IRQ, &KEYBOARD),
        );
        boot::log(Status::Ok, "Keyboard on IRQ 1");

        let passed = selftest::run_all(kernel);
        boot::log(
            if passed { Status::Ok } else { Status::Fail },
            "Boot self-tests",
        );
        #[cfg(feature = "qemu-exit")]
        {
            use ember_kernel::testutil::{exit_qemu, QemuExitCode};
            exit_qemu(if passed {
                QemuExitCode::Success
            } else {
                QemuExitCode::Failed
            });
        }

        check("Interrupts", kernel.activate_interrupts());
        boot::log(Status::Ok, "Interrupts enabled");

        boot::log_section("Ready");
        boot::log(Status::Info, "System ready. Type something!");
        halt_loop()
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        serial::emergency_print(format_args!("KERNEL PANIC: {}\n", info));
        if let Some(kernel) = trap::kernel() {
            kernel.interrupts().silence();
        }

        vga::set_color(Color::LightRed, Color::Black);
        println!("\n\n!!! KERNEL PANIC !!!");
        vga::set_color(Color::White, Color::Black);
        println!("{}", info);

        halt()
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("ember is a bare-metal kernel: build it with `cargo kbuild` and boot it from a Multiboot2 loader");
}
