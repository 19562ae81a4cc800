#![no_std]
#![no_main]

// RPROM cartridge firmware for the RP2350.
//
// Core 0 impersonates a 16-bit parallel ROM from an image in SRAM. Core 1
// receives every address core 0 sees and runs the host command protocol:
// slot switching, status, page transfer, flash program and erase.

mod bus;
mod fifo;
mod flash;

use core::sync::atomic::AtomicU16;

use embedded_alloc::Heap;
use panic_halt as _; // Halts on panic.
use rp235x_hal::{self as hal, multicore::{Multicore, Stack}, pac};

use rprom::config::ROM_IMAGE_WORDS;
use rprom::dispatcher::Dispatcher;
use rprom::image::{ImageWords, RomImage};
use rprom::responder::{AddressDecoder, BusAction, BusLayout, BusResponder, Contiguous, DataBus, Split};
use rprom::store::ConfigStore;

use bus::CartridgeBus;
use fifo::SioFifo;
use flash::RomFlash;

#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: hal::block::ImageDef = hal::block::ImageDef::secure_exe();

// --- Heap ---
// Nothing here allocates; tracing's no_std build still links liballoc.
#[global_allocator]
static HEAP: Heap = Heap::empty();
const HEAP_SIZE: usize = 1024;
static mut HEAP_MEM: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

const XTAL_FREQ_HZ: u32 = 12_000_000;

/// The image the host reads. Fills main SRAM; not zeroed at startup since
/// boot overwrites all of it.
#[link_section = ".rom_image"]
static ROM_IMAGE: ImageWords = [const { AtomicU16::new(0) }; ROM_IMAGE_WORDS];

static CORE1_STACK: Stack<768> = Stack::new();

fn halt() -> ! {
    loop {
        cortex_m::asm::bkpt();
    }
}

#[hal::entry]
fn main() -> ! {
    unsafe {
        let ptr = core::ptr::addr_of_mut!(HEAP_MEM);
        HEAP.init(ptr as usize, HEAP_SIZE);
    }

    let Some(mut pac) = pac::Peripherals::take() else { halt() };
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let clocks = hal::clocks::init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    );
    if clocks.is_err() {
        halt();
    }

    let mut sio = hal::Sio::new(pac.SIO);
    // Takes both GPIO banks out of reset; the pins are then driven through
    // SIO directly.
    let _pins = hal::gpio::Pins::new(pac.IO_BANK0, pac.PADS_BANK0, sio.gpio_bank0, &mut pac.RESETS);
    let mut bus = CartridgeBus::take();
    let layout = BusLayout::from_strap(bus.read_strap());

    let image = RomImage::new(&ROM_IMAGE);
    let mut dispatcher = Dispatcher::new(image, RomFlash, ConfigStore::default());
    if dispatcher.boot().is_err() {
        halt();
    }

    let mut mc = Multicore::new(&mut pac.PSM, &mut pac.PPB, &mut sio.fifo);
    let cores = mc.cores();
    let Some(stack) = CORE1_STACK.take() else { halt() };
    let spawned = cores[1].spawn(stack, move || {
        dispatcher.run(&SioFifo);
    });
    if spawned.is_err() {
        halt();
    }

    match layout {
        BusLayout::Contiguous => serve::<Contiguous>(image, bus),
        BusLayout::Split => serve::<Split>(image, bus),
    }
}

/// Core 0 bus loop. Runs from RAM: core 1 takes flash out of XIP mode while
/// programming.
#[inline(never)]
#[link_section = ".data.ram_func"]
fn serve<D: AddressDecoder>(image: RomImage<'static>, mut bus: CartridgeBus) -> ! {
    let mut responder = BusResponder::<D>::new(image);
    let fifo = SioFifo;
    loop {
        match responder.step(bus.sample(), &fifo) {
            BusAction::Drive(value) => bus.drive(value),
            BusAction::Release => bus.release(),
        }
    }
}
