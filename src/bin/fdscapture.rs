#![no_std]
#![no_main]

use defmt_rtt as _;
use fdsdrive_rs::types::Direction;
use fdsdrive_rs::{defmt_panic_handler, panic_handler};

#[embassy_executor::main]
async fn main(spawner: embassy_executor::Spawner) -> ! {
    fdsdrive_rs::common_main(spawner, Direction::Capture).await
}

// Custom defmt panic handler
#[defmt::panic_handler]
fn defmt_panic() -> ! {
    defmt_panic_handler()
}

// Custom core panic handler
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    panic_handler(info)
}
