#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those     holding buffers for the duration of a data transfer."
)]

use embassy_executor::Spawner;
use embassy_time::{Delay, Duration, Timer};
use embedded_bus_async::{share, RwLockI2cDevice};
use esp_hal::i2c::master::I2c;
use esp_hal::Async;
use esp_hal::{
    clock::CpuClock,
    gpio::{Input, InputConfig, Level, Output, OutputConfig},
    time::Rate,
    timer::systimer::SystemTimer,
};
use esp_println::println;
use log::{info, warn};
use touch_ic_async::pins::{InputLine, OutputLine};
use touch_ic_async::{ChipFamily, I2cBus, Resolution, TouchDriver};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("{}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

type Touch = TouchDriver<
    I2cBus<RwLockI2cDevice<I2c<'static, Async>>>,
    Delay,
    OutputLine<Output<'static>>,
    InputLine<Input<'static>>,
>;

/// The main entry point of the application.
#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    esp_println::logger::init_logger(log::LevelFilter::Debug);
    info!("Logger initialized");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(size: 64 * 1024);

    let timer0 = SystemTimer::new(peripherals.SYSTIMER);
    esp_hal_embassy::init(timer0.alarm0);

    let touch_rst = Output::new(peripherals.GPIO45, Level::High, OutputConfig::default());
    let touch_int = Input::new(peripherals.GPIO12, InputConfig::default());

    let config = esp_hal::i2c::master::Config::default().with_frequency(Rate::from_khz(100));
    let i2c = I2c::new(peripherals.I2C0, config)
        .unwrap()
        .with_sda(peripherals.GPIO13)
        .with_scl(peripherals.GPIO14)
        .into_async();

    // The keyboard and charger sit on the same bus; clone the handle for them.
    let touch_i2c = RwLockI2cDevice::new(share(i2c));

    let mut touch: Touch = TouchDriver::new(I2cBus::new(touch_i2c), Delay, ChipFamily::Cst328)
        .with_reset_pin(OutputLine::new(touch_rst, touch_ic_async::Level::High))
        .with_irq_pin(InputLine::new(touch_int));
    touch.set_display_resolution(Resolution::new(240, 320));

    match touch.init().await {
        Ok(info) => info!("Touch controller initialized: {info:?}"),
        Err(err) => warn!("Error initializing touch controller: {err}"),
    }

    spawner.spawn(read_touch(touch)).unwrap();

    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

/// A task that polls the interrupt line and logs the reported points.
#[embassy_executor::task]
async fn read_touch(mut touch: Touch) {
    touch.set_irq_retrigger_interval(Duration::from_millis(20));
    loop {
        match touch.is_pressed().await {
            Ok(true) => match touch.get_touch_points(5).await {
                Ok(points) => info!("Touches detected {points:?}"),
                Err(err) => warn!("Error receiving touch: {err:?}"),
            },
            Ok(false) => {}
            Err(err) => warn!("Error polling touch interrupt: {err:?}"),
        }
        Timer::after(Duration::from_millis(20)).await;
    }
}
