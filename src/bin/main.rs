#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::fmt::{Debug, Write as _};

use embassy_executor::Spawner;
use embassy_time::Timer;
use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_10X20},
    pixelcolor::Rgb565,
    prelude::*,
    text::{Alignment, Text},
};
use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    spi::master::Spi,
    time::Rate,
    timer::timg::TimerGroup,
};
use heapless::String as HeaplessString;
use log::{LevelFilter, error, info, warn};
use mjpeg_player_core::{
    catalog::Catalog,
    engine::PlaybackEngine,
    frame_buffer::FrameBuffers,
    input::gesture::GestureConfig,
    playlist::Playlist,
    settings::Preferences,
};
use mjpeg_player_hal_esp32s3::{
    decode::RomJpegDecoder,
    input::PushButton,
    platform::{BootClock, OwnedSpiDevice, PanelDisplay},
    storage::{FlashPreferenceStore, SdMediaStorage},
};

const MEDIA_FOLDER: &str = "MJPEG";

const DISPLAY_WIDTH: u16 = 240;
const DISPLAY_HEIGHT: u16 = 240;
const DISPLAY_SPI_HZ: u32 = 40_000_000;
// Cards only have to accept init at 400 kHz or less.
const SD_INIT_HZ: u32 = 400_000;
const SD_STREAM_HZ_CANDIDATES: [u32; 4] = [20_000_000, 10_000_000, 4_000_000, SD_INIT_HZ];

const SPLASH_HOLD_MS: u64 = 1_500;
const TEXT_LINE_HEIGHT: i32 = 24;

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

fn sd_spi_config(speed_hz: u32) -> esp_hal::spi::master::Config {
    esp_hal::spi::master::Config::default()
        .with_frequency(Rate::from_hz(speed_hz))
        // SD cards in SPI mode use CPOL=0, CPHA=0.
        .with_mode(esp_hal::spi::Mode::_0)
}

/// Clears the panel and draws `lines` centered on it.
fn draw_lines<D>(target: &mut D, lines: &[&str])
where
    D: DrawTarget<Color = Rgb565>,
    D::Error: Debug,
{
    if let Err(err) = target.clear(Rgb565::BLACK) {
        warn!("display: clear failed err={:?}", err);
        return;
    }

    let style = MonoTextStyle::new(&FONT_10X20, Rgb565::WHITE);
    let center = target.bounding_box().center();
    let mut y = center.y - (lines.len() as i32 * TEXT_LINE_HEIGHT) / 2 + TEXT_LINE_HEIGHT / 2;

    for line in lines {
        if let Err(err) =
            Text::with_alignment(line, Point::new(center.x, y), style, Alignment::Center).draw(target)
        {
            warn!("display: text draw failed err={:?}", err);
            return;
        }
        y += TEXT_LINE_HEIGHT;
    }
}

/// Parks the firmware after an unrecoverable boot failure.
async fn halt(reason: &str) -> ! {
    error!("boot: halted reason={}", reason);
    esp_println::println!("boot: halted ({})", reason);
    loop {
        Timer::after_secs(1).await;
    }
}

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: mjpeg-player starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Frame buffers and the catalog live on the heap.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);
    esp_alloc::heap_allocator!(size: 64 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let store = match FlashPreferenceStore::new() {
        Ok(store) => Some(store),
        Err(err) => {
            warn!("prefs: flash store unavailable err={:?}; using defaults", err);
            None
        }
    };
    let mut preferences = Preferences::new(store);
    let preference = preferences.load();

    // Display wiring:
    // SCK=GPIO13, MOSI=GPIO14, CS=GPIO15, DC=GPIO2, RST=GPIO9, BL=GPIO10
    let _backlight = Output::new(peripherals.GPIO10, Level::High, OutputConfig::default());
    let dc = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    let rst = Output::new(peripherals.GPIO9, Level::High, OutputConfig::default());
    let cs = Output::new(peripherals.GPIO15, Level::High, OutputConfig::default());

    let display_spi_config = esp_hal::spi::master::Config::default()
        .with_frequency(Rate::from_hz(DISPLAY_SPI_HZ))
        // ST7789 with a chip select line samples on CPOL=0, CPHA=0.
        .with_mode(esp_hal::spi::Mode::_0);
    let display_bus = match Spi::new(peripherals.SPI2, display_spi_config) {
        Ok(spi) => spi
            .with_sck(peripherals.GPIO13)
            .with_mosi(peripherals.GPIO14),
        Err(err) => {
            error!("display: spi config rejected err={:?}", err);
            halt("display bus").await
        }
    };
    let Ok(display_spi) = OwnedSpiDevice::new(display_bus, cs);

    let panel_config = st7789::Config::default()
        .with_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .with_invert(preference.invert)
        .with_spi_hz(DISPLAY_SPI_HZ);
    let mut delay = Delay::new();

    esp_println::println!("display: init begin (SCK=13 MOSI=14 CS=15 DC=2 RST=9)");
    let mut display = match PanelDisplay::initialize(display_spi, dc, rst, panel_config, &mut delay) {
        Ok(display) => display,
        Err(err) => {
            error!("display: initialize failed err={:?}", err);
            halt("display init").await
        }
    };
    esp_println::println!("display: initialize ok");
    draw_lines(display.panel(), &["MJPEG player", "starting"]);

    let button = PushButton::new(Input::new(
        peripherals.GPIO0,
        InputConfig::default().with_pull(Pull::Up),
    ));

    let buffers = match FrameBuffers::allocate(DISPLAY_WIDTH, DISPLAY_HEIGHT) {
        Ok(buffers) => buffers,
        Err(err) => {
            error!("buffers: allocation failed err={:?}", err);
            draw_lines(display.panel(), &["Out of memory"]);
            halt("frame buffers").await
        }
    };

    // SD SPI wiring:
    // CS=GPIO8, SCK=GPIO4, MOSI=GPIO40, MISO=GPIO41
    let sd_cs = Output::new(peripherals.GPIO8, Level::High, OutputConfig::default());
    let sd_spi = match Spi::new(peripherals.SPI3, sd_spi_config(SD_INIT_HZ)) {
        Ok(spi) => spi
            .with_sck(peripherals.GPIO4)
            .with_mosi(peripherals.GPIO40)
            .with_miso(peripherals.GPIO41),
        Err(err) => {
            error!("sd: spi config rejected err={:?}", err);
            halt("sd bus").await
        }
    };

    let mut storage = match SdMediaStorage::mount(sd_spi, sd_cs, Delay::new()) {
        Ok(storage) => storage,
        Err(err) => {
            error!("sd: mount failed hz={} err={:?}", SD_INIT_HZ, err);
            draw_lines(display.panel(), &["No SD card"]);
            halt("sd mount").await
        }
    };

    // The card is initialized; step the clock down until the folder reads.
    let mut catalog = None;
    for speed_hz in SD_STREAM_HZ_CANDIDATES {
        if let Err(err) = storage.with_bus(|bus| bus.apply_config(&sd_spi_config(speed_hz))) {
            warn!("sd: speed rejected hz={} err={:?}", speed_hz, err);
            continue;
        }

        match Catalog::build(&mut storage, MEDIA_FOLDER) {
            Ok((built, _)) => {
                info!("sd: streaming hz={}", speed_hz);
                catalog = Some(built);
                break;
            }
            Err(err) => warn!(
                "catalog: folder={} unreadable hz={} err={:?}",
                MEDIA_FOLDER, speed_hz, err
            ),
        }
    }

    let Some(catalog) = catalog else {
        draw_lines(display.panel(), &["No /MJPEG folder"]);
        halt("media folder").await
    };

    if catalog.is_empty() {
        draw_lines(display.panel(), &["No MJPEG files"]);
        halt("empty catalog").await
    }

    let mut summary: HeaplessString<32> = HeaplessString::new();
    let _ = write!(summary, "{} clips", catalog.len());
    draw_lines(display.panel(), &["MJPEG player", summary.as_str()]);
    Timer::after_millis(SPLASH_HOLD_MS).await;

    let mut engine = PlaybackEngine::new(
        display,
        RomJpegDecoder::new(),
        button,
        BootClock::new(),
        preferences,
        buffers,
        GestureConfig::default(),
    );
    if let Err(err) = engine.apply_preference() {
        warn!("display: apply preference failed err={:?}", err);
    }

    let mut playlist = match Playlist::new(storage, engine, catalog, MEDIA_FOLDER) {
        Ok(playlist) => playlist,
        Err(err) => {
            error!("playlist: not started err={:?}", err);
            halt("no playable files").await
        }
    };

    esp_println::println!("boot: playback starting");
    playlist.run()
}
