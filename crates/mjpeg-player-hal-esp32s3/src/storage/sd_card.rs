use core::ops::ControlFlow;

use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiBus};
use embedded_sdmmc::{
    Mode, RawDirectory, RawFile, RawVolume, SdCard, SdCardError, ShortFileName, TimeSource,
    Timestamp, VolumeIdx, VolumeManager,
};
use heapless::String;
use log::info;
use mjpeg_player_core::storage::{ByteStream, DirEntry, MediaStorage, OpenError};

use crate::platform::spi::OwnedSpiDevice;

/// Longest 8.3 name including the dot.
const SHORT_NAME_BYTES: usize = 12;
/// Idle bytes clocked before the first command (80 clocks).
const PRECLOCK_BYTES: usize = 10;

/// Fixed timestamp source; the player never writes to the card.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        // 2026-01-01 00:00:00
        Timestamp {
            year_since_1970: 56,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

#[derive(Debug)]
pub enum SdStorageError<BusErr, CsErr>
where
    BusErr: core::fmt::Debug,
    CsErr: core::fmt::Debug,
{
    ChipSelect(CsErr),
    Spi(BusErr),
    Card(SdCardError),
    Filesystem(embedded_sdmmc::Error<SdCardError>),
}

type Card<BUS, CS, DELAY> = SdCard<OwnedSpiDevice<BUS, CS>, DELAY>;
type Volumes<BUS, CS, DELAY> = VolumeManager<Card<BUS, CS, DELAY>, FixedTimeSource>;
type SdResult<BUS, CS, T> =
    Result<T, SdStorageError<<BUS as embedded_hal::spi::ErrorType>::Error, <CS as embedded_hal::digital::ErrorType>::Error>>;

/// FAT volume 0 of an SD card on a dedicated SPI bus, read-only.
pub struct SdMediaStorage<BUS, CS, DELAY>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
    DELAY: DelayNs,
    BUS::Error: core::fmt::Debug,
    CS::Error: core::fmt::Debug,
{
    volume_mgr: Volumes<BUS, CS, DELAY>,
    volume: RawVolume,
    root: RawDirectory,
    card_size_bytes: u64,
}

impl<BUS, CS, DELAY> SdMediaStorage<BUS, CS, DELAY>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
    DELAY: DelayNs,
    BUS::Error: core::fmt::Debug,
    CS::Error: core::fmt::Debug,
{
    /// Brings the card up and opens the root directory of volume 0.
    pub fn mount(bus: BUS, cs: CS, delay: DELAY) -> SdResult<BUS, CS, Self> {
        let mut device = OwnedSpiDevice::new(bus, cs).map_err(SdStorageError::ChipSelect)?;
        device
            .preclock(PRECLOCK_BYTES)
            .map_err(SdStorageError::Spi)?;

        let card = SdCard::new(device, delay);
        let card_size_bytes = card.num_bytes().map_err(SdStorageError::Card)?;

        let volume_mgr = VolumeManager::new(card, FixedTimeSource);
        let volume = volume_mgr
            .open_raw_volume(VolumeIdx(0))
            .map_err(SdStorageError::Filesystem)?;
        let root = volume_mgr
            .open_root_dir(volume)
            .map_err(SdStorageError::Filesystem)?;

        info!("sd: mounted card_size_bytes={}", card_size_bytes);
        Ok(Self {
            volume_mgr,
            volume,
            root,
            card_size_bytes,
        })
    }

    pub const fn card_size_bytes(&self) -> u64 {
        self.card_size_bytes
    }

    /// Runs `f` on the SPI bus under the card, e.g. to raise the clock once
    /// the card left its 400 kHz init phase.
    pub fn with_bus<R, F>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut BUS) -> R,
    {
        self.volume_mgr
            .device(|card| card.spi(|device| f(device.bus_mut())))
    }

    /// Closes every handle and hands the card back.
    pub fn unmount(self) -> Card<BUS, CS, DELAY> {
        let _ = self.volume_mgr.close_dir(self.root);
        let _ = self.volume_mgr.close_volume(self.volume);
        self.volume_mgr.free().0
    }
}

impl<BUS, CS, DELAY> MediaStorage for SdMediaStorage<BUS, CS, DELAY>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
    DELAY: DelayNs,
    BUS::Error: core::fmt::Debug,
    CS::Error: core::fmt::Debug,
{
    type Error = SdStorageError<BUS::Error, CS::Error>;
    type Stream<'s>
        = SdFileStream<'s, BUS, CS, DELAY>
    where
        Self: 's;

    fn list_dir<F>(&mut self, folder: &str, mut visit: F) -> Result<(), Self::Error>
    where
        F: FnMut(DirEntry<'_>) -> ControlFlow<()>,
    {
        let dir = self
            .volume_mgr
            .open_dir(self.root, folder)
            .map_err(SdStorageError::Filesystem)?;

        let mut stopped = false;
        let result = self.volume_mgr.iterate_dir(dir, |entry| {
            if stopped || entry.attributes.is_volume() {
                return;
            }

            let name = short_name_to_string(&entry.name);
            let attributes = entry.attributes;
            let dir_entry = DirEntry {
                name: name.as_str(),
                size_bytes: entry.size,
                is_dir: attributes.is_directory(),
                is_hidden: attributes.is_hidden() || attributes.is_system(),
            };
            stopped = visit(dir_entry).is_break();
        });

        let closed = self.volume_mgr.close_dir(dir);
        result.and(closed).map_err(SdStorageError::Filesystem)
    }

    fn open<'s>(
        &'s mut self,
        folder: &str,
        name: &str,
    ) -> Result<Self::Stream<'s>, OpenError<Self::Error>> {
        let dir = self
            .volume_mgr
            .open_dir(self.root, folder)
            .map_err(|err| OpenError::Storage(SdStorageError::Filesystem(err)))?;

        let opened = self
            .volume_mgr
            .open_file_in_dir(dir, name, Mode::ReadOnly);
        let _ = self.volume_mgr.close_dir(dir);

        match opened {
            Ok(file) => Ok(SdFileStream {
                volume_mgr: &self.volume_mgr,
                file,
            }),
            Err(embedded_sdmmc::Error::NotFound) => Err(OpenError::NotFound),
            Err(embedded_sdmmc::Error::OpenedDirAsFile) => Err(OpenError::IsDirectory),
            Err(err) => Err(OpenError::Storage(SdStorageError::Filesystem(err))),
        }
    }
}

/// Open read-only file; closed on drop.
pub struct SdFileStream<'a, BUS, CS, DELAY>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
    DELAY: DelayNs,
    BUS::Error: core::fmt::Debug,
    CS::Error: core::fmt::Debug,
{
    volume_mgr: &'a Volumes<BUS, CS, DELAY>,
    file: RawFile,
}

impl<BUS, CS, DELAY> ByteStream for SdFileStream<'_, BUS, CS, DELAY>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
    DELAY: DelayNs,
    BUS::Error: core::fmt::Debug,
    CS::Error: core::fmt::Debug,
{
    type Error = SdStorageError<BUS::Error, CS::Error>;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.volume_mgr
            .read(self.file, buf)
            .map_err(SdStorageError::Filesystem)
    }

    fn is_eof(&self) -> bool {
        self.volume_mgr.file_eof(self.file).unwrap_or(true)
    }
}

impl<BUS, CS, DELAY> Drop for SdFileStream<'_, BUS, CS, DELAY>
where
    BUS: SpiBus<u8>,
    CS: OutputPin,
    DELAY: DelayNs,
    BUS::Error: core::fmt::Debug,
    CS::Error: core::fmt::Debug,
{
    fn drop(&mut self) {
        let _ = self.volume_mgr.close_file(self.file);
    }
}

/// `NAME.EXT` (or `NAME` without extension) from a FAT short name.
fn short_name_to_string(name: &ShortFileName) -> String<SHORT_NAME_BYTES> {
    let mut out = String::new();
    for &b in name.base_name() {
        let _ = out.push(b as char);
    }
    let ext = name.extension();
    if !ext.is_empty() {
        let _ = out.push('.');
        for &b in ext {
            let _ = out.push(b as char);
        }
    }
    out
}
