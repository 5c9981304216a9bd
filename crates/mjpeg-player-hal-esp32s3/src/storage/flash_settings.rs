use embedded_storage::{ReadStorage, Storage};
use esp_bootloader_esp_idf::partitions::{
    DataPartitionSubType, PARTITION_TABLE_MAX_LEN, PartitionType, read_partition_table,
};
use esp_rom_sys::rom::spiflash::{
    ESP_ROM_SPIFLASH_RESULT_OK, esp_rom_spiflash_erase_sector, esp_rom_spiflash_read,
    esp_rom_spiflash_unlock, esp_rom_spiflash_write,
};
use log::info;
use mjpeg_player_core::settings::{
    DisplayPreference, PreferenceStore,
    record::{self, RECORD_LEN, RecordError},
};

const FLASH_SECTOR_SIZE: u32 = 4096;
const PARTITION_TABLE_OFFSET: u32 = 0x8000;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FlashSettingsError {
    PartitionTable,
    SettingsPartitionMissing,
    PartitionTooSmall,
    FlashOpFailed(i32),
    Corrupted,
    Unsupported,
}

impl From<RecordError> for FlashSettingsError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::Corrupted => Self::Corrupted,
        }
    }
}

#[derive(Debug)]
struct RawFlash;

impl RawFlash {
    fn new() -> Result<Self, FlashSettingsError> {
        let rc = unsafe { esp_rom_spiflash_unlock() };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashSettingsError::FlashOpFailed(rc));
        }
        Ok(Self)
    }

    fn erase_sector(&mut self, sector_addr: u32) -> Result<(), FlashSettingsError> {
        if !sector_addr.is_multiple_of(FLASH_SECTOR_SIZE) {
            return Err(FlashSettingsError::Unsupported);
        }

        let rc = unsafe { esp_rom_spiflash_erase_sector(sector_addr / FLASH_SECTOR_SIZE) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashSettingsError::FlashOpFailed(rc));
        }
        Ok(())
    }

    fn read_word(&mut self, addr: u32) -> Result<u32, FlashSettingsError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashSettingsError::Unsupported);
        }

        let mut word = 0u32;
        let rc = unsafe { esp_rom_spiflash_read(addr, &mut word as *mut u32 as *const u32, 4) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashSettingsError::FlashOpFailed(rc));
        }
        Ok(word)
    }

    fn write_word(&mut self, addr: u32, word: u32) -> Result<(), FlashSettingsError> {
        if !addr.is_multiple_of(4) {
            return Err(FlashSettingsError::Unsupported);
        }

        let rc = unsafe { esp_rom_spiflash_write(addr, &word as *const u32, 4) };
        if rc != ESP_ROM_SPIFLASH_RESULT_OK {
            return Err(FlashSettingsError::FlashOpFailed(rc));
        }
        Ok(())
    }

    /// Reads `out.len()` bytes starting at any byte address.
    fn read_bytes(&mut self, addr: u32, out: &mut [u8]) -> Result<(), FlashSettingsError> {
        let start = addr & !0b11;
        let end = (addr + out.len() as u32 + 3) & !0b11;

        for word_addr in (start..end).step_by(4) {
            let bytes = self.read_word(word_addr)?.to_le_bytes();
            for (i, b) in bytes.iter().enumerate() {
                let pos = (word_addr + i as u32).checked_sub(addr);
                if let Some(dst) = pos.and_then(|p| out.get_mut(p as usize)) {
                    *dst = *b;
                }
            }
        }
        Ok(())
    }

    /// Programs `data` into an already erased region, padding partial words
    /// with `0xFF` so neighbouring bytes stay erased.
    fn write_erased_bytes(&mut self, addr: u32, data: &[u8]) -> Result<(), FlashSettingsError> {
        let start = addr & !0b11;
        let end = (addr + data.len() as u32 + 3) & !0b11;

        for word_addr in (start..end).step_by(4) {
            let mut bytes = [0xFFu8; 4];
            for (i, slot) in bytes.iter_mut().enumerate() {
                let pos = (word_addr + i as u32).checked_sub(addr);
                if let Some(src) = pos.and_then(|p| data.get(p as usize)) {
                    *slot = *src;
                }
            }
            self.write_word(word_addr, u32::from_le_bytes(bytes))?;
        }
        Ok(())
    }
}

/// Read-only window over the partition table, the only shape
/// `read_partition_table` accepts.
struct PartitionTableFlash<'a>(&'a mut RawFlash);

impl ReadStorage for PartitionTableFlash<'_> {
    type Error = FlashSettingsError;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let end = offset as usize + bytes.len();
        if end > self.capacity() {
            return Err(FlashSettingsError::Unsupported);
        }
        self.0.read_bytes(offset, bytes)
    }

    fn capacity(&self) -> usize {
        PARTITION_TABLE_OFFSET as usize + PARTITION_TABLE_MAX_LEN
    }
}

impl Storage for PartitionTableFlash<'_> {
    fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
        Err(FlashSettingsError::Unsupported)
    }
}

/// Display preference kept in the last sector of a data partition.
///
/// A `Data/Undefined` partition is preferred; the first writable NVS
/// partition is the fallback.
#[derive(Debug)]
pub struct FlashPreferenceStore {
    flash: RawFlash,
    sector_addr: u32,
}

impl FlashPreferenceStore {
    pub fn new() -> Result<Self, FlashSettingsError> {
        let mut flash = RawFlash::new()?;

        let mut table_buf = [0u8; PARTITION_TABLE_MAX_LEN];
        let table = read_partition_table(&mut PartitionTableFlash(&mut flash), &mut table_buf)
            .map_err(|_| FlashSettingsError::PartitionTable)?;

        let mut data_undefined: Option<(u32, u32)> = None;
        let mut fallback_nvs: Option<(u32, u32)> = None;

        for entry in table.iter() {
            if entry.is_read_only() {
                continue;
            }

            match entry.partition_type() {
                PartitionType::Data(DataPartitionSubType::Undefined) => {
                    data_undefined = Some((entry.offset(), entry.len()));
                    break;
                }
                PartitionType::Data(DataPartitionSubType::Nvs) => {
                    if fallback_nvs.is_none() {
                        fallback_nvs = Some((entry.offset(), entry.len()));
                    }
                }
                _ => {}
            }
        }

        let (offset, len) = data_undefined
            .or(fallback_nvs)
            .ok_or(FlashSettingsError::SettingsPartitionMissing)?;

        if len < FLASH_SECTOR_SIZE {
            return Err(FlashSettingsError::PartitionTooSmall);
        }

        let sector_addr = offset + len - FLASH_SECTOR_SIZE;
        info!("prefs: flash sector=0x{:08x}", sector_addr);
        Ok(Self { flash, sector_addr })
    }
}

impl PreferenceStore for FlashPreferenceStore {
    type Error = FlashSettingsError;

    fn load(&mut self) -> Result<Option<DisplayPreference>, Self::Error> {
        let mut buf = [0u8; RECORD_LEN];
        self.flash.read_bytes(self.sector_addr, &mut buf)?;
        Ok(record::decode(&buf)?)
    }

    fn save(&mut self, preference: &DisplayPreference) -> Result<(), Self::Error> {
        let buf = record::encode(preference);
        self.flash.erase_sector(self.sector_addr)?;
        self.flash.write_erased_bytes(self.sector_addr, &buf)
    }
}
