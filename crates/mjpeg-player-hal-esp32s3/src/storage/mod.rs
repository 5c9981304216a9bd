pub mod flash_settings;
pub mod sd_card;

pub use flash_settings::{FlashPreferenceStore, FlashSettingsError};
pub use sd_card::{FixedTimeSource, SdFileStream, SdMediaStorage, SdStorageError};
