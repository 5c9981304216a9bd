#![no_std]

//! ESP32-S3 board adapters for the MJPEG player: ST7789 panel, BOOT button,
//! SD card over SPI, ROM JPEG decoder and flash-backed preferences.

pub mod decode;
pub mod input;
pub mod platform;
pub mod storage;
