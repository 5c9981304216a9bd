#![cfg_attr(not(test), no_std)]

//! Platform-free core of the MJPEG player: media catalog, button gestures,
//! frame pipeline and the playlist loop.

extern crate alloc;

pub mod catalog;
pub mod clock;
pub mod decoder;
pub mod display;
pub mod engine;
pub mod frame_buffer;
pub mod input;
pub mod layout;
pub mod mjpeg;
pub mod playlist;
pub mod settings;
pub mod storage;

#[cfg(test)]
mod testing;
