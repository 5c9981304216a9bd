pub mod tjpgd;

pub use tjpgd::{RomJpegDecoder, RomJpegError};
