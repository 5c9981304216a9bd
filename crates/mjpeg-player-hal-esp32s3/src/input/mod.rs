pub mod button;

pub use button::PushButton;
