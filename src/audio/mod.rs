// Audio module - capture and lock-free hand-off to the detection thread

pub mod block;
pub mod buffer_pool;
pub mod capture;

pub use block::AudioBlock;
pub use buffer_pool::{BufferPool, BufferPoolChannels, DropCounter};
pub use capture::{list_input_devices, CaptureEngine, InputDeviceInfo};
