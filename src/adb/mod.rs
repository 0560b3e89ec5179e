//! ADB (Android Debug Bridge) adapter implementing the device traits.

mod command;
mod device;
mod input;
mod packages;
mod screenshot;

pub use command::{AdbCommand, DeviceEntry};
pub use device::{parse_wm_size, AdbDevice};
pub use packages::{label_for_package, parse_package_list};
pub use screenshot::classify_screencap;
