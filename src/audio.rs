// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Audio output. The engine is moved onto the device's callback thread and
//! renders every buffer the device asks for.

use std::error::Error;

mod cpal;
mod thread_priority;

pub use self::cpal::{Device, OutputStream};
pub use self::thread_priority::report_thread_priority;

/// Lists the output devices of every available host.
pub fn list_devices() -> Result<Vec<Device>, Box<dyn Error>> {
    Device::list()
}

/// Gets the named output device, or the default output device if no name is given.
pub fn get_device(name: Option<&str>) -> Result<Device, Box<dyn Error>> {
    match name {
        Some(name) => Device::get(name),
        None => Device::default_output(),
    }
}
