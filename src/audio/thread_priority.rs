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

use std::sync::atomic::{AtomicU8, Ordering};

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{debug, info, warn};

/// Default priority for the audio callback thread when GRIDBEAT_THREAD_PRIORITY is unset.
const DEFAULT_CALLBACK_THREAD_PRIORITY: u8 = 70;

const STATUS_PENDING: u8 = 0;
const STATUS_PRIORITY_SET: u8 = 1;
const STATUS_PRIORITY_FAILED: u8 = 2;
const STATUS_RT_ENABLED: u8 = 3;
const STATUS_RT_FAILED: u8 = 4;
const STATUS_REPORTED: u8 = 5;

/// Outcome of the callback thread's priority change. The callback only stores it;
/// it is logged later from a non-real-time thread.
static PRIORITY_STATUS: AtomicU8 = AtomicU8::new(STATUS_PENDING);

/// Reads GRIDBEAT_THREAD_PRIORITY (0-99) once, before the stream is built, so the
/// callback never touches the environment.
pub fn callback_thread_priority() -> Option<ThreadPriorityValue> {
    let priority = std::env::var("GRIDBEAT_THREAD_PRIORITY")
        .ok()
        .and_then(|value| parse_priority(&value))
        .unwrap_or(DEFAULT_CALLBACK_THREAD_PRIORITY);
    ThreadPriorityValue::try_from(priority).ok()
}

fn parse_priority(value: &str) -> Option<u8> {
    value.trim().parse::<u8>().ok().filter(|n| *n < 100)
}

fn parse_flag(value: &str) -> bool {
    value == "1"
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("on")
}

/// Returns whether we should attempt RT (SCHED_FIFO) scheduling for the audio callback thread.
/// Default: enabled. Opt out with GRIDBEAT_DISABLE_RT_AUDIO=1.
pub fn rt_audio_enabled() -> bool {
    !std::env::var("GRIDBEAT_DISABLE_RT_AUDIO")
        .map(|value| parse_flag(&value))
        .unwrap_or(false)
}

/// Raises the priority of the calling thread the first time it is called.
pub fn configure_audio_thread_priority(
    priority: Option<ThreadPriorityValue>,
    rt_audio: bool,
    priority_set: &mut bool,
) {
    if *priority_set {
        return;
    }
    *priority_set = true;
    let Some(priority) = priority else {
        return;
    };
    let priority = ThreadPriority::Crossplatform(priority);
    let mut status = match set_current_thread_priority(priority) {
        Ok(()) => STATUS_PRIORITY_SET,
        Err(_) => STATUS_PRIORITY_FAILED,
    };

    #[cfg(unix)]
    if rt_audio {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        status = match set_thread_priority_and_policy(
            thread_native_id(),
            priority,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => STATUS_RT_ENABLED,
            Err(_) => STATUS_RT_FAILED,
        };
    }
    #[cfg(not(unix))]
    let _ = rt_audio;

    PRIORITY_STATUS.store(status, Ordering::Release);
}

/// Logs the outcome of the callback thread's priority change once it is known.
/// Returns true if something was logged.
pub fn report_thread_priority() -> bool {
    report_status(&PRIORITY_STATUS)
}

fn report_status(status: &AtomicU8) -> bool {
    let current = status.load(Ordering::Acquire);
    if current == STATUS_PENDING || current == STATUS_REPORTED {
        return false;
    }
    if status
        .compare_exchange(current, STATUS_REPORTED, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return false;
    }

    match current {
        STATUS_PRIORITY_SET => debug!("Raised audio callback thread priority"),
        STATUS_PRIORITY_FAILED => warn!("Failed to raise audio callback thread priority"),
        STATUS_RT_ENABLED => info!("Enabled RT SCHED_FIFO for audio callback thread"),
        _ => warn!("Failed to set RT SCHED_FIFO for audio callback thread"),
    }
    true
}
