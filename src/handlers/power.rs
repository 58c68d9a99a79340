//! Power management commands. Neither sends a response.

use crate::handlers::{HandlerContext, Reply};
use crate::protocol::Frame;
use crate::stack::PowerLock;

/// `0xD7`: hold a power lock.
///
/// `lockType | timeout (u32 BE, ms) | wakeupTimeout (u32 BE, ms)`. The
/// wake-up timer is armed only when both timeouts are non-zero.
pub fn stay_awake(frame: &Frame, ctx: &mut HandlerContext<'_>) -> Reply {
    let payload = frame.payload();
    if payload.len() < 9 {
        tracing::warn!("stay awake request too short: {} bytes", payload.len());
        return Reply::None;
    }

    let timeout = u32::from_be_bytes([payload[1], payload[2], payload[3], payload[4]]);
    let wakeup = u32::from_be_bytes([payload[5], payload[6], payload[7], payload[8]]);

    let stack = &mut ctx.device.stack;
    match PowerLock::from_byte(payload[0]) {
        Some(lock) => {
            tracing::debug!("power lock {:?} for {} ms", lock, timeout);
            stack.power_lock(lock, timeout);
        }
        None => tracing::debug!("unknown power lock type {}", payload[0]),
    }

    if timeout != 0 && wakeup != 0 {
        stack.start_wakeup_timer(wakeup);
    }
    Reply::None
}

/// `0xD8`: release a power lock.
pub fn cancel(frame: &Frame, ctx: &mut HandlerContext<'_>) -> Reply {
    let Some(&kind) = frame.payload().first() else {
        tracing::warn!("power cancel request without lock type");
        return Reply::None;
    };

    if let Some(lock) = PowerLock::from_byte(kind) {
        tracing::debug!("cancel power lock {:?}", lock);
        ctx.device.stack.power_cancel(lock);
    }
    Reply::None
}
