/// Polls until `condition` returns `true`, giving up after `polls` attempts.
///
/// Used where the vendor HAL applies a timeout and the caller has a distinct error to report.
#[inline]
pub(crate) fn poll_until<F>(mut condition: F, polls: u32) -> Result<(), ()>
where
    F: FnMut() -> bool,
{
    for _ in 0..polls {
        if condition() {
            return Ok(());
        }
        core::hint::spin_loop();
    }

    if condition() {
        Ok(())
    } else {
        Err(())
    }
}

/// Busy-waits until `condition` returns `true`.
///
/// There is no timeout: a flag that never flips hangs the calling core. Only used for
/// handshakes that have no recovery path, inside the standby procedures.
#[inline]
pub(crate) fn spin_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    while !condition() {
        core::hint::spin_loop();
    }
}
