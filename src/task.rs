//! Implements task handling support.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use crate::infra::watchdog::reboot_normal;

// Threading and tasks model
//
// Everything runs on core 0.  The executor runs three tasks:
// - the transfer task, which runs the TransferController, refilling and
//   draining the double buffer and following the handshake signals
// - the status display task, which drives the LED
// - the watchdog task
//
// The bit clock itself runs in the PWM wrap interrupt, at the highest
// priority, so it preempts all of the above.  It shares only atomics with
// the transfer task.

/// Method to spawn tasks.
///
/// Using the Spawner object to spawn can fail, because too many instances of
/// that task are already running.  By default only 1 is allowed at once.
///
/// We handle that by rebooting - but it shouldn't happen if tasks are only
/// spawned at start of day.
///
/// Example:
/// ```ignore
/// spawn_or_reboot(spawner.spawn(my_task()), "my_task");
/// ```
pub fn spawn_or_reboot<T, E: defmt::Format>(spawn_result: Result<T, E>, task_name: &str) {
    match spawn_result {
        Ok(_) => debug!("Spawned task {}", task_name),
        Err(e) => {
            error!("Failed to spawn task: {}, error: {}", task_name, e);
            reboot_normal();
        }
    }
}
