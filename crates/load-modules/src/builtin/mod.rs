//! Load modules shipped with loadeval.

mod command;
mod cpuspin;

pub use command::CommandLoad;
pub use cpuspin::CpuSpin;

use crate::registry::ModuleRegistry;

/// Register every built-in module under its canonical name.
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(
        "command",
        "Run an arbitrary program as N restarting child processes",
        CommandLoad::from_params,
    );
    registry.register(
        "hackbench",
        "Scheduler load via hackbench process groups",
        CommandLoad::hackbench,
    );
    registry.register(
        "stressng",
        "Run one stress-ng stressor",
        CommandLoad::stressng,
    );
    registry.register(
        "cpuspin",
        "In-process busy loops, one per core",
        CpuSpin::from_params,
    );
}
