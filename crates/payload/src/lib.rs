// vm-sample - Bytecode VM Sample Payload
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod checksum;
pub mod print;
pub mod spin;

use tracing::{debug, trace};
use vm_sample_abi::{Module, Syscalls, TrapResult, VmArgs};

pub use checksum::test_case;
pub use print::{printf, Arg, PrintBuffer, PRINT_BUFFER_SIZE};
pub use spin::{spin, SPIN_ITERATIONS, SPIN_STEP};

/// Used both as the greeting format and as the checksum input.
pub const GREETING_FORMAT: &str = "Hello %s\n";
pub const GREETING_SUBJECT: &str = "World";

/// Character sum of `GREETING_FORMAT`; a correct build returns zero.
pub const CHECKSUM_BIAS: i32 = 694;

/// Entry routine. The command code and arguments are accepted for ABI
/// compatibility and otherwise ignored.
pub fn vm_main(host: &mut dyn Syscalls, args: &VmArgs) -> TrapResult<i32> {
    debug!(command = args.command, "vm_main");

    printf(host, GREETING_FORMAT, &[Arg::Str(GREETING_SUBJECT)])?;

    let steps = spin(SPIN_ITERATIONS);
    trace!(steps, "busy loop done");

    Ok(test_case(GREETING_FORMAT.as_bytes()).wrapping_sub(CHECKSUM_BIAS))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SampleModule;

impl SampleModule {
    pub const NAME: &'static str = "g_main";

    pub fn new() -> Self {
        Self
    }
}

impl Module for SampleModule {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn vm_main(&mut self, host: &mut dyn Syscalls, args: &VmArgs) -> TrapResult<i32> {
        vm_main(host, args)
    }
}
