// vm-sample - Bytecode VM Sample Payload
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};
use vm_sample_abi::{Module, Syscalls, TrapResult, VmArgs};

use crate::metrics::HostMetrics;
use crate::size_limited_writer::SizeLimitedWriter;

/// Host side of the trap table. Captures everything the payload prints, up to
/// a byte cap, and optionally echoes it to stdout.
pub struct ConsoleHost {
    echo: bool,
    capture: SizeLimitedWriter<Vec<u8>>,
    metrics: Arc<HostMetrics>,
}

impl ConsoleHost {
    pub fn new(echo: bool, max_output_bytes: u64, metrics: Arc<HostMetrics>) -> Self {
        Self {
            echo,
            capture: SizeLimitedWriter::new(Vec::new(), max_output_bytes),
            metrics,
        }
    }

    pub fn output(&self) -> &[u8] {
        self.capture.get_ref()
    }

    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(self.output()).into_owned()
    }

    pub fn output_truncated(&self) -> bool {
        self.capture.limit_exceeded()
    }

    pub fn output_dropped(&self) -> u64 {
        self.capture.bytes_dropped()
    }
}

impl Syscalls for ConsoleHost {
    fn trap_print(&mut self, text: &[u8]) -> TrapResult<()> {
        self.metrics.on_trap(text.len());
        self.capture.write_all(text)?;
        debug!(
            bytes = text.len(),
            captured = self.capture.bytes_written(),
            "trap_print"
        );

        if self.echo {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text)?;
            stdout.flush()?;
        }
        Ok(())
    }
}

/// Calls into the module once and records how long the entry routine ran.
pub fn invoke(
    module: &mut dyn Module,
    host: &mut dyn Syscalls,
    args: &VmArgs,
    metrics: &HostMetrics,
) -> TrapResult<i32> {
    info!("Calling {}::vm_main (command {})", module.name(), args.command);
    let start = Instant::now();
    let result = module.vm_main(host, args);
    metrics.on_entry_finished(start.elapsed());

    if let Ok(ret) = &result {
        info!("vm_main returned {}", ret);
    }
    result
}
