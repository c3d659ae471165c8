// vm-sample - Bytecode VM Sample Payload
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// Number of integer arguments passed alongside the command code.
pub const VM_ARG_COUNT: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("Too many entry arguments: got {got}, the entry routine takes at most {}", VM_ARG_COUNT)]
    TooManyArgs { got: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum TrapError {
    #[error("trap_print failed: {0}")]
    Print(#[from] std::io::Error),
    #[error("Host rejected trap {name}: {reason}")]
    Rejected { name: &'static str, reason: String },
}

pub type TrapResult<T> = Result<T, TrapError>;

/// The values a host passes into the entry routine: one command selector and
/// twelve opaque integers whose meaning is defined by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VmArgs {
    pub command: i32,
    pub args: [i32; VM_ARG_COUNT],
}

impl VmArgs {
    pub fn new(command: i32, args: [i32; VM_ARG_COUNT]) -> Self {
        Self { command, args }
    }

    /// Builds the argument block from a partial list. Missing trailing
    /// arguments are zero.
    pub fn from_slice(command: i32, args: &[i32]) -> Result<Self, AbiError> {
        if args.len() > VM_ARG_COUNT {
            return Err(AbiError::TooManyArgs { got: args.len() });
        }
        let mut block = [0; VM_ARG_COUNT];
        block[..args.len()].copy_from_slice(args);
        Ok(Self::new(command, block))
    }

    pub fn arg(&self, index: usize) -> Option<i32> {
        self.args.get(index).copied()
    }
}

/// Host-provided trap functions a payload may call out to.
pub trait Syscalls {
    /// Emits already rendered text. The bytes never contain format directives
    /// meant for the host to expand.
    fn trap_print(&mut self, text: &[u8]) -> TrapResult<()>;
}

/// A payload loaded into a host. `vm_main` is the only way control passes
/// into the module.
pub trait Module {
    fn name(&self) -> &str;
    fn vm_main(&mut self, host: &mut dyn Syscalls, args: &VmArgs) -> TrapResult<i32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_pads_with_zero() {
        let args = VmArgs::from_slice(7, &[1, 2, 3]).unwrap();
        assert_eq!(args.command, 7);
        assert_eq!(&args.args[..3], &[1, 2, 3]);
        assert!(args.args[3..].iter().all(|&a| a == 0));
    }

    #[test]
    fn test_from_slice_accepts_full_block() {
        let full: Vec<i32> = (0..VM_ARG_COUNT as i32).collect();
        let args = VmArgs::from_slice(0, &full).unwrap();
        assert_eq!(args.arg(11), Some(11));
        assert_eq!(args.arg(12), None);
    }

    #[test]
    fn test_from_slice_rejects_thirteen_args() {
        let err = VmArgs::from_slice(0, &[0; VM_ARG_COUNT + 1]).unwrap_err();
        assert_eq!(err, AbiError::TooManyArgs { got: 13 });
        assert!(err.to_string().contains("at most 12"));
    }

    #[test]
    fn test_trap_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: TrapError = io.into();
        assert!(err.to_string().starts_with("trap_print failed"));
    }
}
