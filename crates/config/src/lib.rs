// vm-sample - Bytecode VM Sample Payload
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vm_sample_abi::{VmArgs, VM_ARG_COUNT};

pub const SCHEMA_VERSION: &str = "1.0";

/// Default cap on captured trap output when a script sets none.
pub const DEFAULT_MAX_OUTPUT_BYTES: u64 = 64 * 1024;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EntryInputs {
    #[serde(default)]
    pub command: i32,
    #[serde(default)]
    pub args: Vec<i32>,
}

impl EntryInputs {
    pub fn to_vm_args(&self) -> Result<VmArgs> {
        Ok(VmArgs::from_slice(self.command, &self.args)?)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct RunLimits {
    /// Human-readable size, e.g. "1KB".
    #[serde(default)]
    pub max_output_bytes: Option<String>,
}

impl RunLimits {
    pub fn output_limit(&self) -> Result<u64> {
        match &self.max_output_bytes {
            Some(s) => {
                parse_size(s).with_context(|| format!("Invalid limit 'max_output_bytes': {s:?}"))
            }
            None => Ok(DEFAULT_MAX_OUTPUT_BYTES),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExpectedReturnAssertion {
    pub expected_return: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputContainsAssertion {
    pub output_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputEqualsAssertion {
    pub output_equals: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum RunAssertion {
    ExpectedReturn(ExpectedReturnAssertion),
    OutputContains(OutputContainsAssertion),
    OutputEquals(OutputEqualsAssertion),
}

impl RunAssertion {
    /// Checks the assertion against the entry return value and the captured
    /// trap output.
    pub fn check(&self, returned: i32, output: &str) -> bool {
        match self {
            RunAssertion::ExpectedReturn(a) => a.expected_return == returned,
            RunAssertion::OutputContains(a) => output.contains(&a.output_contains),
            RunAssertion::OutputEquals(a) => output == a.output_equals,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RunAssertion::ExpectedReturn(a) => format!("expected_return == {}", a.expected_return),
            RunAssertion::OutputContains(a) => format!("output contains {:?}", a.output_contains),
            RunAssertion::OutputEquals(a) => format!("output equals {:?}", a.output_equals),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunScript {
    pub schema_version: String,
    #[serde(default)]
    pub entry: EntryInputs,
    #[serde(default)]
    pub limits: RunLimits,
    #[serde(default)]
    pub assertions: Vec<RunAssertion>,
}

impl RunScript {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: Self = serde_yaml::from_str(yaml).context("Failed to parse Run Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SCHEMA_VERSION
            );
        }

        if self.entry.args.len() > VM_ARG_COUNT {
            anyhow::bail!(
                "Entry 'args' has {} values; vm_main takes at most {}",
                self.entry.args.len(),
                VM_ARG_COUNT
            );
        }

        if self.limits.output_limit()? == 0 {
            anyhow::bail!("Limit 'max_output_bytes' must be greater than zero");
        }

        if self.assertions.is_empty() {
            tracing::warn!("Run script has no assertions; the run always passes");
        }

        Ok(())
    }
}

/// Load a run script from YAML and validate it.
pub fn load_run_script<P: AsRef<Path>>(path: P) -> Result<RunScript> {
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read run script at {:?}", path.as_ref()))?;
    RunScript::from_yaml(&contents)
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
entry:
  command: 3
  args: [1, 2, 3]
limits:
  max_output_bytes: "512B"
assertions:
  - expected_return: 0
  - output_contains: "Hello"
  - output_equals: "Hello World\n"
"#;
        let script = RunScript::from_yaml(yaml).unwrap();
        assert_eq!(script.entry.command, 3);
        assert_eq!(script.entry.args, vec![1, 2, 3]);
        assert_eq!(script.limits.output_limit().unwrap(), 512);
        assert_eq!(script.assertions.len(), 3);
        assert!(matches!(
            script.assertions[0],
            RunAssertion::ExpectedReturn(ExpectedReturnAssertion { expected_return: 0 })
        ));
        assert!(matches!(script.assertions[2], RunAssertion::OutputEquals(_)));
    }

    #[test]
    fn test_minimal_script_uses_defaults() {
        let script = RunScript::from_yaml("schema_version: \"1.0\"\n").unwrap();
        assert_eq!(script.entry, EntryInputs::default());
        assert_eq!(script.limits.output_limit().unwrap(), DEFAULT_MAX_OUTPUT_BYTES);
        assert!(script.assertions.is_empty());
    }

    #[test]
    fn test_invalid_version() {
        let err = RunScript::from_yaml("schema_version: \"2.0\"\n").unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }

    #[test]
    fn test_too_many_args() {
        let yaml = r#"
schema_version: "1.0"
entry:
  args: [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]
"#;
        let err = RunScript::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("at most 12"));
    }

    #[test]
    fn test_zero_output_limit() {
        let yaml = r#"
schema_version: "1.0"
limits:
  max_output_bytes: "0B"
"#;
        let err = RunScript::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("max_output_bytes"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
schema_version: "1.0"
module: "g_main.qvm"
"#;
        assert!(RunScript::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_assertion_check() {
        let ret = RunAssertion::ExpectedReturn(ExpectedReturnAssertion { expected_return: 0 });
        assert!(ret.check(0, ""));
        assert!(!ret.check(1, ""));

        let contains = RunAssertion::OutputContains(OutputContainsAssertion {
            output_contains: "World".to_string(),
        });
        assert!(contains.check(0, "Hello World\n"));
        assert!(!contains.check(0, "Hello\n"));

        let equals = RunAssertion::OutputEquals(OutputEqualsAssertion {
            output_equals: "Hello World\n".to_string(),
        });
        assert!(equals.check(0, "Hello World\n"));
        assert!(!equals.check(0, "Hello World"));
    }

    #[test]
    fn test_to_vm_args_pads() {
        let inputs = EntryInputs {
            command: 9,
            args: vec![5],
        };
        let args = inputs.to_vm_args().unwrap();
        assert_eq!(args.command, 9);
        assert_eq!(args.args[0], 5);
        assert_eq!(args.args[11], 0);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("12B").unwrap(), 12);
        assert!(parse_size("4KB").unwrap() >= 4000);
        assert!(parse_size("lots").is_err());
    }
}
