// vm-sample - Bytecode VM Sample Payload
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

mod host;
mod metrics;
mod size_limited_writer;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

use host::ConsoleHost;
use metrics::{HostMetrics, MetricsReport};
use vm_sample_abi::{Module, VmArgs};
use vm_sample_config::{load_run_script, parse_size, RunAssertion, DEFAULT_MAX_OUTPUT_BYTES};
use vm_sample_payload::SampleModule;

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

fn parse_i32_arg(s: &str) -> Result<i32, String> {
    let trimmed = s.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        // Hex values are taken as raw 32-bit patterns, so 0xFFFFFFFF is -1.
        let raw = u32::from_str_radix(hex, 16)
            .map_err(|e| format!("Invalid hex value '{}': {}", s, e))?;
        let value = raw as i32;
        Ok(if negative { value.wrapping_neg() } else { value })
    } else {
        i32::from_str(trimmed).map_err(|e| format!("Invalid integer '{}': {}", s, e))
    }
}

fn resolve_output_limit(flag: Option<&str>) -> anyhow::Result<u64> {
    let Some(size) = flag else {
        return Ok(DEFAULT_MAX_OUTPUT_BYTES);
    };
    let limit =
        parse_size(size).with_context(|| format!("Invalid --max-output-bytes {:?}", size))?;
    if limit == 0 {
        anyhow::bail!("--max-output-bytes must be greater than zero");
    }
    Ok(limit)
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Host harness for the vm-sample payload",
    long_about = None
)]
struct Cli {
    /// Command code passed to vm_main
    #[arg(long, default_value = "0", value_parser = parse_i32_arg, allow_hyphen_values = true)]
    command: i32,

    /// Entry argument (repeatable, at most 12). Decimal or 0x hex.
    #[arg(short, long = "arg", value_parser = parse_i32_arg, allow_hyphen_values = true)]
    args: Vec<i32>,

    /// Maximum captured trap output, e.g. "4KB"
    #[arg(long)]
    max_output_bytes: Option<String>,

    /// Print a JSON run report on stdout after the payload returns
    #[arg(long)]
    json: bool,

    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command_mode: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deterministic, CI-friendly runner mode driven by a run script (YAML).
    Test(TestArgs),
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the run script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Directory to write test artifacts (result.json, output.log)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Do not echo payload output to stdout (still captured for assertions)
    #[arg(long)]
    no_stdout: bool,
}

#[derive(Debug, Serialize)]
struct RunReport {
    result_schema_version: String,
    status: String,
    module: String,
    vm_args: Option<VmArgs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_value: Option<i32>,
    output: String,
    output_truncated: bool,
    output_dropped_bytes: u64,
    metrics: MetricsReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    assertions: Vec<AssertionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    script: Option<PathBuf>,
}

#[derive(Debug, Serialize, Clone)]
struct AssertionResult {
    assertion: RunAssertion,
    description: String,
    passed: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only payload output and reports.
    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command_mode {
        Some(Commands::Test(ref args)) => run_test(args),
        None => run_once(&cli),
    }
}

fn run_once(cli: &Cli) -> ExitCode {
    let vm_args = match VmArgs::from_slice(cli.command, &cli.args) {
        Ok(a) => a,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let max_output_bytes = match resolve_output_limit(cli.max_output_bytes.as_deref()) {
        Ok(n) => n,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let metrics = Arc::new(HostMetrics::new());
    let mut host = ConsoleHost::new(true, max_output_bytes, Arc::clone(&metrics));
    let mut module = SampleModule::new();

    let result = host::invoke(&mut module, &mut host, &vm_args, &metrics);

    let (status, return_value, message, code) = match result {
        Ok(0) => ("pass", Some(0), None, EXIT_PASS),
        Ok(ret) => {
            error!("vm_main returned {}, expected 0", ret);
            ("fail", Some(ret), None, EXIT_ASSERT_FAIL)
        }
        Err(e) => {
            error!("{}", e);
            ("error", None, Some(e.to_string()), EXIT_RUNTIME_ERROR)
        }
    };

    if cli.json {
        let report = RunReport {
            result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
            status: status.to_string(),
            module: module.name().to_string(),
            vm_args: Some(vm_args),
            return_value,
            output: host.output_lossy(),
            output_truncated: host.output_truncated(),
            output_dropped_bytes: host.output_dropped(),
            metrics: metrics.report(),
            message,
            assertions: Vec::new(),
            script: None,
        };
        match serde_json::to_string(&report) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize run report: {}", e),
        }
    }

    ExitCode::from(code)
}

fn run_test(args: &TestArgs) -> ExitCode {
    let module_name = SampleModule::NAME.to_string();

    let script = match load_run_script(&args.script) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!("{}", msg);
            write_config_error_outputs(args, &module_name, msg);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let (vm_args, max_output_bytes) =
        match (script.entry.to_vm_args(), script.limits.output_limit()) {
            (Ok(a), Ok(limit)) => (a, limit),
            (Err(e), _) | (_, Err(e)) => {
                let msg = format!("{:#}", e);
                error!("{}", msg);
                write_config_error_outputs(args, &module_name, msg);
                return ExitCode::from(EXIT_CONFIG_ERROR);
            }
        };

    info!(
        "Running {} with {} assertion(s) from {:?}",
        module_name,
        script.assertions.len(),
        args.script
    );

    let metrics = Arc::new(HostMetrics::new());
    let mut host = ConsoleHost::new(!args.no_stdout, max_output_bytes, Arc::clone(&metrics));
    let mut module = SampleModule::new();

    let returned = match host::invoke(&mut module, &mut host, &vm_args, &metrics) {
        Ok(ret) => ret,
        Err(e) => {
            let msg = e.to_string();
            error!("{}", msg);
            let report = RunReport {
                result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
                status: "error".to_string(),
                module: module_name,
                vm_args: Some(vm_args),
                return_value: None,
                output: host.output_lossy(),
                output_truncated: host.output_truncated(),
                output_dropped_bytes: host.output_dropped(),
                metrics: metrics.report(),
                message: Some(msg),
                assertions: Vec::new(),
                script: Some(args.script.clone()),
            };
            write_outputs(args, &report, host.output());
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    let output = host.output_lossy();
    let results: Vec<AssertionResult> = script
        .assertions
        .iter()
        .map(|a| {
            let passed = a.check(returned, &output);
            let description = a.describe();
            if passed {
                info!("Assertion passed: {}", description);
            } else {
                error!("Assertion failed: {}", description);
            }
            AssertionResult {
                assertion: a.clone(),
                description,
                passed,
            }
        })
        .collect();

    let all_passed = results.iter().all(|r| r.passed);
    let report = RunReport {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: if all_passed { "pass" } else { "fail" }.to_string(),
        module: module_name,
        vm_args: Some(vm_args),
        return_value: Some(returned),
        output,
        output_truncated: host.output_truncated(),
        output_dropped_bytes: host.output_dropped(),
        metrics: metrics.report(),
        message: None,
        assertions: results,
        script: Some(args.script.clone()),
    };
    write_outputs(args, &report, host.output());

    if all_passed {
        ExitCode::from(EXIT_PASS)
    } else {
        ExitCode::from(EXIT_ASSERT_FAIL)
    }
}

fn write_config_error_outputs(args: &TestArgs, module_name: &str, message: String) {
    let report = RunReport {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: "config_error".to_string(),
        module: module_name.to_string(),
        vm_args: None,
        return_value: None,
        output: String::new(),
        output_truncated: false,
        output_dropped_bytes: 0,
        metrics: HostMetrics::new().report(),
        message: Some(message),
        assertions: Vec::new(),
        script: Some(args.script.clone()),
    };
    write_outputs(args, &report, &[]);
}

fn write_outputs(args: &TestArgs, report: &RunReport, output: &[u8]) {
    let Some(output_dir) = &args.output_dir else {
        return;
    };

    if let Err(e) = std::fs::create_dir_all(output_dir) {
        error!("Failed to create output directory {:?}: {}", output_dir, e);
        return;
    }

    write_json(&output_dir.join("result.json"), report);

    let log_path = output_dir.join("output.log");
    if let Err(e) = std::fs::write(&log_path, output) {
        error!("Failed to write {:?}: {}", log_path, e);
    }
}

fn write_json(path: &Path, report: &RunReport) {
    match std::fs::File::create(path) {
        Ok(f) => {
            if let Err(e) = serde_json::to_writer_pretty(f, report) {
                error!("Failed to write {:?}: {}", path, e);
            }
        }
        Err(e) => error!("Failed to create {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_i32_arg() {
        assert_eq!(parse_i32_arg("42"), Ok(42));
        assert_eq!(parse_i32_arg(" -7 "), Ok(-7));
        assert_eq!(parse_i32_arg("0x10"), Ok(16));
        assert_eq!(parse_i32_arg("0XfF"), Ok(255));
        assert_eq!(parse_i32_arg("0xFFFFFFFF"), Ok(-1));
        assert_eq!(parse_i32_arg("-0x10"), Ok(-16));
        assert!(parse_i32_arg("0x1_0000_0000").is_err());
        assert!(parse_i32_arg("ten").is_err());
    }

    #[test]
    fn test_resolve_output_limit() {
        assert_eq!(resolve_output_limit(None).unwrap(), DEFAULT_MAX_OUTPUT_BYTES);
        assert_eq!(resolve_output_limit(Some("5B")).unwrap(), 5);
        assert!(resolve_output_limit(Some("0B")).is_err());
        let err = resolve_output_limit(Some("huge")).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid --max-output-bytes"));
    }

    #[test]
    fn test_cli_parses_entry_args() {
        let cli = Cli::try_parse_from([
            "vm-sample", "--command", "3", "--arg", "1", "-a", "0x20", "--arg", "-5",
        ])
        .unwrap();
        assert_eq!(cli.command, 3);
        assert_eq!(cli.args, vec![1, 32, -5]);
        assert!(cli.command_mode.is_none());
    }

    #[test]
    fn test_cli_parses_test_mode() {
        let cli = Cli::try_parse_from([
            "vm-sample",
            "test",
            "--script",
            "run.yaml",
            "--no-stdout",
        ])
        .unwrap();
        match cli.command_mode {
            Some(Commands::Test(args)) => {
                assert_eq!(args.script, PathBuf::from("run.yaml"));
                assert!(args.no_stdout);
                assert!(args.output_dir.is_none());
            }
            other => panic!("unexpected mode: {:?}", other),
        }
    }
}
