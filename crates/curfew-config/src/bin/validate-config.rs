//! Config validation CLI tool
//!
//! Validates a curfew configuration file and reports any errors.

use curfew_config::ConfigError;
use curfew_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a curfew configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match curfew_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", curfew_config::CURRENT_CONFIG_VERSION);
            println!(
                "  Blocking period: {}{}",
                policy.schedule,
                if policy.schedule.wraps_midnight() { " (wraps midnight)" } else { "" }
            );
            println!("  Data directory: {}", policy.service.data_dir.display());
            println!("  Hosts file: {}", policy.service.hosts_file.display());
            println!(
                "  Process sweep: every {}",
                format_duration(policy.enforcement.sweep_interval)
            );
            println!(
                "  Unblock: {} attempt(s) per hour, {} to answer",
                policy.unblock.max_attempts_per_hour,
                format_duration(policy.unblock.challenge_timeout)
            );
            if policy.resolver.flush_command.is_empty() {
                println!("  Resolver flush: disabled");
            } else {
                println!("  Resolver flush: {}", policy.resolver.flush_command.join(" "));
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        curfew_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
