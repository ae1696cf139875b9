//! Command execution utilities

use crate::error::{ProfileError, Result};
use std::process::Command;

/// Execute a command and return stdout as a trimmed String.
pub fn run_command(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program).args(args).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(ProfileError::Detection(format!(
            "command '{}' failed with exit code: {:?}",
            program,
            output.status.code()
        )))
    }
}

/// Check if a command exists in PATH.
pub fn command_exists(program: &str) -> bool {
    use std::env;

    if let Ok(path) = env::var("PATH") {
        for dir in path.split(':') {
            let full_path = std::path::Path::new(dir).join(program);
            if full_path.exists() && full_path.is_file() {
                return true;
            }
        }
    }
    false
}

/// Run a guarded command, mapping any failure to None.
pub fn run_if_present(program: &str, args: &[&str]) -> Option<String> {
    if !command_exists(program) {
        return None;
    }
    match run_command(program, args) {
        Ok(out) => Some(out),
        Err(err) => {
            tracing::debug!(%program, %err, "command probe failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonzero_exit_maps_to_detection() {
        match run_command("false", &[]) {
            Err(ProfileError::Detection(_)) => {}
            other => panic!("expected detection error, got {other:?}"),
        }
    }

    #[test]
    fn missing_program_maps_to_io() {
        match run_command("benchprof-no-such-tool", &[]) {
            Err(ProfileError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_guarded_to_none() {
        assert_eq!(run_if_present("benchprof-no-such-tool", &[]), None);
    }
}
