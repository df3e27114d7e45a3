//! Active diagnostics for the Docker daemon and configuration.

use crate::config::Config;
use crate::runtime::{DockerRuntime, RuntimeError};

/// Run diagnostics and print a report. Fails when any check fails.
pub async fn run_doctor_command() -> anyhow::Result<()> {
    println!("dropdock doctor");
    println!("{}", "-".repeat(40));

    let config = match Config::from_env() {
        Ok(config) => {
            report(true, "configuration", "valid");
            config
        }
        Err(e) => {
            report(false, "configuration", &e.to_string());
            anyhow::bail!("1 check failed");
        }
    };

    report(
        true,
        "storage",
        &format!(
            "{} ({})",
            config.storage.backend,
            config.storage.data_dir.display()
        ),
    );

    let pinged = match DockerRuntime::connect(&config.docker).await {
        Ok(runtime) => runtime.ping().await,
        Err(e) => Err(e),
    };
    match pinged {
        Ok(()) => report(true, "docker", "daemon reachable"),
        Err(e) => {
            report(false, "docker", &e.to_string());
            println!("    {}", docker_hint(&e));
            anyhow::bail!("1 check failed");
        }
    }

    Ok(())
}

/// What to try next when the daemon did not answer.
fn docker_hint(err: &RuntimeError) -> &'static str {
    match err.code() {
        Some("ENOENT") => {
            "No Docker socket found. Install Docker, or set DROPDOCK_DOCKER_SOCKET / DOCKER_HOST."
        }
        Some("ECONNREFUSED") | Some("EACCES") => {
            "Docker is installed but not answering. Start the daemon and check socket permissions."
        }
        _ => "Check DROPDOCK_DOCKER_SOCKET / DOCKER_HOST and that the daemon is running.",
    }
}

fn report(ok: bool, name: &str, detail: &str) {
    let mark = if ok { "ok" } else { "FAIL" };
    println!("  [{:<4}] {:<14} {}", mark, name, detail);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connectivity(code: &str) -> RuntimeError {
        RuntimeError::Connectivity {
            code: code.to_string(),
            syscall: "connect".to_string(),
            message: format!("connect {}", code),
        }
    }

    #[test]
    fn test_hint_for_missing_socket() {
        assert!(docker_hint(&connectivity("ENOENT")).contains("Install Docker"));
    }

    #[test]
    fn test_hint_for_refused_socket() {
        assert!(docker_hint(&connectivity("ECONNREFUSED")).contains("Start the daemon"));
    }

    #[test]
    fn test_hint_for_remote_error() {
        let err = RuntimeError::Remote {
            status: Some(500),
            message: "boom".to_string(),
        };
        assert!(docker_hint(&err).contains("DOCKER_HOST"));
    }
}
