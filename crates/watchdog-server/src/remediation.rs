//! Starts the standby backup instance through the AWS CLI.

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::info;
use watchdog::sinks::Remediation;

/// Runs `aws ec2 start-instances` for the configured backup instance.
///
/// The CLI is killed if it outlives `timeout`.
pub struct AwsCliRemediation {
    aws_cli: String,
    instance_id: Option<String>,
    region: Option<String>,
    timeout: Duration,
}

impl AwsCliRemediation {
    pub fn new(
        aws_cli: impl Into<String>,
        instance_id: Option<String>,
        region: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            aws_cli: aws_cli.into(),
            instance_id,
            region,
            timeout,
        }
    }

    /// Arguments passed to the CLI
    pub fn command_args(&self, instance_id: &str) -> Vec<String> {
        let mut args = vec![
            "ec2".to_string(),
            "start-instances".to_string(),
            "--instance-ids".to_string(),
            instance_id.to_string(),
        ];
        if let Some(region) = &self.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        args
    }
}

#[async_trait]
impl Remediation for AwsCliRemediation {
    async fn start_backup(&self) -> common::Result<String> {
        let instance_id = self
            .instance_id
            .as_deref()
            .ok_or_else(|| common::Error::remediation("no backup instance id configured"))?;

        info!(instance = instance_id, "Starting backup instance");
        let run = Command::new(&self.aws_cli)
            .args(self.command_args(instance_id))
            .kill_on_drop(true)
            .output();
        let output = timeout(self.timeout, run)
            .await
            .map_err(|_| {
                common::Error::remediation(format!(
                    "{} timed out after {:?}",
                    self.aws_cli, self.timeout
                ))
            })?
            .map_err(|e| common::Error::remediation(format!("failed to run {}: {}", self.aws_cli, e)))?;

        if output.status.success() {
            Ok(instance_id.to_string())
        } else {
            Err(common::Error::remediation(
                String::from_utf8_lossy(&output.stderr).trim(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_secs(10);

    #[test]
    fn test_command_args() {
        let remediation = AwsCliRemediation::new("aws", Some("i-0abc".to_string()), None, LIMIT);
        assert_eq!(
            remediation.command_args("i-0abc"),
            vec!["ec2", "start-instances", "--instance-ids", "i-0abc"]
        );

        let remediation =
            AwsCliRemediation::new("aws", Some("i-0abc".to_string()), Some("eu-west-1".to_string()), LIMIT);
        assert_eq!(
            remediation.command_args("i-0abc")[4..],
            ["--region".to_string(), "eu-west-1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_instance_id_is_error() {
        let remediation = AwsCliRemediation::new("aws", None, None, LIMIT);
        let err = remediation.start_backup().await.unwrap_err();
        assert!(err.to_string().contains("no backup instance id configured"));
    }

    #[tokio::test]
    async fn test_missing_cli_is_error() {
        let remediation =
            AwsCliRemediation::new("/nonexistent/bin/aws", Some("i-0abc".to_string()), None, LIMIT);
        let err = remediation.start_backup().await.unwrap_err();
        assert!(matches!(err, common::Error::Remediation(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_error() {
        // `false` ignores its arguments and exits 1
        let remediation = AwsCliRemediation::new("false", Some("i-0abc".to_string()), None, LIMIT);
        assert!(remediation.start_backup().await.is_err());

        let remediation = AwsCliRemediation::new("true", Some("i-0abc".to_string()), None, LIMIT);
        assert_eq!(remediation.start_backup().await.unwrap(), "i-0abc");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_cli_is_cut_off() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("aws");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let remediation = AwsCliRemediation::new(
            script.to_string_lossy(),
            Some("i-0abc".to_string()),
            None,
            Duration::from_millis(200),
        );

        let started = std::time::Instant::now();
        let err = remediation.start_backup().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
