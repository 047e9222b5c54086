use std::fmt::Display;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use updatekit_core::{
    ApplicationDeployment, CancellationToken, ProcessEnvironment, UpdateChecker, UpdateLauncher,
    UpdateLocation, UpdateScheduler, read_manifest_version,
};

use crate::error::AppError;
use crate::settings::AppSettings;

fn deployment(settings: &AppSettings) -> Result<ApplicationDeployment, AppError> {
    ApplicationDeployment::detect_with_prefix(ProcessEnvironment, settings.variable_prefix.clone())
        .ok_or(AppError::NotNetworkDeployed)
}

fn http_client(settings: &AppSettings) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.http_timeout_secs))
        .user_agent(concat!("updatekit/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(AppError::HttpClient)
}

fn checker(settings: &AppSettings) -> Result<Arc<UpdateChecker>, AppError> {
    let deployment = Arc::new(deployment(settings)?);
    Ok(Arc::new(UpdateChecker::new(
        deployment,
        http_client(settings)?,
    )))
}

fn print_field(name: &str, value: impl Display) {
    println!("{name:<28} {value}");
}

fn or_unset<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "(not set)".to_string(), |value| value.to_string())
}

pub fn info(settings: &AppSettings) -> Result<(), AppError> {
    let deployment = deployment(settings)?;

    print_field("Current version", deployment.current_version()?);
    print_field("Update location", or_unset(deployment.update_location()));
    print_field("Activation URI", or_unset(deployment.activation_uri()?));
    print_field(
        "Data directory",
        or_unset(deployment.data_directory().map(|dir| dir.display().to_string())),
    );
    print_field("First run", deployment.is_first_run()?);
    print_field(
        "Last update check",
        or_unset(deployment.time_of_last_update_check()?),
    );
    print_field(
        "Updated application",
        or_unset(deployment.updated_application_full_name()),
    );
    print_field("Updated version", or_unset(deployment.updated_version()?));
    print_field("Launcher version", or_unset(deployment.launcher_version()?));

    let activation_data = deployment.activation_data()?;
    if activation_data.is_empty() {
        print_field("Activation data", "(none)");
    } else {
        for (index, value) in activation_data.iter().enumerate() {
            print_field(&format!("Activation data [{index}]"), value);
        }
    }
    Ok(())
}

fn report_check(checker: &UpdateChecker, found: bool) {
    if found {
        let state = checker.state();
        println!(
            "Update available: {} -> {}",
            or_unset(state.current_version),
            or_unset(state.available_version)
        );
        return;
    }

    match checker.deployment().update_location() {
        None => println!("No update location configured, nothing to check"),
        Some(UpdateLocation::Unknown(raw)) => {
            println!("Update location {raw} is not supported, nothing checked");
        }
        Some(_) => println!("No update available"),
    }
}

pub fn check(settings: &AppSettings) -> Result<(), AppError> {
    let checker = checker(settings)?;
    let found = checker.check_for_update_blocking(&CancellationToken::new())?;
    report_check(&checker, found);
    Ok(())
}

pub fn update(settings: &AppSettings) -> Result<(), AppError> {
    let checker = checker(settings)?;
    let found = checker.check_for_update_blocking(&CancellationToken::new())?;
    report_check(&checker, found);

    UpdateLauncher::new(checker).update()?;
    Ok(())
}

pub fn watch(settings: &AppSettings, interval: Option<u64>, apply: bool) -> Result<(), AppError> {
    let checker = checker(settings)?;
    let period = Duration::from_secs(interval.unwrap_or(settings.check_interval_secs).max(1));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(AppError::Runtime)?;

    println!("Checking for updates every {}s", period.as_secs());
    let notification = runtime.block_on(async {
        let (scheduler, mut events) = UpdateScheduler::spawn(Arc::clone(&checker), period);
        let notification = events.recv().await;
        scheduler.stop();
        notification
    });
    drop(runtime);

    let notification = notification.ok_or(AppError::WatchEnded)?;
    println!(
        "Update available: {} -> {}",
        notification.current_version, notification.available_version
    );

    if apply {
        info!("Applying update {}", notification.available_version);
        UpdateLauncher::new(checker).update()?;
        println!("Nothing to launch for this update location");
    }
    Ok(())
}

pub fn manifest(path: &Path) -> Result<(), AppError> {
    let file = std::fs::File::open(path).map_err(|source| AppError::ManifestRead {
        path: path.to_path_buf(),
        source,
    })?;
    let version = read_manifest_version(BufReader::new(file))?;
    println!("{version}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{manifest, or_unset};
    use crate::error::AppError;

    #[test]
    fn or_unset_formats_missing_values() {
        assert_eq!(or_unset(Some(42)), "42");
        assert_eq!(or_unset(None::<u32>), "(not set)");
    }

    #[test]
    fn manifest_command_reads_local_file() {
        let temp = tempfile::tempdir().expect("tempdir should be created");
        let path = temp.path().join("App.application");
        std::fs::write(
            &path,
            r#"<assembly xmlns="urn:schemas-microsoft-com:asm.v1"><assemblyIdentity version="1.4.0.2"/></assembly>"#,
        )
        .expect("manifest should be written");

        manifest(&path).expect("manifest command should succeed");
    }

    #[test]
    fn manifest_command_reports_missing_file() {
        let temp = tempfile::tempdir().expect("tempdir should be created");

        let error = manifest(&temp.path().join("missing.application"))
            .expect_err("missing manifest should fail");

        assert!(matches!(error, AppError::ManifestRead { .. }));
    }
}
