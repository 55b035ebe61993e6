use std::process::ExitCode;

const USAGE: &str = "\
This is a compiler-cache HTTP(S) storage helper, usually started
automatically by the cache front-end when remote storage is configured.
It is not meant to be run by hand.

Version: 0.1.0
";

fn main() -> ExitCode {
    // The front-end always sets these two; a bare invocation gets the
    // usage text instead of a bind error.
    if std::env::var_os("CRSH_IPC_ENDPOINT").is_none() || std::env::var_os("CRSH_URL").is_none() {
        eprint!("{USAGE}");
        return ExitCode::from(1);
    }

    // Logging comes up before configuration parsing so parse failures
    // are recorded too.
    crsh::observability::logging::init_from_env();

    let config = match crsh::config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to parse configuration: {e}");
            return ExitCode::from(1);
        }
    };

    tracing::info!("Starting");
    tracing::info!("IPC endpoint: {}", config.ipc_endpoint.display());
    tracing::info!("URL: {}", config.url);
    tracing::info!("Idle timeout: {}", config.idle_timeout_seconds);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create event loop: {e}");
            return ExitCode::from(1);
        }
    };

    let local = tokio::task::LocalSet::new();
    match runtime.block_on(local.run_until(crsh::run(config))) {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::from(1)
        }
    }
}
