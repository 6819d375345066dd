//! Walk through the shell client against a scripted in-memory transport.
//!
//! Run with: cargo run -p shell-demo
//!
//! Set `SHELL_DEMO_CONFIG` to a JSON `ShellConfig` document to override the
//! script host, e.g. `{"script_host": "pwsh"}`.

use std::sync::Arc;

use anyhow::Context as _;
use remote_shell_core::{CommandResult, ShellConfig, ShellError};
use remote_shell_session::{Client, MemoryTransport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SCRIPT_ERROR: &[u8] = b"#< CLIXML\r\n<Objs Version=\"1.1.0.1\" \
    xmlns=\"http://schemas.microsoft.com/powershell/2004/04\">\
    <S S=\"Error\">Get-Item : Cannot find path 'C:\\missing' because it does not exist._x000D__x000A_</S>\
    <S S=\"Error\">At line:1 char:1_x000D__x000A_</S></Objs>";

fn load_config() -> anyhow::Result<ShellConfig> {
    match std::env::var("SHELL_DEMO_CONFIG") {
        Ok(raw) => serde_json::from_str(&raw).context("invalid SHELL_DEMO_CONFIG"),
        Err(_) => Ok(ShellConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = load_config()?;
    tracing::info!(script_host = %config.script_host, "Using shell configuration");

    let transport = Arc::new(MemoryTransport::new());
    transport.push_result(CommandResult::new(0, b"demo-host\r\n".to_vec(), None));
    transport.push_result(CommandResult::new(1, Vec::new(), Some(SCRIPT_ERROR.to_vec())));

    let client = Client::new(Arc::clone(&transport) as _).with_config(config);

    let outcome = client
        .with_shell(async |shell| {
            let host = shell.check_command("hostname", &[]).await?;
            tracing::info!(host = host.stdout.trim(), "Connected");
            shell.check_script("Get-Item C:\\missing").await
        })
        .await;

    match outcome {
        Ok(output) => tracing::info!(stdout = %output.stdout, "Script succeeded"),
        Err(ShellError::Command(err)) => {
            tracing::error!(status_code = err.status_code, "Script failed");
            eprintln!("{err}");
        }
        Err(err) => return Err(err.into()),
    }

    tracing::info!(
        open_shells = transport.open_shells(),
        calls = transport.calls().len(),
        "Done"
    );
    Ok(())
}
