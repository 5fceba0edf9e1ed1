#[cfg(windows)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use clap::Parser;
    use tracing_subscriber::EnvFilter;

    use clipwatch::clipboard::ClipboardListener;
    use clipwatch::config::{Cli, Config};
    use clipwatch::emitter::Emitter;
    use clipwatch::sink::Sink;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());
    // Only write a default config if no custom path was specified
    if cli.config.is_none() {
        Config::write_default_if_missing(&Config::config_path());
    }

    // Event markers go to stdout; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clipwatch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let sink = Sink::from_config(&config.sink)?;
    let emitter = Emitter::spawn(sink, config.sink.timeout(), config.sink.shutdown_grace());

    let mut listener = match ClipboardListener::start(emitter.sender(), config.capture.clone()) {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to start clipboard listener: {e}");
            emitter.shutdown();
            return Err(e.into());
        }
    };

    // Ctrl+C / console close posts WM_CLOSE to the listener window so the
    // message loop exits and teardown runs in order.
    install_ctrl_handler()?;

    println!("Clipboard Watcher Active...");

    let run_result = listener.run();

    listener.stop();
    emitter.shutdown();

    match run_result {
        Ok(()) => {
            tracing::info!("clipboard watcher shut down cleanly");
            Ok(())
        }
        Err(e) => {
            tracing::error!("clipboard watcher terminated: {e}");
            Err(e.into())
        }
    }
}

#[cfg(windows)]
fn install_ctrl_handler() -> Result<(), windows::core::Error> {
    use windows::Win32::System::Console::{
        CTRL_BREAK_EVENT, CTRL_C_EVENT, CTRL_CLOSE_EVENT, SetConsoleCtrlHandler,
    };

    unsafe extern "system" fn handler(ctrl_type: u32) -> windows::core::BOOL {
        match ctrl_type {
            CTRL_C_EVENT | CTRL_BREAK_EVENT | CTRL_CLOSE_EVENT => {
                clipwatch::clipboard::monitor::request_stop();
                true.into()
            }
            _ => false.into(),
        }
    }

    unsafe { SetConsoleCtrlHandler(Some(handler), true) }
}

#[cfg(not(windows))]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    Err(clipwatch::error::StartError::Unsupported.into())
}
