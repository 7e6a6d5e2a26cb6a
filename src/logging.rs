use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Installs the terminal logger, only the first call per process wins.
pub fn init(level: LevelFilter) -> anyhow::Result<()> {
    let config = ConfigBuilder::new()
        .add_filter_allow_str("phone_pong")
        .add_filter_allow_str("observer")
        .add_filter_allow_str("publisher")
        .build();
    TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto)?;
    Ok(())
}
