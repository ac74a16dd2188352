use crate::sink::{ConsoleSink, SinkWriter};
use core::fmt::Write;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// `log::Log` backend writing one line per record into a [`ConsoleSink`].
pub struct ConsoleLogger<S> {
    sink: S,
    max_level: LevelFilter,
}

impl<S: ConsoleSink> ConsoleLogger<S> {
    #[must_use]
    pub const fn new(sink: S, max_level: LevelFilter) -> Self {
        Self { sink, max_level }
    }

    pub const fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: ConsoleSink + 'static> ConsoleLogger<S> {
    /// Register as the global logger.
    ///
    /// # Errors
    /// Fails if a logger has already been installed.
    pub fn install(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.max_level);
        Ok(())
    }
}

impl<S: ConsoleSink> Log for ConsoleLogger<S> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Format straight into the sink, no intermediate buffer.
        let _ = writeln!(
            SinkWriter(&self.sink),
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Install a [`ConsoleLogger`] on the QEMU debug port.
///
/// # Errors
/// Fails if a logger has already been installed.
#[cfg(feature = "debugcon")]
pub fn install_debug_port_logger(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    use crate::sink::DebugPortSink;
    use hv_sync::SyncOnceCell;

    static LOGGER: SyncOnceCell<ConsoleLogger<DebugPortSink>> = SyncOnceCell::new();
    LOGGER
        .get_or_init(|| ConsoleLogger::new(DebugPortSink, max_level))
        .install()
}
