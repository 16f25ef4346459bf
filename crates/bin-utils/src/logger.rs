//! Logging for binaries: everything goes to a file, only the important bits to stderr.

use std::{
    env,
    fs::File,
    path::{Path, PathBuf},
};

use log::{info, LevelFilter, Log, Metadata, Record};

/// Sends each record to stderr and, when one could be created, to a log file.
struct Tee {
    stderr: env_logger::Logger,
    file: Option<env_logger::Logger>,
}

impl Tee {
    fn loggers(&self) -> impl Iterator<Item = &env_logger::Logger> {
        std::iter::once(&self.stderr).chain(self.file.as_ref())
    }
}

impl Log for Tee {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.loggers().any(|logger| logger.enabled(metadata))
    }

    fn log(&self, record: &Record) {
        self.loggers()
            .filter(|logger| logger.enabled(record.metadata()))
            .for_each(|logger| logger.log(record));
    }

    fn flush(&self) {
        self.loggers().for_each(|logger| logger.flush());
    }
}

/// Points the user to the full log unless the program finished successfully.
pub struct Guard {
    file: Option<PathBuf>,
}

impl Guard {
    pub fn disarm(&mut self) {
        if let Some(file) = self.file.take() {
            info!("Full log stored in {file:?}");
        }
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(file) = self.file.as_ref() {
            eprintln!("Full log stored in {file:?}");
        }
    }
}

fn file_path() -> Option<PathBuf> {
    let current_exe = env::current_exe().ok()?;
    let name = current_exe.file_name()?.to_str()?;
    let path = env::temp_dir().join(name).with_extension("log");
    Some(path)
}

fn file_logger(path: &Path) -> Option<env_logger::Logger> {
    let target = env_logger::Target::Pipe(Box::new(File::create(path).ok()?));
    Some(
        env_logger::Builder::new()
            .filter_level(LevelFilter::Trace)
            .target(target)
            .build(),
    )
}

fn stderr_logger(verbose: bool) -> env_logger::Logger {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .build()
}

/// Install the global logger.
///
/// `verbose` lowers the stderr threshold from warnings to debug messages; `RUST_LOG` overrides
/// either.
pub fn init(verbose: bool) -> Guard {
    let path = file_path();
    let file = path.as_deref().and_then(file_logger);
    let tee = Tee {
        stderr: stderr_logger(verbose),
        file,
    };
    let max_level = tee
        .loggers()
        .map(|logger| logger.filter())
        .max()
        .unwrap_or(LevelFilter::Warn);
    let file = tee.file.as_ref().and(path);

    if log::set_boxed_logger(Box::new(tee)).is_err() {
        eprintln!("A logger was already installed");
        return Guard { file: None };
    }
    log::set_max_level(max_level);

    Guard { file }
}
