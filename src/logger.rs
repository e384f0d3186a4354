//! User-facing output and run statistics. Trace-level narration goes
//! through the `log` macros (the binary wires them to `env_logger`); the
//! `show`/`whisper` channel prints to stdout or the `--out` file.
use crate::stats::Statistics;
use crate::types::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OutLvl {
    Silent,
    Whisper,
    Verbose,
}

enum Channel {
    Stdout,
    File(BufWriter<File>),
}

pub struct Logger {
    level: OutLvl,
    channel: Channel,
    pub indent: usize,
    pub stats: Statistics,
}

impl Logger {
    pub fn new(level: OutLvl, out: Option<&Path>) -> Result<Logger> {
        let channel = match out {
            None => Channel::Stdout,
            Some(p) => Channel::File(BufWriter::new(File::create(p).map_err(|e| {
                Error::Input(format!("cannot create {}: {}", p.display(), e))
            })?)),
        };
        Ok(Logger {
            level,
            channel,
            indent: 0,
            stats: Statistics::new(),
        })
    }

    pub fn level(&self) -> OutLvl {
        self.level
    }

    fn emit(&mut self, msg: &str) {
        match &mut self.channel {
            Channel::Stdout => println!("{}", msg),
            Channel::File(w) => {
                let _ = writeln!(w, "{}", msg);
            }
        }
    }

    /// Verbose-only output.
    pub fn show(&mut self, msg: impl AsRef<str>) {
        if self.level == OutLvl::Verbose {
            self.emit(msg.as_ref());
        }
    }

    /// Output unless silenced.
    pub fn whisper(&mut self, msg: impl AsRef<str>) {
        if self.level != OutLvl::Silent {
            self.emit(msg.as_ref());
        }
    }

    pub fn and_show(&mut self, msg: impl AsRef<str>) {
        log::info!("{}", msg.as_ref());
        self.show(msg);
    }

    pub fn and_whisper(&mut self, msg: impl AsRef<str>) {
        log::info!("{}", msg.as_ref());
        self.whisper(msg);
    }

    /// Trace narration with the current indent.
    pub fn tabbed(&self, msg: impl AsRef<str>) {
        log::trace!("{}| {}", "\t".repeat(self.indent), msg.as_ref());
    }

    pub fn flush(&mut self) {
        if let Channel::File(w) = &mut self.channel {
            let _ = w.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_channel_receives_whispers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let mut log = Logger::new(OutLvl::Whisper, Some(&path)).unwrap();
        log.whisper("hello");
        log.show("not shown at whisper level");
        log.flush();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "hello\n");
    }

    #[test]
    fn silent_suppresses_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let mut log = Logger::new(OutLvl::Silent, Some(&path)).unwrap();
        log.whisper("quiet");
        log.flush();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
