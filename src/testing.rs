//! Recording fakes for the external collaborators, shared by unit tests

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::charset::{CharsetConverter, ConverterFactory};
use crate::error::{DtvccError, Result};
use crate::processor::{DecoderSession, PacketDecoder};
use crate::sink::{OutputSink, SinkFactory};
use crate::types::{Cue, EncoderConfig, OutputFormat};

#[derive(Debug, Default)]
pub struct ConverterLog {
    pub opened: Vec<String>,
    pub closed: Vec<String>,
}

/// Opens fake converters that upper-case ASCII; `fail_on` simulates an unusable charset
#[derive(Default, Clone)]
pub struct RecordingConverters {
    pub log: Rc<RefCell<ConverterLog>>,
    pub fail_on: Option<String>,
}

impl ConverterFactory for RecordingConverters {
    fn open(&self, _to: &str, from: &str) -> Result<Box<dyn CharsetConverter>> {
        if self.fail_on.as_deref() == Some(from) {
            return Err(DtvccError::ConverterOpen {
                charset: from.to_string(),
                reason: "Invalid argument".to_string(),
            });
        }
        self.log.borrow_mut().opened.push(from.to_string());
        Ok(Box::new(RecordingConverter { charset: from.to_string(), log: self.log.clone() }))
    }
}

struct RecordingConverter {
    charset: String,
    log: Rc<RefCell<ConverterLog>>,
}

impl CharsetConverter for RecordingConverter {
    fn charset(&self) -> &str {
        &self.charset
    }

    fn convert(&mut self, input: &[u8]) -> String {
        String::from_utf8_lossy(input).to_ascii_uppercase()
    }

    fn close(self: Box<Self>) {
        self.log.borrow_mut().closed.push(self.charset.clone());
    }
}

#[derive(Debug, Default)]
pub struct SinkLog {
    pub created: Vec<PathBuf>,
    pub stdout_bound: usize,
    pub finished: Vec<PathBuf>,
    pub closed: Vec<PathBuf>,
    pub stdout_closed: usize,
    pub cues: BTreeMap<PathBuf, Vec<Cue>>,
}

/// In-memory sinks; writes to `fail_writes_to` return an error, and the next
/// `fail_next_writes` writes to any sink fail once each
#[derive(Default, Clone)]
pub struct RecordingSinks {
    pub log: Rc<RefCell<SinkLog>>,
    pub fail_writes_to: Option<PathBuf>,
    pub fail_next_writes: Rc<Cell<usize>>,
}

pub const STDOUT_PATH: &str = "<stdout>";

impl SinkFactory for RecordingSinks {
    fn create(
        &self,
        path: &Path,
        _format: OutputFormat,
        _encoder: Rc<EncoderConfig>,
    ) -> io::Result<Box<dyn OutputSink>> {
        self.log.borrow_mut().created.push(path.to_path_buf());
        Ok(Box::new(RecordingSink {
            path: path.to_path_buf(),
            stdout: false,
            fail_writes: self.fail_writes_to.as_deref() == Some(path),
            fail_next_writes: self.fail_next_writes.clone(),
            log: self.log.clone(),
        }))
    }

    fn stdout(&self, _format: OutputFormat, _encoder: Rc<EncoderConfig>) -> Box<dyn OutputSink> {
        self.log.borrow_mut().stdout_bound += 1;
        Box::new(RecordingSink {
            path: PathBuf::from(STDOUT_PATH),
            stdout: true,
            fail_writes: false,
            fail_next_writes: self.fail_next_writes.clone(),
            log: self.log.clone(),
        })
    }
}

struct RecordingSink {
    path: PathBuf,
    stdout: bool,
    fail_writes: bool,
    fail_next_writes: Rc<Cell<usize>>,
    log: Rc<RefCell<SinkLog>>,
}

impl OutputSink for RecordingSink {
    fn is_stdout(&self) -> bool {
        self.stdout
    }

    fn write_cue(&mut self, cue: &Cue) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::other("device full"));
        }
        if self.fail_next_writes.get() > 0 {
            self.fail_next_writes.set(self.fail_next_writes.get() - 1);
            return Err(io::Error::other("transient write error"));
        }
        self.log.borrow_mut().cues.entry(self.path.clone()).or_default().push(cue.clone());
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.log.borrow_mut().finished.push(self.path.clone());
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        let mut log = self.log.borrow_mut();
        if self.stdout {
            log.stdout_closed += 1;
        } else {
            log.closed.push(self.path.clone());
        }
        Ok(())
    }
}

/// Captures every packet handed over by the assembler
#[derive(Default, Clone)]
pub struct RecordingDecoder {
    pub packets: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl PacketDecoder for RecordingDecoder {
    fn handle_packet(&mut self, packet: &[u8], _session: &mut DecoderSession<'_>) -> Result<()> {
        self.packets.borrow_mut().push(packet.to_vec());
        Ok(())
    }
}

/// Builds `(valid, type, b0, b1)` tuples
pub fn tuple(valid: u8, cc_type: u8, b0: u8, b1: u8) -> [u8; 4] {
    [valid, cc_type, b0, b1]
}

pub fn tuples(items: &[[u8; 4]]) -> Vec<u8> {
    items.iter().flatten().copied().collect()
}
