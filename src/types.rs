use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;

use serde::Deserialize;

use crate::constants::{CC_TYPE_CONTINUE, CC_TYPE_START, MAX_SERVICES};
use crate::error::DtvccError;
use crate::stats::DtvccReport;

/// Role of a 4-byte caption tuple in the packet stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcType {
    /// cc_type 2: DTVCC channel packet data
    Continue,
    /// cc_type 3: DTVCC channel packet start
    Start,
}

impl TryFrom<u8> for CcType {
    type Error = DtvccError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            CC_TYPE_CONTINUE => Ok(CcType::Continue),
            CC_TYPE_START => Ok(CcType::Start),
            other => Err(DtvccError::IllegalCcType(other)),
        }
    }
}

/// Enable bitmap over service slots; slot `i` carries service number `i + 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSet([bool; MAX_SERVICES]);

impl ServiceSet {
    pub fn empty() -> Self {
        Self([false; MAX_SERVICES])
    }

    /// Builds the bitmap from 1-based service numbers; out-of-range numbers are rejected
    pub fn from_service_numbers(numbers: &[usize]) -> Result<Self, DtvccError> {
        let mut set = Self::empty();
        for &n in numbers {
            if n == 0 || n > MAX_SERVICES {
                return Err(DtvccError::Config(format!(
                    "service number {n} outside 1..={MAX_SERVICES}"
                )));
            }
            set.0[n - 1] = true;
        }
        Ok(set)
    }

    pub fn enable(&mut self, index: usize) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = true;
        }
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        self.0.get(index).copied().unwrap_or(false)
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|on| **on).count()
    }

    /// Enabled slot indices in ascending order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().filter(|(_, on)| **on).map(|(i, _)| i)
    }
}

impl Default for ServiceSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Caption file format written by each service sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text, one line per caption row
    Transcript,
    /// SubRip
    #[default]
    Srt,
    /// Microsoft SAMI
    Sami,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Transcript => "txt",
            OutputFormat::Srt => "srt",
            OutputFormat::Sami => "smi",
        }
    }
}

/// Encoder settings shared by every service sink
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub crlf: bool,
    pub write_bom: bool,
}

impl EncoderConfig {
    pub fn line_terminator(&self) -> &'static str {
        if self.crlf { "\r\n" } else { "\n" }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { crlf: true, write_bom: false }
    }
}

/// Session clock in milliseconds, advanced by the caller per frame
#[derive(Debug, Default)]
pub struct CaptionClock {
    now_ms: Cell<i64>,
}

impl CaptionClock {
    pub fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }

    pub fn set_ms(&self, ms: i64) {
        self.now_ms.set(ms);
    }

    pub fn advance_ms(&self, delta: i64) {
        self.now_ms.set(self.now_ms.get() + delta);
    }
}

/// One block of caption text ready for a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    /// 1-based service number
    pub service: usize,
    pub start_ms: i64,
    pub end_ms: i64,
    pub lines: Vec<String>,
}

/// Construction-time configuration for a decoding session
#[derive(Debug, Clone)]
pub struct DtvccSettings {
    pub services_enabled: ServiceSet,
    pub active_services_count: usize,
    /// Applies to every service and wins over `services_charsets`
    pub all_services_charset: Option<String>,
    /// Indexed by service slot
    pub services_charsets: Vec<Option<String>>,
    pub basefilename: PathBuf,
    pub cc_to_stdout: bool,
    pub output_format: OutputFormat,
    pub encoder: Rc<EncoderConfig>,
    pub timing: Rc<CaptionClock>,
    pub print_file_reports: bool,
    pub report: Rc<RefCell<DtvccReport>>,
}

impl DtvccSettings {
    pub fn new(services_enabled: ServiceSet) -> Self {
        Self {
            services_enabled,
            active_services_count: services_enabled.count(),
            all_services_charset: None,
            services_charsets: vec![None; MAX_SERVICES],
            basefilename: PathBuf::from("captions"),
            cc_to_stdout: false,
            output_format: OutputFormat::default(),
            encoder: Rc::new(EncoderConfig::default()),
            timing: Rc::new(CaptionClock::default()),
            print_file_reports: false,
            report: Rc::new(RefCell::new(DtvccReport::default())),
        }
    }

    /// Effective charset for a service slot
    pub fn charset_for(&self, index: usize) -> Option<&str> {
        self.all_services_charset
            .as_deref()
            .or_else(|| self.services_charsets.get(index).and_then(|c| c.as_deref()))
    }

    pub fn set_service_charset(&mut self, index: usize, charset: impl Into<String>) {
        if self.services_charsets.len() < MAX_SERVICES {
            self.services_charsets.resize(MAX_SERVICES, None);
        }
        if let Some(slot) = self.services_charsets.get_mut(index) {
            *slot = Some(charset.into());
        }
    }
}
