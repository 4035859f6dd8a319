//! Per-service decoding pipelines
//!
//! Each enabled caption service owns one [`ServiceDecoderState`]: an optional
//! charset converter, an output sink and [`MAX_WINDOWS`] window slots. The
//! [`ServiceRegistry`] provisions them at session start and tears them down
//! at session end.

mod registry;
mod window;

pub use registry::ServiceRegistry;
pub use window::WindowState;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, warn};

use crate::charset::{CharsetConverter, ConverterFactory, UTF8};
use crate::constants::*;
use crate::error::{DtvccError, Result};
use crate::sink::{OutputSink, SinkFactory};
use crate::types::{CaptionClock, Cue, DtvccSettings, EncoderConfig, OutputFormat};

pub struct ServiceDecoderState {
    index: usize,
    charset: Option<String>,
    converter: Option<Box<dyn CharsetConverter>>,
    filename: Option<PathBuf>,
    sink: Option<Box<dyn OutputSink>>,
    output_started: bool,
    windows: [WindowState; MAX_WINDOWS],
    current_window: usize,
    format: OutputFormat,
    encoder: Rc<EncoderConfig>,
    timing: Rc<CaptionClock>,
    sinks: Rc<dyn SinkFactory>,
    cues_written: u64,
}

impl ServiceDecoderState {
    /// Provision the pipeline for service slot `index`
    pub fn open(
        index: usize,
        settings: &DtvccSettings,
        converters: &dyn ConverterFactory,
        sinks: Rc<dyn SinkFactory>,
    ) -> Result<Self> {
        let charset = settings.charset_for(index).map(str::to_string);
        let converter = match &charset {
            Some(cs) => Some(converters.open(UTF8, cs)?),
            None => None,
        };

        let mut state = Self {
            index,
            charset,
            converter,
            filename: None,
            sink: None,
            output_started: false,
            windows: Default::default(),
            current_window: 0,
            format: settings.output_format,
            encoder: settings.encoder.clone(),
            timing: settings.timing.clone(),
            sinks,
            cues_written: 0,
        };
        state.reset_windows();

        if settings.cc_to_stdout {
            state.sink = Some(state.sinks.stdout(state.format, state.encoder.clone()));
            state.output_started = true;
        } else {
            state.filename = Some(service_filename(&settings.basefilename, index + 1, state.format));
        }

        debug!(
            target: LOG_TARGET,
            "service {} provisioned (charset: {}, output: {})",
            index + 1,
            state.charset.as_deref().unwrap_or("none"),
            state
                .filename
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stdout".to_string())
        );
        Ok(state)
    }

    /// 1-based service number
    pub fn service_number(&self) -> usize {
        self.index + 1
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    pub fn has_converter(&self) -> bool {
        self.converter.is_some()
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn output_started(&self) -> bool {
        self.output_started
    }

    pub fn windows(&self) -> &[WindowState] {
        &self.windows
    }

    pub fn cues_written(&self) -> u64 {
        self.cues_written
    }

    /// Drop every window's rows and select window 0
    pub fn reset_windows(&mut self) {
        for window in &mut self.windows {
            window.release();
        }
        self.current_window = 0;
    }

    /// Feed the payload of one service block.
    ///
    /// Only the text path is interpreted: printable characters, CR, and the
    /// window commands that end a caption. Other codes are skipped with their
    /// parameters.
    pub fn handle_block(&mut self, block: &[u8]) -> Result<()> {
        let now = self.timing.now_ms();
        let mut i = 0;
        while i < block.len() {
            let code = block[i];
            i += 1;
            match code {
                CODE_ETX | CODE_FF => self.flush_window(self.current_window)?,
                CODE_CR => self.windows[self.current_window].carriage_return(),
                CODE_EXT1 => i += 1,
                0x00..=0x0F => {}
                0x11..=0x17 => i += 1,
                0x18..=0x1F => i += 2,
                0x20..=0x7F | 0xA0..=0xFF => self.windows[self.current_window].push_byte(code, now),
                0x80..=0x87 => self.current_window = usize::from(code & 0x07),
                CODE_CLW | CODE_DLW => {
                    let Some(&bitmap) = block.get(i) else {
                        break;
                    };
                    i += 1;
                    for w in (0..MAX_WINDOWS).filter(|w| bitmap & (1 << w) != 0) {
                        self.flush_window(w)?;
                        if code == CODE_DLW {
                            self.windows[w].release();
                        }
                    }
                }
                0x89..=0x8B | 0x8D => i += 1,
                0x8E | 0x8F | 0x93..=0x96 => {}
                0x90 | 0x92 => i += 2,
                0x91 => i += 3,
                0x97 => i += 4,
                0x98..=0x9F => {
                    self.current_window = usize::from(code - 0x98);
                    i += 6;
                }
            }
        }
        Ok(())
    }

    /// Emit every window that holds text. A failing window does not stop the
    /// others; the first error is returned.
    pub fn flush(&mut self) -> Result<()> {
        let mut first_err = None;
        for w in 0..MAX_WINDOWS {
            if let Err(e) = self.flush_window(w) {
                warn!(target: LOG_TARGET, "service {}: window {w} flush failed: {e}", self.service_number());
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn flush_window(&mut self, w: usize) -> Result<()> {
        if !self.windows[w].has_text() {
            return Ok(());
        }
        let now = self.timing.now_ms();
        let start_ms = self.windows[w].start_ms().unwrap_or(now);
        let rows = self.windows[w].take_text();
        let lines = rows.iter().map(|row| self.decode_row(row)).collect();
        let cue = Cue {
            service: self.service_number(),
            start_ms,
            end_ms: now.max(start_ms),
            lines,
        };
        self.write_cue(&cue)
    }

    fn decode_row(&mut self, row: &[u8]) -> String {
        match self.converter.as_mut() {
            Some(conv) => conv.convert(row),
            None => row
                .iter()
                .map(|&b| if b == 0x7F { MUSIC_NOTE } else { char::from(b) })
                .collect(),
        }
    }

    fn write_cue(&mut self, cue: &Cue) -> Result<()> {
        if self.sink.is_none() {
            if let Some(path) = self.filename.as_deref() {
                let sink = self
                    .sinks
                    .create(path, self.format, self.encoder.clone())
                    .map_err(|source| DtvccError::OutputOpen { path: path.to_path_buf(), source })?;
                debug!(target: LOG_TARGET, "service {}: opened {}", self.service_number(), path.display());
                self.sink = Some(sink);
                self.output_started = true;
            }
        }
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        sink.write_cue(cue)
            .map_err(|e| DtvccError::io(format!("service {}: write failed", cue.service), e))?;
        self.cues_written += 1;
        Ok(())
    }

    /// Release everything acquired at provisioning or since. Safe to call more than once.
    pub fn release(&mut self) {
        if self.output_started {
            if let Err(e) = self.flush() {
                warn!(target: LOG_TARGET, "service {}: final flush failed: {e}", self.service_number());
            }
        }

        if let Some(converter) = self.converter.take() {
            converter.close();
        }
        self.charset = None;

        if let Some(mut sink) = self.sink.take() {
            if !sink.is_stdout() {
                if let Err(e) = sink.finish() {
                    warn!(target: LOG_TARGET, "service {}: finalizing output failed: {e}", self.service_number());
                }
                if let Err(e) = sink.close() {
                    warn!(target: LOG_TARGET, "service {}: closing output failed: {e}", self.service_number());
                }
            }
        }

        self.filename = None;

        for window in &mut self.windows {
            if window.memory_reserved() {
                window.release();
            }
        }
    }
}

impl Drop for ServiceDecoderState {
    fn drop(&mut self) {
        self.release();
    }
}

/// `<stem>_<service>.<ext>` next to the base filename
pub fn service_filename(base: &Path, service: usize, format: OutputFormat) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "captions".to_string());
    base.with_file_name(format!("{stem}_{service}.{}", format.extension()))
}
