//! Per-service output destinations and caption formatting

use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;
use std::rc::Rc;

use crate::types::{Cue, EncoderConfig, OutputFormat};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A per-service caption destination
pub trait OutputSink {
    /// True for the shared process standard output, which is never closed
    fn is_stdout(&self) -> bool;

    fn write_cue(&mut self, cue: &Cue) -> io::Result<()>;

    /// Write trailing container metadata and flush
    fn finish(&mut self) -> io::Result<()>;

    /// Close the underlying handle
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Creates sinks for service pipelines
pub trait SinkFactory {
    fn create(
        &self,
        path: &Path,
        format: OutputFormat,
        encoder: Rc<EncoderConfig>,
    ) -> io::Result<Box<dyn OutputSink>>;

    fn stdout(&self, format: OutputFormat, encoder: Rc<EncoderConfig>) -> Box<dyn OutputSink>;
}

/// Sinks on the local filesystem and the process standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct StdSinkFactory;

impl SinkFactory for StdSinkFactory {
    fn create(
        &self,
        path: &Path,
        format: OutputFormat,
        encoder: Rc<EncoderConfig>,
    ) -> io::Result<Box<dyn OutputSink>> {
        let file = BufWriter::new(File::create(path)?);
        let mut writer = CaptionWriter::new(file, format, encoder, false);
        writer.write_header()?;
        Ok(Box::new(writer))
    }

    fn stdout(&self, format: OutputFormat, encoder: Rc<EncoderConfig>) -> Box<dyn OutputSink> {
        Box::new(CaptionWriter::<Stdout>::new(io::stdout(), format, encoder, true))
    }
}

/// Formats cues as transcript, SRT or SAMI into any writer
pub struct CaptionWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    encoder: Rc<EncoderConfig>,
    cue_index: u64,
    to_stdout: bool,
}

impl<W: Write> CaptionWriter<W> {
    pub fn new(writer: W, format: OutputFormat, encoder: Rc<EncoderConfig>, to_stdout: bool) -> Self {
        Self { writer, format, encoder, cue_index: 0, to_stdout }
    }

    /// BOM and container header; only files get one
    pub fn write_header(&mut self) -> io::Result<()> {
        if self.encoder.write_bom {
            self.writer.write_all(UTF8_BOM)?;
        }
        if self.format == OutputFormat::Sami {
            let nl = self.encoder.line_terminator();
            write!(
                self.writer,
                "<SAMI>{nl}<HEAD>{nl}<STYLE TYPE=\"text/css\">{nl}<!--{nl}\
                 P {{margin-left: 16pt; margin-right: 16pt; margin-bottom: 16pt; margin-top: 16pt;{nl}\
                 text-align: center; font-size: 18pt; font-family: arial; font-weight: bold; color: #f0f0f0;}}{nl}\
                 .UNKNOWNCC {{Name:Unknown; lang:en-US; SAMIType:CC;}}{nl}\
                 -->{nl}</STYLE>{nl}</HEAD>{nl}{nl}<BODY>{nl}"
            )?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for CaptionWriter<W> {
    fn is_stdout(&self) -> bool {
        self.to_stdout
    }

    fn write_cue(&mut self, cue: &Cue) -> io::Result<()> {
        let nl = self.encoder.line_terminator();
        self.cue_index += 1;
        match self.format {
            OutputFormat::Transcript => {
                for line in &cue.lines {
                    write!(self.writer, "{line}{nl}")?;
                }
            }
            OutputFormat::Srt => {
                write!(
                    self.writer,
                    "{}{nl}{} --> {}{nl}",
                    self.cue_index,
                    srt_time(cue.start_ms),
                    srt_time(cue.end_ms)
                )?;
                for line in &cue.lines {
                    write!(self.writer, "{line}{nl}")?;
                }
                write!(self.writer, "{nl}")?;
            }
            OutputFormat::Sami => {
                write!(
                    self.writer,
                    "<SYNC start={}><P class=\"UNKNOWNCC\">{nl}{}{nl}</P></SYNC>{nl}\
                     <SYNC start={}><P class=\"UNKNOWNCC\">&nbsp;</P></SYNC>{nl}{nl}",
                    cue.start_ms.max(0),
                    cue.lines.join(&format!("<br>{nl}")),
                    cue.end_ms.max(0)
                )?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.format == OutputFormat::Sami {
            let nl = self.encoder.line_terminator();
            write!(self.writer, "</BODY></SAMI>{nl}")?;
        }
        self.writer.flush()
    }

    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.writer.flush()
    }
}

/// `HH:MM:SS,mmm`, negative times clamp to zero
pub fn srt_time(ms: i64) -> String {
    let ms = ms.max(0);
    let (h, rem) = (ms / 3_600_000, ms % 3_600_000);
    let (m, rem) = (rem / 60_000, rem % 60_000);
    let (s, millis) = (rem / 1000, rem % 1000);
    format!("{h:02}:{m:02}:{s:02},{millis:03}")
}
