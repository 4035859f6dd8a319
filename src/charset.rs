//! Character set conversion capability used by service pipelines

use encoding_rs::Encoding;
use log::debug;

use crate::constants::LOG_TARGET;
use crate::error::{DtvccError, Result};

pub const UTF8: &str = "UTF-8";

/// An open transcoding resource for one source charset, producing UTF-8
pub trait CharsetConverter {
    fn charset(&self) -> &str;

    /// Convert a run of caption bytes to UTF-8; undecodable bytes become U+FFFD
    fn convert(&mut self, input: &[u8]) -> String;

    /// Release the converter. Called exactly once per opened converter.
    fn close(self: Box<Self>);
}

/// Opens converters during service provisioning
pub trait ConverterFactory {
    fn open(&self, to: &str, from: &str) -> Result<Box<dyn CharsetConverter>>;
}

/// Converters backed by the WHATWG encodings in `encoding_rs`
#[derive(Debug, Default, Clone, Copy)]
pub struct EncodingConverterFactory;

impl ConverterFactory for EncodingConverterFactory {
    fn open(&self, to: &str, from: &str) -> Result<Box<dyn CharsetConverter>> {
        if !to.eq_ignore_ascii_case(UTF8) {
            return Err(DtvccError::ConverterOpen {
                charset: from.to_string(),
                reason: format!("unsupported target encoding {to}"),
            });
        }
        let encoding = Encoding::for_label(from.trim().as_bytes()).ok_or_else(|| {
            DtvccError::ConverterOpen {
                charset: from.to_string(),
                reason: "unknown charset label".to_string(),
            }
        })?;
        debug!(target: LOG_TARGET, "opened converter {} -> {to}", encoding.name());
        Ok(Box::new(EncodingConverter { label: from.to_string(), encoding }))
    }
}

pub struct EncodingConverter {
    label: String,
    encoding: &'static Encoding,
}

impl CharsetConverter for EncodingConverter {
    fn charset(&self) -> &str {
        &self.label
    }

    fn convert(&mut self, input: &[u8]) -> String {
        let (text, had_errors) = self.encoding.decode_without_bom_handling(input);
        if had_errors {
            debug!(target: LOG_TARGET, "malformed {} sequence replaced", self.encoding.name());
        }
        text.into_owned()
    }

    fn close(self: Box<Self>) {
        debug!(target: LOG_TARGET, "closed converter for {}", self.label);
    }
}
