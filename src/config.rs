//! Configuration file loading.
//!
//! ```toml
//! services = [1, 2]
//! charset = "ISO-8859-1"      # applies to every service
//! output_base = "out/show.ts"
//! format = "srt"              # transcript | srt | sami
//! stdout = false
//! report = true
//!
//! [charsets]
//! 2 = "EUC-KR"
//!
//! [encoder]
//! crlf = true
//! write_bom = false
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Deserialize;

use crate::constants::MAX_SERVICES;
use crate::error::{DtvccError, Result};
use crate::types::{DtvccSettings, EncoderConfig, OutputFormat, ServiceSet};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DtvccConfig {
    /// 1-based service numbers to decode
    pub services: Vec<usize>,
    pub charset: Option<String>,
    /// service number -> charset
    pub charsets: BTreeMap<String, String>,
    pub output_base: Option<PathBuf>,
    pub stdout: bool,
    pub format: Option<OutputFormat>,
    pub report: bool,
    pub encoder: EncoderConfig,
}

impl DtvccConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| DtvccError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| DtvccError::Config(e.to_string()))
    }

    pub fn into_settings(self) -> Result<DtvccSettings> {
        let services = ServiceSet::from_service_numbers(&self.services)?;
        let mut settings = DtvccSettings::new(services);
        settings.all_services_charset = self.charset;
        for (key, charset) in self.charsets {
            let service: usize = key
                .trim()
                .parse()
                .map_err(|_| DtvccError::Config(format!("charset key {key:?} is not a service number")))?;
            if service == 0 || service > MAX_SERVICES {
                return Err(DtvccError::Config(format!(
                    "charset for service {service} outside 1..={MAX_SERVICES}"
                )));
            }
            settings.set_service_charset(service - 1, charset);
        }
        if let Some(base) = self.output_base {
            settings.basefilename = base;
        }
        settings.cc_to_stdout = self.stdout;
        if let Some(format) = self.format {
            settings.output_format = format;
        }
        settings.print_file_reports = self.report;
        settings.encoder = Rc::new(self.encoder);
        Ok(settings)
    }
}
