use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, warn};

use crate::charset::{ConverterFactory, EncodingConverterFactory};
use crate::constants::LOG_TARGET;
use crate::error::Result;
use crate::parsers::ServiceBlockDemuxer;
use crate::processor::{DecoderSession, PacketAssembler, PacketDecoder};
use crate::service::ServiceRegistry;
use crate::sink::{SinkFactory, StdSinkFactory};
use crate::stats::DtvccReport;
use crate::types::{CaptionClock, DtvccSettings, EncoderConfig, ServiceSet};

/// External capabilities a session is built with
pub struct Collaborators {
    pub decoder: Box<dyn PacketDecoder>,
    pub converters: Box<dyn ConverterFactory>,
    pub sinks: Rc<dyn SinkFactory>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            decoder: Box::new(ServiceBlockDemuxer::new()),
            converters: Box::new(EncodingConverterFactory),
            sinks: Rc::new(StdSinkFactory),
        }
    }
}

/// One decoding session: packet assembly, the service pipelines and the
/// state shared between calls
pub struct DtvccContext {
    is_active: bool,
    report_enabled: bool,
    active_services_count: usize,
    last_sequence: Option<u8>,
    assembler: PacketAssembler,
    services: ServiceRegistry,
    decoder: Box<dyn PacketDecoder>,
    report: Rc<RefCell<DtvccReport>>,
    encoder: Rc<EncoderConfig>,
    timing: Rc<CaptionClock>,
}

impl DtvccContext {
    /// Provision every enabled service. Fails if a charset converter cannot be opened.
    pub fn new(settings: &DtvccSettings, collaborators: Collaborators) -> Result<Self> {
        debug!(target: LOG_TARGET, "initializing dtvcc decoder");
        settings.report.borrow_mut().reset_count = 0;

        let services =
            ServiceRegistry::provision(settings, collaborators.converters.as_ref(), collaborators.sinks.clone())?;
        let mut assembler = PacketAssembler::new();
        assembler.clear();

        Ok(Self {
            is_active: false,
            report_enabled: settings.print_file_reports,
            active_services_count: settings.active_services_count,
            last_sequence: None,
            assembler,
            services,
            decoder: collaborators.decoder,
            report: settings.report.clone(),
            encoder: settings.encoder.clone(),
            timing: settings.timing.clone(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    pub fn report_enabled(&self) -> bool {
        self.report_enabled
    }

    pub fn services_active(&self) -> &ServiceSet {
        self.services.services_active()
    }

    pub fn active_services_count(&self) -> usize {
        self.active_services_count
    }

    pub fn last_sequence(&self) -> Option<u8> {
        self.last_sequence
    }

    pub fn current_packet(&self) -> &[u8] {
        self.assembler.packet()
    }

    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    pub fn report(&self) -> Rc<RefCell<DtvccReport>> {
        self.report.clone()
    }

    pub fn encoder(&self) -> &EncoderConfig {
        &self.encoder
    }

    pub fn timing(&self) -> &CaptionClock {
        &self.timing
    }

    /// Feed caption tuples from one frame. No-op unless the session is
    /// active or collecting reports.
    pub fn process_data(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_active && !self.report_enabled {
            return Ok(());
        }
        let Self { assembler, services, decoder, last_sequence, report, .. } = self;
        let mut report = report.borrow_mut();
        assembler.process_data(data, &mut report, |packet, report| {
            dispatch(&mut **decoder, packet, services, last_sequence, report)
        })
    }

    /// Hand over the packet in progress, e.g. at end of stream
    pub fn flush_packet(&mut self) -> Result<()> {
        if !self.is_active && !self.report_enabled {
            return Ok(());
        }
        let Self { assembler, services, decoder, last_sequence, report, .. } = self;
        let mut report = report.borrow_mut();
        assembler.flush(&mut report, &mut |packet: &[u8], report: &mut DtvccReport| {
            dispatch(&mut **decoder, packet, services, last_sequence, report)
        })
    }

    /// End the session, releasing every service pipeline
    pub fn free(self) {
        debug!(target: LOG_TARGET, "dtvcc_free: cleaning up");
        self.services.teardown();
    }
}

fn dispatch(
    decoder: &mut dyn PacketDecoder,
    packet: &[u8],
    services: &mut ServiceRegistry,
    last_sequence: &mut Option<u8>,
    report: &mut DtvccReport,
) -> Result<()> {
    let mut session = DecoderSession { services, last_sequence, report };
    match decoder.handle_packet(packet, &mut session) {
        Err(e) if !e.is_fatal() => {
            warn!(target: LOG_TARGET, "packet dropped: {e}");
            Ok(())
        }
        other => other,
    }
}
