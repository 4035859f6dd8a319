use std::rc::Rc;

use log::debug;

use super::ServiceDecoderState;
use crate::charset::ConverterFactory;
use crate::constants::{LOG_TARGET, MAX_SERVICES};
use crate::error::Result;
use crate::sink::SinkFactory;
use crate::types::{DtvccSettings, ServiceSet};

/// Fixed array of service slots; only enabled slots are ever populated
pub struct ServiceRegistry {
    services_active: ServiceSet,
    decoders: [Option<ServiceDecoderState>; MAX_SERVICES],
}

impl ServiceRegistry {
    /// Build one pipeline per enabled service, in ascending slot order.
    ///
    /// A converter that cannot be opened aborts provisioning; slots already
    /// built are released when the partial registry is dropped.
    pub fn provision(
        settings: &DtvccSettings,
        converters: &dyn ConverterFactory,
        sinks: Rc<dyn SinkFactory>,
    ) -> Result<Self> {
        let mut registry = Self {
            services_active: settings.services_enabled,
            decoders: std::array::from_fn(|_| None),
        };
        for index in settings.services_enabled.indices() {
            let state = ServiceDecoderState::open(index, settings, converters, sinks.clone())?;
            registry.decoders[index] = Some(state);
        }
        Ok(registry)
    }

    pub fn services_active(&self) -> &ServiceSet {
        &self.services_active
    }

    pub fn is_active(&self, index: usize) -> bool {
        self.services_active.is_enabled(index)
    }

    pub fn get(&self, index: usize) -> Option<&ServiceDecoderState> {
        if !self.is_active(index) {
            return None;
        }
        self.decoders.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut ServiceDecoderState> {
        if !self.is_active(index) {
            return None;
        }
        self.decoders.get_mut(index)?.as_mut()
    }

    pub fn active_mut(&mut self) -> impl Iterator<Item = &mut ServiceDecoderState> + '_ {
        self.decoders.iter_mut().filter_map(Option::as_mut)
    }

    /// Discard buffered window text of every service
    pub fn reset_all(&mut self) {
        for state in self.active_mut() {
            state.reset_windows();
        }
    }

    /// Release every provisioned service. Slots that were never enabled are not touched.
    pub fn teardown(mut self) {
        debug!(target: LOG_TARGET, "cleaning up {} services", self.services_active.count());
        for index in self.services_active.indices() {
            if let Some(mut state) = self.decoders[index].take() {
                state.release();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use crate::error::DtvccError;
    use crate::testing::{RecordingConverters, RecordingSinks};

    fn settings(numbers: &[usize]) -> DtvccSettings {
        let mut s = DtvccSettings::new(ServiceSet::from_service_numbers(numbers).unwrap());
        s.basefilename = PathBuf::from("out/movie.mpg");
        s
    }

    #[test]
    fn test_provision_only_enabled_slots() {
        let registry = ServiceRegistry::provision(
            &settings(&[1, 4, 8]),
            &RecordingConverters::default(),
            Rc::new(RecordingSinks::default()),
        )
        .unwrap();

        for index in 0..MAX_SERVICES {
            assert_eq!(registry.get(index).is_some(), [0, 3, 7].contains(&index), "slot {index}");
        }
        assert_eq!(registry.get(3).unwrap().filename(), Some(Path::new("out/movie_4.srt")));
        assert!(registry.get(MAX_SERVICES).is_none());
    }

    #[test]
    fn test_teardown_closes_everything_once() {
        let converters = RecordingConverters::default();
        let sinks = RecordingSinks::default();
        let mut s = settings(&[1, 4, 8]);
        s.set_service_charset(0, "CS-A");
        s.set_service_charset(3, "CS-B");
        s.set_service_charset(7, "CS-C");
        // charset configured for a disabled slot is ignored
        s.set_service_charset(5, "CS-UNUSED");

        let mut registry = ServiceRegistry::provision(&s, &converters, Rc::new(sinks.clone())).unwrap();
        for index in [0, 3, 7] {
            registry.get_mut(index).unwrap().handle_block(b"TEXT\x03").unwrap();
        }
        registry.teardown();

        let conv = converters.log.borrow();
        assert_eq!(conv.opened, vec!["CS-A", "CS-B", "CS-C"]);
        let mut closed = conv.closed.clone();
        closed.sort();
        assert_eq!(closed, conv.opened);

        let log = sinks.log.borrow();
        let mut created = log.created.clone();
        let mut closed = log.closed.clone();
        created.sort();
        closed.sort();
        assert_eq!(
            created,
            vec![
                PathBuf::from("out/movie_1.srt"),
                PathBuf::from("out/movie_4.srt"),
                PathBuf::from("out/movie_8.srt"),
            ]
        );
        assert_eq!(closed, created);
        assert_eq!(log.finished.len(), 3);
    }

    #[test]
    fn test_teardown_never_closes_stdout() {
        let sinks = RecordingSinks::default();
        let converters = RecordingConverters::default();
        let mut s = settings(&[2, 3]);
        s.cc_to_stdout = true;
        s.all_services_charset = Some("GLOBAL".into());

        let mut registry = ServiceRegistry::provision(&s, &converters, Rc::new(sinks.clone())).unwrap();
        registry.get_mut(1).unwrap().handle_block(b"PENDING").unwrap();
        registry.teardown();

        let log = sinks.log.borrow();
        assert_eq!(log.stdout_bound, 2);
        assert_eq!(log.stdout_closed, 0);
        assert!(log.closed.is_empty());
        assert!(log.finished.is_empty());
        // output already started on stdout, so the pending window is flushed
        assert_eq!(log.cues.values().map(Vec::len).sum::<usize>(), 1);
        assert_eq!(converters.log.borrow().closed.len(), 2);
    }

    #[test]
    fn test_unused_service_opens_no_file() {
        let sinks = RecordingSinks::default();
        let mut registry =
            ServiceRegistry::provision(&settings(&[1]), &RecordingConverters::default(), Rc::new(sinks.clone()))
                .unwrap();
        // text that never got flushed to a file is dropped at teardown
        registry.get_mut(0).unwrap().handle_block(b"LOST").unwrap();
        registry.teardown();

        let log = sinks.log.borrow();
        assert!(log.created.is_empty());
        assert!(log.closed.is_empty());
    }

    #[test]
    fn test_flush_error_does_not_stop_teardown() {
        let sinks = RecordingSinks {
            fail_writes_to: Some(PathBuf::from("out/movie_1.srt")),
            ..Default::default()
        };
        let mut registry =
            ServiceRegistry::provision(&settings(&[1, 2]), &RecordingConverters::default(), Rc::new(sinks.clone()))
                .unwrap();

        let err = registry.get_mut(0).unwrap().handle_block(b"A\x03B").unwrap_err();
        assert!(matches!(err, DtvccError::Io { .. }));
        // left pending; the final flush of service 1 fails too
        registry.get_mut(0).unwrap().handle_block(b"B").unwrap();
        registry.get_mut(1).unwrap().handle_block(b"C\x03").unwrap();
        registry.teardown();

        let log = sinks.log.borrow();
        assert_eq!(log.closed.len(), 2);
        assert_eq!(log.created.len(), log.closed.len());
    }

    #[test]
    fn test_failed_provision_releases_earlier_services() {
        let converters = RecordingConverters { fail_on: Some("BAD".into()), ..Default::default() };
        let mut s = settings(&[1, 2, 3]);
        s.set_service_charset(0, "GOOD");
        s.set_service_charset(2, "BAD");

        let result = ServiceRegistry::provision(&s, &converters, Rc::new(RecordingSinks::default()));
        assert!(matches!(result, Err(DtvccError::ConverterOpen { .. })));
        let log = converters.log.borrow();
        assert_eq!(log.opened, vec!["GOOD"]);
        assert_eq!(log.closed, vec!["GOOD"]);
    }

    #[test]
    fn test_reset_all_drops_window_text() {
        let mut registry = ServiceRegistry::provision(
            &settings(&[1, 2]),
            &RecordingConverters::default(),
            Rc::new(RecordingSinks::default()),
        )
        .unwrap();
        registry.get_mut(0).unwrap().handle_block(b"abc").unwrap();
        registry.get_mut(1).unwrap().handle_block(b"def").unwrap();
        registry.reset_all();
        assert!(registry.active_mut().all(|s| s.windows().iter().all(|w| !w.memory_reserved())));
    }
}
