use std::fmt;

/// The stages of an analysis pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Graph,
    Voxelization,
    Pairing,
    Pathfinding,
    SpatialIndex,
    Hindrance,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Graph => "Building bond graph",
            Self::Voxelization => "Voxelizing structure",
            Self::Pairing => "Ordering pairs",
            Self::Pathfinding => "Searching paths",
            Self::SpatialIndex => "Indexing voxels",
            Self::Hindrance => "Flagging hindrance",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart { phase: Phase },
    PhaseFinish { phase: Phase },

    TaskStart { total_steps: u64 },
    TaskIncrement,
    TaskFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards progress events to an optional callback.
///
/// The callback is `Send + Sync` so that parallel pair searches may report increments
/// from worker threads.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Runs `body` between a `PhaseStart` and a `PhaseFinish` event.
    ///
    /// `PhaseFinish` is only reported when `body` succeeds.
    pub fn phase<T, E>(&self, phase: Phase, body: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        self.report(Progress::PhaseStart { phase });
        let value = body()?;
        self.report(Progress::PhaseFinish { phase });
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording() -> (ProgressReporter<'static>, Arc<Mutex<Vec<Progress>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let reporter =
            ProgressReporter::with_callback(Box::new(move |e| sink.lock().unwrap().push(e)));
        (reporter, events)
    }

    #[test]
    fn reporter_without_callback_is_silent() {
        ProgressReporter::new().report(Progress::TaskIncrement);
    }

    #[test]
    fn phase_wraps_body_in_start_and_finish() {
        let (reporter, events) = recording();
        let value: Result<u32, ()> = reporter.phase(Phase::Graph, || {
            reporter.report(Progress::Message("inside".into()));
            Ok(7)
        });
        assert_eq!(value, Ok(7));
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                Progress::PhaseStart { phase: Phase::Graph },
                Progress::Message("inside".into()),
                Progress::PhaseFinish { phase: Phase::Graph },
            ]
        );
    }

    #[test]
    fn failed_phase_does_not_report_finish() {
        let (reporter, events) = recording();
        let value: Result<(), &str> = reporter.phase(Phase::Hindrance, || Err("boom"));
        assert_eq!(value, Err("boom"));
        assert_eq!(
            *events.lock().unwrap(),
            vec![Progress::PhaseStart {
                phase: Phase::Hindrance
            }]
        );
    }

    #[test]
    fn phase_labels_are_human_readable() {
        assert_eq!(Phase::SpatialIndex.to_string(), "Indexing voxels");
    }
}
