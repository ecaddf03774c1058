use crate::stage::{normalize, AnalysisStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    /// Position among the running stages; `None` for error/cancelled tags.
    pub stage_index: Option<usize>,
    /// 0..=100.
    pub percent: u8,
    pub is_terminal: bool,
    pub is_error: bool,
}

/// Derives the progress indicator for a canonical stage.
///
/// An error freezes the state at the stage it happened in, regardless of which
/// stage that was.
pub fn progress(stage: AnalysisStage, has_error: bool) -> ProgressState {
    let stage_index = stage.index();

    if has_error || stage == AnalysisStage::Error {
        return ProgressState {
            stage_index,
            percent: stage_index.map(percent_at).unwrap_or(0),
            is_terminal: true,
            is_error: true,
        };
    }

    match stage {
        AnalysisStage::Final => ProgressState {
            stage_index,
            percent: 100,
            is_terminal: true,
            is_error: false,
        },
        AnalysisStage::Cancelled => ProgressState {
            stage_index: None,
            percent: 0,
            is_terminal: true,
            is_error: false,
        },
        _ => ProgressState {
            stage_index,
            percent: stage_index.map(percent_at).unwrap_or(0),
            is_terminal: false,
            is_error: false,
        },
    }
}

/// [`progress`] for a raw, not yet normalized label.
pub fn progress_for_label(raw: &str, has_error: bool) -> ProgressState {
    progress(normalize(raw), has_error)
}

fn percent_at(index: usize) -> u8 {
    let last = AnalysisStage::RUNNING.len() - 1;
    (index.min(last) * 100 / last) as u8
}

/// Progress of one analysis run fed with successive stage observations.
///
/// Percent never moves backwards within a run. `Starting` begins a new run,
/// and so does any observation after a terminal state. Error and cancellation
/// keep the percent reached so far.
#[derive(Debug, Clone, Default)]
pub struct RunProgress {
    current: Option<ProgressState>,
}

impl RunProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ProgressState> {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = None;
    }

    pub fn observe_label(&mut self, raw: &str, has_error: bool) -> ProgressState {
        self.observe(normalize(raw), has_error)
    }

    pub fn observe(&mut self, stage: AnalysisStage, has_error: bool) -> ProgressState {
        let next = progress(stage, has_error);
        let state = match self.current {
            None => next,
            Some(prev) if prev.is_terminal => next,
            Some(_) if stage == AnalysisStage::Starting && !has_error => next,
            Some(prev) if next.is_error || stage == AnalysisStage::Cancelled => ProgressState {
                stage_index: prev.stage_index,
                percent: prev.percent,
                is_terminal: true,
                is_error: next.is_error,
            },
            Some(prev) if next.percent < prev.percent => prev,
            Some(_) => next,
        };
        self.current = Some(state);
        state
    }
}
