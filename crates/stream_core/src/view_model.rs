use crate::{AnalysisStage, ProgressState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Active,
    Pending,
    Failed,
}

/// One row of the expanded stage stepper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageStep {
    pub stage: AnalysisStage,
    pub status: StepStatus,
}

/// Per-stage status for every running stage, derived from a progress state.
pub fn stage_steps(state: &ProgressState) -> Vec<StageStep> {
    AnalysisStage::RUNNING
        .iter()
        .enumerate()
        .map(|(index, &stage)| {
            let status = match state.stage_index {
                Some(current) if index < current => StepStatus::Done,
                Some(current) if index == current => {
                    if state.is_error {
                        StepStatus::Failed
                    } else if state.is_terminal {
                        StepStatus::Done
                    } else {
                        StepStatus::Active
                    }
                }
                _ => StepStatus::Pending,
            };
            StageStep { stage, status }
        })
        .collect()
}
