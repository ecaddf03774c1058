use std::fmt;

/// Canonical analysis pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisStage {
    Starting,
    Analyst,
    Debate,
    Risk,
    Final,
    Error,
    Cancelled,
}

impl AnalysisStage {
    /// Running stages in pipeline order.
    pub const RUNNING: [AnalysisStage; 5] = [
        AnalysisStage::Starting,
        AnalysisStage::Analyst,
        AnalysisStage::Debate,
        AnalysisStage::Risk,
        AnalysisStage::Final,
    ];

    /// Position in [`AnalysisStage::RUNNING`]; `None` for terminal tags.
    pub fn index(self) -> Option<usize> {
        Self::RUNNING.iter().position(|stage| *stage == self)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AnalysisStage::Final | AnalysisStage::Error | AnalysisStage::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStage::Starting => "starting",
            AnalysisStage::Analyst => "analyst",
            AnalysisStage::Debate => "debate",
            AnalysisStage::Risk => "risk",
            AnalysisStage::Final => "final",
            AnalysisStage::Error => "error",
            AnalysisStage::Cancelled => "cancelled",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "starting" => Some(AnalysisStage::Starting),
            "analyst" => Some(AnalysisStage::Analyst),
            "debate" => Some(AnalysisStage::Debate),
            "risk" => Some(AnalysisStage::Risk),
            "final" => Some(AnalysisStage::Final),
            "error" => Some(AnalysisStage::Error),
            "cancelled" => Some(AnalysisStage::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a raw label; `recognized` is false when the label
/// fell back to [`AnalysisStage::Starting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageLabel {
    pub stage: AnalysisStage,
    pub recognized: bool,
}

/// Maps a raw backend label such as `"stage_analyst"` or
/// `"starting (quick scan)"` to its canonical stage.
pub fn normalize(raw: &str) -> AnalysisStage {
    classify(raw).stage
}

/// Like [`normalize`], but also reports whether the leading token was known.
pub fn classify(raw: &str) -> StageLabel {
    let lowered = raw
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let token = lowered.strip_prefix("stage_").unwrap_or(&lowered);

    match AnalysisStage::from_token(token) {
        Some(stage) => StageLabel {
            stage,
            recognized: true,
        },
        None => StageLabel {
            stage: AnalysisStage::Starting,
            recognized: false,
        },
    }
}
