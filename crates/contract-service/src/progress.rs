use serde::Serialize;

/// One step of a running pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub stage: String,
    /// 0..=100
    pub percent: u8,
}

impl Progress {
    pub fn new(stage: impl Into<String>, percent: u8) -> Self {
        Self {
            stage: stage.into(),
            percent: percent.min(100),
        }
    }
}

/// Receives progress events from a pipeline
pub type ProgressFn<'a> = &'a (dyn Fn(Progress) + Send + Sync);

/// Discards progress events
pub fn ignore_progress(_: Progress) {}
