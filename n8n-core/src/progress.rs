/// 操作进度阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStep {
    CleaningBackups,
    CreatingBackup,
    StoppingService,
    RemovingPackage,
    InstallingPackage,
    RestoringPackage,
    RestoringUserData,
    RestoringServiceConfig,
    StartingService,
    WaitingForService,
    ProbingHttp { attempt: u32, max: u32 },
    Completed,
    Failed(String),
}

pub type ProgressCallback = Box<dyn Fn(OperationStep, &str) + Send + Sync>;

pub(crate) fn send_progress(
    progress_callback: Option<&ProgressCallback>,
    step: OperationStep,
    message: &str,
) {
    if let Some(callback) = progress_callback {
        callback(step, message);
    }
}
