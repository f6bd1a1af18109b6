#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ProgressPhase {
    Discovery,
    Enumeration,
    Cache,
}

#[derive(Clone, Debug)]
pub enum ProgressMessage {
    Started {
        phase: ProgressPhase,
        total: usize,
    },
    Progress {
        phase: ProgressPhase,
        current: usize,
        item: Option<String>,
    },
    Finished {
        phase: ProgressPhase,
    },
    Warning(String),
}
