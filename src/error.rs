use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GcError {
    ScanInProgress,
    LivenessStateAllocation,
}

impl GcError {
    pub fn message(&self) -> &'static str {
        match self {
            GcError::ScanInProgress => "an object scan is already in flight",
            GcError::LivenessStateAllocation => "runtime failed to allocate liveness state",
        }
    }
}

impl fmt::Display for GcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for GcError {}
