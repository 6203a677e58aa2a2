use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No deadline; initial state and the target of `reset`.
    #[default]
    Idle,
    Work,
    Rest,
    /// Goal reached. Terminal until reset.
    Done,
}

impl Phase {
    /// `Work` and `Rest` are the only phases with a live deadline.
    pub fn is_running(self) -> bool {
        matches!(self, Phase::Work | Phase::Rest)
    }

    /// The phase that follows this one in the work/rest alternation.
    pub fn opposite(self) -> Option<Phase> {
        match self {
            Phase::Work => Some(Phase::Rest),
            Phase::Rest => Some(Phase::Work),
            Phase::Idle | Phase::Done => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Work => "Work",
            Phase::Rest => "Rest",
            Phase::Done => "Done",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_work_and_rest_run() {
        assert!(Phase::Work.is_running());
        assert!(Phase::Rest.is_running());
        assert!(!Phase::Idle.is_running());
        assert!(!Phase::Done.is_running());
    }

    #[test]
    fn alternation() {
        assert_eq!(Phase::Work.opposite(), Some(Phase::Rest));
        assert_eq!(Phase::Rest.opposite(), Some(Phase::Work));
        assert_eq!(Phase::Done.opposite(), None);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Phase::Rest).unwrap(), "\"rest\"");
    }
}
