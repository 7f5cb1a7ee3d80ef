/// A labelled input control discovered on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledInput {
    pub id: String,
    pub label: String,
}

/// Outcome of one targeted control during a fill pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// Value written into the control.
    Filled { label: String, value: String },
    /// Mapped value was empty; the control keeps whatever it had.
    LeftEmpty { label: String },
    /// Label already consumed its single write earlier in the pass.
    Duplicate { label: String },
    /// The control failed individually; the pass continued.
    Failed { label: String, reason: String },
}

/// Collected outcomes of one fill pass over the mapped labels.
#[derive(Debug, Clone, Default)]
pub struct FillReport {
    pub outcomes: Vec<FillOutcome>,
}

impl FillReport {
    pub fn filled(&self) -> usize {
        self.count(|o| matches!(o, FillOutcome::Filled { .. }))
    }

    pub fn left_empty(&self) -> usize {
        self.count(|o| matches!(o, FillOutcome::LeftEmpty { .. }))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|o| matches!(o, FillOutcome::Duplicate { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FillOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&FillOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}
