//! Keyword-matched content templates.
//!
//! Every generator here is a pure function from free text to canned data.
//! Matching is always the same: lower-case the input, walk an ordered table
//! of keyword groups, and the first group with any keyword present as a
//! substring wins. Each table carries a mandatory default, so selection is
//! total.
//!
//! ```text
//! "Learn to travel"  --lower-->  "learn to travel"
//!      business? no -> learning? "learn" yes -> Learning
//! ```

pub mod deployment;
pub mod execution;
pub mod plans;
pub mod research;

pub use deployment::{build_log, deployment_slug, simulate_deployment};
pub use execution::{
    CodeType, api_call_output, detect_code_type, execution_outputs, generate_code, scaffold_files,
    script_output,
};
pub use plans::{
    PlanStepDraft, PlanTemplate, SubTaskDraft, SubTaskTemplate, select_plan_template,
    select_subtask_template,
};
pub use research::{
    ResearchDepth, ResearchDepthParseError, ResearchTopic, fallback_findings, research_findings,
};

/// One row of a [`KeywordTable`]: if any keyword occurs in the input, the
/// row's value is selected.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule<T: 'static> {
    pub keywords: &'static [&'static str],
    pub value: T,
}

/// An ordered list of keyword rules with a fallback value.
///
/// Keywords must be lower-case; the input is lower-cased before matching.
#[derive(Debug, Clone, Copy)]
pub struct KeywordTable<T: 'static> {
    rules: &'static [KeywordRule<T>],
    default: T,
}

impl<T: Copy> KeywordTable<T> {
    pub const fn new(rules: &'static [KeywordRule<T>], default: T) -> Self {
        Self { rules, default }
    }

    /// Return the value of the first rule matching `text`, or the default.
    pub fn select(&self, text: &str) -> T {
        let lower = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|kw| lower.contains(kw)))
            .map_or(self.default, |rule| rule.value)
    }

    /// The rules in evaluation order.
    pub fn rules(&self) -> &'static [KeywordRule<T>] {
        self.rules
    }

    /// The value returned when nothing matches.
    pub fn default_value(&self) -> T {
        self.default
    }
}
