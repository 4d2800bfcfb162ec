//! Plan-step and sub-task templates.

use waypoint_db::models::Priority;
use waypoint_db::queries::plans::NewTaskPlan;
use waypoint_db::queries::sub_tasks::NewSubTask;

use super::{KeywordRule, KeywordTable};

/// A plan step before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanStepDraft {
    pub title: &'static str,
    pub description: &'static str,
    pub estimated_duration: &'static str,
    pub priority: Priority,
}

impl PlanStepDraft {
    /// Insert parameters for this draft at `position`.
    pub fn to_new(&self, position: i32) -> NewTaskPlan {
        NewTaskPlan {
            title: self.title.to_owned(),
            description: self.description.to_owned(),
            position,
            estimated_duration: self.estimated_duration.to_owned(),
            priority: self.priority,
        }
    }
}

/// A sub-task before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubTaskDraft {
    pub title: &'static str,
    pub description: &'static str,
}

impl SubTaskDraft {
    pub fn to_new(&self, position: i32) -> NewSubTask {
        NewSubTask {
            title: self.title.to_owned(),
            description: self.description.to_owned(),
            position,
        }
    }
}

// ---------------------------------------------------------------------------
// Plan templates
// ---------------------------------------------------------------------------

/// The five plan templates a goal can expand into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanTemplate {
    Business,
    Learning,
    Travel,
    Event,
    Generic,
}

/// Goal keyword groups, in precedence order.
pub const PLAN_TABLE: KeywordTable<PlanTemplate> = KeywordTable::new(
    &[
        KeywordRule {
            keywords: &["business", "startup", "company"],
            value: PlanTemplate::Business,
        },
        KeywordRule {
            keywords: &["learn", "study", "development"],
            value: PlanTemplate::Learning,
        },
        KeywordRule {
            keywords: &["travel", "vacation", "trip"],
            value: PlanTemplate::Travel,
        },
        KeywordRule {
            keywords: &["event", "party", "fundrais"],
            value: PlanTemplate::Event,
        },
    ],
    PlanTemplate::Generic,
);

impl PlanTemplate {
    pub fn steps(self) -> &'static [PlanStepDraft; 5] {
        match self {
            Self::Business => &BUSINESS_STEPS,
            Self::Learning => &LEARNING_STEPS,
            Self::Travel => &TRAVEL_STEPS,
            Self::Event => &EVENT_STEPS,
            Self::Generic => &GENERIC_STEPS,
        }
    }
}

/// Pick the plan template for a goal and return its five steps in order.
pub fn select_plan_template(goal_text: &str) -> Vec<PlanStepDraft> {
    PLAN_TABLE.select(goal_text).steps().to_vec()
}

const BUSINESS_STEPS: [PlanStepDraft; 5] = [
    PlanStepDraft {
        title: "Market Research & Validation",
        description: "Research your target market, analyze competitors, and validate demand for your product or service.",
        estimated_duration: "2-3 weeks",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Business Plan Development",
        description: "Write a business plan covering your value proposition, revenue model, operations and financial projections.",
        estimated_duration: "2-4 weeks",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Legal Structure & Registration",
        description: "Choose a legal structure, register the business, and obtain the required licenses and permits.",
        estimated_duration: "1-2 weeks",
        priority: Priority::Medium,
    },
    PlanStepDraft {
        title: "Funding & Financial Setup",
        description: "Secure initial funding, open business bank accounts, and set up bookkeeping.",
        estimated_duration: "3-6 weeks",
        priority: Priority::Medium,
    },
    PlanStepDraft {
        title: "Launch & Marketing",
        description: "Build your brand, launch to your first customers, and run initial marketing campaigns.",
        estimated_duration: "4-8 weeks",
        priority: Priority::High,
    },
];

const LEARNING_STEPS: [PlanStepDraft; 5] = [
    PlanStepDraft {
        title: "Foundation & Prerequisites",
        description: "Assess what you already know and cover the fundamentals the subject builds on.",
        estimated_duration: "2-3 weeks",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Structured Learning Path",
        description: "Follow a structured curriculum of courses, books and tutorials at a steady pace.",
        estimated_duration: "8-12 weeks",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Practical Application",
        description: "Apply what you learn through hands-on projects and exercises.",
        estimated_duration: "6-10 weeks",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Advanced Topics",
        description: "Deepen your expertise with advanced concepts and a specialization.",
        estimated_duration: "4-8 weeks",
        priority: Priority::Medium,
    },
    PlanStepDraft {
        title: "Community & Networking",
        description: "Join communities, find mentors, and share your work with others.",
        estimated_duration: "Ongoing",
        priority: Priority::Low,
    },
];

const TRAVEL_STEPS: [PlanStepDraft; 5] = [
    PlanStepDraft {
        title: "Destination Research",
        description: "Research destinations, seasons, local customs and must-see attractions.",
        estimated_duration: "1-2 weeks",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Budget & Itinerary Planning",
        description: "Set a realistic budget and draft a day-by-day itinerary.",
        estimated_duration: "1 week",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Bookings & Reservations",
        description: "Book flights, accommodation and the activities that sell out early.",
        estimated_duration: "1-2 weeks",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Travel Documents & Health",
        description: "Check passports and visas, buy travel insurance and get any required vaccinations.",
        estimated_duration: "2-6 weeks",
        priority: Priority::Medium,
    },
    PlanStepDraft {
        title: "Packing & Final Preparations",
        description: "Pack, arrange things at home, and confirm every reservation.",
        estimated_duration: "3-5 days",
        priority: Priority::Low,
    },
];

const EVENT_STEPS: [PlanStepDraft; 5] = [
    PlanStepDraft {
        title: "Event Concept & Goals",
        description: "Define the purpose, audience, format and success criteria of the event.",
        estimated_duration: "1 week",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Budget & Venue Selection",
        description: "Set the budget and book a venue that fits the guest count and date.",
        estimated_duration: "2-4 weeks",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Vendors & Logistics",
        description: "Arrange catering, equipment, entertainment and transport.",
        estimated_duration: "2-3 weeks",
        priority: Priority::Medium,
    },
    PlanStepDraft {
        title: "Promotion & Invitations",
        description: "Send invitations, promote the event and track RSVPs.",
        estimated_duration: "2-4 weeks",
        priority: Priority::Medium,
    },
    PlanStepDraft {
        title: "Event Day Execution",
        description: "Run the day to schedule and follow up with attendees afterwards.",
        estimated_duration: "1-2 days",
        priority: Priority::High,
    },
];

const GENERIC_STEPS: [PlanStepDraft; 5] = [
    PlanStepDraft {
        title: "Define Objectives & Scope",
        description: "Clarify what success looks like and what is out of scope.",
        estimated_duration: "1 week",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Planning & Preparation",
        description: "Break the goal into milestones and gather the resources you need.",
        estimated_duration: "1-2 weeks",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Initial Implementation",
        description: "Start on the first milestones and build momentum.",
        estimated_duration: "2-4 weeks",
        priority: Priority::High,
    },
    PlanStepDraft {
        title: "Progress Review & Adjustment",
        description: "Review progress, collect feedback and adjust the plan.",
        estimated_duration: "1-2 weeks",
        priority: Priority::Medium,
    },
    PlanStepDraft {
        title: "Completion & Reflection",
        description: "Finish the remaining work and write down the lessons learned.",
        estimated_duration: "1 week",
        priority: Priority::Low,
    },
];

// ---------------------------------------------------------------------------
// Sub-task templates
// ---------------------------------------------------------------------------

/// The five sub-task checklists a plan step can expand into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubTaskTemplate {
    MarketValidation,
    BusinessPlan,
    Foundation,
    DestinationResearch,
    Generic,
}

/// Step-title keyword groups, in precedence order.
pub const SUBTASK_TABLE: KeywordTable<SubTaskTemplate> = KeywordTable::new(
    &[
        KeywordRule {
            keywords: &["market research", "validation"],
            value: SubTaskTemplate::MarketValidation,
        },
        KeywordRule {
            keywords: &["business plan"],
            value: SubTaskTemplate::BusinessPlan,
        },
        KeywordRule {
            keywords: &["foundation", "prerequisite"],
            value: SubTaskTemplate::Foundation,
        },
        KeywordRule {
            keywords: &["destination", "research"],
            value: SubTaskTemplate::DestinationResearch,
        },
    ],
    SubTaskTemplate::Generic,
);

impl SubTaskTemplate {
    pub fn items(self) -> &'static [SubTaskDraft; 5] {
        match self {
            Self::MarketValidation => &MARKET_VALIDATION_TASKS,
            Self::BusinessPlan => &BUSINESS_PLAN_TASKS,
            Self::Foundation => &FOUNDATION_TASKS,
            Self::DestinationResearch => &DESTINATION_TASKS,
            Self::Generic => &GENERIC_TASKS,
        }
    }
}

/// Pick the sub-task checklist for a plan step title.
pub fn select_subtask_template(step_title: &str) -> Vec<SubTaskDraft> {
    SUBTASK_TABLE.select(step_title).items().to_vec()
}

const MARKET_VALIDATION_TASKS: [SubTaskDraft; 5] = [
    SubTaskDraft {
        title: "Define target customer personas",
        description: "Describe your ideal customers, their needs and how they buy today.",
    },
    SubTaskDraft {
        title: "Analyze competitors",
        description: "List direct and indirect competitors and compare pricing and positioning.",
    },
    SubTaskDraft {
        title: "Estimate market size",
        description: "Estimate the addressable market and a realistic early share.",
    },
    SubTaskDraft {
        title: "Run customer interviews",
        description: "Talk to at least ten potential customers to confirm the problem is real.",
    },
    SubTaskDraft {
        title: "Summarize validation findings",
        description: "Decide whether to proceed, pivot or stop based on the evidence.",
    },
];

const BUSINESS_PLAN_TASKS: [SubTaskDraft; 5] = [
    SubTaskDraft {
        title: "Write the executive summary",
        description: "One page covering the problem, solution, market and ask.",
    },
    SubTaskDraft {
        title: "Define the revenue model",
        description: "Decide how you charge, what you charge and who pays.",
    },
    SubTaskDraft {
        title: "Draft the operations plan",
        description: "Describe suppliers, staffing, tools and day-to-day processes.",
    },
    SubTaskDraft {
        title: "Build financial projections",
        description: "Project revenue, costs and cash flow for the first three years.",
    },
    SubTaskDraft {
        title: "Review the plan with an advisor",
        description: "Get feedback from a mentor, accountant or experienced founder.",
    },
];

const FOUNDATION_TASKS: [SubTaskDraft; 5] = [
    SubTaskDraft {
        title: "Assess your current skill level",
        description: "Take a short self-assessment or placement quiz.",
    },
    SubTaskDraft {
        title: "Identify core prerequisites",
        description: "List the concepts everything else depends on.",
    },
    SubTaskDraft {
        title: "Gather learning resources",
        description: "Pick one primary course or book and a few references.",
    },
    SubTaskDraft {
        title: "Set up your learning environment",
        description: "Install tools, create accounts and organize a study space.",
    },
    SubTaskDraft {
        title: "Schedule regular study time",
        description: "Block recurring time in your calendar and protect it.",
    },
];

const DESTINATION_TASKS: [SubTaskDraft; 5] = [
    SubTaskDraft {
        title: "Shortlist candidate destinations",
        description: "Pick three to five places that match your interests and budget.",
    },
    SubTaskDraft {
        title: "Check the best time to visit",
        description: "Compare weather, crowds and prices across the year.",
    },
    SubTaskDraft {
        title: "Research local customs and safety",
        description: "Read up on etiquette, tipping, local laws and travel advisories.",
    },
    SubTaskDraft {
        title: "List must-see attractions",
        description: "Collect sights, food and experiences you do not want to miss.",
    },
    SubTaskDraft {
        title: "Compare travel costs",
        description: "Estimate flights, lodging and daily spend for each option.",
    },
];

const GENERIC_TASKS: [SubTaskDraft; 5] = [
    SubTaskDraft {
        title: "Clarify the expected outcome",
        description: "Write down what done looks like for this step.",
    },
    SubTaskDraft {
        title: "Break the step into tasks",
        description: "Split the work into pieces that fit in a single session.",
    },
    SubTaskDraft {
        title: "Gather what you need",
        description: "Collect the tools, information and people involved.",
    },
    SubTaskDraft {
        title: "Do the work",
        description: "Work through the tasks, tracking progress as you go.",
    },
    SubTaskDraft {
        title: "Review and wrap up",
        description: "Check the result against the expected outcome and close the step.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(steps: &[PlanStepDraft]) -> Vec<&'static str> {
        steps.iter().map(|s| s.title).collect()
    }

    #[test]
    fn business_keywords_select_business_template() {
        for goal in [
            "Start a business",
            "launch my STARTUP",
            "Grow the family company",
            "monkeybusiness",
        ] {
            let steps = select_plan_template(goal);
            assert_eq!(steps, BUSINESS_STEPS.to_vec(), "goal {goal:?}");
        }
    }

    #[test]
    fn business_template_priorities_and_durations() {
        let steps = select_plan_template("my startup");
        let shape: Vec<(&str, Priority, &str)> = steps
            .iter()
            .map(|s| (s.title, s.priority, s.estimated_duration))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("Market Research & Validation", Priority::High, "2-3 weeks"),
                ("Business Plan Development", Priority::High, "2-4 weeks"),
                ("Legal Structure & Registration", Priority::Medium, "1-2 weeks"),
                ("Funding & Financial Setup", Priority::Medium, "3-6 weeks"),
                ("Launch & Marketing", Priority::High, "4-8 weeks"),
            ]
        );
    }

    #[test]
    fn learn_web_development_scenario() {
        let steps = select_plan_template("Learn web development in 6 months");
        assert_eq!(
            titles(&steps),
            vec![
                "Foundation & Prerequisites",
                "Structured Learning Path",
                "Practical Application",
                "Advanced Topics",
                "Community & Networking",
            ]
        );
    }

    #[test]
    fn precedence_learn_before_travel() {
        let steps = select_plan_template("learn to travel");
        assert_eq!(steps, LEARNING_STEPS.to_vec());
    }

    #[test]
    fn precedence_business_before_everything() {
        assert_eq!(
            PLAN_TABLE.select("business trip to a learning event"),
            PlanTemplate::Business
        );
    }

    #[test]
    fn travel_and_event_groups() {
        assert_eq!(PLAN_TABLE.select("Summer vacation"), PlanTemplate::Travel);
        assert_eq!(PLAN_TABLE.select("road TRIP"), PlanTemplate::Travel);
        assert_eq!(PLAN_TABLE.select("Birthday party"), PlanTemplate::Event);
        assert_eq!(PLAN_TABLE.select("Fundraising gala"), PlanTemplate::Event);
    }

    #[test]
    fn unmatched_goal_gets_generic_template() {
        for goal in ["Run a marathon", "", "   ", "Ünïcödé goal"] {
            let steps = select_plan_template(goal);
            assert_eq!(steps, GENERIC_STEPS.to_vec(), "goal {goal:?}");
        }
    }

    #[test]
    fn every_template_has_five_steps() {
        for template in [
            PlanTemplate::Business,
            PlanTemplate::Learning,
            PlanTemplate::Travel,
            PlanTemplate::Event,
            PlanTemplate::Generic,
        ] {
            assert_eq!(template.steps().len(), 5);
        }
    }

    #[test]
    fn plan_selection_is_pure() {
        let a = select_plan_template("Plan a company offsite");
        let b = select_plan_template("Plan a company offsite");
        assert_eq!(a, b);
    }

    #[test]
    fn subtask_selection_by_title_family() {
        assert_eq!(
            SUBTASK_TABLE.select("Market Research & Validation"),
            SubTaskTemplate::MarketValidation
        );
        assert_eq!(
            SUBTASK_TABLE.select("Business Plan Development"),
            SubTaskTemplate::BusinessPlan
        );
        assert_eq!(
            SUBTASK_TABLE.select("Foundation & Prerequisites"),
            SubTaskTemplate::Foundation
        );
        assert_eq!(
            SUBTASK_TABLE.select("Destination Research"),
            SubTaskTemplate::DestinationResearch
        );
        assert_eq!(
            SUBTASK_TABLE.select("Launch & Marketing"),
            SubTaskTemplate::Generic
        );
    }

    #[test]
    fn market_research_wins_over_plain_research() {
        // "research" alone would select the destination checklist.
        assert_eq!(
            SUBTASK_TABLE.select("market research"),
            SubTaskTemplate::MarketValidation
        );
        assert_eq!(
            SUBTASK_TABLE.select("user research"),
            SubTaskTemplate::DestinationResearch
        );
    }

    #[test]
    fn subtask_selection_is_pure_and_total() {
        let a = select_subtask_template("Anything at all");
        let b = select_subtask_template("Anything at all");
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert_eq!(a, GENERIC_TASKS.to_vec());
    }

    #[test]
    fn drafts_convert_to_insert_params() {
        let new = BUSINESS_STEPS[2].to_new(2);
        assert_eq!(new.title, "Legal Structure & Registration");
        assert_eq!(new.position, 2);
        assert_eq!(new.priority, Priority::Medium);

        let sub = FOUNDATION_TASKS[0].to_new(0);
        assert_eq!(sub.title, "Assess your current skill level");
        assert_eq!(sub.position, 0);
    }
}
