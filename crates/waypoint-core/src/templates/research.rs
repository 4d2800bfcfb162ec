//! Canned research findings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{KeywordRule, KeywordTable};
use crate::agent::ResearchFinding;

/// How many findings a research request returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDepth {
    Basic,
    #[default]
    Standard,
    Comprehensive,
}

/// Depth markers written into research queries by the workflow runner.
const DEPTH_TABLE: KeywordTable<ResearchDepth> = KeywordTable::new(
    &[
        KeywordRule {
            keywords: &["(basic research)"],
            value: ResearchDepth::Basic,
        },
        KeywordRule {
            keywords: &["(comprehensive research)"],
            value: ResearchDepth::Comprehensive,
        },
    ],
    ResearchDepth::Standard,
);

impl ResearchDepth {
    /// Depth requested by a query, standard when it carries no marker.
    pub fn detect(query: &str) -> Self {
        DEPTH_TABLE.select(query)
    }

    pub fn finding_count(self) -> usize {
        match self {
            Self::Basic => 2,
            Self::Standard => 3,
            Self::Comprehensive => 4,
        }
    }
}

impl fmt::Display for ResearchDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Comprehensive => "comprehensive",
        };
        f.write_str(s)
    }
}

impl FromStr for ResearchDepth {
    type Err = ResearchDepthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "comprehensive" => Ok(Self::Comprehensive),
            other => Err(ResearchDepthParseError(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid research depth: {0:?}")]
pub struct ResearchDepthParseError(pub String);

/// Subject family detected from a research query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchTopic {
    Market,
    Learning,
    Travel,
    Event,
    General,
}

pub const TOPIC_TABLE: KeywordTable<ResearchTopic> = KeywordTable::new(
    &[
        KeywordRule {
            keywords: &["market", "business", "competitor", "startup"],
            value: ResearchTopic::Market,
        },
        KeywordRule {
            keywords: &["learn", "course", "tutorial", "study", "skill"],
            value: ResearchTopic::Learning,
        },
        KeywordRule {
            keywords: &["travel", "destination", "trip", "flight"],
            value: ResearchTopic::Travel,
        },
        KeywordRule {
            keywords: &["event", "venue", "party", "wedding"],
            value: ResearchTopic::Event,
        },
    ],
    ResearchTopic::General,
);

struct Snippet {
    title: &'static str,
    content: &'static str,
    summary: &'static str,
}

/// Relevance assigned by rank; the best finding comes first.
const RELEVANCE: [f64; 4] = [0.95, 0.88, 0.82, 0.74];

impl ResearchTopic {
    fn snippets(self) -> &'static [Snippet; 4] {
        match self {
            Self::Market => &MARKET,
            Self::Learning => &LEARNING,
            Self::Travel => &TRAVEL,
            Self::Event => &EVENT,
            Self::General => &GENERAL,
        }
    }
}

/// Findings for `query`, as many as `depth` asks for.
pub fn research_findings(query: &str, depth: ResearchDepth) -> Vec<ResearchFinding> {
    TOPIC_TABLE
        .select(query)
        .snippets()
        .iter()
        .zip(RELEVANCE)
        .take(depth.finding_count())
        .map(|(snippet, relevance_score)| ResearchFinding {
            title: snippet.title.to_owned(),
            content: snippet.content.to_owned(),
            summary: snippet.summary.to_owned(),
            relevance_score,
        })
        .collect()
}

/// Single low-relevance finding used when regular research generation fails.
pub fn fallback_findings(query: &str) -> Vec<ResearchFinding> {
    vec![ResearchFinding {
        title: format!("General overview: {query}"),
        content: "Detailed research could not be generated. Start from official \
                  documentation, reputable industry sources and community forums, \
                  and compare at least three independent perspectives."
            .to_owned(),
        summary: "Fallback overview with suggested starting points.".to_owned(),
        relevance_score: 0.5,
    }]
}

const MARKET: [Snippet; 4] = [
    Snippet {
        title: "Market Size and Growth Trends",
        content: "Small-business markets in most sectors grow 4-8% a year. Niche segments \
                  with underserved customers often grow faster than the category average.",
        summary: "The target market shows steady growth with room for niche entrants.",
    },
    Snippet {
        title: "Competitive Landscape Analysis",
        content: "Established competitors compete mainly on price and distribution. New \
                  entrants succeed by differentiating on service, speed or specialization.",
        summary: "Differentiation beats price competition for new entrants.",
    },
    Snippet {
        title: "Customer Pain Points",
        content: "Surveys of early adopters point to onboarding friction, unclear pricing \
                  and slow support as the most common frustrations.",
        summary: "Simple onboarding and transparent pricing are key selling points.",
    },
    Snippet {
        title: "Go-to-Market Channels",
        content: "Content marketing, partnerships and targeted social campaigns give the \
                  lowest customer acquisition cost for early-stage ventures.",
        summary: "Start with low-cost organic and partnership channels.",
    },
];

const LEARNING: [Snippet; 4] = [
    Snippet {
        title: "Recommended Learning Resources",
        content: "Structured online courses combined with a reference book and weekly \
                  practice projects give the best retention for self-directed learners.",
        summary: "Combine one course, one book and regular practice.",
    },
    Snippet {
        title: "Skill Progression Roadmap",
        content: "Learners typically move from fundamentals to guided projects in 4-6 \
                  weeks, and to independent projects after 3 months of steady study.",
        summary: "Expect independent work after about three months.",
    },
    Snippet {
        title: "Practice Techniques That Work",
        content: "Spaced repetition, deliberate practice on weak areas and teaching others \
                  consistently outperform passive reading and video watching.",
        summary: "Active practice beats passive consumption.",
    },
    Snippet {
        title: "Communities and Mentorship",
        content: "Study groups, forums and local meetups keep learners accountable and \
                  shorten the time spent stuck on problems.",
        summary: "Join a community early for accountability and help.",
    },
];

const TRAVEL: [Snippet; 4] = [
    Snippet {
        title: "Best Time to Visit",
        content: "Shoulder seasons offer mild weather, smaller crowds and prices 20-30% \
                  below peak season for most popular destinations.",
        summary: "Travel in shoulder season for the best value.",
    },
    Snippet {
        title: "Budget Breakdown",
        content: "Accommodation and transport usually account for 60% of a trip budget. \
                  Booking flights 6-8 weeks ahead typically secures the lowest fares.",
        summary: "Book transport early and budget most for lodging.",
    },
    Snippet {
        title: "Local Customs and Safety",
        content: "Check current travel advisories, learn basic local phrases and review \
                  tipping and dress customs before departure.",
        summary: "Review advisories and customs before you go.",
    },
    Snippet {
        title: "Top Attractions and Experiences",
        content: "Mixing well-known landmarks with local food tours and neighbourhood \
                  walks gives a fuller picture of a destination.",
        summary: "Balance landmarks with local experiences.",
    },
];

const EVENT: [Snippet; 4] = [
    Snippet {
        title: "Venue Selection Criteria",
        content: "Capacity, accessibility, included services and cancellation terms are \
                  the factors that most affect venue cost and guest experience.",
        summary: "Compare venues on capacity, access and terms.",
    },
    Snippet {
        title: "Event Budget Benchmarks",
        content: "Venue and catering typically take 50-60% of an event budget. Keep a 10% \
                  contingency for last-minute changes.",
        summary: "Plan for venue and catering first, keep a contingency.",
    },
    Snippet {
        title: "Promotion Strategies",
        content: "Early save-the-date messages, personal invitations and reminder emails a \
                  week before raise attendance the most.",
        summary: "Invite early and send reminders.",
    },
    Snippet {
        title: "Day-of Coordination",
        content: "A run-of-show document, a single point of contact and a vendor call \
                  sheet prevent most day-of problems.",
        summary: "Prepare a run-of-show and a vendor contact list.",
    },
];

const GENERAL: [Snippet; 4] = [
    Snippet {
        title: "Overview and Key Concepts",
        content: "Breaking a goal into measurable milestones and reviewing progress weekly \
                  is the most reliable predictor of completion.",
        summary: "Set milestones and review progress weekly.",
    },
    Snippet {
        title: "Common Pitfalls",
        content: "Unclear scope, over-commitment and skipping review steps are the most \
                  common reasons plans stall.",
        summary: "Keep scope clear and schedule reviews.",
    },
    Snippet {
        title: "Tools and Resources",
        content: "A simple task tracker, a shared calendar and a notes system cover the \
                  needs of most personal and small-team projects.",
        summary: "Lightweight tools are usually enough.",
    },
    Snippet {
        title: "Success Stories",
        content: "People who share their goals publicly and track them visibly report \
                  higher follow-through than those who keep them private.",
        summary: "Public commitment improves follow-through.",
    },
];
