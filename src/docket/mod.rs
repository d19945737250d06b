// Copyright (c) 2025 - Cowboy AI, Inc.
//! Docket Policy Engine
//!
//! Evaluates a newly created request against an ordered rule list and
//! produces a decision: approve without human review, reject outright, or
//! route to manual review.
//!
//! # Evaluation Model
//!
//! ```text
//! RequestSnapshot → [rule₁, rule₂, ...] → Decision
//!                    (priority order, first match wins)
//! ```
//!
//! Rules are data, not code: a rule is a set of optional matchers plus an
//! outcome. Lower priority numbers run first, so guard rules (quota) sit in
//! front of convenience rules (auto-approve). When no rule matches, the
//! engine falls through to [`Decision::ManualReview`]; the docket never
//! silently approves.
//!
//! The engine is pure. Quota state is folded from the project stream by the
//! caller and passed in as part of the snapshot, so evaluation is
//! deterministic and replayable in tests.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ProjectType, QuotaLimits, QuotaUsage, VmSize};

/// Everything a policy rule may inspect about a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    /// Requested size
    pub size: VmSize,

    /// Classification of the target project
    pub project_type: ProjectType,

    /// Current project usage, folded from the project stream
    pub usage: QuotaUsage,

    /// Project quota ceiling
    pub limits: QuotaLimits,
}

impl RequestSnapshot {
    /// Would granting this request overflow the project quota?
    pub fn quota_exceeded(&self) -> bool {
        self.usage
            .would_exceed(&self.limits, &self.size.footprint())
    }
}

/// Outcome of docket evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Approved without human review
    Approve {
        /// Rule that granted the approval
        rule: String,
    },

    /// Rejected by policy
    Reject {
        /// Rule that rejected
        rule: String,

        /// User-facing rejection reason
        reason: String,
    },

    /// No rule matched; an admin must decide
    ManualReview,
}

/// Matchers a rule applies to a snapshot; `None` means "don't care"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleCriteria {
    /// Match on whether the request would overflow the quota
    pub quota_exceeded: Option<bool>,

    /// Match sizes up to and including this one
    pub max_size: Option<VmSize>,

    /// Match a specific project classification
    pub project_type: Option<ProjectType>,
}

impl RuleCriteria {
    /// All present matchers must hold
    fn matches(&self, snapshot: &RequestSnapshot) -> bool {
        if let Some(expected) = self.quota_exceeded {
            if snapshot.quota_exceeded() != expected {
                return false;
            }
        }
        if let Some(max_size) = self.max_size {
            if snapshot.size > max_size {
                return false;
            }
        }
        if let Some(project_type) = self.project_type {
            if snapshot.project_type != project_type {
                return false;
            }
        }
        true
    }
}

/// What a matching rule decides
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Approve,
    Reject { reason: String },
}

/// A single policy rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRule {
    /// Rule name, recorded in decision events
    pub name: String,

    /// Evaluation order; lower runs first
    pub priority: u32,

    /// Matchers
    pub criteria: RuleCriteria,

    /// Decision when the criteria match
    pub outcome: RuleOutcome,
}

/// Priority-ordered policy rule engine
#[derive(Debug, Clone)]
pub struct DocketEngine {
    rules: Vec<PolicyRule>,
}

impl DocketEngine {
    /// Build an engine from a rule list; rules are sorted by priority once
    pub fn new(mut rules: Vec<PolicyRule>) -> Self {
        rules.sort_by_key(|rule| rule.priority);
        Self { rules }
    }

    /// The platform's standing rules:
    ///
    /// 1. `reject-over-quota` (priority 10) - any request that would
    ///    overflow the project quota is rejected
    /// 2. `auto-approve-small-dev` (priority 20) - S-sized requests for
    ///    development projects within quota skip human review
    ///
    /// Everything else falls through to manual review.
    pub fn with_default_rules() -> Self {
        Self::new(vec![
            PolicyRule {
                name: "reject-over-quota".to_string(),
                priority: 10,
                criteria: RuleCriteria {
                    quota_exceeded: Some(true),
                    ..RuleCriteria::default()
                },
                outcome: RuleOutcome::Reject {
                    reason: "project quota exceeded".to_string(),
                },
            },
            PolicyRule {
                name: "auto-approve-small-dev".to_string(),
                priority: 20,
                criteria: RuleCriteria {
                    quota_exceeded: Some(false),
                    max_size: Some(VmSize::S),
                    project_type: Some(ProjectType::Development),
                },
                outcome: RuleOutcome::Approve,
            },
        ])
    }

    /// Evaluate a snapshot; first matching rule wins
    pub fn evaluate(&self, snapshot: &RequestSnapshot) -> Decision {
        for rule in &self.rules {
            if rule.criteria.matches(snapshot) {
                debug!(rule = %rule.name, "docket rule matched");
                return match &rule.outcome {
                    RuleOutcome::Approve => Decision::Approve {
                        rule: rule.name.clone(),
                    },
                    RuleOutcome::Reject { reason } => Decision::Reject {
                        rule: rule.name.clone(),
                        reason: reason.clone(),
                    },
                };
            }
        }
        Decision::ManualReview
    }
}
