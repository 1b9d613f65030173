//! Marker expansion into when-conditions
//!
//! Recipe conditions are pure conjunctions, so a marker is expanded into a
//! list of branches (a disjunction), each branch becoming its own
//! [`WhenCondition`]. An empty list means the marker can never hold.

use super::translator::translate;
use crate::domain::{
    normalize_name, Diagnostic, MarkerExpr, MarkerOp, MarkerValue, MarkerVariable, Outcome,
    Platform, TargetRange, Version, WhenCondition,
};
use crate::error::ParseError;
use crate::parser::parse_constraint;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

/// One conjunction produced while evaluating a marker.
/// `runtime: None` leaves the interpreter unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
struct Branch {
    platform: Option<Platform>,
    variants: BTreeMap<String, bool>,
    runtime: Option<BTreeSet<Version>>,
}

impl Branch {
    fn is_unconstrained(&self) -> bool {
        self.platform.is_none() && self.variants.is_empty() && self.runtime.is_none()
    }

    fn and(&self, other: &Branch) -> Option<Branch> {
        let platform = match (self.platform, other.platform) {
            (Some(a), Some(b)) if a != b => return None,
            (a, b) => a.or(b),
        };

        let mut variants = self.variants.clone();
        for (name, on) in &other.variants {
            match variants.get(name) {
                Some(existing) if existing != on => return None,
                _ => {
                    variants.insert(name.clone(), *on);
                }
            }
        }

        let runtime = match (&self.runtime, &other.runtime) {
            (Some(a), Some(b)) => {
                let both: BTreeSet<Version> = a.intersection(b).cloned().collect();
                if both.is_empty() {
                    return None;
                }
                Some(both)
            }
            (Some(a), None) | (None, Some(a)) => Some(a.clone()),
            (None, None) => None,
        };

        Some(Branch {
            platform,
            variants,
            runtime,
        })
    }
}

/// Expand `marker` into when-conditions, using `runtime_versions` as the
/// interpreter's known versions. Unsupported atoms are treated as true
/// and reported as approximate translations.
pub fn expand_marker(
    marker: &MarkerExpr,
    runtime_versions: &[Version],
) -> Result<Outcome<Vec<WhenCondition>>, ParseError> {
    let mut evaluator = Evaluator {
        runtime: runtime_versions.iter().cloned().collect(),
        diagnostics: Vec::new(),
    };
    let branches = evaluator.eval(marker)?;

    let mut outcome = Outcome::with_diagnostics(Vec::new(), evaluator.diagnostics);
    for branch in branches {
        let runtime = match branch.runtime {
            None => TargetRange::Any,
            Some(subset) => {
                let subset: Vec<Version> = subset.into_iter().collect();
                match outcome.absorb(translate(&subset, runtime_versions, true)) {
                    Some(range) => range,
                    None => continue,
                }
            }
        };
        outcome.value.push(WhenCondition {
            host: TargetRange::Any,
            variants: branch.variants,
            platform: branch.platform,
            runtime,
        });
    }
    outcome.value.sort();
    outcome.value.dedup();
    Ok(outcome)
}

struct Evaluator {
    runtime: BTreeSet<Version>,
    diagnostics: Vec<Diagnostic>,
}

impl Evaluator {
    fn eval(&mut self, expr: &MarkerExpr) -> Result<Vec<Branch>, ParseError> {
        match expr {
            MarkerExpr::Compare { lhs, op, rhs } => self.eval_atom(expr, lhs, *op, rhs),
            MarkerExpr::And(left, right) => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                let product = left
                    .iter()
                    .flat_map(|l| right.iter().filter_map(move |r| l.and(r)))
                    .collect();
                Ok(self.simplify(product))
            }
            MarkerExpr::Or(left, right) => {
                let mut branches = self.eval(left)?;
                branches.extend(self.eval(right)?);
                Ok(self.simplify(branches))
            }
        }
    }

    /// Collapse to "always" when any branch is unconstrained and merge
    /// branches that differ only in their runtime subset
    fn simplify(&self, branches: Vec<Branch>) -> Vec<Branch> {
        if branches.iter().any(Branch::is_unconstrained) {
            return vec![Branch::default()];
        }

        let mut merged: BTreeMap<(Option<Platform>, BTreeMap<String, bool>), Option<BTreeSet<Version>>> =
            BTreeMap::new();
        for branch in branches {
            match merged.entry((branch.platform, branch.variants)) {
                Entry::Vacant(slot) => {
                    slot.insert(branch.runtime);
                }
                Entry::Occupied(mut slot) => {
                    let combined = match (slot.get_mut().take(), branch.runtime) {
                        (Some(mut a), Some(b)) => {
                            a.extend(b);
                            Some(a)
                        }
                        _ => None,
                    };
                    *slot.get_mut() = combined;
                }
            }
        }

        let branches: Vec<Branch> = merged
            .into_iter()
            .map(|((platform, variants), runtime)| Branch {
                platform,
                variants,
                runtime: runtime.filter(|set| *set != self.runtime),
            })
            .collect();
        if branches.iter().any(Branch::is_unconstrained) {
            return vec![Branch::default()];
        }
        branches
    }

    fn always(&self) -> Vec<Branch> {
        vec![Branch::default()]
    }

    fn approximate(&mut self, atom: &MarkerExpr) -> Vec<Branch> {
        self.diagnostics.push(Diagnostic::approximate(format!(
            "marker '{}' cannot be expressed in a recipe condition and is treated as true",
            atom
        )));
        self.always()
    }

    fn eval_atom(
        &mut self,
        atom: &MarkerExpr,
        lhs: &MarkerValue,
        op: MarkerOp,
        rhs: &MarkerValue,
    ) -> Result<Vec<Branch>, ParseError> {
        let (variable, op, literal) = match (lhs, rhs) {
            (MarkerValue::Variable(var), MarkerValue::Literal(lit)) => (*var, op, lit.as_str()),
            (MarkerValue::Literal(lit), MarkerValue::Variable(var)) => match op.flipped() {
                Some(flipped) => (*var, flipped, lit.as_str()),
                None => return Ok(self.approximate(atom)),
            },
            (MarkerValue::Literal(a), MarkerValue::Literal(b)) => {
                return Ok(match op {
                    MarkerOp::Equal if a == b => self.always(),
                    MarkerOp::NotEqual if a != b => self.always(),
                    MarkerOp::Equal | MarkerOp::NotEqual => Vec::new(),
                    _ => self.approximate(atom),
                })
            }
            (MarkerValue::Variable(_), MarkerValue::Variable(_)) => {
                return Ok(self.approximate(atom))
            }
        };

        match variable {
            MarkerVariable::PythonVersion | MarkerVariable::PythonFullVersion => {
                if matches!(op, MarkerOp::In | MarkerOp::NotIn) {
                    return Ok(self.approximate(atom));
                }
                let constraint = parse_constraint(&format!("{}{}", op.as_str(), literal))?;
                let short = variable == MarkerVariable::PythonVersion;
                let subset: BTreeSet<Version> = self
                    .runtime
                    .iter()
                    .filter(|v| {
                        if short {
                            constraint.matches(&v.truncated(2))
                        } else {
                            constraint.matches(v)
                        }
                    })
                    .cloned()
                    .collect();
                Ok(if subset.is_empty() {
                    Vec::new()
                } else if subset == self.runtime {
                    self.always()
                } else {
                    vec![Branch {
                        runtime: Some(subset),
                        ..Branch::default()
                    }]
                })
            }
            MarkerVariable::SysPlatform | MarkerVariable::PlatformSystem => {
                let platform = if variable == MarkerVariable::SysPlatform {
                    Platform::from_sys_platform(literal)
                } else {
                    Platform::from_system(literal)
                };
                Ok(match (op, platform) {
                    (MarkerOp::Equal, Some(p)) => vec![Branch {
                        platform: Some(p),
                        ..Branch::default()
                    }],
                    (MarkerOp::Equal, None) => Vec::new(),
                    (MarkerOp::NotEqual, Some(p)) => Platform::ALL
                        .iter()
                        .filter(|other| **other != p)
                        .map(|other| Branch {
                            platform: Some(*other),
                            ..Branch::default()
                        })
                        .collect(),
                    (MarkerOp::NotEqual, None) => self.always(),
                    _ => self.approximate(atom),
                })
            }
            MarkerVariable::ImplementationName | MarkerVariable::PlatformPythonImplementation => {
                let is_cpython = literal.eq_ignore_ascii_case("cpython");
                Ok(match op {
                    MarkerOp::Equal if is_cpython => self.always(),
                    MarkerOp::Equal => Vec::new(),
                    MarkerOp::NotEqual if is_cpython => Vec::new(),
                    MarkerOp::NotEqual => self.always(),
                    _ => self.approximate(atom),
                })
            }
            MarkerVariable::Extra => {
                let polarity = match op {
                    MarkerOp::Equal => true,
                    MarkerOp::NotEqual => false,
                    _ => return Ok(self.approximate(atom)),
                };
                let mut variants = BTreeMap::new();
                variants.insert(normalize_name(literal), polarity);
                Ok(vec![Branch {
                    variants,
                    ..Branch::default()
                }])
            }
            MarkerVariable::OsName
            | MarkerVariable::PlatformMachine
            | MarkerVariable::PlatformRelease
            | MarkerVariable::PlatformVersion
            | MarkerVariable::ImplementationVersion => Ok(self.approximate(atom)),
        }
    }
}
