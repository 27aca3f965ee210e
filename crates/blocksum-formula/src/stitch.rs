//! SSA stitching: soundly conjoining path conditions that were built
//! with independent per-variable version counters.
//!
//! A "lower" condition (closer to program start) and an "upper"
//! condition (closer to the block entry) both number their incarnations
//! from 1, so the same symbol `x_2` means different incarnations in
//! each. [`rename_apart`] shifts the upper condition's versions out of
//! the lower condition's range; [`stitch`] conjoins the two afterwards.
//!
//! Two offset strategies exist because the two call sites disagree on
//! which side is semantically newer; see [`StitchStrategy`].

use serde::{Deserialize, Serialize};

use crate::carrier::FormulaError;
use crate::condition::PathCondition;
use crate::ssa::{versioned_symbol, SmtType};

/// How renamed versions of a shared variable are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StitchStrategy {
    /// Shift every upper version by `lower_version - 1`, so the upper
    /// side's first incarnation coincides with the lower side's last.
    /// The shared incarnation is the handoff point where the two
    /// conditions agree; every later upper incarnation lands strictly
    /// above the lower range. Used where the upper condition continues
    /// the lower one.
    #[default]
    Handoff,
    /// Keep the overlapping version ranges aligned (versions up to
    /// `min(lower, upper)` are unchanged) and shift the remaining upper
    /// versions past the combined maximum. Used where the two
    /// conditions share a common prefix of incarnations and only the
    /// upper side's surplus must be kept fresh.
    Aligned,
}

#[derive(Debug, Clone, Copy)]
enum Shift {
    /// `v -> v + offset`
    Offset(u32),
    /// `v <= keep_upto` unchanged, otherwise `v -> base + (v - keep_upto)`
    AlignPast { keep_upto: u32, base: u32 },
}

impl Shift {
    fn apply(self, version: u32) -> u32 {
        match self {
            Shift::Offset(offset) => version + offset,
            Shift::AlignPast { keep_upto, base } => {
                if version <= keep_upto {
                    version
                } else {
                    base + (version - keep_upto)
                }
            }
        }
    }
}

struct Rename {
    name: String,
    ty: SmtType,
    shift: Shift,
    new_max: u32,
}

/// Rename the upper condition's versions apart from the lower
/// condition's, per the selected strategy.
///
/// Only variables present in *both* SSA maps are renamed; everything
/// else passes through. If no variable requires renaming the upper
/// condition is returned unchanged (fast path). The renaming is applied
/// to every versioned free-variable and uninterpreted-function
/// occurrence in the upper formula text. The result keeps the upper
/// condition's memory footprint; footprints are not merged.
pub fn rename_apart(
    lower: &PathCondition,
    upper: &PathCondition,
    strategy: StitchStrategy,
) -> Result<PathCondition, FormulaError> {
    let mut plan = Vec::new();
    for (name, entry) in upper.ssa().iter() {
        let Some(lower_version) = lower.ssa().version_of(name) else {
            continue;
        };
        match lower.ssa().ty_of(name) {
            Some(ty) if *ty == entry.ty => {}
            Some(ty) => {
                return Err(FormulaError::SortClash {
                    name: name.clone(),
                    declared: ty.to_smt_string(),
                    requested: entry.ty.to_smt_string(),
                });
            }
            None => continue,
        }
        match strategy {
            StitchStrategy::Handoff => {
                let offset = lower_version - 1;
                if offset > 0 {
                    plan.push(Rename {
                        name: name.clone(),
                        ty: entry.ty.clone(),
                        shift: Shift::Offset(offset),
                        new_max: entry.version + offset,
                    });
                }
            }
            StitchStrategy::Aligned => {
                let keep_upto = lower_version.min(entry.version);
                if entry.version > keep_upto {
                    let base = lower_version.max(entry.version);
                    plan.push(Rename {
                        name: name.clone(),
                        ty: entry.ty.clone(),
                        shift: Shift::AlignPast { keep_upto, base },
                        new_max: base + (entry.version - keep_upto),
                    });
                }
            }
        }
    }

    if plan.is_empty() {
        return Ok(upper.clone());
    }

    let mut formula = upper.formula().to_string();
    let mut ssa = upper.ssa().clone();
    for rename in &plan {
        let Some(pattern) = upper.ssa().occurrences(&rename.name) else {
            continue;
        };
        formula = pattern
            .replace_all(&formula, |caps: &regex::Captures<'_>| {
                match caps[1].parse::<u32>() {
                    Ok(version) => versioned_symbol(&rename.name, rename.shift.apply(version)),
                    Err(_) => caps[0].to_string(),
                }
            })
            .into_owned();
        ssa.insert(rename.name.clone(), rename.ty.clone(), rename.new_max);
    }

    Ok(PathCondition::new(formula, ssa, upper.footprint().clone()))
}

/// Stitch two independently-numbered conditions into one sound
/// conjunction: rename the upper condition apart from the lower one,
/// conjoin the formulas, and merge the version maps.
///
/// The stitched condition carries the upper condition's memory
/// footprint only; merging footprints is an unresolved limitation of
/// the exchange protocol and callers must not rely on the lower
/// condition's regions being represented.
pub fn stitch(
    lower: &PathCondition,
    upper: &PathCondition,
    strategy: StitchStrategy,
) -> Result<PathCondition, FormulaError> {
    let renamed = rename_apart(lower, upper, strategy)?;

    let mut ssa = renamed.ssa().clone();
    for (name, entry) in lower.ssa().iter() {
        match ssa.version_of(name) {
            Some(version) if version >= entry.version => {}
            _ => ssa.insert(name.clone(), entry.ty.clone(), entry.version),
        }
    }

    let formula = if lower.is_trivial() {
        renamed.formula().to_string()
    } else if renamed.formula() == "true" {
        lower.formula().to_string()
    } else {
        format!("(and {} {})", lower.formula(), renamed.formula())
    };

    Ok(PathCondition::new(
        formula,
        ssa,
        renamed.footprint().clone(),
    ))
}
