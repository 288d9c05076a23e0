// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction phase classification.
//!
//! A [`PhaseTimeline`] orders the phases of a project. For a selected phase
//! every element is either not present, newly created, demolished, or
//! carried over from an earlier phase. The renderer only ever sees the
//! resulting `element id -> PhaseStatus` map.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::properties::Properties;
use crate::scene::SceneNode;
use crate::ElementId;

/// Lifecycle status of an element in one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Created,
    Demolished,
    Existing,
}

/// Ordered list of construction phases.
#[derive(Debug, Clone, Default)]
pub struct PhaseTimeline {
    phases: Vec<String>,
    positions: FxHashMap<String, usize>,
}

impl PhaseTimeline {
    /// Build a timeline from phase names in chronological order.
    ///
    /// Duplicate names keep their first position.
    pub fn new<I, S>(phases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut timeline = Self::default();
        for name in phases {
            let name = name.into();
            if timeline.positions.contains_key(&name) {
                continue;
            }
            timeline.positions.insert(name.clone(), timeline.phases.len());
            timeline.phases.push(name);
        }
        timeline
    }

    /// Phase names in order.
    pub fn phases(&self) -> &[String] {
        &self.phases
    }

    /// Position of a phase in the timeline.
    pub fn position(&self, phase: &str) -> Option<usize> {
        self.positions.get(phase).copied()
    }

    fn selected(&self, phase: &str) -> Result<usize> {
        self.position(phase)
            .ok_or_else(|| Error::UnknownPhase(phase.to_string()))
    }

    /// Resolve a phase reference found on an element; unknown names count as absent.
    fn element_phase(&self, element: &str, phase: Option<&str>) -> Option<usize> {
        let name = phase?;
        let position = self.position(name);
        if position.is_none() {
            tracing::warn!(element, phase = name, "Element references unknown phase");
        }
        position
    }

    /// Status of one element at the phase with position `selected`.
    ///
    /// `None` means the element does not exist in that phase.
    fn classify(&self, element: &str, props: &Properties, selected: usize) -> Option<PhaseStatus> {
        // No creation phase: the element predates the timeline
        let created = self
            .element_phase(element, props.phase_created.as_deref())
            .unwrap_or(0);
        let demolished = self.element_phase(element, props.phase_demolished.as_deref());

        if created > selected {
            return None;
        }
        match demolished {
            Some(d) if d < selected => None,
            Some(d) if d == selected => Some(PhaseStatus::Demolished),
            _ if created == selected && props.phase_created.is_some() => {
                Some(PhaseStatus::Created)
            }
            _ => Some(PhaseStatus::Existing),
        }
    }

    /// Status of a single element at `phase`.
    pub fn status(&self, element: &str, props: &Properties, phase: &str) -> Result<Option<PhaseStatus>> {
        let selected = self.selected(phase)?;
        Ok(self.classify(element, props, selected))
    }

    /// Status map for a set of elements at `phase`. Absent elements are omitted.
    pub fn statuses<'a, I>(&self, elements: I, phase: &str) -> Result<FxHashMap<ElementId, PhaseStatus>>
    where
        I: IntoIterator<Item = (&'a str, &'a Properties)>,
    {
        let selected = self.selected(phase)?;
        Ok(elements
            .into_iter()
            .filter_map(|(id, props)| {
                self.classify(id, props, selected)
                    .map(|status| (id.to_string(), status))
            })
            .collect())
    }

    /// Status map for every phased node of a scene tree.
    pub fn statuses_for_tree(&self, root: &SceneNode, phase: &str) -> Result<FxHashMap<ElementId, PhaseStatus>> {
        self.statuses(
            root.iter()
                .filter(|n| n.properties.is_phased())
                .map(|n| (n.id.as_str(), &n.properties)),
            phase,
        )
    }

    /// Cumulative set of elements standing during `phase`
    /// (created up to and including it, not demolished before it).
    pub fn active_set<'a, I>(&self, elements: I, phase: &str) -> Result<FxHashSet<ElementId>>
    where
        I: IntoIterator<Item = (&'a str, &'a Properties)>,
    {
        Ok(self.statuses(elements, phase)?.into_keys().collect())
    }
}
