// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Visual-state palette and material precedence
//!
//! Every batch carries the same seven-entry material array. Element state is
//! expressed purely through which slot its draw group points at.

use std::sync::Arc;

use retrofit_core::PhaseStatus;

use crate::config::PaletteConfig;
use crate::material::{Material, Side};

/// Position of a material in a batch's palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MaterialSlot {
    Base = 0,
    Highlight = 1,
    PhaseCreated = 2,
    PhaseDemolished = 3,
    PhaseExisting = 4,
    Hidden = 5,
    Hover = 6,
}

impl MaterialSlot {
    pub const COUNT: usize = 7;

    pub const ALL: [MaterialSlot; Self::COUNT] = [
        MaterialSlot::Base,
        MaterialSlot::Highlight,
        MaterialSlot::PhaseCreated,
        MaterialSlot::PhaseDemolished,
        MaterialSlot::PhaseExisting,
        MaterialSlot::Hidden,
        MaterialSlot::Hover,
    ];

    #[inline]
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    fn for_phase(status: PhaseStatus) -> Self {
        match status {
            PhaseStatus::Created => MaterialSlot::PhaseCreated,
            PhaseStatus::Demolished => MaterialSlot::PhaseDemolished,
            PhaseStatus::Existing => MaterialSlot::PhaseExisting,
        }
    }
}

/// Per-element state flags consulted by [`resolve_slot`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisualFlags {
    pub filtered_out: bool,
    pub highlighted: bool,
    pub hovered: bool,
    pub phase: Option<PhaseStatus>,
}

/// Resolve the single palette slot an element renders with.
///
/// Precedence, highest first: filtered out, highlighted, hovered, phase
/// status, base. In the back-face (rooms) pass phase colours are ignored.
pub fn resolve_slot(flags: &VisualFlags, render_back_faces: bool) -> MaterialSlot {
    if flags.filtered_out {
        return MaterialSlot::Hidden;
    }
    if flags.highlighted {
        return MaterialSlot::Highlight;
    }
    if flags.hovered {
        return MaterialSlot::Hover;
    }
    match flags.phase {
        Some(status) if !render_back_faces => MaterialSlot::for_phase(status),
        _ => MaterialSlot::Base,
    }
}

/// Build the full palette around a batch's base material.
pub fn build_palette(base: Material, config: &PaletteConfig, render_back_faces: bool) -> Vec<Arc<Material>> {
    let state = |name: &str, rgb: u32| {
        let mut m = Material::flat(format!("{}:{}", base.name, name), rgb);
        m.side = base.side;
        m
    };

    let mut highlight = state("highlight", config.highlight);
    if render_back_faces {
        highlight.side = Side::Back;
        highlight.opacity = 0.6;
        highlight.transparent = true;
    }

    let mut hidden = state("hidden", 0x000000);
    hidden.visible = config.hidden_opacity > 0.0;
    hidden.opacity = config.hidden_opacity;
    hidden.transparent = true;
    hidden.depth_write = false;

    let hover = state("hover", config.hover);
    let created = state("created", config.phase_created);
    let demolished = state("demolished", config.phase_demolished);
    let existing = state("existing", config.phase_existing);

    vec![
        Arc::new(base),
        Arc::new(highlight),
        Arc::new(created),
        Arc::new(demolished),
        Arc::new(existing),
        Arc::new(hidden),
        Arc::new(hover),
    ]
}
