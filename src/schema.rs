//! Static checklist schema: sections, items, and the persisted version tag.
//!
//! The schema is fixed at compile time; an item belongs to exactly one
//! section and item ids are unique across the whole checklist. Answers are
//! keyed by these ids, so any change to the shape of the definitions must
//! bump [`SCHEMA_VERSION`] to invalidate stored snapshots.

/// Version tag written alongside every persisted snapshot.
///
/// Version 1 carried the three-tier (partial-credit) status scale; the move
/// to the two-tier scale is a shape change, so answers recorded under
/// version 1 must never be loaded against the current engine.
pub const SCHEMA_VERSION: u32 = 2;

/// A single checklist question with a compliance outcome.
#[derive(Debug, Clone, Copy)]
pub struct ItemDef {
    pub id: &'static str,
    pub label: &'static str,
    /// Verification criterion shown to the auditor and quoted in the
    /// summary prompt. Informational only; never affects scoring.
    pub criterion: &'static str,
    /// Inspection cadence. Informational only.
    pub frequency: &'static str,
    /// Whether a not-applicable answer is valid for this item.
    pub allow_na: bool,
}

/// An ordered group of items under one theme.
#[derive(Debug, Clone, Copy)]
pub struct SectionDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub items: &'static [ItemDef],
}

/// The built-in property-audit checklist, in report order.
pub fn sections() -> &'static [SectionDef] {
    SECTIONS
}

/// Look up an item definition anywhere in the schema.
pub fn find_item(id: &str) -> Option<&'static ItemDef> {
    SECTIONS
        .iter()
        .flat_map(|section| section.items.iter())
        .find(|item| item.id == id)
}

/// The section an item belongs to.
pub fn section_for_item(id: &str) -> Option<&'static SectionDef> {
    SECTIONS
        .iter()
        .find(|section| section.items.iter().any(|item| item.id == id))
}

/// Total number of items across all sections.
pub fn item_count() -> usize {
    SECTIONS.iter().map(|section| section.items.len()).sum()
}

const SECTIONS: &[SectionDef] = &[
    SectionDef {
        id: "security",
        title: "Security",
        description: "Protocols, personnel, and security systems",
        items: &[
            ItemDef {
                id: "seg_01",
                label: "Security protocols and staff",
                criterion: "Written protocols on file, incident logbook up to date, \
                            vehicle and pedestrian access control, documented patrol rounds",
                frequency: "Monthly",
                allow_na: false,
            },
            ItemDef {
                id: "seg_02",
                label: "Life safety",
                criterion: "Current emergency plan, evacuation signage, extinguishers in date, \
                            fire cabinets, stocked first-aid kit, trained brigade",
                frequency: "Monthly",
                allow_na: false,
            },
            ItemDef {
                id: "seg_03",
                label: "Signage",
                criterion: "Common-area signage, parking zones, evacuation routes, \
                            assembly points, prohibition and obligation signs",
                frequency: "Quarterly",
                allow_na: false,
            },
        ],
    },
    SectionDef {
        id: "cleaning",
        title: "Cleaning",
        description: "Cleanliness and waste handling",
        items: &[
            ItemDef {
                id: "ase_01",
                label: "Common areas",
                criterion: "Hallways, stairs, elevators, lobby, social areas, \
                            parking decks and facades clean",
                frequency: "Monthly",
                allow_na: false,
            },
            ItemDef {
                id: "ase_02",
                label: "Waste room",
                criterion: "Source separation, room cleanliness, collection schedule \
                            compliance, pest control, fumigation certificate",
                frequency: "Monthly",
                allow_na: false,
            },
            ItemDef {
                id: "ase_03",
                label: "Chemical supplies",
                criterion: "Product data sheets, proper storage, labeling, safety sheets, \
                            personal protective equipment",
                frequency: "Quarterly",
                allow_na: true,
            },
        ],
    },
    SectionDef {
        id: "infrastructure",
        title: "Infrastructure",
        description: "Physical condition of facilities and equipment",
        items: &[
            ItemDef {
                id: "inf_01",
                label: "Technical rooms",
                criterion: "Electrical room, pump room, backup generator, substation, \
                            telecom room, restricted access",
                frequency: "Monthly",
                allow_na: true,
            },
            ItemDef {
                id: "inf_02",
                label: "Wet areas",
                criterion: "Pool, steam room, sauna, jacuzzi, showers, water-quality \
                            compliance, certified operator",
                frequency: "Monthly",
                allow_na: true,
            },
            ItemDef {
                id: "inf_03",
                label: "Lighting",
                criterion: "Luminaires in common areas, parking, exterior zones, \
                            emergency lighting, motion sensors",
                frequency: "Monthly",
                allow_na: false,
            },
            ItemDef {
                id: "inf_04",
                label: "Recreation areas",
                criterion: "Community hall, gym, playgrounds, BBQ zones, sports courts, \
                            furniture in good repair",
                frequency: "Quarterly",
                allow_na: true,
            },
        ],
    },
    SectionDef {
        id: "projects",
        title: "Projects",
        description: "Special works and improvements",
        items: &[ItemDef {
            id: "pry_01",
            label: "Special works",
            criterion: "Works in progress, current permits, contractor insurance, \
                        schedule adherence, supervision, resident impact",
            frequency: "As needed",
            allow_na: true,
        }],
    },
    SectionDef {
        id: "communication",
        title: "Communication",
        description: "Management reports and resident communications",
        items: &[
            ItemDef {
                id: "com_01",
                label: "Management reports",
                criterion: "Monthly management reports, board minutes current, follow-up \
                            on commitments, management indicators, budget vs. actuals",
                frequency: "Monthly",
                allow_na: false,
            },
            ItemDef {
                id: "com_02",
                label: "Notice boards and outreach",
                criterion: "Notice boards current, resident communiques, active digital \
                            channels, timely handling of complaints",
                frequency: "Monthly",
                allow_na: false,
            },
        ],
    },
    SectionDef {
        id: "utilities",
        title: "Utilities",
        description: "Utility tracking and water systems",
        items: &[
            ItemDef {
                id: "ssp_01",
                label: "Utilities logbook",
                criterion: "Consumption records, month-over-month comparison, leak \
                            detection, claims handling, meter readings",
                frequency: "Monthly",
                allow_na: false,
            },
            ItemDef {
                id: "ssp_02",
                label: "Water systems",
                criterion: "Tank cleaning with semiannual certificate, water quality, \
                            pump condition, hydropneumatic system, shutoff valves",
                frequency: "Semiannual",
                allow_na: false,
            },
        ],
    },
    SectionDef {
        id: "community",
        title: "Community",
        description: "House rules and staff welfare",
        items: &[
            ItemDef {
                id: "cnv_01",
                label: "Rules and personnel",
                criterion: "House-rules enforcement, conflict management, active \
                            coexistence committee, operational staff training",
                frequency: "Monthly",
                allow_na: false,
            },
            ItemDef {
                id: "cnv_02",
                label: "Staff welfare",
                criterion: "Labor obligations, workplace insurance, health coverage, \
                            uniforms, schedules, breaks, staff climate",
                frequency: "Quarterly",
                allow_na: false,
            },
        ],
    },
];
