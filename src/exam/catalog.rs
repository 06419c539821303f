//! Static catalog of the five TELC B2 sections. The attempt never owns this
//! data; content generated for a section must fit the part layout below.

use crate::db::types::SectionId;

#[derive(Debug, Clone, Copy)]
pub(crate) struct SectionSpec {
    pub(crate) id: SectionId,
    pub(crate) title: &'static str,
    pub(crate) duration_seconds: u32,
    pub(crate) max_points: f64,
    pub(crate) parts: &'static [PartSpec],
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PartSpec {
    pub(crate) number: u32,
    pub(crate) kind: PartKind,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PartKind {
    Questions { count: usize },
    Task { expected_words: u32 },
}

pub(crate) const TOTAL_MAX_POINTS: f64 = 300.0;

const SECTIONS: [SectionSpec; 5] = [
    SectionSpec {
        id: SectionId::Reading,
        title: "Leseverstehen",
        duration_seconds: 5400,
        max_points: 75.0,
        parts: &[
            PartSpec { number: 0, kind: PartKind::Questions { count: 5 } },
            PartSpec { number: 1, kind: PartKind::Questions { count: 5 } },
            PartSpec { number: 2, kind: PartKind::Questions { count: 10 } },
        ],
    },
    SectionSpec {
        id: SectionId::LanguageElements,
        title: "Sprachbausteine",
        duration_seconds: 2700,
        max_points: 30.0,
        parts: &[
            PartSpec { number: 0, kind: PartKind::Questions { count: 10 } },
            PartSpec { number: 1, kind: PartKind::Questions { count: 10 } },
        ],
    },
    SectionSpec {
        id: SectionId::Listening,
        title: "Hörverstehen",
        duration_seconds: 1500,
        max_points: 75.0,
        parts: &[
            PartSpec { number: 0, kind: PartKind::Questions { count: 5 } },
            PartSpec { number: 1, kind: PartKind::Questions { count: 10 } },
            PartSpec { number: 2, kind: PartKind::Questions { count: 5 } },
        ],
    },
    SectionSpec {
        id: SectionId::Writing,
        title: "Schriftlicher Ausdruck",
        duration_seconds: 1800,
        max_points: 45.0,
        parts: &[PartSpec { number: 0, kind: PartKind::Task { expected_words: 150 } }],
    },
    SectionSpec {
        id: SectionId::Speaking,
        title: "Mündlicher Ausdruck",
        duration_seconds: 1200,
        max_points: 75.0,
        parts: &[
            PartSpec { number: 0, kind: PartKind::Task { expected_words: 80 } },
            PartSpec { number: 1, kind: PartKind::Task { expected_words: 120 } },
            PartSpec { number: 2, kind: PartKind::Task { expected_words: 100 } },
        ],
    },
];

pub(crate) fn sections() -> &'static [SectionSpec; 5] {
    &SECTIONS
}

pub(crate) fn spec(id: SectionId) -> &'static SectionSpec {
    match id {
        SectionId::Reading => &SECTIONS[0],
        SectionId::LanguageElements => &SECTIONS[1],
        SectionId::Listening => &SECTIONS[2],
        SectionId::Writing => &SECTIONS[3],
        SectionId::Speaking => &SECTIONS[4],
    }
}

impl SectionId {
    pub(crate) fn all() -> [SectionId; 5] {
        [
            SectionId::Reading,
            SectionId::LanguageElements,
            SectionId::Listening,
            SectionId::Writing,
            SectionId::Speaking,
        ]
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SectionId::Reading => "reading",
            SectionId::LanguageElements => "language_elements",
            SectionId::Listening => "listening",
            SectionId::Writing => "writing",
            SectionId::Speaking => "speaking",
        }
    }

    /// Objective sections are scored locally against the answer key;
    /// writing and speaking go to the external evaluator.
    pub(crate) fn is_objective(self) -> bool {
        matches!(self, SectionId::Reading | SectionId::LanguageElements | SectionId::Listening)
    }
}
