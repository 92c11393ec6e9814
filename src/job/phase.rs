#![forbid(unsafe_code)]

//! Workflow phases derived from a job's percent complete.
//!
//! A single descending band table drives both the phase label and its color,
//! so the two can never disagree on a boundary. The 65-69% band is "ON-HOLD"
//! and red even though it sits between two non-hold bands; shop convention.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Planned,
    Received,
    PreTest,
    Teardown,
    Evaluation,
    AdvisedCostHold,
    WaitingOnParts,
    OnHold,
    Assembly,
    FinalTesting,
    PreparingForShipment,
    Shipped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColorToken {
    Green,
    Blue,
    Red,
    Orange,
    Purple,
    Indigo,
    Gray,
}

/// Lower bound of each band, highest first. First match wins.
const BANDS: [(u8, Phase); 12] = [
    (100, Phase::Shipped),
    (95, Phase::PreparingForShipment),
    (80, Phase::FinalTesting),
    (70, Phase::Assembly),
    (65, Phase::OnHold),
    (60, Phase::WaitingOnParts),
    (40, Phase::AdvisedCostHold),
    (30, Phase::Evaluation),
    (20, Phase::Teardown),
    (15, Phase::PreTest),
    (10, Phase::Received),
    (0, Phase::Planned),
];

impl Phase {
    /// All phases in workflow order.
    pub const ALL: [Phase; 12] = [
        Phase::Planned,
        Phase::Received,
        Phase::PreTest,
        Phase::Teardown,
        Phase::Evaluation,
        Phase::AdvisedCostHold,
        Phase::WaitingOnParts,
        Phase::OnHold,
        Phase::Assembly,
        Phase::FinalTesting,
        Phase::PreparingForShipment,
        Phase::Shipped,
    ];

    /// Band lookup. Values above 100 land in `Shipped`; callers clamp first.
    #[must_use]
    pub fn from_percent(percent: u8) -> Self {
        BANDS
            .iter()
            .find(|(floor, _)| percent >= *floor)
            .map_or(Phase::Planned, |(_, phase)| *phase)
    }

    /// Lowest percent that falls inside this phase.
    #[must_use]
    pub fn floor(self) -> u8 {
        BANDS
            .iter()
            .find(|(_, phase)| *phase == self)
            .map_or(0, |(floor, _)| *floor)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Phase::Shipped => "Shipped",
            Phase::PreparingForShipment => "Preparing for Shipment",
            Phase::FinalTesting => "Final Testing",
            Phase::Assembly => "Assembly",
            Phase::OnHold => "ON-HOLD",
            Phase::WaitingOnParts => "Waiting on Parts",
            Phase::AdvisedCostHold => "Advised Cost/HOLD",
            Phase::Evaluation => "Evaluation",
            Phase::Teardown => "Teardown",
            Phase::PreTest => "Pre-Test",
            Phase::Received => "Received",
            Phase::Planned => "Planned",
        }
    }

    #[must_use]
    pub fn color(self) -> ColorToken {
        match self {
            Phase::Shipped => ColorToken::Green,
            Phase::PreparingForShipment | Phase::FinalTesting | Phase::Assembly => {
                ColorToken::Blue
            }
            Phase::OnHold => ColorToken::Red,
            Phase::WaitingOnParts | Phase::AdvisedCostHold => ColorToken::Orange,
            Phase::Evaluation | Phase::Teardown | Phase::PreTest => ColorToken::Purple,
            Phase::Received => ColorToken::Indigo,
            Phase::Planned => ColorToken::Gray,
        }
    }

    /// Case-insensitive match against the display labels.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let want = label.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(want))
    }
}

impl ColorToken {
    #[must_use]
    pub fn hex(self) -> &'static str {
        match self {
            ColorToken::Green => "#10b981",
            ColorToken::Blue => "#3b82f6",
            ColorToken::Red => "#ef4444",
            ColorToken::Orange => "#f59e0b",
            ColorToken::Purple => "#8b5cf6",
            ColorToken::Indigo => "#6366f1",
            ColorToken::Gray => "#6b7280",
        }
    }

    /// 256-color foreground escape for terminals.
    #[must_use]
    pub fn ansi(self) -> &'static str {
        match self {
            ColorToken::Green => "\x1b[38;5;35m",
            ColorToken::Blue => "\x1b[38;5;33m",
            ColorToken::Red => "\x1b[38;5;196m",
            ColorToken::Orange => "\x1b[38;5;214m",
            ColorToken::Purple => "\x1b[38;5;99m",
            ColorToken::Indigo => "\x1b[38;5;62m",
            ColorToken::Gray => "\x1b[38;5;245m",
        }
    }
}

#[must_use]
pub fn derive_status_label(percent: u8) -> &'static str {
    Phase::from_percent(percent).label()
}

#[must_use]
pub fn derive_status_color(percent: u8) -> ColorToken {
    Phase::from_percent(percent).color()
}

/// Clamp any integer progress value into 0..=100.
#[must_use]
pub fn clamp_percent(value: i64) -> u8 {
    u8::try_from(value.clamp(0, 100)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: [(&str, ColorToken); 12] = [
        ("Planned", ColorToken::Gray),
        ("Received", ColorToken::Indigo),
        ("Pre-Test", ColorToken::Purple),
        ("Teardown", ColorToken::Purple),
        ("Evaluation", ColorToken::Purple),
        ("Advised Cost/HOLD", ColorToken::Orange),
        ("Waiting on Parts", ColorToken::Orange),
        ("ON-HOLD", ColorToken::Red),
        ("Assembly", ColorToken::Blue),
        ("Final Testing", ColorToken::Blue),
        ("Preparing for Shipment", ColorToken::Blue),
        ("Shipped", ColorToken::Green),
    ];

    #[test]
    fn label_and_color_share_every_band() {
        for (phase, (label, color)) in Phase::ALL.into_iter().zip(EXPECTED) {
            let floor = phase.floor();
            assert_eq!(derive_status_label(floor), label, "floor {floor}");
            assert_eq!(derive_status_color(floor), color, "floor {floor}");
        }
    }

    #[test]
    fn label_and_color_agree_across_full_range() {
        for p in 0..=100u8 {
            let label = derive_status_label(p);
            let color = derive_status_color(p);
            let phase = Phase::from_label(label).unwrap();
            assert_eq!(phase, Phase::from_percent(p));
            assert_eq!(phase.color(), color, "percent {p}");
        }
    }

    #[test]
    fn boundary_values() {
        let cases: [(u8, &str, ColorToken); 22] = [
            (9, "Planned", ColorToken::Gray),
            (10, "Received", ColorToken::Indigo),
            (14, "Received", ColorToken::Indigo),
            (15, "Pre-Test", ColorToken::Purple),
            (19, "Pre-Test", ColorToken::Purple),
            (20, "Teardown", ColorToken::Purple),
            (29, "Teardown", ColorToken::Purple),
            (30, "Evaluation", ColorToken::Purple),
            (39, "Evaluation", ColorToken::Purple),
            (40, "Advised Cost/HOLD", ColorToken::Orange),
            (59, "Advised Cost/HOLD", ColorToken::Orange),
            (60, "Waiting on Parts", ColorToken::Orange),
            (64, "Waiting on Parts", ColorToken::Orange),
            (65, "ON-HOLD", ColorToken::Red),
            (69, "ON-HOLD", ColorToken::Red),
            (70, "Assembly", ColorToken::Blue),
            (79, "Assembly", ColorToken::Blue),
            (80, "Final Testing", ColorToken::Blue),
            (94, "Final Testing", ColorToken::Blue),
            (95, "Preparing for Shipment", ColorToken::Blue),
            (99, "Preparing for Shipment", ColorToken::Blue),
            (100, "Shipped", ColorToken::Green),
        ];
        for (p, label, color) in cases {
            assert_eq!(derive_status_label(p), label, "percent {p}");
            assert_eq!(derive_status_color(p), color, "percent {p}");
        }
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(clamp_percent(-5), 0);
        assert_eq!(clamp_percent(250), 100);
        assert_eq!(clamp_percent(42), 42);
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!(Phase::from_label("on-hold"), Some(Phase::OnHold));
        assert_eq!(Phase::from_label(" Final testing "), Some(Phase::FinalTesting));
        assert_eq!(Phase::from_label("done"), None);
    }

    #[test]
    fn color_tokens_keep_hex_values() {
        let hexes = [
            (ColorToken::Green, "#10b981"),
            (ColorToken::Blue, "#3b82f6"),
            (ColorToken::Red, "#ef4444"),
            (ColorToken::Orange, "#f59e0b"),
            (ColorToken::Purple, "#8b5cf6"),
            (ColorToken::Indigo, "#6366f1"),
            (ColorToken::Gray, "#6b7280"),
        ];
        for (token, hex) in hexes {
            assert_eq!(token.hex(), hex, "{token:?}");
        }
        assert_eq!(derive_status_color(100).hex(), "#10b981");
    }
}
