//! Broadcast snapshots fetched from Lichess and the partial edit bodies sent back.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Tournament metadata attached to a broadcast response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tour {
    /// Tournament identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
}

/// A broadcast tournament together with its rounds in official order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    /// Tournament metadata.
    pub tour: Tour,
    /// Rounds in official order; position 1 is the first element.
    #[serde(default)]
    pub rounds: Vec<Round>,
}

/// Points awarded to one color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideScoring {
    /// Points for a win.
    pub win: f64,
    /// Points for a draw.
    pub draw: f64,
}

/// Per-color custom scoring of a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomScoring {
    /// Points for the white player.
    pub white: SideScoring,
    /// Points for the black player.
    pub black: SideScoring,
}

/// Read-only snapshot of one broadcast round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Round identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// URL slug.
    #[serde(default)]
    pub slug: String,
    /// Scheduled start in epoch milliseconds.
    #[serde(default)]
    pub starts_at: Option<i64>,
    /// Whether the round starts once the previous one finishes.
    #[serde(default)]
    pub starts_after_previous: Option<bool>,
    /// Transmission delay in seconds.
    #[serde(default)]
    pub delay: Option<u32>,
    /// Source polling period in seconds.
    #[serde(default)]
    pub period: Option<u32>,
    /// Custom scoring, when configured.
    #[serde(default)]
    pub custom_scoring: Option<CustomScoring>,
}

impl Round {
    /// Label used in console messages: the name when known, otherwise the id.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Mechanism populating a round's games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncSource {
    /// Poll a single PGN URL.
    Url,
    /// Poll a newline-separated list of PGN URLs.
    Urls,
    /// Mirror a list of Lichess game ids.
    Ids,
}

impl SyncSource {
    /// Wire name of the source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Urls => "urls",
            Self::Ids => "ids",
        }
    }
}

/// Partial round edit. Absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundEdit {
    /// Transmission delay in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u32>,
    /// Scheduled start in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<i64>,
    /// Start once the previous round finishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_after_previous: Option<bool>,
    /// Source polling period in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    /// Sync mechanism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_source: Option<SyncSource>,
    /// Single source URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_url: Option<String>,
    /// Newline-separated source URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_urls: Option<String>,
    /// Space-separated Lichess game ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_ids: Option<String>,
    /// Only keep games whose round tag matches this number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_round: Option<u32>,
    /// Game slice filter such as `1-5,7`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slices: Option<String>,
    /// Points for a white win.
    #[serde(
        rename = "customScoring.white.win",
        skip_serializing_if = "Option::is_none"
    )]
    pub white_win: Option<f64>,
    /// Points for a white draw.
    #[serde(
        rename = "customScoring.white.draw",
        skip_serializing_if = "Option::is_none"
    )]
    pub white_draw: Option<f64>,
    /// Points for a black win.
    #[serde(
        rename = "customScoring.black.win",
        skip_serializing_if = "Option::is_none"
    )]
    pub black_win: Option<f64>,
    /// Points for a black draw.
    #[serde(
        rename = "customScoring.black.draw",
        skip_serializing_if = "Option::is_none"
    )]
    pub black_draw: Option<f64>,
}

impl RoundEdit {
    /// `true` when no field would be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Present fields as `(wire name, rendered value)` pairs, in wire order.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        if let Some(delay) = self.delay {
            fields.push(("delay", format!("{delay}s")));
        }
        if let Some(starts_at) = self.starts_at {
            fields.push(("startsAt", starts_at.to_string()));
        }
        if let Some(value) = self.starts_after_previous {
            fields.push(("startsAfterPrevious", value.to_string()));
        }
        if let Some(period) = self.period {
            fields.push(("period", format!("{period}s")));
        }
        if let Some(source) = self.sync_source {
            fields.push(("syncSource", source.as_str().to_string()));
        }
        if let Some(url) = &self.sync_url {
            fields.push(("syncUrl", url.clone()));
        }
        if let Some(urls) = &self.sync_urls {
            fields.push(("syncUrls", urls.clone()));
        }
        if let Some(ids) = &self.sync_ids {
            fields.push(("syncIds", ids.clone()));
        }
        if let Some(round) = self.only_round {
            fields.push(("onlyRound", round.to_string()));
        }
        if let Some(slices) = &self.slices {
            fields.push(("slices", slices.clone()));
        }
        for (name, value) in [
            ("customScoring.white.win", self.white_win),
            ("customScoring.white.draw", self.white_draw),
            ("customScoring.black.win", self.black_win),
            ("customScoring.black.draw", self.black_draw),
        ] {
            if let Some(value) = value {
                fields.push((name, value.to_string()));
            }
        }
        fields
    }
}

impl Display for RoundEdit {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let rendered = self
            .fields()
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        if rendered.is_empty() {
            formatter.write_str("no changes")
        } else {
            formatter.write_str(&rendered)
        }
    }
}
