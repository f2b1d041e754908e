use std::collections::HashSet;

use serde::Serialize;
use simdesk_config::Tpa;

/// A TPA link to a region or channel that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Orphan {
  Region { tpa: String, region: String },
  Channel { tpa: String, channel: String },
  /// A seller rate keyed by a region that doesn't exist.
  Rate { tpa: String, region: String },
}

impl std::fmt::Display for Orphan {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Orphan::Region { tpa, region } => write!(f, "{}: unknown region '{}'", tpa, region),
      Orphan::Channel { tpa, channel } => write!(f, "{}: unknown channel '{}'", tpa, channel),
      Orphan::Rate { tpa, region } => {
        write!(f, "{}: seller rate for unknown region '{}'", tpa, region)
      }
    }
  }
}

/// Known region and channel names TPA links are checked against.
#[derive(Debug, Clone, Default)]
pub struct TpaChecker<'a> {
  regions: HashSet<&'a str>,
  channels: HashSet<&'a str>,
}

impl<'a> TpaChecker<'a> {
  pub fn new(
    regions: impl IntoIterator<Item = &'a str>,
    channels: impl IntoIterator<Item = &'a str>,
  ) -> Self {
    Self {
      regions: regions.into_iter().collect(),
      channels: channels.into_iter().collect(),
    }
  }

  /// Dangling links on one TPA. Never fails; orphans are only reported.
  pub fn orphans(&self, tpa: &Tpa) -> Vec<Orphan> {
    let mut orphans = Vec::new();

    for region in &tpa.regions {
      if !self.regions.contains(region.as_str()) {
        orphans.push(Orphan::Region {
          tpa: tpa.name.clone(),
          region: region.clone(),
        });
      }
    }

    for channel in &tpa.channels {
      if !self.channels.contains(channel.as_str()) {
        orphans.push(Orphan::Channel {
          tpa: tpa.name.clone(),
          channel: channel.clone(),
        });
      }
    }

    for region in tpa.seller_rates.keys() {
      if !self.regions.contains(region.as_str()) {
        orphans.push(Orphan::Rate {
          tpa: tpa.name.clone(),
          region: region.clone(),
        });
      }
    }

    orphans
  }

  /// Orphans across many TPAs, logging each at `warn`.
  pub fn report<'t>(&self, tpas: impl IntoIterator<Item = &'t Tpa>) -> Vec<Orphan> {
    let orphans: Vec<Orphan> = tpas.into_iter().flat_map(|t| self.orphans(t)).collect();
    for orphan in &orphans {
      tracing::warn!(%orphan, "orphaned tpa link");
    }
    orphans
  }
}
