//! compare.rs — pure diff between two ranking snapshots.
//!
//! No I/O, deterministic. Output order is load-bearing: the dispatcher
//! builds its message from the first significant entry, so transitions
//! derived from the new list come first (in new-list order), drop-outs
//! last (in old-list order).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Sentinel position for items that dropped out of the ranking.
pub const POSITION_OUT: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    New,
    Up,
    Down,
    Out,
    Same,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::New => write!(f, "new"),
            ChangeKind::Up => write!(f, "up"),
            ChangeKind::Down => write!(f, "down"),
            ChangeKind::Out => write!(f, "out"),
            ChangeKind::Same => write!(f, "same"),
        }
    }
}

impl FromStr for ChangeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_lowercase().as_str() {
            "new" => Ok(ChangeKind::New),
            "up" => Ok(ChangeKind::Up),
            "down" => Ok(ChangeKind::Down),
            "out" => Ok(ChangeKind::Out),
            "same" => Ok(ChangeKind::Same),
            _ => Err(Error::Config(format!("unknown change kind: {s}"))),
        }
    }
}

/// One detected per-item transition between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingChange {
    pub item_id: String,
    pub item_name: String,
    pub old_position: Option<i64>,
    /// `POSITION_OUT` (-1) when the item left the ranking.
    pub new_position: i64,
    pub kind: ChangeKind,
    /// Absolute position delta; 0 for `new` and `out`.
    pub change_amount: i64,
}

/// Anything with a stable item key and a 1-based position can be
/// diffed — stored rows and freshly fetched items both qualify.
pub trait Ranked {
    fn item_id(&self) -> &str;
    fn item_name(&self) -> &str;
    fn position(&self) -> i64;
}

/// Diff two snapshots of one ranking.
///
/// Items present in both with an unchanged position emit nothing
/// (implicit `same`).
pub fn compare<O: Ranked, N: Ranked>(old: &[O], new: &[N]) -> Vec<RankingChange> {
    let old_by_id: HashMap<&str, &O> = old.iter().map(|it| (it.item_id(), it)).collect();
    let new_by_id: HashMap<&str, &N> = new.iter().map(|it| (it.item_id(), it)).collect();

    let mut changes = Vec::new();

    for item in new {
        match old_by_id.get(item.item_id()) {
            None => changes.push(RankingChange {
                item_id: item.item_id().to_string(),
                item_name: item.item_name().to_string(),
                old_position: None,
                new_position: item.position(),
                kind: ChangeKind::New,
                change_amount: 0,
            }),
            Some(prev) if prev.position() != item.position() => {
                let delta = prev.position() - item.position();
                changes.push(RankingChange {
                    item_id: item.item_id().to_string(),
                    item_name: item.item_name().to_string(),
                    old_position: Some(prev.position()),
                    new_position: item.position(),
                    kind: if delta > 0 {
                        ChangeKind::Up
                    } else {
                        ChangeKind::Down
                    },
                    change_amount: delta.abs(),
                });
            }
            Some(_) => {}
        }
    }

    for item in old {
        if !new_by_id.contains_key(item.item_id()) {
            changes.push(RankingChange {
                item_id: item.item_id().to_string(),
                item_name: item.item_name().to_string(),
                old_position: Some(item.position()),
                new_position: POSITION_OUT,
                kind: ChangeKind::Out,
                change_amount: 0,
            });
        }
    }

    changes
}
