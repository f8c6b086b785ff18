//! Notification dispatch: filter the diff for significant changes,
//! format one message, push it to every subscribed device in a single
//! batch call.

pub mod onesignal;

use metrics::counter;
use tracing::{debug, info};

use crate::compare::{ChangeKind, RankingChange};
use crate::error::Result;
use crate::store::{Ranking, Store};

/// Push transport seam; OneSignal in production, mocks in tests.
#[async_trait::async_trait]
pub trait PushSender: Send + Sync {
    /// One batch call delivering `message` to every player id.
    async fn send_batch(&self, player_ids: &[String], message: &str) -> Result<()>;
}

/// A change worth waking a user for: entering or leaving the ranking
/// always qualifies; a move qualifies from `threshold` positions up.
pub fn is_significant(change: &RankingChange, threshold: i64) -> bool {
    match change.kind {
        ChangeKind::New | ChangeKind::Out => true,
        ChangeKind::Up | ChangeKind::Down => change.change_amount >= threshold,
        ChangeKind::Same => false,
    }
}

/// Message templates match the product copy exactly (vi).
pub fn format_message(ranking_name: &str, change: &RankingChange) -> String {
    match change.kind {
        ChangeKind::New => format!("🆕 {} mới vào {}!", change.item_name, ranking_name),
        ChangeKind::Out => format!("📉 {} rơi khỏi {}", change.item_name, ranking_name),
        ChangeKind::Up => format!(
            "📈 {} tăng {} hạng trong {}!",
            change.item_name, change.change_amount, ranking_name
        ),
        ChangeKind::Down => format!(
            "📊 {} giảm {} hạng trong {}",
            change.item_name, change.change_amount, ranking_name
        ),
        // never significant, so never rendered
        ChangeKind::Same => String::new(),
    }
}

/// Notify subscribers of one ranking about this run's changes.
///
/// The message is built from the first significant change only, even
/// when several occurred — intentional product behavior, kept as-is.
/// Returns whether a push was actually sent.
pub async fn dispatch(
    store: &Store,
    push: &dyn PushSender,
    ranking: &Ranking,
    changes: &[RankingChange],
    threshold: i64,
) -> Result<bool> {
    let player_ids = store.player_ids_for(&ranking.id).await?;
    if player_ids.is_empty() {
        debug!(ranking = %ranking.id, "no subscribers, skipping notification");
        return Ok(false);
    }

    let Some(first) = changes.iter().find(|c| is_significant(c, threshold)) else {
        debug!(ranking = %ranking.id, "no significant changes to notify");
        return Ok(false);
    };

    let message = format_message(&ranking.name, first);
    push.send_batch(&player_ids, &message).await?;

    counter!("rankalert_notifications_sent_total").increment(1);
    info!(
        ranking = %ranking.id,
        devices = player_ids.len(),
        "sent change notification"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(kind: ChangeKind, amount: i64) -> RankingChange {
        RankingChange {
            item_id: "atsh-001".into(),
            item_name: "Anh Trai A".into(),
            old_position: Some(4),
            new_position: if kind == ChangeKind::Out { -1 } else { 2 },
            kind,
            change_amount: amount,
        }
    }

    #[test]
    fn new_and_out_are_always_significant() {
        assert!(is_significant(&change(ChangeKind::New, 0), 3));
        assert!(is_significant(&change(ChangeKind::Out, 0), 3));
    }

    #[test]
    fn moves_respect_the_threshold() {
        assert!(!is_significant(&change(ChangeKind::Down, 2), 3));
        assert!(is_significant(&change(ChangeKind::Down, 3), 3));
        assert!(is_significant(&change(ChangeKind::Up, 5), 3));
        assert!(is_significant(&change(ChangeKind::Up, 1), 1));
    }

    #[test]
    fn same_is_never_significant_and_renders_nothing() {
        assert!(!is_significant(&change(ChangeKind::Same, 10), 1));
        assert!(format_message("Anh Trai Say Hi", &change(ChangeKind::Same, 0)).is_empty());
    }

    #[test]
    fn message_templates_per_kind() {
        let ranking = "Anh Trai Say Hi";
        assert_eq!(
            format_message(ranking, &change(ChangeKind::New, 0)),
            "🆕 Anh Trai A mới vào Anh Trai Say Hi!"
        );
        assert_eq!(
            format_message(ranking, &change(ChangeKind::Out, 0)),
            "📉 Anh Trai A rơi khỏi Anh Trai Say Hi"
        );
        assert_eq!(
            format_message(ranking, &change(ChangeKind::Up, 2)),
            "📈 Anh Trai A tăng 2 hạng trong Anh Trai Say Hi!"
        );
        assert_eq!(
            format_message(ranking, &change(ChangeKind::Down, 3)),
            "📊 Anh Trai A giảm 3 hạng trong Anh Trai Say Hi"
        );
    }
}
