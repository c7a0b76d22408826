//! [`SqliteStore`] — the SQLite implementation of the engine store traits.

use std::future::Future;
use std::path::Path;

use chrono::{DateTime, Utc};
use laurel_core::{
  Error, Result,
  badge::{Badge, BadgeAward, BadgeUpdate, NewBadge, NewBadgeAward},
  ledger::{IdempotencyKey, LedgerEntry, NewLedgerEntry},
  points::UserPoints,
  reward::{
    NewRedemption, NewReward, Redemption, RedemptionStatus, Reward,
    RewardUpdate,
  },
  rule::{NewRule, Rule, RuleUpdate, TriggerEvent},
  store::{
    BadgeStore, LedgerStore, PointsStore, RewardStore, RuleStore,
    SuggestionStore,
  },
  suggestion::{DraftSuggestion, Suggestion, SuggestionStatus},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  encode::{
    RawBadge, RawBadgeAward, RawLedgerEntry, RawRedemption, RawReward,
    RawRule, RawSuggestion, RawUserPoints, decode_dt,
    decode_redemption_status, decode_suggestion_status, encode_date,
    encode_dt, encode_stock, encode_uuid,
  },
  error::{domain, into_core},
  schema::SCHEMA,
};

// ─── Column lists & row mappers ──────────────────────────────────────────────

const RULE_COLS: &str = "rule_id, rule_name, scope_json, trigger_event, \
   conditions_json, logic, award_points, badge_id, priority, \
   frequency_limit, multipliers_json, notify_on_award, \
   notification_message, is_active, created_date";

fn rule_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRule> {
  Ok(RawRule {
    rule_id:              row.get(0)?,
    rule_name:            row.get(1)?,
    scope_json:           row.get(2)?,
    trigger_event:        row.get(3)?,
    conditions_json:      row.get(4)?,
    logic:                row.get(5)?,
    award_points:         row.get(6)?,
    badge_id:             row.get(7)?,
    priority:             row.get(8)?,
    frequency_limit:      row.get(9)?,
    multipliers_json:     row.get(10)?,
    notify_on_award:      row.get(11)?,
    notification_message: row.get(12)?,
    is_active:            row.get(13)?,
    created_date:         row.get(14)?,
  })
}

const LEDGER_COLS: &str = "entry_id, user_email, amount, transaction_type, \
   reference_type, reference_id, description, created_date";

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLedgerEntry> {
  Ok(RawLedgerEntry {
    entry_id:         row.get(0)?,
    user_email:       row.get(1)?,
    amount:           row.get(2)?,
    transaction_type: row.get(3)?,
    reference_type:   row.get(4)?,
    reference_id:     row.get(5)?,
    description:      row.get(6)?,
    created_date:     row.get(7)?,
  })
}

const BADGE_COLS: &str =
  "badge_id, badge_name, points_value, is_active, created_date";

fn badge_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBadge> {
  Ok(RawBadge {
    badge_id:     row.get(0)?,
    badge_name:   row.get(1)?,
    points_value: row.get(2)?,
    is_active:    row.get(3)?,
    created_date: row.get(4)?,
  })
}

const AWARD_COLS: &str =
  "award_id, user_email, badge_id, awarded_by_json, reason, awarded_date";

fn award_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBadgeAward> {
  Ok(RawBadgeAward {
    award_id:        row.get(0)?,
    user_email:      row.get(1)?,
    badge_id:        row.get(2)?,
    awarded_by_json: row.get(3)?,
    reason:          row.get(4)?,
    awarded_date:    row.get(5)?,
  })
}

const POINTS_COLS: &str = "user_email, total_points, tier, current_streak, \
   last_activity_date, badges_earned, updated_at";

fn points_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUserPoints> {
  Ok(RawUserPoints {
    user_email:         row.get(0)?,
    total_points:       row.get(1)?,
    tier:               row.get(2)?,
    current_streak:     row.get(3)?,
    last_activity_date: row.get(4)?,
    badges_earned:      row.get(5)?,
    updated_at:         row.get(6)?,
  })
}

const REWARD_COLS: &str = "reward_id, reward_name, points_cost, \
   stock_quantity, is_available, created_date";

fn reward_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawReward> {
  Ok(RawReward {
    reward_id:      row.get(0)?,
    reward_name:    row.get(1)?,
    points_cost:    row.get(2)?,
    stock_quantity: row.get(3)?,
    is_available:   row.get(4)?,
    created_date:   row.get(5)?,
  })
}

const REDEMPTION_COLS: &str = "redemption_id, reward_id, user_email, \
   points_spent, status, created_date, updated_at";

fn redemption_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawRedemption> {
  Ok(RawRedemption {
    redemption_id: row.get(0)?,
    reward_id:     row.get(1)?,
    user_email:    row.get(2)?,
    points_spent:  row.get(3)?,
    status:        row.get(4)?,
    created_date:  row.get(5)?,
    updated_at:    row.get(6)?,
  })
}

const SUGGESTION_COLS: &str = "suggestion_id, suggestion_type, title, \
   description, confidence_score, proposed_change_json, status, \
   created_date, reviewed_by, reviewed_at";

fn suggestion_from_row(
  row: &rusqlite::Row<'_>,
) -> rusqlite::Result<RawSuggestion> {
  Ok(RawSuggestion {
    suggestion_id:        row.get(0)?,
    suggestion_type:      row.get(1)?,
    title:                row.get(2)?,
    description:          row.get(3)?,
    confidence_score:     row.get(4)?,
    proposed_change_json: row.get(5)?,
    status:               row.get(6)?,
    created_date:         row.get(7)?,
    reviewed_by:          row.get(8)?,
    reviewed_at:          row.get(9)?,
  })
}

/// Append one ledger row. Shared by the plain append path, the redeem
/// transaction, and the cancel transaction.
fn insert_ledger_row(
  conn: &rusqlite::Connection,
  entry_id: &str,
  entry: &NewLedgerEntry,
  reference_id: Option<&str>,
  created_date: &str,
) -> rusqlite::Result<usize> {
  conn.execute(
    "INSERT INTO ledger (
       entry_id, user_email, amount, transaction_type,
       reference_type, reference_id, description, created_date
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      entry_id,
      entry.user_email,
      entry.amount,
      entry.transaction_type.as_str(),
      entry.reference_type.map(|r| r.as_str()),
      reference_id,
      entry.description,
      created_date,
    ],
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Laurel store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(into_core)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(into_core)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(into_core)
  }

  /// Write every mutable column of a rule row.
  async fn write_rule(&self, rule: Rule) -> Result<Rule> {
    let id_str = encode_uuid(rule.rule_id);
    let scope_json = serde_json::to_string(&rule.scope)?;
    let conditions_json = serde_json::to_string(&rule.conditions)?;
    let multipliers_json = serde_json::to_string(&rule.multipliers)?;
    let badge_id_str = rule.actions.badge_id.map(encode_uuid);
    let stored = rule.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE rules SET
             rule_name = ?2, scope_json = ?3, conditions_json = ?4,
             logic = ?5, award_points = ?6, badge_id = ?7, priority = ?8,
             frequency_limit = ?9, multipliers_json = ?10,
             notify_on_award = ?11, notification_message = ?12,
             is_active = ?13
           WHERE rule_id = ?1",
          rusqlite::params![
            id_str,
            rule.rule_name,
            scope_json,
            conditions_json,
            rule.logic.as_str(),
            rule.actions.award_points,
            badge_id_str,
            rule.priority,
            rule.frequency_limit.as_str(),
            multipliers_json,
            rule.notify_on_award,
            rule.notification_message,
            rule.is_active,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(into_core)?;
    Ok(stored)
  }
}

// ─── RuleStore ───────────────────────────────────────────────────────────────

impl RuleStore for SqliteStore {
  async fn create_rule(&self, input: NewRule) -> Result<Rule> {
    let rule = Rule {
      rule_id:              Uuid::new_v4(),
      rule_name:            input.rule_name,
      scope:                input.scope,
      trigger_event:        input.trigger_event,
      conditions:           input.conditions,
      logic:                input.logic,
      actions:              input.actions,
      priority:             input.priority,
      frequency_limit:      input.frequency_limit,
      multipliers:          input.multipliers,
      notify_on_award:      input.notify_on_award,
      notification_message: input.notification_message,
      is_active:            true,
      created_date:         Utc::now(),
    };

    let id_str = encode_uuid(rule.rule_id);
    let scope_json = serde_json::to_string(&rule.scope)?;
    let conditions_json = serde_json::to_string(&rule.conditions)?;
    let multipliers_json = serde_json::to_string(&rule.multipliers)?;
    let badge_id_str = rule.actions.badge_id.map(encode_uuid);
    let created_str = encode_dt(rule.created_date);
    let stored = rule.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO rules (
             rule_id, rule_name, scope_json, trigger_event, conditions_json,
             logic, award_points, badge_id, priority, frequency_limit,
             multipliers_json, notify_on_award, notification_message,
             is_active, created_date
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15)",
          rusqlite::params![
            id_str,
            rule.rule_name,
            scope_json,
            rule.trigger_event.as_str(),
            conditions_json,
            rule.logic.as_str(),
            rule.actions.award_points,
            badge_id_str,
            rule.priority,
            rule.frequency_limit.as_str(),
            multipliers_json,
            rule.notify_on_award,
            rule.notification_message,
            rule.is_active,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(into_core)?;

    Ok(stored)
  }

  async fn update_rule(&self, rule_id: Uuid, update: RuleUpdate) -> Result<Rule> {
    let current = self
      .get_rule(rule_id)
      .await?
      .ok_or(Error::RuleNotFound(rule_id))?;
    self.write_rule(update.apply_to(current)).await
  }

  async fn deactivate_rule(&self, rule_id: Uuid) -> Result<Rule> {
    let mut current = self
      .get_rule(rule_id)
      .await?
      .ok_or(Error::RuleNotFound(rule_id))?;
    current.is_active = false;
    self.write_rule(current).await
  }

  async fn get_rule(&self, rule_id: Uuid) -> Result<Option<Rule>> {
    let id_str = encode_uuid(rule_id);

    let raw: Option<RawRule> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RULE_COLS} FROM rules WHERE rule_id = ?1"),
              rusqlite::params![id_str],
              rule_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(into_core)?;

    raw.map(RawRule::into_rule).transpose()
  }

  async fn list_rules(&self) -> Result<Vec<Rule>> {
    let raws: Vec<RawRule> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RULE_COLS} FROM rules
           ORDER BY priority ASC, created_date ASC"
        ))?;
        let rows = stmt
          .query_map([], rule_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(into_core)?;

    raws.into_iter().map(RawRule::into_rule).collect()
  }

  async fn list_active(&self, trigger_event: TriggerEvent) -> Result<Vec<Rule>> {
    let event_str = trigger_event.as_str();

    let raws: Vec<RawRule> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RULE_COLS} FROM rules
           WHERE trigger_event = ?1 AND is_active = 1
           ORDER BY priority ASC, created_date ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![event_str], rule_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(into_core)?;

    raws.into_iter().map(RawRule::into_rule).collect()
  }
}

// ─── LedgerStore ─────────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  async fn append(
    &self,
    entry: NewLedgerEntry,
    key: Option<IdempotencyKey>,
  ) -> Result<Option<LedgerEntry>> {
    let entry_id = Uuid::new_v4();
    let created_date = Utc::now();

    let entry_id_str = encode_uuid(entry_id);
    let created_str = encode_dt(created_date);
    let reference_id_str = entry.reference_id.map(encode_uuid);
    let stored = LedgerEntry {
      entry_id,
      user_email: entry.user_email.clone(),
      amount: entry.amount,
      transaction_type: entry.transaction_type,
      reference_type: entry.reference_type,
      reference_id: entry.reference_id,
      description: entry.description.clone(),
      created_date,
    };
    let marker = key.as_ref().map(|k| {
      (
        k.as_marker(),
        k.trigger_instance_id.clone(),
        k.rule_id.map(encode_uuid),
        k.user_email.clone(),
      )
    });

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some((marker, trigger_id, rule_id_str, user_email)) = marker {
          let n = tx.execute(
            "INSERT OR IGNORE INTO rule_executions (
               idem_key, trigger_instance_id, rule_id, user_email,
               recorded_at
             ) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
              marker,
              trigger_id,
              rule_id_str,
              user_email,
              created_str,
            ],
          )?;
          if n == 0 {
            // Marker already present: this key was applied before.
            return Ok(false);
          }
        }
        insert_ledger_row(
          &tx,
          &entry_id_str,
          &entry,
          reference_id_str.as_deref(),
          &created_str,
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await
      .map_err(into_core)?;

    Ok(inserted.then_some(stored))
  }

  fn sum_for(
    &self,
    user_email: &str,
  ) -> impl Future<Output = Result<i64>> + Send + '_ {
    let email = user_email.to_string();
    async move {
      self
        .conn
        .call(move |conn| {
          Ok(conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM ledger WHERE user_email = ?1",
            rusqlite::params![email],
            |row| row.get(0),
          )?)
        })
        .await
        .map_err(into_core)
    }
  }

  fn entries_for(
    &self,
    user_email: &str,
  ) -> impl Future<Output = Result<Vec<LedgerEntry>>> + Send + '_ {
    let email = user_email.to_string();

    async move {
      let raws: Vec<RawLedgerEntry> = self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {LEDGER_COLS} FROM ledger
             WHERE user_email = ?1
             ORDER BY created_date DESC"
          ))?;
          let rows = stmt
            .query_map(rusqlite::params![email], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await
        .map_err(into_core)?;

      raws.into_iter().map(RawLedgerEntry::into_entry).collect()
    }
  }

  fn rule_applications(
    &self,
    rule_id: Uuid,
    user_email: &str,
  ) -> impl Future<Output = Result<Vec<DateTime<Utc>>>> + Send + '_ {
    let rule_id_str = encode_uuid(rule_id);
    let email = user_email.to_string();

    async move {
      let dates: Vec<String> = self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(
            "SELECT created_date FROM ledger
             WHERE reference_type = 'rule' AND reference_id = ?1
               AND user_email = ?2 AND transaction_type = 'rule_award'
             ORDER BY created_date DESC",
          )?;
          let rows = stmt
            .query_map(rusqlite::params![rule_id_str, email], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await
        .map_err(into_core)?;

      dates.iter().map(|s| decode_dt(s)).collect()
    }
  }

  async fn entries_since(
    &self,
    cutoff: DateTime<Utc>,
  ) -> Result<Vec<LedgerEntry>> {
    let cutoff_str = encode_dt(cutoff);

    let raws: Vec<RawLedgerEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LEDGER_COLS} FROM ledger
           WHERE created_date > ?1
           ORDER BY created_date DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![cutoff_str], entry_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(into_core)?;

    raws.into_iter().map(RawLedgerEntry::into_entry).collect()
  }
}

// ─── BadgeStore ──────────────────────────────────────────────────────────────

impl BadgeStore for SqliteStore {
  async fn create_badge(&self, input: NewBadge) -> Result<Badge> {
    let badge = Badge {
      badge_id:     Uuid::new_v4(),
      badge_name:   input.badge_name,
      points_value: input.points_value,
      is_active:    true,
      created_date: Utc::now(),
    };

    let id_str = encode_uuid(badge.badge_id);
    let created_str = encode_dt(badge.created_date);
    let stored = badge.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO badges (
             badge_id, badge_name, points_value, is_active, created_date
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            id_str,
            badge.badge_name,
            badge.points_value,
            badge.is_active,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(into_core)?;

    Ok(stored)
  }

  async fn update_badge(
    &self,
    badge_id: Uuid,
    update: BadgeUpdate,
  ) -> Result<Badge> {
    let mut badge = self
      .get_badge(badge_id)
      .await?
      .ok_or(Error::BadgeNotFound(badge_id))?;
    if let Some(v) = update.badge_name {
      badge.badge_name = v;
    }
    if let Some(v) = update.points_value {
      badge.points_value = v;
    }
    if let Some(v) = update.is_active {
      badge.is_active = v;
    }

    let id_str = encode_uuid(badge.badge_id);
    let stored = badge.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE badges SET badge_name = ?2, points_value = ?3,
             is_active = ?4
           WHERE badge_id = ?1",
          rusqlite::params![
            id_str,
            badge.badge_name,
            badge.points_value,
            badge.is_active,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(into_core)?;

    Ok(stored)
  }

  async fn get_badge(&self, badge_id: Uuid) -> Result<Option<Badge>> {
    let id_str = encode_uuid(badge_id);

    let raw: Option<RawBadge> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {BADGE_COLS} FROM badges WHERE badge_id = ?1"),
              rusqlite::params![id_str],
              badge_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(into_core)?;

    raw.map(RawBadge::into_badge).transpose()
  }

  async fn list_badges(&self) -> Result<Vec<Badge>> {
    let raws: Vec<RawBadge> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {BADGE_COLS} FROM badges ORDER BY created_date ASC"
        ))?;
        let rows = stmt
          .query_map([], badge_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(into_core)?;

    raws.into_iter().map(RawBadge::into_badge).collect()
  }

  fn award_exists(
    &self,
    user_email: &str,
    badge_id: Uuid,
  ) -> impl Future<Output = Result<bool>> + Send + '_ {
    let email = user_email.to_string();
    let id_str = encode_uuid(badge_id);

    async move {
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT 1 FROM badge_awards
                 WHERE user_email = ?1 AND badge_id = ?2",
                rusqlite::params![email, id_str],
                |_| Ok(true),
              )
              .optional()?
              .unwrap_or(false),
          )
        })
        .await
        .map_err(into_core)
    }
  }

  async fn try_create_award(
    &self,
    input: NewBadgeAward,
  ) -> Result<Option<BadgeAward>> {
    let award = BadgeAward {
      award_id:     Uuid::new_v4(),
      user_email:   input.user_email,
      badge_id:     input.badge_id,
      awarded_by:   input.awarded_by,
      reason:       input.reason,
      awarded_date: Utc::now(),
    };

    let id_str = encode_uuid(award.award_id);
    let badge_id_str = encode_uuid(award.badge_id);
    let awarded_by_json = serde_json::to_string(&award.awarded_by)?;
    let date_str = encode_dt(award.awarded_date);
    let stored = award.clone();

    let inserted: bool = self
      .conn
      .call(move |conn| {
        // The UNIQUE (user_email, badge_id) constraint turns duplicate
        // grants into no-ops.
        let n = conn.execute(
          "INSERT OR IGNORE INTO badge_awards (
             award_id, user_email, badge_id, awarded_by_json, reason,
             awarded_date
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            award.user_email,
            badge_id_str,
            awarded_by_json,
            award.reason,
            date_str,
          ],
        )?;
        Ok(n > 0)
      })
      .await
      .map_err(into_core)?;

    Ok(inserted.then_some(stored))
  }

  fn awards_for(
    &self,
    user_email: &str,
  ) -> impl Future<Output = Result<Vec<BadgeAward>>> + Send + '_ {
    let email = user_email.to_string();

    async move {
      let raws: Vec<RawBadgeAward> = self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {AWARD_COLS} FROM badge_awards
             WHERE user_email = ?1
             ORDER BY awarded_date DESC"
          ))?;
          let rows = stmt
            .query_map(rusqlite::params![email], award_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await
        .map_err(into_core)?;

      raws.into_iter().map(RawBadgeAward::into_award).collect()
    }
  }

  async fn awards_since(
    &self,
    cutoff: DateTime<Utc>,
  ) -> Result<Vec<BadgeAward>> {
    let cutoff_str = encode_dt(cutoff);

    let raws: Vec<RawBadgeAward> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {AWARD_COLS} FROM badge_awards
           WHERE awarded_date > ?1
           ORDER BY awarded_date DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![cutoff_str], award_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(into_core)?;

    raws.into_iter().map(RawBadgeAward::into_award).collect()
  }
}

// ─── PointsStore ─────────────────────────────────────────────────────────────

impl PointsStore for SqliteStore {
  fn get_points(
    &self,
    user_email: &str,
  ) -> impl Future<Output = Result<Option<UserPoints>>> + Send + '_ {
    let email = user_email.to_string();

    async move {
      let raw: Option<RawUserPoints> = self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                &format!(
                  "SELECT {POINTS_COLS} FROM user_points WHERE user_email = ?1"
                ),
                rusqlite::params![email],
                points_from_row,
              )
              .optional()?,
          )
        })
        .await
        .map_err(into_core)?;

      raw.map(RawUserPoints::into_points).transpose()
    }
  }

  async fn upsert_points(&self, points: UserPoints) -> Result<()> {
    let last_activity_str = points.last_activity_date.map(encode_date);
    let updated_str = encode_dt(points.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_points (
             user_email, total_points, tier, current_streak,
             last_activity_date, badges_earned, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(user_email) DO UPDATE SET
             total_points = excluded.total_points,
             tier = excluded.tier,
             current_streak = excluded.current_streak,
             last_activity_date = excluded.last_activity_date,
             badges_earned = excluded.badges_earned,
             updated_at = excluded.updated_at",
          rusqlite::params![
            points.user_email,
            points.total_points,
            points.tier.as_str(),
            points.current_streak,
            last_activity_str,
            points.badges_earned,
            updated_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(into_core)
  }

  async fn list_points(&self) -> Result<Vec<UserPoints>> {
    let raws: Vec<RawUserPoints> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {POINTS_COLS} FROM user_points
           ORDER BY total_points DESC"
        ))?;
        let rows = stmt
          .query_map([], points_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(into_core)?;

    raws.into_iter().map(RawUserPoints::into_points).collect()
  }
}

// ─── RewardStore ─────────────────────────────────────────────────────────────

impl RewardStore for SqliteStore {
  async fn create_reward(&self, input: NewReward) -> Result<Reward> {
    let reward = Reward {
      reward_id:    Uuid::new_v4(),
      reward_name:  input.reward_name,
      points_cost:  input.points_cost,
      stock:        input.stock,
      is_available: true,
      created_date: Utc::now(),
    };

    let id_str = encode_uuid(reward.reward_id);
    let stock_val = encode_stock(reward.stock);
    let created_str = encode_dt(reward.created_date);
    let stored = reward.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO rewards (
             reward_id, reward_name, points_cost, stock_quantity,
             is_available, created_date
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            reward.reward_name,
            reward.points_cost,
            stock_val,
            reward.is_available,
            created_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(into_core)?;

    Ok(stored)
  }

  async fn update_reward(
    &self,
    reward_id: Uuid,
    update: RewardUpdate,
  ) -> Result<Reward> {
    let mut reward = self
      .get_reward(reward_id)
      .await?
      .ok_or(Error::RewardNotFound(reward_id))?;
    if let Some(v) = update.reward_name {
      reward.reward_name = v;
    }
    if let Some(v) = update.points_cost {
      reward.points_cost = v;
    }
    if let Some(v) = update.stock {
      reward.stock = v;
    }
    if let Some(v) = update.is_available {
      reward.is_available = v;
    }

    let id_str = encode_uuid(reward.reward_id);
    let stock_val = encode_stock(reward.stock);
    let stored = reward.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE rewards SET reward_name = ?2, points_cost = ?3,
             stock_quantity = ?4, is_available = ?5
           WHERE reward_id = ?1",
          rusqlite::params![
            id_str,
            reward.reward_name,
            reward.points_cost,
            stock_val,
            reward.is_available,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(into_core)?;

    Ok(stored)
  }

  async fn get_reward(&self, reward_id: Uuid) -> Result<Option<Reward>> {
    let id_str = encode_uuid(reward_id);

    let raw: Option<RawReward> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REWARD_COLS} FROM rewards WHERE reward_id = ?1"
              ),
              rusqlite::params![id_str],
              reward_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(into_core)?;

    raw.map(RawReward::into_reward).transpose()
  }

  async fn list_available(&self) -> Result<Vec<Reward>> {
    let raws: Vec<RawReward> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REWARD_COLS} FROM rewards
           WHERE is_available = 1
           ORDER BY points_cost ASC"
        ))?;
        let rows = stmt
          .query_map([], reward_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(into_core)?;

    raws.into_iter().map(RawReward::into_reward).collect()
  }

  async fn redeem(
    &self,
    input: NewRedemption,
    debit: NewLedgerEntry,
  ) -> Result<Redemption> {
    let now = Utc::now();
    let redemption = Redemption {
      redemption_id: Uuid::new_v4(),
      reward_id:     input.reward_id,
      user_email:    input.user_email,
      points_spent:  input.points_spent,
      status:        RedemptionStatus::Pending,
      created_date:  now,
      updated_at:    now,
    };

    let redemption_id_str = encode_uuid(redemption.redemption_id);
    let reward_id = redemption.reward_id;
    let reward_id_str = encode_uuid(reward_id);
    let entry_id_str = encode_uuid(Uuid::new_v4());
    let now_str = encode_dt(now);
    let stored = redemption.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let stock: Option<i64> = tx
          .query_row(
            "SELECT stock_quantity FROM rewards WHERE reward_id = ?1",
            rusqlite::params![reward_id_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(stock) = stock else {
          return Err(domain(Error::RewardNotFound(reward_id)));
        };

        // Conditional decrement: a concurrent redeem of the last unit
        // makes this update touch zero rows, and the loser gets OutOfStock
        // with nothing written.
        if stock >= 0 {
          let n = tx.execute(
            "UPDATE rewards SET stock_quantity = stock_quantity - 1
             WHERE reward_id = ?1 AND stock_quantity > 0",
            rusqlite::params![reward_id_str],
          )?;
          if n == 0 {
            return Err(domain(Error::OutOfStock));
          }
        }

        tx.execute(
          "INSERT INTO redemptions (
             redemption_id, reward_id, user_email, points_spent, status,
             created_date, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            redemption_id_str,
            reward_id_str,
            redemption.user_email,
            redemption.points_spent,
            redemption.status.as_str(),
            now_str,
            now_str,
          ],
        )?;
        insert_ledger_row(
          &tx,
          &entry_id_str,
          &debit,
          Some(&redemption_id_str),
          &now_str,
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(into_core)?;

    Ok(stored)
  }

  async fn get_redemption(
    &self,
    redemption_id: Uuid,
  ) -> Result<Option<Redemption>> {
    let id_str = encode_uuid(redemption_id);

    let raw: Option<RawRedemption> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REDEMPTION_COLS} FROM redemptions
                 WHERE redemption_id = ?1"
              ),
              rusqlite::params![id_str],
              redemption_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(into_core)?;

    raw.map(RawRedemption::into_redemption).transpose()
  }

  async fn transition_redemption(
    &self,
    redemption_id: Uuid,
    to: RedemptionStatus,
  ) -> Result<Redemption> {
    let id_str = encode_uuid(redemption_id);
    let now_str = encode_dt(Utc::now());

    let raw: RawRedemption = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let mut raw = tx
          .query_row(
            &format!(
              "SELECT {REDEMPTION_COLS} FROM redemptions
               WHERE redemption_id = ?1"
            ),
            rusqlite::params![id_str],
            redemption_from_row,
          )
          .optional()?
          .ok_or_else(|| domain(Error::RedemptionNotFound(redemption_id)))?;

        let from = decode_redemption_status(&raw.status).map_err(domain)?;
        if !from.can_transition_to(to) {
          return Err(domain(Error::InvalidTransition { from, to }));
        }

        tx.execute(
          "UPDATE redemptions SET status = ?2, updated_at = ?3
           WHERE redemption_id = ?1",
          rusqlite::params![id_str, to.as_str(), now_str],
        )?;
        tx.commit()?;

        raw.status = to.as_str().to_string();
        raw.updated_at = now_str;
        Ok(raw)
      })
      .await
      .map_err(into_core)?;

    raw.into_redemption()
  }

  async fn cancel_redemption(
    &self,
    redemption_id: Uuid,
    refund: NewLedgerEntry,
  ) -> Result<Redemption> {
    let id_str = encode_uuid(redemption_id);
    let entry_id_str = encode_uuid(Uuid::new_v4());
    let now_str = encode_dt(Utc::now());

    let raw: RawRedemption = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let mut raw = tx
          .query_row(
            &format!(
              "SELECT {REDEMPTION_COLS} FROM redemptions
               WHERE redemption_id = ?1"
            ),
            rusqlite::params![id_str],
            redemption_from_row,
          )
          .optional()?
          .ok_or_else(|| domain(Error::RedemptionNotFound(redemption_id)))?;

        let from = decode_redemption_status(&raw.status).map_err(domain)?;
        if !from.can_transition_to(RedemptionStatus::Cancelled) {
          return Err(domain(Error::InvalidTransition {
            from,
            to: RedemptionStatus::Cancelled,
          }));
        }

        tx.execute(
          "UPDATE redemptions SET status = 'cancelled', updated_at = ?2
           WHERE redemption_id = ?1",
          rusqlite::params![id_str, now_str],
        )?;
        // Unlimited stock stays at the -1 sentinel.
        tx.execute(
          "UPDATE rewards SET stock_quantity = stock_quantity + 1
           WHERE reward_id = ?1 AND stock_quantity >= 0",
          rusqlite::params![raw.reward_id],
        )?;
        insert_ledger_row(&tx, &entry_id_str, &refund, Some(&id_str), &now_str)?;
        tx.commit()?;

        raw.status = RedemptionStatus::Cancelled.as_str().to_string();
        raw.updated_at = now_str;
        Ok(raw)
      })
      .await
      .map_err(into_core)?;

    raw.into_redemption()
  }

  fn redemptions_for(
    &self,
    user_email: &str,
  ) -> impl Future<Output = Result<Vec<Redemption>>> + Send + '_ {
    let email = user_email.to_string();

    async move {
      let raws: Vec<RawRedemption> = self
        .conn
        .call(move |conn| {
          let mut stmt = conn.prepare(&format!(
            "SELECT {REDEMPTION_COLS} FROM redemptions
             WHERE user_email = ?1
             ORDER BY created_date DESC"
          ))?;
          let rows = stmt
            .query_map(rusqlite::params![email], redemption_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          Ok(rows)
        })
        .await
        .map_err(into_core)?;

      raws.into_iter().map(RawRedemption::into_redemption).collect()
    }
  }
}

// ─── SuggestionStore ─────────────────────────────────────────────────────────

impl SuggestionStore for SqliteStore {
  async fn create_suggestion(&self, draft: DraftSuggestion) -> Result<Suggestion> {
    let suggestion = Suggestion {
      suggestion_id:    Uuid::new_v4(),
      suggestion_type:  draft.suggestion_type,
      title:            draft.title,
      description:      draft.description,
      confidence_score: draft.confidence_score.clamp(0.0, 1.0),
      proposed_change:  draft.proposed_change,
      status:           SuggestionStatus::Pending,
      created_date:     Utc::now(),
      reviewed_by:      None,
      reviewed_at:      None,
    };

    let id_str = encode_uuid(suggestion.suggestion_id);
    let change_json = serde_json::to_string(&suggestion.proposed_change)?;
    let created_str = encode_dt(suggestion.created_date);
    let stored = suggestion.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO suggestions (
             suggestion_id, suggestion_type, title, description,
             confidence_score, proposed_change_json, status, created_date
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            suggestion.suggestion_type.as_str(),
            suggestion.title,
            suggestion.description,
            suggestion.confidence_score,
            change_json,
            suggestion.status.as_str(),
            created_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(into_core)?;

    Ok(stored)
  }

  async fn get_suggestion(
    &self,
    suggestion_id: Uuid,
  ) -> Result<Option<Suggestion>> {
    let id_str = encode_uuid(suggestion_id);

    let raw: Option<RawSuggestion> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SUGGESTION_COLS} FROM suggestions
                 WHERE suggestion_id = ?1"
              ),
              rusqlite::params![id_str],
              suggestion_from_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(into_core)?;

    raw.map(RawSuggestion::into_suggestion).transpose()
  }

  async fn list_suggestions(
    &self,
    status: Option<SuggestionStatus>,
  ) -> Result<Vec<Suggestion>> {
    let status_str = status.map(|s| s.as_str().to_owned());

    let raws: Vec<RawSuggestion> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(s) = status_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {SUGGESTION_COLS} FROM suggestions
             WHERE status = ?1
             ORDER BY created_date DESC"
          ))?;
          stmt
            .query_map(rusqlite::params![s], suggestion_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {SUGGESTION_COLS} FROM suggestions
             ORDER BY created_date DESC"
          ))?;
          stmt
            .query_map([], suggestion_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await
      .map_err(into_core)?;

    raws.into_iter().map(RawSuggestion::into_suggestion).collect()
  }

  async fn transition_suggestion(
    &self,
    suggestion_id: Uuid,
    from: SuggestionStatus,
    to: SuggestionStatus,
    reviewed_by: Option<String>,
  ) -> Result<Suggestion> {
    let id_str = encode_uuid(suggestion_id);
    let now_str = encode_dt(Utc::now());

    let raw: RawSuggestion = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let mut raw = tx
          .query_row(
            &format!(
              "SELECT {SUGGESTION_COLS} FROM suggestions
               WHERE suggestion_id = ?1"
            ),
            rusqlite::params![id_str],
            suggestion_from_row,
          )
          .optional()?
          .ok_or_else(|| domain(Error::SuggestionNotFound(suggestion_id)))?;

        let actual = decode_suggestion_status(&raw.status).map_err(domain)?;
        if actual != from {
          return Err(domain(Error::SuggestionNotIn {
            id:       suggestion_id,
            expected: from.as_str(),
            actual:   actual.as_str().to_string(),
          }));
        }

        tx.execute(
          "UPDATE suggestions SET status = ?2,
             reviewed_by = COALESCE(?3, reviewed_by), reviewed_at = ?4
           WHERE suggestion_id = ?1",
          rusqlite::params![id_str, to.as_str(), reviewed_by, now_str],
        )?;
        tx.commit()?;

        raw.status = to.as_str().to_string();
        if reviewed_by.is_some() {
          raw.reviewed_by = reviewed_by;
        }
        raw.reviewed_at = Some(now_str);
        Ok(raw)
      })
      .await
      .map_err(into_core)?;

    raw.into_suggestion()
  }
}
