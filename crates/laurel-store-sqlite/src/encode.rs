//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and calendar dates as
//! `YYYY-MM-DD`. Structured fields (scope, conditions, multipliers,
//! `AwardedBy`, `ProposedChange`) are stored as compact JSON. UUIDs are
//! stored as hyphenated lowercase strings. Enum discriminants reuse the
//! domain types' `as_str` forms.

use chrono::{DateTime, NaiveDate, Utc};
use laurel_core::{
  Result,
  badge::{Badge, BadgeAward},
  ledger::{LedgerEntry, ReferenceType, TransactionType},
  points::{Tier, UserPoints},
  reward::{Redemption, RedemptionStatus, Reward, Stock},
  rule::{ConditionLogic, FrequencyLimit, Rule, TriggerEvent},
  suggestion::{Suggestion, SuggestionStatus, SuggestionType},
};
use uuid::Uuid;

use crate::error::corrupt;

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(|_| corrupt("uuid", s))
}

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|_| corrupt("timestamp", s))
}

pub fn encode_date(d: NaiveDate) -> String { d.to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  s.parse().map_err(|_| corrupt("date", s))
}

// ─── Enum discriminants ──────────────────────────────────────────────────────

pub fn decode_trigger_event(s: &str) -> Result<TriggerEvent> {
  match s {
    "event_attendance" => Ok(TriggerEvent::EventAttendance),
    "recognition_sent" => Ok(TriggerEvent::RecognitionSent),
    "recognition_received" => Ok(TriggerEvent::RecognitionReceived),
    "challenge_completed" => Ok(TriggerEvent::ChallengeCompleted),
    "module_completed" => Ok(TriggerEvent::ModuleCompleted),
    "learning_path_completed" => Ok(TriggerEvent::LearningPathCompleted),
    "profile_updated" => Ok(TriggerEvent::ProfileUpdated),
    "content_created" => Ok(TriggerEvent::ContentCreated),
    other => Err(corrupt("trigger event", other)),
  }
}

pub fn decode_logic(s: &str) -> Result<ConditionLogic> {
  match s {
    "AND" => Ok(ConditionLogic::And),
    "OR" => Ok(ConditionLogic::Or),
    other => Err(corrupt("condition logic", other)),
  }
}

pub fn decode_frequency_limit(s: &str) -> Result<FrequencyLimit> {
  match s {
    "unlimited" => Ok(FrequencyLimit::Unlimited),
    "once" => Ok(FrequencyLimit::Once),
    "daily" => Ok(FrequencyLimit::Daily),
    "weekly" => Ok(FrequencyLimit::Weekly),
    "monthly" => Ok(FrequencyLimit::Monthly),
    other => Err(corrupt("frequency limit", other)),
  }
}

pub fn decode_transaction_type(s: &str) -> Result<TransactionType> {
  match s {
    "rule_award" => Ok(TransactionType::RuleAward),
    "manual_adjustment" => Ok(TransactionType::ManualAdjustment),
    "badge_earned" => Ok(TransactionType::BadgeEarned),
    "redemption_debit" => Ok(TransactionType::RedemptionDebit),
    "redemption_refund" => Ok(TransactionType::RedemptionRefund),
    other => Err(corrupt("transaction type", other)),
  }
}

pub fn decode_reference_type(s: &str) -> Result<ReferenceType> {
  match s {
    "rule" => Ok(ReferenceType::Rule),
    "badge" => Ok(ReferenceType::Badge),
    "redemption" => Ok(ReferenceType::Redemption),
    other => Err(corrupt("reference type", other)),
  }
}

pub fn decode_tier(s: &str) -> Result<Tier> {
  match s {
    "bronze" => Ok(Tier::Bronze),
    "silver" => Ok(Tier::Silver),
    "gold" => Ok(Tier::Gold),
    "platinum" => Ok(Tier::Platinum),
    other => Err(corrupt("tier", other)),
  }
}

pub fn decode_redemption_status(s: &str) -> Result<RedemptionStatus> {
  match s {
    "pending" => Ok(RedemptionStatus::Pending),
    "approved" => Ok(RedemptionStatus::Approved),
    "fulfilled" => Ok(RedemptionStatus::Fulfilled),
    "cancelled" => Ok(RedemptionStatus::Cancelled),
    other => Err(corrupt("redemption status", other)),
  }
}

pub fn decode_suggestion_status(s: &str) -> Result<SuggestionStatus> {
  match s {
    "pending" => Ok(SuggestionStatus::Pending),
    "approved" => Ok(SuggestionStatus::Approved),
    "implemented" => Ok(SuggestionStatus::Implemented),
    "rejected" => Ok(SuggestionStatus::Rejected),
    other => Err(corrupt("suggestion status", other)),
  }
}

pub fn decode_suggestion_type(s: &str) -> Result<SuggestionType> {
  match s {
    "new_rule" => Ok(SuggestionType::NewRule),
    "rule_adjustment" => Ok(SuggestionType::RuleAdjustment),
    "new_badge" => Ok(SuggestionType::NewBadge),
    "badge_adjustment" => Ok(SuggestionType::BadgeAdjustment),
    "new_reward" => Ok(SuggestionType::NewReward),
    "reward_adjustment" => Ok(SuggestionType::RewardAdjustment),
    other => Err(corrupt("suggestion type", other)),
  }
}

// ─── Stock ───────────────────────────────────────────────────────────────────

/// `-1` is the unlimited sentinel in the `stock_quantity` column.
pub fn encode_stock(stock: Stock) -> i64 {
  match stock {
    Stock::Limited(n) => i64::from(n),
    Stock::Unlimited => -1,
  }
}

pub fn decode_stock(quantity: i64) -> Stock {
  if quantity < 0 {
    Stock::Unlimited
  } else {
    Stock::Limited(quantity as u32)
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `rules` row.
pub struct RawRule {
  pub rule_id:              String,
  pub rule_name:            String,
  pub scope_json:           String,
  pub trigger_event:        String,
  pub conditions_json:      String,
  pub logic:                String,
  pub award_points:         i64,
  pub badge_id:             Option<String>,
  pub priority:             i32,
  pub frequency_limit:      String,
  pub multipliers_json:     String,
  pub notify_on_award:      bool,
  pub notification_message: Option<String>,
  pub is_active:            bool,
  pub created_date:         String,
}

impl RawRule {
  pub fn into_rule(self) -> Result<Rule> {
    Ok(Rule {
      rule_id:              decode_uuid(&self.rule_id)?,
      rule_name:            self.rule_name,
      scope:                serde_json::from_str(&self.scope_json)?,
      trigger_event:        decode_trigger_event(&self.trigger_event)?,
      conditions:           serde_json::from_str(&self.conditions_json)?,
      logic:                decode_logic(&self.logic)?,
      actions:              laurel_core::rule::RuleActions {
        award_points: self.award_points,
        badge_id:     self
          .badge_id
          .as_deref()
          .map(decode_uuid)
          .transpose()?,
      },
      priority:             self.priority,
      frequency_limit:      decode_frequency_limit(&self.frequency_limit)?,
      multipliers:          serde_json::from_str(&self.multipliers_json)?,
      notify_on_award:      self.notify_on_award,
      notification_message: self.notification_message,
      is_active:            self.is_active,
      created_date:         decode_dt(&self.created_date)?,
    })
  }
}

/// Raw strings read directly from a `ledger` row.
pub struct RawLedgerEntry {
  pub entry_id:         String,
  pub user_email:       String,
  pub amount:           i64,
  pub transaction_type: String,
  pub reference_type:   Option<String>,
  pub reference_id:     Option<String>,
  pub description:      String,
  pub created_date:     String,
}

impl RawLedgerEntry {
  pub fn into_entry(self) -> Result<LedgerEntry> {
    Ok(LedgerEntry {
      entry_id:         decode_uuid(&self.entry_id)?,
      user_email:       self.user_email,
      amount:           self.amount,
      transaction_type: decode_transaction_type(&self.transaction_type)?,
      reference_type:   self
        .reference_type
        .as_deref()
        .map(decode_reference_type)
        .transpose()?,
      reference_id:     self
        .reference_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      description:      self.description,
      created_date:     decode_dt(&self.created_date)?,
    })
  }
}

/// Raw strings read directly from a `badges` row.
pub struct RawBadge {
  pub badge_id:     String,
  pub badge_name:   String,
  pub points_value: i64,
  pub is_active:    bool,
  pub created_date: String,
}

impl RawBadge {
  pub fn into_badge(self) -> Result<Badge> {
    Ok(Badge {
      badge_id:     decode_uuid(&self.badge_id)?,
      badge_name:   self.badge_name,
      points_value: self.points_value,
      is_active:    self.is_active,
      created_date: decode_dt(&self.created_date)?,
    })
  }
}

/// Raw strings read directly from a `badge_awards` row.
pub struct RawBadgeAward {
  pub award_id:        String,
  pub user_email:      String,
  pub badge_id:        String,
  pub awarded_by_json: String,
  pub reason:          String,
  pub awarded_date:    String,
}

impl RawBadgeAward {
  pub fn into_award(self) -> Result<BadgeAward> {
    Ok(BadgeAward {
      award_id:     decode_uuid(&self.award_id)?,
      user_email:   self.user_email,
      badge_id:     decode_uuid(&self.badge_id)?,
      awarded_by:   serde_json::from_str(&self.awarded_by_json)?,
      reason:       self.reason,
      awarded_date: decode_dt(&self.awarded_date)?,
    })
  }
}

/// Raw strings read directly from a `user_points` row.
pub struct RawUserPoints {
  pub user_email:         String,
  pub total_points:       i64,
  pub tier:               String,
  pub current_streak:     u32,
  pub last_activity_date: Option<String>,
  pub badges_earned:      u32,
  pub updated_at:         String,
}

impl RawUserPoints {
  pub fn into_points(self) -> Result<UserPoints> {
    Ok(UserPoints {
      user_email:         self.user_email,
      total_points:       self.total_points,
      tier:               decode_tier(&self.tier)?,
      current_streak:     self.current_streak,
      last_activity_date: self
        .last_activity_date
        .as_deref()
        .map(decode_date)
        .transpose()?,
      badges_earned:      self.badges_earned,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `rewards` row.
pub struct RawReward {
  pub reward_id:      String,
  pub reward_name:    String,
  pub points_cost:    i64,
  pub stock_quantity: i64,
  pub is_available:   bool,
  pub created_date:   String,
}

impl RawReward {
  pub fn into_reward(self) -> Result<Reward> {
    Ok(Reward {
      reward_id:    decode_uuid(&self.reward_id)?,
      reward_name:  self.reward_name,
      points_cost:  self.points_cost,
      stock:        decode_stock(self.stock_quantity),
      is_available: self.is_available,
      created_date: decode_dt(&self.created_date)?,
    })
  }
}

/// Raw strings read directly from a `redemptions` row.
pub struct RawRedemption {
  pub redemption_id: String,
  pub reward_id:     String,
  pub user_email:    String,
  pub points_spent:  i64,
  pub status:        String,
  pub created_date:  String,
  pub updated_at:    String,
}

impl RawRedemption {
  pub fn into_redemption(self) -> Result<Redemption> {
    Ok(Redemption {
      redemption_id: decode_uuid(&self.redemption_id)?,
      reward_id:     decode_uuid(&self.reward_id)?,
      user_email:    self.user_email,
      points_spent:  self.points_spent,
      status:        decode_redemption_status(&self.status)?,
      created_date:  decode_dt(&self.created_date)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `suggestions` row.
pub struct RawSuggestion {
  pub suggestion_id:        String,
  pub suggestion_type:      String,
  pub title:                String,
  pub description:          String,
  pub confidence_score:     f64,
  pub proposed_change_json: String,
  pub status:               String,
  pub created_date:         String,
  pub reviewed_by:          Option<String>,
  pub reviewed_at:          Option<String>,
}

impl RawSuggestion {
  pub fn into_suggestion(self) -> Result<Suggestion> {
    Ok(Suggestion {
      suggestion_id:    decode_uuid(&self.suggestion_id)?,
      suggestion_type:  decode_suggestion_type(&self.suggestion_type)?,
      title:            self.title,
      description:      self.description,
      confidence_score: self.confidence_score,
      proposed_change:  serde_json::from_str(&self.proposed_change_json)?,
      status:           decode_suggestion_status(&self.status)?,
      created_date:     decode_dt(&self.created_date)?,
      reviewed_by:      self.reviewed_by,
      reviewed_at:      self
        .reviewed_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
    })
  }
}
