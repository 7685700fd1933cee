//! 経験カード（親・子共通の形）
//!
//! サーバーの JSON は境界で一度だけ `RawExperienceCard` として受け、`From` で正規形に変換する。
//! 旧来の別名（`company_name` や `headline` など）は serde の alias で吸収し、
//! 表示・更新ロジックの側でフィールド名を探し回らない。

use super::ids::CardId;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 子カードの関係種別
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationType {
    SkillApplied,
    OutcomeDetail,
    ToolUsed,
    MethodUsed,
    CollaborationDetail,
    ChallengeDetail,
    LearningDetail,
    /// 未知の値（そのまま保持してサーバーへ返す）
    Other(String),
}

impl RelationType {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "skill_applied" => Self::SkillApplied,
            "outcome_detail" => Self::OutcomeDetail,
            "tool_used" => Self::ToolUsed,
            "method_used" => Self::MethodUsed,
            "collaboration_detail" => Self::CollaborationDetail,
            "challenge_detail" => Self::ChallengeDetail,
            "learning_detail" => Self::LearningDetail,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SkillApplied => "skill_applied",
            Self::OutcomeDetail => "outcome_detail",
            Self::ToolUsed => "tool_used",
            Self::MethodUsed => "method_used",
            Self::CollaborationDetail => "collaboration_detail",
            Self::ChallengeDetail => "challenge_detail",
            Self::LearningDetail => "learning_detail",
            Self::Other(s) => s,
        }
    }
}

impl Serialize for RelationType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RelationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

/// 経験カード（正規形）
///
/// 親は `parent_id == None` かつ `depth == 0`、子は `parent_id` と `relation_type` を持つ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawExperienceCard")]
pub struct ExperienceCard {
    pub id: CardId,
    pub parent_id: Option<CardId>,
    pub depth: u32,
    pub relation_type: Option<RelationType>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_current: Option<bool>,
    /// 表示用の期間ラベル（日付から導出）
    pub time_range: Option<String>,
    pub domain: Option<String>,
    pub employment_type: Option<String>,
    pub intent: Option<String>,
    pub seniority: Option<String>,
    pub tags: Vec<String>,
    pub confidence: Option<f64>,
    pub visible: Option<bool>,
    pub version: Option<i64>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub edited_at: Option<String>,
}

impl ExperienceCard {
    /// 空の親カード
    pub fn new_parent(id: impl Into<String>) -> Self {
        Self::blank(CardId::new(id), None, 0, None)
    }

    /// 空の子カード
    pub fn new_child(id: impl Into<String>, parent_id: &CardId, relation: RelationType) -> Self {
        Self::blank(CardId::new(id), Some(parent_id.clone()), 1, Some(relation))
    }

    fn blank(
        id: CardId,
        parent_id: Option<CardId>,
        depth: u32,
        relation_type: Option<RelationType>,
    ) -> Self {
        Self {
            id,
            parent_id,
            depth,
            relation_type,
            title: None,
            summary: None,
            company: None,
            role: None,
            location: None,
            start_date: None,
            end_date: None,
            is_current: None,
            time_range: None,
            domain: None,
            employment_type: None,
            intent: None,
            seniority: None,
            tags: Vec::new(),
            confidence: None,
            visible: None,
            version: None,
            created_at: None,
            updated_at: None,
            edited_at: None,
        }
    }

    pub fn is_parent(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_dates(mut self, start: Option<&str>, end: Option<&str>, is_current: Option<bool>) -> Self {
        self.start_date = start.map(str::to_string);
        self.end_date = end.map(str::to_string);
        self.is_current = is_current;
        self.refresh_time_range();
        self
    }

    /// 日付から `time_range` を計算し直す（開始日が無ければ既存ラベルを残す）
    pub fn refresh_time_range(&mut self) {
        if let Some(label) =
            time_range_label(self.start_date.as_deref(), self.end_date.as_deref(), self.is_current)
        {
            self.time_range = Some(label);
        }
    }
}

/// serde 用の内部構造（旧来の別名をここで吸収する）
#[derive(Debug, Deserialize)]
struct RawExperienceCard {
    id: CardId,
    parent_id: Option<CardId>,
    depth: Option<u32>,
    relation_type: Option<RelationType>,
    #[serde(alias = "headline")]
    title: Option<String>,
    summary: Option<String>,
    #[serde(alias = "company_name")]
    company: Option<String>,
    #[serde(alias = "normalized_role")]
    role: Option<String>,
    location: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    #[serde(alias = "current")]
    is_current: Option<bool>,
    #[serde(alias = "time_text")]
    time_range: Option<String>,
    domain: Option<String>,
    employment_type: Option<String>,
    intent: Option<String>,
    #[serde(alias = "seniority_level")]
    seniority: Option<String>,
    #[serde(alias = "topics")]
    tags: Option<Vec<String>>,
    #[serde(alias = "confidence_score")]
    confidence: Option<f64>,
    #[serde(alias = "visibility", alias = "is_visible")]
    visible: Option<bool>,
    version: Option<i64>,
    created_at: Option<String>,
    updated_at: Option<String>,
    edited_at: Option<String>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl From<RawExperienceCard> for ExperienceCard {
    fn from(r: RawExperienceCard) -> Self {
        let parent_id = r.parent_id;
        let is_parent = parent_id.is_none();
        let depth = match (is_parent, r.depth) {
            (true, _) => 0,
            (false, Some(d)) if d >= 1 => d,
            (false, _) => 1,
        };
        let mut card = ExperienceCard {
            id: r.id,
            parent_id,
            depth,
            relation_type: r.relation_type,
            title: non_blank(r.title),
            summary: non_blank(r.summary),
            company: non_blank(r.company),
            role: non_blank(r.role),
            location: non_blank(r.location),
            start_date: non_blank(r.start_date),
            end_date: non_blank(r.end_date),
            is_current: r.is_current,
            time_range: non_blank(r.time_range),
            domain: non_blank(r.domain),
            employment_type: non_blank(r.employment_type),
            intent: non_blank(r.intent),
            seniority: non_blank(r.seniority),
            tags: r.tags.unwrap_or_default(),
            confidence: r.confidence,
            visible: r.visible,
            version: r.version,
            created_at: r.created_at,
            updated_at: r.updated_at,
            edited_at: r.edited_at,
        };
        card.refresh_time_range();
        card
    }
}

/// カードへの部分更新（PATCH のボディ兼楽観的更新の内容）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_current: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seniority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// 指定されたフィールドだけを上書きする。日付が変われば期間ラベルも推測し直す。
    pub fn apply_to(&self, card: &mut ExperienceCard) {
        fn set<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if let Some(v) = src {
                *dst = Some(v.clone());
            }
        }
        set(&mut card.title, &self.title);
        set(&mut card.summary, &self.summary);
        set(&mut card.company, &self.company);
        set(&mut card.role, &self.role);
        set(&mut card.location, &self.location);
        set(&mut card.start_date, &self.start_date);
        set(&mut card.end_date, &self.end_date);
        set(&mut card.is_current, &self.is_current);
        set(&mut card.domain, &self.domain);
        set(&mut card.employment_type, &self.employment_type);
        set(&mut card.intent, &self.intent);
        set(&mut card.seniority, &self.seniority);
        set(&mut card.visible, &self.visible);
        if let Some(tags) = &self.tags {
            card.tags = tags.clone();
        }
        if self.start_date.is_some() || self.end_date.is_some() || self.is_current.is_some() {
            card.refresh_time_range();
        }
    }
}

enum DatePrecision {
    Year,
    Month,
}

fn parse_partial_date(s: &str) -> Option<(NaiveDate, DatePrecision)> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some((d, DatePrecision::Month));
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        return Some((d, DatePrecision::Month));
    }
    if s.len() == 4 {
        if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01-01", s), "%Y-%m-%d") {
            return Some((d, DatePrecision::Year));
        }
    }
    None
}

fn format_date(s: &str) -> String {
    match parse_partial_date(s) {
        Some((d, DatePrecision::Month)) => d.format("%b %Y").to_string(),
        Some((d, DatePrecision::Year)) => d.format("%Y").to_string(),
        None => s.trim().to_string(),
    }
}

/// 期間ラベル（例: `Jan 2020 - Mar 2021`、`Jan 2020 - Present`）
///
/// 開始日が無ければ `None`。
pub fn time_range_label(start: Option<&str>, end: Option<&str>, is_current: Option<bool>) -> Option<String> {
    let start = start.map(str::trim).filter(|s| !s.is_empty())?;
    let start_label = format_date(start);
    let end_label = if is_current == Some(true) {
        Some("Present".to_string())
    } else {
        end.map(str::trim).filter(|s| !s.is_empty()).map(format_date)
    };
    Some(match end_label {
        Some(end) => format!("{} - {}", start_label, end),
        None => start_label,
    })
}
