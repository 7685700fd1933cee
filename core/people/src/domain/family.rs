//! カードファミリー（親カード 1 枚 + 子カード群）
//!
//! 不変条件: すべての子の `parent_id` は親の `id` と一致し、親自身は子ではない。
//! サーバーから受けたファミリーは `normalize_families` を通してからキャッシュへ入れる。

use super::card::ExperienceCard;
use super::ids::CardId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardFamily {
    pub parent: ExperienceCard,
    pub children: Vec<ExperienceCard>,
}

impl CardFamily {
    /// 子の `parent_id` を検証してファミリーを作る
    ///
    /// - 親が `parent_id` を持っていれば `None`
    /// - `parent_id` の無い子は親の id を引き継ぐ
    /// - 別の親を指す子は捨てる（捨てた件数を返す）
    pub fn adopt(mut parent: ExperienceCard, children: Vec<ExperienceCard>) -> Option<(Self, usize)> {
        if !parent.is_parent() {
            return None;
        }
        parent.relation_type = None;
        let mut dropped = 0;
        let mut kept = Vec::with_capacity(children.len());
        for mut child in children {
            if child.parent_id.is_none() {
                child.parent_id = Some(parent.id.clone());
                child.depth = child.depth.max(1);
                kept.push(child);
            } else if child.parent_id.as_ref() == Some(&parent.id) && child.id != parent.id {
                kept.push(child);
            } else {
                dropped += 1;
            }
        }
        Some((
            Self {
                parent,
                children: kept,
            },
            dropped,
        ))
    }

    pub fn id(&self) -> &CardId {
        &self.parent.id
    }

    pub fn child(&self, id: &CardId) -> Option<&ExperienceCard> {
        self.children.iter().find(|c| &c.id == id)
    }

    pub fn child_index(&self, id: &CardId) -> Option<usize> {
        self.children.iter().position(|c| &c.id == id)
    }

    /// 不変条件を満たしているか
    pub fn is_consistent(&self) -> bool {
        self.parent.is_parent()
            && self
                .children
                .iter()
                .all(|c| c.parent_id.as_ref() == Some(&self.parent.id) && c.depth >= 1)
    }
}

/// サーバー上のファミリー表現（`parent` の別名として `card` も受ける）
#[derive(Debug, Deserialize)]
struct RawCardFamily {
    #[serde(alias = "card")]
    parent: ExperienceCard,
    #[serde(default, alias = "child_cards")]
    children: Vec<ExperienceCard>,
}

/// 正規化の結果（捨てたファミリー・子の件数はログ用）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedFamilies {
    pub families: Vec<CardFamily>,
    pub dropped_families: usize,
    pub dropped_children: usize,
}

/// ファミリー一覧の JSON（素の配列、または `{"families": [...]}`）を正規化する
pub fn normalize_families(value: Value) -> Result<NormalizedFamilies, serde_json::Error> {
    let list = match value {
        Value::Object(mut obj) => match obj.remove("families").or_else(|| obj.remove("card_families")) {
            Some(v) => v,
            None => Value::Array(Vec::new()),
        },
        Value::Null => Value::Array(Vec::new()),
        other => other,
    };
    let raws: Vec<RawCardFamily> = serde_json::from_value(list)?;
    let mut out = NormalizedFamilies::default();
    for raw in raws {
        match CardFamily::adopt(raw.parent, raw.children) {
            Some((family, dropped)) => {
                out.dropped_children += dropped;
                out.families.push(family);
            }
            None => out.dropped_families += 1,
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::RelationType;
    use serde_json::json;

    #[test]
    fn test_adopt_repairs_and_drops() {
        let mut parent = ExperienceCard::new_parent("p1");
        parent.relation_type = Some(RelationType::Other("x".to_string()));
        let mut orphan = ExperienceCard::new_child("c1", &CardId::new("p1"), RelationType::ToolUsed);
        orphan.parent_id = None;
        orphan.depth = 0;
        let foreign = ExperienceCard::new_child("c2", &CardId::new("other"), RelationType::ToolUsed);
        let own = ExperienceCard::new_child("c3", &CardId::new("p1"), RelationType::SkillApplied);

        let (family, dropped) = CardFamily::adopt(parent, vec![orphan, foreign, own]).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(family.children.len(), 2);
        assert_eq!(family.children[0].parent_id, Some(CardId::new("p1")));
        assert_eq!(family.children[0].depth, 1);
        assert_eq!(family.children[0].relation_type, Some(RelationType::ToolUsed));
        assert_eq!(family.parent.relation_type, None);
        assert!(family.is_consistent());
    }

    #[test]
    fn test_adopt_rejects_child_as_parent() {
        let not_parent = ExperienceCard::new_child("c1", &CardId::new("p1"), RelationType::ToolUsed);
        assert!(CardFamily::adopt(not_parent, vec![]).is_none());
    }

    #[test]
    fn test_normalize_families_shapes() {
        let wrapped = json!({"families": [
            {"card": {"id": "p1", "title": "A"}, "child_cards": [{"id": "c1", "parent_id": "p1", "relation_type": "tool_used"}]},
            {"parent": {"id": "bad", "parent_id": "p1"}, "children": []}
        ]});
        let n = normalize_families(wrapped).unwrap();
        assert_eq!(n.families.len(), 1);
        assert_eq!(n.dropped_families, 1);
        assert_eq!(n.families[0].children.len(), 1);

        let bare = json!([{"parent": {"id": "p2"}}]);
        let n = normalize_families(bare).unwrap();
        assert_eq!(n.families.len(), 1);
        assert!(n.families[0].children.is_empty());

        assert!(normalize_families(Value::Null).unwrap().families.is_empty());
    }
}
