//! カードファミリーのキャッシュ
//!
//! 永続化済みファミリー・フラットな親カード一覧・下書きファミリーを保持する。
//! ここの操作はすべて純粋な構造変更で、ネットワークには触れない。
//! どの操作の後でも「子の parent_id は存在するファミリーの親を指す」が成り立つ。

use crate::domain::{CardFamily, CardId, CardPatch, ExperienceCard};

/// フロントエンドが編集中のカード
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditingTarget {
    Parent(CardId),
    Child { parent_id: CardId, child_id: CardId },
}

impl EditingTarget {
    fn touches(&self, id: &CardId) -> bool {
        match self {
            Self::Parent(p) => p == id,
            Self::Child { parent_id, child_id } => parent_id == id || child_id == id,
        }
    }
}

/// 削除したファミリー（ロールバック用に元の位置を覚える）
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedFamily {
    /// ファミリー一覧側の位置と中身
    pub family: Option<(usize, CardFamily)>,
    /// フラット一覧側の位置と中身
    pub flat: Option<(usize, ExperienceCard)>,
}

/// 削除した子カード
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedChild {
    pub parent_id: CardId,
    pub index: usize,
    pub card: ExperienceCard,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardFamilyCache {
    families: Vec<CardFamily>,
    cards: Vec<ExperienceCard>,
    drafts: Vec<CardFamily>,
    editing: Option<EditingTarget>,
}

impl CardFamilyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn families(&self) -> &[CardFamily] {
        &self.families
    }

    /// フラットな親カード一覧
    pub fn cards(&self) -> &[ExperienceCard] {
        &self.cards
    }

    pub fn drafts(&self) -> &[CardFamily] {
        &self.drafts
    }

    pub fn editing(&self) -> Option<&EditingTarget> {
        self.editing.as_ref()
    }

    pub fn set_editing(&mut self, target: Option<EditingTarget>) {
        self.editing = target;
    }

    /// 編集中ポインタが `ids` のいずれかを指していれば外す
    pub fn clear_editing_for(&mut self, ids: &[&CardId]) {
        if self
            .editing
            .as_ref()
            .is_some_and(|t| ids.iter().any(|id| t.touches(id)))
        {
            self.editing = None;
        }
    }

    // --- 一括置き換え

    /// 永続化済みファミリーを置き換える（不整合なファミリーは入れない）
    pub fn replace_persisted(&mut self, families: Vec<CardFamily>) {
        self.families = dedup_consistent(families);
    }

    pub fn replace_cards(&mut self, cards: Vec<ExperienceCard>) {
        self.cards = cards.into_iter().filter(ExperienceCard::is_parent).collect();
    }

    /// 構造化呼び出しの結果で下書きを丸ごと置き換える（永続化済みとは混ぜない）
    pub fn replace_drafts(&mut self, families: Vec<CardFamily>) {
        self.drafts = dedup_consistent(families);
    }

    // --- 参照

    pub fn family(&self, parent_id: &CardId) -> Option<&CardFamily> {
        self.families.iter().find(|f| f.id() == parent_id)
    }

    fn family_index(&self, parent_id: &CardId) -> Option<usize> {
        self.families.iter().position(|f| f.id() == parent_id)
    }

    fn card_index(&self, id: &CardId) -> Option<usize> {
        self.cards.iter().position(|c| &c.id == id)
    }

    /// 子カードの位置（ファミリー位置, 子位置）
    fn locate_child(&self, child_id: &CardId) -> Option<(usize, usize)> {
        self.families
            .iter()
            .enumerate()
            .find_map(|(fi, f)| f.child_index(child_id).map(|ci| (fi, ci)))
    }

    pub fn parent(&self, id: &CardId) -> Option<&ExperienceCard> {
        self.family(id).map(|f| &f.parent)
    }

    pub fn flat_card(&self, id: &CardId) -> Option<&ExperienceCard> {
        self.cards.iter().find(|c| &c.id == id)
    }

    pub fn child(&self, child_id: &CardId) -> Option<&ExperienceCard> {
        self.locate_child(child_id)
            .map(|(fi, ci)| &self.families[fi].children[ci])
    }

    pub fn draft(&self, id: &CardId) -> Option<&CardFamily> {
        self.drafts.iter().find(|f| f.id() == id)
    }

    // --- 構造更新

    /// 親カードへの部分更新（ファミリー側とフラット一覧側の両方）
    pub fn apply_parent_patch(&mut self, id: &CardId, patch: &CardPatch) -> bool {
        let mut touched = false;
        if let Some(fi) = self.family_index(id) {
            patch.apply_to(&mut self.families[fi].parent);
            touched = true;
        }
        if let Some(ci) = self.card_index(id) {
            patch.apply_to(&mut self.cards[ci]);
            touched = true;
        }
        touched
    }

    pub fn apply_child_patch(&mut self, child_id: &CardId, patch: &CardPatch) -> bool {
        match self.locate_child(child_id) {
            Some((fi, ci)) => {
                patch.apply_to(&mut self.families[fi].children[ci]);
                true
            }
            None => false,
        }
    }

    /// サーバーの正規な親カードで置き換える。キャッシュに無ければ何もしない。
    pub fn merge_parent(&mut self, card: ExperienceCard) -> bool {
        if !card.is_parent() {
            return false;
        }
        let mut touched = false;
        if let Some(ci) = self.card_index(&card.id) {
            self.cards[ci] = card.clone();
            touched = true;
        }
        if let Some(fi) = self.family_index(&card.id) {
            self.families[fi].parent = card;
            touched = true;
        }
        touched
    }

    /// サーバーの正規な子カードで置き換える。削除済み・親違いなら何もしない。
    pub fn merge_child(&mut self, card: ExperienceCard) -> bool {
        let Some((fi, ci)) = self.locate_child(&card.id) else {
            return false;
        };
        if card.parent_id.as_ref() != Some(self.families[fi].id()) {
            return false;
        }
        self.families[fi].children[ci] = card;
        true
    }

    /// ファミリーを子ごと取り除く（フラット一覧からも）
    pub fn remove_family(&mut self, parent_id: &CardId) -> Option<RemovedFamily> {
        let family = self
            .family_index(parent_id)
            .map(|fi| (fi, self.families.remove(fi)));
        let flat = self
            .card_index(parent_id)
            .map(|ci| (ci, self.cards.remove(ci)));
        if family.is_none() && flat.is_none() {
            return None;
        }
        Some(RemovedFamily { family, flat })
    }

    /// 子カードだけを取り除く（親と兄弟は残る）
    pub fn remove_child(&mut self, child_id: &CardId) -> Option<RemovedChild> {
        let (fi, ci) = self.locate_child(child_id)?;
        let family = &mut self.families[fi];
        let card = family.children.remove(ci);
        Some(RemovedChild {
            parent_id: family.parent.id.clone(),
            index: ci,
            card,
        })
    }

    // --- ロールバック用の復元（持ち主が残っているときだけ戻す）

    pub fn restore_family(&mut self, removed: RemovedFamily) {
        if let Some((fi, family)) = removed.family {
            if self.family_index(family.id()).is_none() {
                let at = fi.min(self.families.len());
                self.families.insert(at, family);
            }
        }
        if let Some((ci, card)) = removed.flat {
            if self.card_index(&card.id).is_none() {
                let at = ci.min(self.cards.len());
                self.cards.insert(at, card);
            }
        }
    }

    pub fn restore_child(&mut self, removed: RemovedChild) {
        if self.locate_child(&removed.card.id).is_some() {
            return;
        }
        if let Some(fi) = self.family_index(&removed.parent_id) {
            let children = &mut self.families[fi].children;
            let at = removed.index.min(children.len());
            children.insert(at, removed.card);
        }
    }

    /// 親カードの内容を更新前の値に戻す（ファミリーが消えていれば何もしない）
    pub fn restore_parent(&mut self, card: Option<ExperienceCard>, flat: Option<ExperienceCard>) {
        if let Some(card) = card {
            if let Some(fi) = self.family_index(&card.id) {
                self.families[fi].parent = card;
            }
        }
        if let Some(flat) = flat {
            if let Some(ci) = self.card_index(&flat.id) {
                self.cards[ci] = flat;
            }
        }
    }

    /// 子カードの内容を更新前の値に戻す（子が消えていれば何もしない）
    pub fn restore_child_fields(&mut self, card: ExperienceCard) {
        if let Some((fi, ci)) = self.locate_child(&card.id) {
            self.families[fi].children[ci] = card;
        }
    }

    // --- 下書き

    /// 承認済みの下書きを永続化済みへ移す。承認済みファミリーが既にあれば親だけ差し替える。
    pub fn promote_draft(&mut self, server_card: ExperienceCard) -> bool {
        if !server_card.is_parent() {
            return false;
        }
        let id = server_card.id.clone();
        let draft = self
            .drafts
            .iter()
            .position(|f| f.id() == &id)
            .map(|i| self.drafts.remove(i));

        if let Some(fi) = self.family_index(&id) {
            self.families[fi].parent = server_card.clone();
        } else {
            let children = draft.map(|d| d.children).unwrap_or_default();
            if let Some((family, _)) = CardFamily::adopt(server_card.clone(), children) {
                self.families.push(family);
            }
        }
        match self.card_index(&id) {
            Some(ci) => self.cards[ci] = server_card,
            None => self.cards.push(server_card),
        }
        true
    }

    pub fn discard_draft(&mut self, id: &CardId) -> bool {
        let before = self.drafts.len();
        self.drafts.retain(|f| f.id() != id);
        self.drafts.len() != before
    }

    /// 不変条件の検査
    pub fn is_consistent(&self) -> bool {
        let families_ok = self.families.iter().all(CardFamily::is_consistent)
            && self.drafts.iter().all(CardFamily::is_consistent);
        let unique = {
            let mut ids: Vec<&CardId> = self.families.iter().map(CardFamily::id).collect();
            let n = ids.len();
            ids.sort();
            ids.dedup();
            ids.len() == n
        };
        families_ok && unique && self.cards.iter().all(ExperienceCard::is_parent)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn dedup_consistent(families: Vec<CardFamily>) -> Vec<CardFamily> {
    let mut out: Vec<CardFamily> = Vec::with_capacity(families.len());
    for f in families {
        if f.is_consistent() && !out.iter().any(|o| o.id() == f.id()) {
            out.push(f);
        }
    }
    out
}
