// ============================================
// src/session.rs
// ステージ選択 / カード送りの状態管理
// ============================================

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use crate::words::{StageId, WordRecord};

/// 画面の状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// ステージ選択中
    #[default]
    Selecting,
    /// カードを見ている
    Reviewing,
}

/// 表示用にまとめた「今のカード」
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardView<'a> {
    pub stage: StageId,
    pub record: &'a WordRecord,
    /// 元の単語リストでのインデックス (チェック状態のキー)
    pub word_index: usize,
    /// シャッフル後の並びでの位置
    pub position: usize,
    pub len: usize,
    pub reviewed: bool,
}

#[derive(Debug)]
struct ActiveStage {
    stage: StageId,
    words: Arc<[WordRecord]>,
    order: Vec<usize>,
    position: usize,
}

/// 1 回の起動中ずっと生きているセッション
#[derive(Debug, Default)]
pub struct Session {
    mode: Mode,
    active: Option<ActiveStage>,
    /// ステージ -> (単語インデックス -> 確認済みか)。プロセス終了まで消さない
    reviews: HashMap<StageId, HashMap<usize, bool>>,
}

/// Fisher–Yates で 0..len を並べ替える
pub fn shuffled_order<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    for i in (1..len).rev() {
        let j = rng.random_range(0..=i);
        order.swap(i, j);
    }
    order
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// 直近に入ったステージ (選択画面に戻っても残る)
    pub fn active_stage(&self) -> Option<StageId> {
        self.active.as_ref().map(|a| a.stage)
    }

    /// ステージに入る。毎回シャッフルし直し、位置は先頭に戻す
    pub fn enter_stage<R: Rng + ?Sized>(
        &mut self,
        stage: StageId,
        words: Arc<[WordRecord]>,
        rng: &mut R,
    ) -> Option<CardView<'_>> {
        let order = shuffled_order(words.len(), rng);
        if order.is_empty() {
            tracing::warn!(stage, "entered a stage with no words");
        }
        tracing::debug!(stage, words = order.len(), "stage entered");

        self.reviews.entry(stage).or_default();
        self.active = Some(ActiveStage {
            stage,
            words,
            order,
            position: 0,
        });
        self.mode = Mode::Reviewing;
        self.current()
    }

    /// 選択画面に戻る。並び順とチェック状態はそのまま
    pub fn return_to_selection(&mut self) {
        self.mode = Mode::Selecting;
    }

    pub fn current(&self) -> Option<CardView<'_>> {
        if self.mode != Mode::Reviewing {
            return None;
        }
        let active = self.active.as_ref()?;
        let word_index = *active.order.get(active.position)?;
        let record = active.words.get(word_index)?;
        Some(CardView {
            stage: active.stage,
            record,
            word_index,
            position: active.position,
            len: active.order.len(),
            reviewed: self.is_reviewed(active.stage, word_index),
        })
    }

    pub fn current_word(&self) -> Option<&WordRecord> {
        self.current().map(|card| card.record)
    }

    /// 記録がなければ false 扱い
    pub fn is_current_reviewed(&self) -> bool {
        self.current().is_some_and(|card| card.reviewed)
    }

    pub fn is_reviewed(&self, stage: StageId, word_index: usize) -> bool {
        self.reviews
            .get(&stage)
            .and_then(|flags| flags.get(&word_index))
            .copied()
            .unwrap_or(false)
    }

    /// チェックを反転して、新しい値を返す
    pub fn toggle_reviewed(&mut self) -> Option<bool> {
        if self.mode != Mode::Reviewing {
            return None;
        }
        let active = self.active.as_ref()?;
        let word_index = *active.order.get(active.position)?;
        let flag = self
            .reviews
            .entry(active.stage)
            .or_default()
            .entry(word_index)
            .or_insert(false);
        *flag = !*flag;
        Some(*flag)
    }

    /// 次のカードへ。離れるカードは確認済みにする (false に戻すことはしない)
    pub fn advance(&mut self) -> Option<CardView<'_>> {
        if self.mode != Mode::Reviewing {
            return None;
        }
        let active = self.active.as_mut()?;
        let len = active.order.len();
        if len == 0 {
            return None;
        }

        let word_index = active.order[active.position];
        let flag = self
            .reviews
            .entry(active.stage)
            .or_default()
            .entry(word_index)
            .or_insert(false);
        if !*flag {
            *flag = true;
        }

        active.position = (active.position + 1) % len;
        self.current()
    }

    /// 前のカードへ。チェック状態は触らない
    pub fn retreat(&mut self) -> Option<CardView<'_>> {
        if self.mode != Mode::Reviewing {
            return None;
        }
        let active = self.active.as_mut()?;
        let len = active.order.len();
        if len == 0 {
            return None;
        }

        active.position = (active.position + len - 1) % len;
        self.current()
    }

    /// ステージ内の確認済み単語数
    pub fn reviewed_count(&self, stage: StageId) -> usize {
        self.reviews
            .get(&stage)
            .map_or(0, |flags| flags.values().filter(|checked| **checked).count())
    }

    pub fn traversal_order(&self) -> Option<&[usize]> {
        self.active.as_ref().map(|a| a.order.as_slice())
    }

    pub fn position(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn words(n: usize) -> Arc<[WordRecord]> {
        (0..n)
            .map(|i| WordRecord {
                word: format!("word{i}"),
                prog: format!("prog{i}"),
                dict: format!("dict{i}"),
            })
            .collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn starts_in_selection_with_nothing_to_show() {
        let mut session = Session::new();
        assert_eq!(session.mode(), Mode::Selecting);
        assert!(session.current_word().is_none());
        assert!(!session.is_current_reviewed());
        assert!(session.advance().is_none());
        assert!(session.retreat().is_none());
        assert!(session.toggle_reviewed().is_none());
    }

    #[test]
    fn three_word_stage_walkthrough() {
        let mut session = Session::new();
        let mut rng = rng();
        session.enter_stage(1, words(3), &mut rng);

        let order = session.traversal_order().unwrap().to_vec();
        let first = session.current_word().unwrap().clone();
        assert_eq!(first.word, format!("word{}", order[0]));
        assert!(!session.is_current_reviewed());

        for _ in 0..3 {
            session.advance();
        }
        assert_eq!(session.current_word().unwrap(), &first);
        assert!(session.is_current_reviewed());
        assert_eq!(session.reviewed_count(1), 3);
    }

    #[test]
    fn toggle_survives_retreat_and_advance() {
        let mut session = Session::new();
        let mut rng = rng();
        session.enter_stage(1, words(4), &mut rng);

        assert_eq!(session.toggle_reviewed(), Some(true));
        session.retreat();
        session.advance();
        assert!(session.is_current_reviewed());
    }

    #[test]
    fn advance_marks_a_card_that_was_unchecked_by_hand() {
        let mut session = Session::new();
        let mut rng = rng();
        session.enter_stage(1, words(2), &mut rng);

        // 一度チェックして外す -> 離れるときに true になる
        session.toggle_reviewed();
        session.toggle_reviewed();
        assert!(!session.is_current_reviewed());
        let index = session.current().unwrap().word_index;
        session.advance();
        assert!(session.is_reviewed(1, index));
    }

    #[test]
    fn retreat_leaves_flags_alone() {
        let mut session = Session::new();
        let mut rng = rng();
        session.enter_stage(2, words(5), &mut rng);
        session.retreat();
        session.retreat();
        assert_eq!(session.reviewed_count(2), 0);
    }

    #[test]
    fn review_history_survives_reentry() {
        let mut session = Session::new();
        let mut rng = rng();
        let stage_words = words(6);

        session.enter_stage(1, stage_words.clone(), &mut rng);
        let marked = session.current().unwrap().word_index;
        session.toggle_reviewed();
        session.return_to_selection();
        assert!(session.current_word().is_none());

        session.enter_stage(1, stage_words, &mut rng);
        assert_eq!(session.position(), Some(0));
        assert!(session.is_reviewed(1, marked));
        assert_eq!(session.reviewed_count(1), 1);
    }

    #[test]
    fn stages_keep_separate_flags() {
        let mut session = Session::new();
        let mut rng = rng();
        session.enter_stage(1, words(3), &mut rng);
        session.advance();
        session.enter_stage(2, words(3), &mut rng);
        assert_eq!(session.reviewed_count(1), 1);
        assert_eq!(session.reviewed_count(2), 0);
    }

    #[test]
    fn empty_stage_navigation_is_a_no_op() {
        let mut session = Session::new();
        let mut rng = rng();
        assert!(session.enter_stage(3, words(0), &mut rng).is_none());
        assert_eq!(session.mode(), Mode::Reviewing);
        assert!(session.current_word().is_none());
        assert!(session.advance().is_none());
        assert!(session.retreat().is_none());
        assert!(session.toggle_reviewed().is_none());
        assert_eq!(session.position(), Some(0));
    }

    #[test]
    fn single_word_stage_wraps_to_itself() {
        let mut session = Session::new();
        let mut rng = rng();
        session.enter_stage(1, words(1), &mut rng);
        let card = session.advance().unwrap();
        assert_eq!(card.position, 0);
        assert!(card.reviewed);
    }

    #[test]
    fn every_order_of_three_is_about_equally_likely() {
        const RUNS: usize = 6000;
        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts: HashMap<Vec<usize>, usize> = HashMap::new();
        for _ in 0..RUNS {
            *counts.entry(shuffled_order(3, &mut rng)).or_default() += 1;
        }

        // 3! = 6 通りすべて出る (元の並びや、動かない要素がある並びも含む)
        assert_eq!(counts.len(), 6);
        assert!(counts.contains_key(&vec![0, 1, 2]));
        assert!(counts.contains_key(&vec![0, 2, 1]));
        // 期待値 1000、標準偏差はおよそ 29
        for (order, count) in &counts {
            assert!((850..=1150).contains(count), "{order:?} appeared {count} times");
        }
    }

    proptest! {
        #[test]
        fn order_is_a_permutation(len in 0usize..200, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut order = shuffled_order(len, &mut rng);
            order.sort_unstable();
            prop_assert_eq!(order, (0..len).collect::<Vec<_>>());
        }

        #[test]
        fn advancing_len_times_is_cyclic(len in 1usize..40, start in 0usize..40, seed in any::<u64>()) {
            let mut session = Session::new();
            let mut rng = StdRng::seed_from_u64(seed);
            session.enter_stage(1, words(len), &mut rng);
            for _ in 0..(start % len) {
                session.advance();
            }
            let before = session.position();
            for _ in 0..len {
                session.advance();
            }
            prop_assert_eq!(session.position(), before);
        }

        #[test]
        fn retreat_undoes_advance(len in 1usize..40, steps in 0usize..80, seed in any::<u64>()) {
            let mut session = Session::new();
            let mut rng = StdRng::seed_from_u64(seed);
            session.enter_stage(1, words(len), &mut rng);
            for _ in 0..steps {
                session.advance();
            }
            let before = session.position();
            session.advance();
            session.retreat();
            prop_assert_eq!(session.position(), before);
            session.retreat();
            session.advance();
            prop_assert_eq!(session.position(), before);
        }

        #[test]
        fn double_toggle_restores(len in 1usize..20, steps in 0usize..20, seed in any::<u64>()) {
            let mut session = Session::new();
            let mut rng = StdRng::seed_from_u64(seed);
            session.enter_stage(1, words(len), &mut rng);
            for _ in 0..steps {
                session.advance();
            }
            let before = session.is_current_reviewed();
            session.toggle_reviewed();
            session.toggle_reviewed();
            prop_assert_eq!(session.is_current_reviewed(), before);
        }
    }
}
