// ============================================
// src/gesture.rs
// スワイプ (マウスドラッグ) 判定と、カード切り替えのスライド演出
// ============================================

/// 1 ステップで動かす列数
const SLIDE_STEP_COLUMNS: i32 = 4;
/// 出ていく / 入ってくる演出のフレーム数 (1 フレーム = 1 tick)
pub const LEAVE_TICKS: u8 = 3;
pub const ENTER_TICKS: u8 = 3;

/// カード送りの向き
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Next,
    Prev,
}

impl Heading {
    /// 画面上で動く向き (Next は左へ流れる)
    fn sign(self) -> i32 {
        match self {
            Heading::Next => -1,
            Heading::Prev => 1,
        }
    }
}

/// ドラッグを離したときの判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Swipe(Heading),
    /// ほとんど動いていない = クリック
    Tap,
}

/// 押した位置を覚えておき、離した位置との差で左右を判定する
#[derive(Debug, Clone, Copy)]
pub struct SwipeTracker {
    start: Option<u16>,
    threshold: u16,
}

impl SwipeTracker {
    pub fn new(threshold: u16) -> Self {
        Self {
            start: None,
            threshold,
        }
    }

    pub fn press(&mut self, column: u16) {
        self.start = Some(column);
    }

    /// 押していないのに離された場合は None
    pub fn release(&mut self, column: u16) -> Option<Gesture> {
        let start = i32::from(self.start.take()?);
        let end = i32::from(column);
        let threshold = i32::from(self.threshold);

        let gesture = if end < start - threshold {
            Gesture::Swipe(Heading::Next) // 左へ払う
        } else if end > start + threshold {
            Gesture::Swipe(Heading::Prev) // 右へ払う
        } else {
            Gesture::Tap
        };
        Some(gesture)
    }

    pub fn cancel(&mut self) {
        self.start = None;
    }

    /// カードの上で押したときだけ追跡を始める
    pub fn press_at(&mut self, column: u16, on_card: bool) {
        if on_card {
            self.press(column);
        } else {
            self.cancel();
        }
    }

    /// スワイプは離した場所を問わないが、タップはカードの上でだけ
    pub fn release_at(&mut self, column: u16, on_card: bool) -> Option<Gesture> {
        match self.release(column)? {
            Gesture::Tap if !on_card => None,
            gesture => Some(gesture),
        }
    }
}

/// Idle -> Leaving -> Entering -> Idle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transition {
    #[default]
    Idle,
    Leaving { heading: Heading, ticks_left: u8 },
    Entering { heading: Heading, ticks_left: u8 },
}

impl Transition {
    pub fn is_idle(&self) -> bool {
        matches!(self, Transition::Idle)
    }

    /// 演出中は受け付けない (false を返す)
    pub fn begin(&mut self, heading: Heading) -> bool {
        if !self.is_idle() {
            return false;
        }
        *self = Transition::Leaving {
            heading,
            ticks_left: LEAVE_TICKS,
        };
        true
    }

    /// 1 フレーム進める。カードを差し替えるタイミングで向きを返す
    pub fn tick(&mut self) -> Option<Heading> {
        match *self {
            Transition::Idle => None,
            Transition::Leaving { heading, ticks_left } if ticks_left > 1 => {
                *self = Transition::Leaving {
                    heading,
                    ticks_left: ticks_left - 1,
                };
                None
            }
            Transition::Leaving { heading, .. } => {
                *self = Transition::Entering {
                    heading,
                    ticks_left: ENTER_TICKS,
                };
                Some(heading)
            }
            Transition::Entering { heading, ticks_left } if ticks_left > 1 => {
                *self = Transition::Entering {
                    heading,
                    ticks_left: ticks_left - 1,
                };
                None
            }
            Transition::Entering { .. } => {
                *self = Transition::Idle;
                None
            }
        }
    }

    /// 描画時のカードの横ずれ (列数)
    pub fn offset(&self) -> i32 {
        match *self {
            Transition::Idle => 0,
            Transition::Leaving { heading, ticks_left } => {
                let step = i32::from(LEAVE_TICKS - ticks_left + 1);
                heading.sign() * step * SLIDE_STEP_COLUMNS
            }
            // 反対側から入ってくる
            Transition::Entering { heading, ticks_left } => {
                -heading.sign() * i32::from(ticks_left) * SLIDE_STEP_COLUMNS
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_left_past_threshold_is_next() {
        let mut tracker = SwipeTracker::new(5);
        tracker.press(40);
        assert_eq!(tracker.release(30), Some(Gesture::Swipe(Heading::Next)));
    }

    #[test]
    fn drag_right_past_threshold_is_prev() {
        let mut tracker = SwipeTracker::new(5);
        tracker.press(10);
        assert_eq!(tracker.release(16), Some(Gesture::Swipe(Heading::Prev)));
    }

    #[test]
    fn small_drag_is_a_tap() {
        let mut tracker = SwipeTracker::new(5);
        tracker.press(10);
        assert_eq!(tracker.release(15), Some(Gesture::Tap));
        tracker.press(10);
        assert_eq!(tracker.release(5), Some(Gesture::Tap));
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut tracker = SwipeTracker::new(5);
        assert_eq!(tracker.release(3), None);
        tracker.press(3);
        tracker.cancel();
        assert_eq!(tracker.release(20), None);
    }

    #[test]
    fn presses_off_the_card_are_ignored() {
        let mut tracker = SwipeTracker::new(5);
        tracker.press_at(40, false);
        assert_eq!(tracker.release_at(20, true), None);

        // 押したのがカード外なら、前の押下も捨てる
        tracker.press_at(40, true);
        tracker.press_at(40, false);
        assert_eq!(tracker.release_at(40, true), None);
    }

    #[test]
    fn swipe_may_end_off_the_card_but_tap_may_not() {
        let mut tracker = SwipeTracker::new(5);
        tracker.press_at(40, true);
        assert_eq!(tracker.release_at(2, false), Some(Gesture::Swipe(Heading::Next)));

        tracker.press_at(40, true);
        assert_eq!(tracker.release_at(41, false), None);
        tracker.press_at(40, true);
        assert_eq!(tracker.release_at(41, true), Some(Gesture::Tap));
    }

    #[test]
    fn swipe_near_left_edge_does_not_underflow() {
        let mut tracker = SwipeTracker::new(5);
        tracker.press(2);
        assert_eq!(tracker.release(0), Some(Gesture::Tap));
    }

    #[test]
    fn transition_runs_full_cycle_and_swaps_once() {
        let mut transition = Transition::default();
        assert!(transition.begin(Heading::Next));

        let mut swaps = Vec::new();
        let mut ticks = 0;
        while !transition.is_idle() {
            if let Some(heading) = transition.tick() {
                swaps.push(heading);
            }
            ticks += 1;
        }
        assert_eq!(swaps, vec![Heading::Next]);
        assert_eq!(ticks, usize::from(LEAVE_TICKS + ENTER_TICKS));
        assert_eq!(transition.offset(), 0);
    }

    #[test]
    fn busy_transition_rejects_new_requests() {
        let mut transition = Transition::default();
        assert!(transition.begin(Heading::Prev));
        assert!(!transition.begin(Heading::Next));
        transition.tick();
        assert!(!transition.begin(Heading::Next));
    }

    #[test]
    fn offsets_slide_out_then_back_in() {
        let mut transition = Transition::default();
        transition.begin(Heading::Next);
        assert!(transition.offset() < 0);
        for _ in 0..LEAVE_TICKS {
            transition.tick();
        }
        // 右から入ってくる
        assert!(transition.offset() > 0);
    }
}
