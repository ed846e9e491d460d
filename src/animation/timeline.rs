use serde::{Deserialize, Serialize};

use crate::animation::ease::Ease;
use crate::foundation::error::{PushmockError, PushmockResult};
use crate::scene::model::{AnimParams, Card, Direction, Stage};

/// Sampled card transform at one instant. Identity when not animating.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CardTransform {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
    pub shadow_factor: f64,
}

impl Default for CardTransform {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
            shadow_factor: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    BeforeStart,
    Delay,
    In,
    Hold,
    Out,
    AfterEnd,
    Complete,
}

impl AnimParams {
    /// Sum of the six phase durations in seconds.
    pub fn total(&self) -> f64 {
        self.before_start + self.delay + self.enter + self.hold + self.exit + self.after_end
    }

    /// Which phase a timeline instant falls into. Boundaries belong to the
    /// later phase except the very start; times past `total()` are
    /// `Complete`.
    pub fn phase_at(&self, t: f64) -> Phase {
        if t < self.before_start {
            return Phase::BeforeStart;
        }
        let at = t - self.before_start;
        let in_end = self.delay + self.enter;
        let hold_end = in_end + self.hold;
        let out_end = hold_end + self.exit;
        let total = out_end + self.after_end;
        if at < self.delay {
            Phase::Delay
        } else if at <= in_end {
            Phase::In
        } else if at <= hold_end {
            Phase::Hold
        } else if at <= out_end {
            Phase::Out
        } else if at <= total {
            Phase::AfterEnd
        } else {
            Phase::Complete
        }
    }

    pub fn validate(&self) -> PushmockResult<()> {
        let durations = [
            ("beforeStart", self.before_start),
            ("delay", self.delay),
            ("in", self.enter),
            ("hold", self.hold),
            ("out", self.exit),
            ("afterEnd", self.after_end),
            ("pressAt", self.press_at),
            ("pressDur", self.press_dur),
        ];
        for (name, d) in durations {
            if !d.is_finite() || d < 0.0 {
                return Err(PushmockError::animation(format!(
                    "{name} must be finite and >= 0, got {d}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.press_depth) {
            return Err(PushmockError::animation(format!(
                "pressDepth must be in [0,1], got {}",
                self.press_depth
            )));
        }
        Ok(())
    }
}

/// Off-stage travel offset for a direction. `progress` 0 is fully off stage,
/// 1 is in place; the travel distance includes a 40 px margin past the stage
/// edge so the shadow clears too.
fn direction_offset(dir: Direction, card: &Card, stage: &Stage, progress: f64) -> (f64, f64) {
    let k = 1.0 - progress;
    match dir {
        Direction::Top => (0.0, -(card.y + card.h + 40.0) * k),
        Direction::Bottom => (0.0, (stage.h - card.y + 40.0) * k),
        Direction::Left => (-(card.x + card.w + 40.0) * k, 0.0),
        Direction::Right => ((stage.w - card.x + 40.0) * k, 0.0),
    }
}

// Zero-duration phases collapse to their end state.
fn progress(elapsed: f64, dur: f64) -> f64 {
    if dur <= 0.0 { 1.0 } else { elapsed / dur }
}

/// Sample the card transform at timeline instant `t` (seconds). Pure.
/// Entrance eases out-cubic, exit eases in-cubic; the optional press pulse
/// composes multiplicatively on top.
pub fn card_transform(
    params: &AnimParams,
    card: &Card,
    stage: &Stage,
    t: f64,
) -> (CardTransform, Phase) {
    let phase = params.phase_at(t);
    let at = t - params.before_start;
    let hold_end = params.delay + params.enter + params.hold;

    let (offset_x, offset_y) = match phase {
        Phase::BeforeStart | Phase::Delay => {
            direction_offset(params.in_direction, card, stage, 0.0)
        }
        Phase::In => {
            let k = Ease::OutCubic.apply(progress(at - params.delay, params.enter));
            direction_offset(params.in_direction, card, stage, k)
        }
        Phase::Hold => (0.0, 0.0),
        Phase::Out => {
            let k = Ease::InCubic.apply(progress(at - hold_end, params.exit));
            direction_offset(params.out_direction, card, stage, 1.0 - k)
        }
        Phase::AfterEnd | Phase::Complete => {
            direction_offset(params.out_direction, card, stage, 0.0)
        }
    };

    let mut out = CardTransform {
        offset_x,
        offset_y,
        ..Default::default()
    };

    // Press pulse: symmetric triangular envelope peaking at the midpoint.
    if params.press_on && !matches!(phase, Phase::BeforeStart | Phase::Complete) {
        let start = params.before_start + params.delay + params.press_at;
        let end = start + params.press_dur;
        if t >= start && t <= end {
            let half = params.press_dur / 2.0;
            let k = if half <= 0.0 {
                1.0
            } else {
                1.0 - ((t - (start + half)) / half).abs()
            };
            out.scale = 1.0 - params.press_depth * k;
            out.shadow_factor = 1.0 - 0.5 * k;
        }
    }

    (out, phase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::model::Scene;

    fn base() -> (AnimParams, Card, Stage) {
        let scene = Scene::new();
        let mut anim = AnimParams::default();
        anim.press_on = false;
        (anim, scene.card, scene.stage)
    }

    #[test]
    fn phase_coverage_for_default_params() {
        // in 0.6, hold 1.4, out 0.6, afterEnd 1.
        let (anim, ..) = base();
        assert_eq!(anim.phase_at(0.3), Phase::In);
        assert_eq!(anim.phase_at(1.0), Phase::Hold);
        assert_eq!(anim.phase_at(2.5), Phase::Out);
        assert_eq!(anim.phase_at(2.7), Phase::AfterEnd);
        assert_eq!(anim.phase_at(anim.total() + 1e-6), Phase::Complete);
    }

    #[test]
    fn entering_card_moves_toward_rest() {
        let (anim, card, stage) = base();
        let (start, _) = card_transform(&anim, &card, &stage, 0.0);
        let (mid, _) = card_transform(&anim, &card, &stage, 0.3);
        let (held, _) = card_transform(&anim, &card, &stage, 1.0);
        // Top direction: fully above stage, with a 40 px clearance margin.
        assert_eq!(start.offset_y, -(card.y + card.h + 40.0));
        assert!(mid.offset_y > start.offset_y && mid.offset_y < 0.0);
        assert_eq!(held.offset_y, 0.0);
        assert_eq!(held.offset_x, 0.0);
    }

    #[test]
    fn complete_holds_exit_transform() {
        let (mut anim, card, stage) = base();
        anim.out_direction = crate::scene::model::Direction::Bottom;
        let (done, phase) = card_transform(&anim, &card, &stage, anim.total() + 5.0);
        assert_eq!(phase, Phase::Complete);
        assert_eq!(done.offset_y, stage.h - card.y + 40.0);
        assert_eq!(done.scale, 1.0);
    }

    #[test]
    fn zero_duration_phases_are_skipped() {
        let (mut anim, card, stage) = base();
        anim.enter = 0.0;
        anim.delay = 0.0;
        // t=0 lands on the In boundary with zero duration: progress is 1.
        let (tr, phase) = card_transform(&anim, &card, &stage, 0.0);
        assert_eq!(phase, Phase::In);
        assert_eq!(tr.offset_y, 0.0);
        assert!(tr.offset_y.is_finite());
    }

    #[test]
    fn press_pulse_peaks_at_midpoint() {
        let (mut anim, card, stage) = base();
        anim.press_on = true;
        // Window [1.0, 1.18] within the hold phase.
        let mid = 1.0 + 0.09;
        let (peak, _) = card_transform(&anim, &card, &stage, mid);
        assert!((peak.scale - (1.0 - anim.press_depth)).abs() < 1e-9);
        assert!((peak.shadow_factor - 0.5).abs() < 1e-9);
        let (edge, _) = card_transform(&anim, &card, &stage, 1.0);
        assert!((edge.scale - 1.0).abs() < 1e-9);
        let (outside, _) = card_transform(&anim, &card, &stage, 1.5);
        assert_eq!(outside.scale, 1.0);
    }

    #[test]
    fn zero_duration_press_hits_full_depth() {
        let (mut anim, card, stage) = base();
        anim.press_on = true;
        anim.press_dur = 0.0;
        let (tr, _) = card_transform(&anim, &card, &stage, 1.0);
        assert!((tr.scale - (1.0 - anim.press_depth)).abs() < 1e-9);
    }

    #[test]
    fn validate_rejects_bad_params() {
        let mut anim = AnimParams::default();
        anim.hold = -1.0;
        assert!(anim.validate().is_err());
        let mut anim = AnimParams::default();
        anim.press_depth = 2.0;
        assert!(anim.validate().is_err());
        assert!(AnimParams::default().validate().is_ok());
    }
}
