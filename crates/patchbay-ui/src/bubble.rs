use std::time::{Duration, Instant};

use egui::{Context, FontId, Rect, Shape, Stroke};

const BUBBLE_WRAP_WIDTH: f32 = 280.0;
const STEM_LENGTH: f32 = 10.0;

/// A transient speech bubble pointing at a target rect.
///
/// The owner keeps the value and calls [`show`](BubbleMessage::show) every
/// frame until [`finished`](BubbleMessage::finished); the bubble times out
/// on its own and fades over a short interval.
pub struct BubbleMessage {
    text: String,
    target: Rect,
    expiry: Option<Instant>,
    fade_out: Duration,
    dismiss_on_click: bool,
    dismissed_at: Option<Instant>,
}

impl BubbleMessage {
    pub fn new(text: impl Into<String>, target: Rect) -> Self {
        Self {
            text: text.into(),
            target,
            expiry: None,
            fade_out: Duration::from_millis(150),
            dismiss_on_click: true,
            dismissed_at: None,
        }
    }

    /// Starts the fade after `duration`. Without this the bubble stays
    /// until dismissed.
    pub fn for_duration(mut self, duration: Duration) -> Self {
        self.expiry = Some(Instant::now() + duration);
        self
    }

    pub fn with_fade_out(mut self, fade_out: Duration) -> Self {
        self.fade_out = fade_out;
        self
    }

    pub fn keep_on_click(mut self) -> Self {
        self.dismiss_on_click = false;
        self
    }

    pub fn dismiss(&mut self) {
        if self.dismissed_at.is_none() {
            self.dismissed_at = Some(Instant::now());
        }
    }

    pub fn finished(&self) -> bool {
        self.opacity_at(Instant::now()) <= 0.0
    }

    pub fn show(&mut self, ctx: &Context) {
        let opacity = self.opacity_at(Instant::now());
        if opacity <= 0.0 {
            return;
        }
        if self.dismiss_on_click && ctx.input(|i| i.pointer.any_pressed()) {
            self.dismiss();
        }

        let visuals = ctx.style().visuals.clone();
        let text_color = visuals.text_color().gamma_multiply(opacity);
        let galley = ctx.fonts(|fonts| {
            fonts.layout(
                self.text.clone(),
                FontId::proportional(13.0),
                text_color,
                BUBBLE_WRAP_WIDTH,
            )
        });

        let padding = egui::vec2(10.0, 8.0);
        let body_size = galley.size() + padding * 2.0;
        let above = self.target.top() - STEM_LENGTH - body_size.y >= 0.0;
        let tip = if above {
            egui::pos2(self.target.center().x, self.target.top())
        } else {
            egui::pos2(self.target.center().x, self.target.bottom())
        };
        let body_top = if above {
            tip.y - STEM_LENGTH - body_size.y
        } else {
            tip.y + STEM_LENGTH
        };
        let body = Rect::from_min_size(egui::pos2(tip.x - body_size.x * 0.5, body_top), body_size);

        let fill = visuals.window_fill.gamma_multiply(opacity);
        let outline_color = visuals.widgets.noninteractive.bg_stroke.color;
        let outline = Stroke::new(1.0, outline_color.gamma_multiply(opacity));

        egui::Area::new(egui::Id::new("bubble_message"))
            .order(egui::Order::Tooltip)
            .interactable(false)
            .fixed_pos(body.min)
            .show(ctx, |ui| {
                let painter = ui.painter();
                painter.rect(body, 6.0, fill, outline);
                let base_y = if above { body.bottom() } else { body.top() };
                let stem = vec![
                    egui::pos2(tip.x - STEM_LENGTH * 0.6, base_y),
                    egui::pos2(tip.x + STEM_LENGTH * 0.6, base_y),
                    tip,
                ];
                painter.add(Shape::convex_polygon(stem, fill, Stroke::NONE));
                painter.galley(body.min + padding, galley, text_color);
                ui.allocate_rect(body, egui::Sense::hover());
            });

        if self.expiry.is_some() || self.dismissed_at.is_some() {
            ctx.request_repaint();
        }
    }

    fn opacity_at(&self, now: Instant) -> f32 {
        let fade_start = match (self.dismissed_at, self.expiry) {
            (Some(dismissed), Some(expiry)) => dismissed.min(expiry),
            (Some(dismissed), None) => dismissed,
            (None, Some(expiry)) => expiry,
            (None, None) => return 1.0,
        };
        if now < fade_start {
            return 1.0;
        }
        let fade = self.fade_out.as_secs_f32();
        if fade <= 0.0 {
            return 0.0;
        }
        (1.0 - (now - fade_start).as_secs_f32() / fade).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn stays_opaque_until_the_deadline() {
        let start = Instant::now();
        let bubble = BubbleMessage::new("saved", Rect::ZERO)
            .for_duration(Duration::from_secs(10))
            .with_fade_out(Duration::from_secs(10));
        assert_eq!(bubble.opacity_at(start + Duration::from_secs(5)), 1.0);
        assert!(bubble.opacity_at(start + Duration::from_secs(16)) < 0.7);
        assert_eq!(bubble.opacity_at(start + Duration::from_secs(30)), 0.0);
        assert!(!bubble.finished());
    }

    #[test]
    fn undated_bubbles_stay_until_dismissed() {
        let mut bubble = BubbleMessage::new("saved", Rect::ZERO);
        assert_eq!(
            bubble.opacity_at(Instant::now() + Duration::from_secs(3600)),
            1.0
        );
        bubble.dismiss();
        assert_eq!(bubble.opacity_at(Instant::now() + Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn zero_fade_disappears_immediately() {
        let mut bubble = BubbleMessage::new("saved", Rect::ZERO).with_fade_out(Duration::ZERO);
        bubble.dismiss();
        assert!(bubble.finished());
    }

    #[test]
    fn dismissal_wins_over_a_later_deadline() {
        let start = Instant::now();
        let mut bubble = BubbleMessage::new("saved", Rect::ZERO)
            .for_duration(Duration::from_secs(3600))
            .with_fade_out(Duration::from_secs(1));
        bubble.dismiss();
        assert_eq!(bubble.opacity_at(start + Duration::from_secs(10)), 0.0);
    }
}
