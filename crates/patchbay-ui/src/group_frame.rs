use egui::{Color32, FontId, InnerResponse, Rect, Stroke, Ui};

const LABEL_HEIGHT: f32 = 16.0;
const TEXT_INDENT: f32 = 12.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LabelJustify {
    #[default]
    Left,
    Centre,
    Right,
}

/// A titled outline around a group of controls: rounded-rect stroke with a
/// gap where the label sits on the top edge.
pub struct GroupFrame<'a> {
    label: &'a str,
    justify: LabelJustify,
    stroke: Option<Stroke>,
    text_color: Option<Color32>,
    rounding: f32,
}

impl<'a> GroupFrame<'a> {
    pub fn new(label: &'a str) -> Self {
        Self {
            label,
            justify: LabelJustify::Left,
            stroke: None,
            text_color: None,
            rounding: 5.0,
        }
    }

    pub fn justify(mut self, justify: LabelJustify) -> Self {
        self.justify = justify;
        self
    }

    pub fn with_stroke(mut self, stroke: Stroke) -> Self {
        self.stroke = Some(stroke);
        self
    }

    pub fn with_text_color(mut self, color: Color32) -> Self {
        self.text_color = Some(color);
        self
    }

    pub fn show<R>(self, ui: &mut Ui, contents: impl FnOnce(&mut Ui) -> R) -> InnerResponse<R> {
        let stroke = self
            .stroke
            .unwrap_or(ui.visuals().widgets.noninteractive.bg_stroke);
        let text_color = self.text_color.unwrap_or_else(|| ui.visuals().text_color());

        let margin = egui::Margin {
            left: 10.0,
            right: 10.0,
            top: LABEL_HEIGHT + 4.0,
            bottom: 10.0,
        };
        let result = egui::Frame::none().inner_margin(margin).show(ui, contents);
        let frame_rect = result.response.rect;

        // the outline top runs through the middle of the label
        let outline = Rect::from_min_max(
            egui::pos2(frame_rect.left(), frame_rect.top() + LABEL_HEIGHT * 0.5),
            frame_rect.max,
        );
        let painter = ui.painter();
        painter.rect_stroke(outline, self.rounding, stroke);

        if !self.label.is_empty() {
            let galley = painter.layout_no_wrap(
                self.label.to_owned(),
                FontId::proportional(13.0),
                text_color,
            );
            let x = label_origin_x(self.justify, outline.left(), outline.right(), galley.size().x);
            let text_rect = Rect::from_min_size(
                egui::pos2(x, outline.top() - galley.size().y * 0.5),
                galley.size(),
            );
            painter.rect_filled(
                text_rect.expand2(egui::vec2(4.0, 0.0)),
                0.0,
                ui.visuals().panel_fill,
            );
            painter.galley(text_rect.min, galley, text_color);
        }

        result
    }
}

fn label_origin_x(justify: LabelJustify, left: f32, right: f32, text_width: f32) -> f32 {
    match justify {
        LabelJustify::Left => left + TEXT_INDENT,
        LabelJustify::Centre => (left + right - text_width) * 0.5,
        LabelJustify::Right => right - TEXT_INDENT - text_width,
    }
}
