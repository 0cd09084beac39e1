use bubblemap::graph::{GraphLink, GraphNode, LabelMode, LinkDirection, LinkKind, truncated_address};
use bubblemap::layout::ViewTransform;
use eframe::egui::{Color32, Painter, Pos2, Rect, Stroke, Vec2};

pub(super) const BACKGROUND: Color32 = Color32::from_rgb(6, 16, 25);
pub(super) const NODE_FILL: Color32 = Color32::from_rgb(6, 16, 25);
pub(super) const MAIN_FILL: Color32 = Color32::from_rgb(42, 63, 80);
pub(super) const ACCENT: Color32 = Color32::from_rgb(52, 207, 130);
pub(super) const SELECTED: Color32 = Color32::from_rgb(0, 142, 255);
pub(super) const RED: Color32 = Color32::from_rgb(255, 127, 123);
const LINK: Color32 = Color32::from_rgba_premultiplied(70, 96, 118, 150);

/// Custom highlight, then selection, then shared-holder emphasis, then the default accent.
pub(super) fn node_stroke_color(node: &GraphNode, selected: bool, highlight_shared: bool) -> Color32 {
    if let Some(color) = node.custom_highlight.as_deref().and_then(parse_hex) {
        return color;
    }
    if selected || (highlight_shared && node.is_shared()) {
        return SELECTED;
    }
    ACCENT
}

/// Custom labels win in both modes.
pub(super) fn display_label(node: &GraphNode, mode: LabelMode) -> String {
    match mode {
        LabelMode::Label => node.label.clone(),
        LabelMode::Address if node.has_custom_label => node.label.clone(),
        LabelMode::Address => truncated_address(&node.address),
    }
}

pub(super) fn parse_hex(color: &str) -> Option<Color32> {
    Color32::from_hex(color.trim()).ok()
}

pub(super) fn to_hex(color: Color32) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r(), color.g(), color.b())
}

pub(super) fn link_stroke(link: &GraphLink, zoom: f32) -> Stroke {
    let width = (link_width(link) * zoom.sqrt()).clamp(0.5, 6.0);
    match &link.kind {
        LinkKind::Aggregated { .. } => Stroke::new(width, LINK),
        LinkKind::Transaction {
            direction: LinkDirection::Incoming,
            ..
        } => Stroke::new(width, ACCENT.gamma_multiply(0.7)),
        LinkKind::Transaction {
            direction: LinkDirection::Outgoing,
            ..
        } => Stroke::new(width, RED.gamma_multiply(0.7)),
    }
}

fn link_width(link: &GraphLink) -> f32 {
    let value = link.value().abs().max(1.0);
    1.0 + (value.log10() as f32 * 0.35).min(3.0)
}

/// Dotted grid that moves with the view.
pub(super) fn draw_background(painter: &Painter, rect: Rect, view: ViewTransform) {
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let step = (64.0 * view.scale.clamp(0.5, 2.0)).max(24.0);
    let origin = rect.min + view.translate;
    let dot = Color32::from_rgba_unmultiplied(52, 207, 130, 18);

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
        while y < rect.bottom() {
            painter.circle_filled(Pos2::new(x, y), 1.0, dot);
            y += step;
        }
        x += step;
    }
}

pub(super) fn circle_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    rect.expand(radius).contains(position)
}

/// Cheap culling: the bounding box of the points, padded, overlaps the canvas.
pub(super) fn path_visible(rect: Rect, points: &[Pos2], padding: f32) -> bool {
    let Some(bounds) = points
        .iter()
        .map(|point| Rect::from_center_size(*point, Vec2::ZERO))
        .reduce(|bounds, point| bounds.union(point))
    else {
        return false;
    };
    rect.intersects(bounds.expand(padding))
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    fn node() -> GraphNode {
        GraphNode {
            id: "a".to_owned(),
            address: "A".to_owned(),
            label: "A".to_owned(),
            has_custom_label: false,
            address_label: None,
            is_main: false,
            token_amount: 10.0,
            value_usd: 0.0,
            ownership_percentage: 0.0,
            total_inflow: 0.0,
            total_outflow: 0.0,
            balance_change_24h: 0.0,
            balance_change_7d: 0.0,
            balance_change_30d: 0.0,
            connected_tokens: ["t1".to_owned(), "t2".to_owned()].into(),
            is_smart_contract: false,
            is_exchange: false,
            custom_highlight: None,
            locked: false,
        }
    }

    #[test]
    fn stroke_priority() {
        let mut node = node();
        assert_eq!(node_stroke_color(&node, false, false), ACCENT);
        assert_eq!(node_stroke_color(&node, false, true), SELECTED);
        assert_eq!(node_stroke_color(&node, true, false), SELECTED);

        node.custom_highlight = Some(to_hex(RED));
        assert_eq!(node_stroke_color(&node, true, true), RED);

        node.custom_highlight = Some("not a colour".to_owned());
        assert_eq!(node_stroke_color(&node, false, false), ACCENT);
    }

    #[test]
    fn offscreen_paths_are_culled() {
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 100.0));
        assert!(path_visible(rect, &[pos2(-50.0, 50.0), pos2(150.0, 50.0)], 0.0));
        assert!(!path_visible(rect, &[pos2(200.0, 200.0), pos2(300.0, 250.0)], 10.0));
        assert!(!path_visible(rect, &[], 10.0));
    }
}
