use bubblemap::address::Chain;
use eframe::egui::{self, Ui};

mod controls;
mod details;
mod panels;

pub(super) fn chain_selector(ui: &mut Ui, id_salt: &str, chain: &mut Chain) {
    egui::ComboBox::from_id_salt(id_salt)
        .selected_text(chain.as_str())
        .show_ui(ui, |ui| {
            for option in Chain::ALL {
                ui.selectable_value(chain, option, option.as_str());
            }
        });
}
